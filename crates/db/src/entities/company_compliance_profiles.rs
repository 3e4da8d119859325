//! `SeaORM` Entity for company_compliance_profiles table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "company_compliance_profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub company_id: Uuid,
    pub legal_name: String,
    pub permit_number: Option<String>,
    pub employer_id: Option<String>,
    pub reduced_rate_eligible: bool,
    pub reduced_rate_threshold: Option<Decimal>,
    pub report_form: String,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub schedule: Option<Json>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
