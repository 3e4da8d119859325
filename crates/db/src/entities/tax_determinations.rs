//! `SeaORM` Entity for tax_determinations table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "tax_determinations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub order_reference: String,
    pub determination_date: Date,
    pub prior_ytd_production_gallons: Decimal,
    pub reduced_rate_eligible: bool,
    pub reduced_rate_threshold: Decimal,
    pub reduced_rate: Decimal,
    pub standard_rate: Decimal,
    pub total_proof_gallons: Decimal,
    pub reduced_rate_gallons: Decimal,
    pub standard_rate_gallons: Decimal,
    pub reduced_rate_tax: Decimal,
    pub standard_rate_tax: Decimal,
    pub total_tax_due: Decimal,
    pub effective_tax_rate: Decimal,
    #[sea_orm(column_type = "JsonBinary")]
    pub gauge_ids: Json,
    pub payment_reference: Option<String>,
    pub payment_date: Option<Date>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
