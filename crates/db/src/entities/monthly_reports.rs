//! `SeaORM` Entity for monthly_reports table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "monthly_reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub period_year: i32,
    pub period_month: i32,
    pub form_type: String,
    pub status: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub data: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub validation: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub history: Json,
    pub generated_by: String,
    pub generated_at: DateTimeWithTimeZone,
    pub submitted_for_review_by: Option<String>,
    pub submitted_for_review_at: Option<DateTimeWithTimeZone>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTimeWithTimeZone>,
    pub review_notes: Option<String>,
    pub submitted_at: Option<DateTimeWithTimeZone>,
    pub confirmation_number: Option<String>,
    pub document_reference: Option<String>,
    pub superseded_by: Option<Uuid>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::SupersededBy",
        to = "Column::Id"
    )]
    SupersededBy,
}

impl ActiveModelBehavior for ActiveModel {}
