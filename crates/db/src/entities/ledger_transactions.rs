//! `SeaORM` Entity for ledger_transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Assigned by the database on insert.
    pub sequence: i64,
    pub recorded_at: DateTimeWithTimeZone,
    pub company_id: Uuid,
    pub transaction_date: Date,
    pub transaction_type: String,
    pub product_type: String,
    pub spirits_class: String,
    pub tax_status: String,
    pub proof_gallons: Decimal,
    pub wine_gallons: Decimal,
    pub source_kind: Option<String>,
    pub source_reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
