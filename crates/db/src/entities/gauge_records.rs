//! `SeaORM` Entity for gauge_records table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "gauge_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub barrel_id: Uuid,
    pub purpose: String,
    pub measured_at: DateTimeWithTimeZone,
    pub observed_proof: Decimal,
    pub observed_temperature_f: Decimal,
    pub observed_volume: Decimal,
    pub wine_gallons: Decimal,
    pub proof_gallons: Decimal,
    pub operator: Option<String>,
    pub supersedes: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::Supersedes",
        to = "Column::Id"
    )]
    SupersededRecord,
}

impl ActiveModelBehavior for ActiveModel {}
