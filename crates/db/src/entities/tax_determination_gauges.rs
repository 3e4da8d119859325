//! `SeaORM` Entity for tax_determination_gauges table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "tax_determination_gauges")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub gauge_id: Uuid,
    pub determination_id: Uuid,
    pub company_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tax_determinations::Entity",
        from = "Column::DeterminationId",
        to = "super::tax_determinations::Column::Id"
    )]
    TaxDetermination,
}

impl Related<super::tax_determinations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TaxDetermination.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
