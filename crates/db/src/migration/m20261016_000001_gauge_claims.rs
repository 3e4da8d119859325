//! Gauge claims.
//!
//! Records which removal gauges each tax determination consumed, so a gauge
//! is taxed at most once.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(GAUGE_CLAIMS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_GAUGE_CLAIMS_SQL).await?;
        Ok(())
    }
}

const GAUGE_CLAIMS_SQL: &str = r"
ALTER TABLE tax_determinations
    ADD COLUMN gauge_ids JSONB NOT NULL DEFAULT '[]'::jsonb;

-- One row per consumed gauge; the primary key rejects a second claim
CREATE TABLE tax_determination_gauges (
    gauge_id UUID PRIMARY KEY REFERENCES gauge_records(id),
    determination_id UUID NOT NULL REFERENCES tax_determinations(id),
    company_id UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_gauge_claims_determination ON tax_determination_gauges(determination_id);

CREATE TRIGGER trg_gauge_claims_append_only
BEFORE UPDATE OR DELETE ON tax_determination_gauges
FOR EACH ROW
EXECUTE FUNCTION prevent_modification();
";

const DROP_GAUGE_CLAIMS_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_gauge_claims_append_only ON tax_determination_gauges;
DROP TABLE IF EXISTS tax_determination_gauges CASCADE;
ALTER TABLE tax_determinations DROP COLUMN IF EXISTS gauge_ids;
";
