//! Compliance schema.
//!
//! Creates the profile, gauge, ledger, tax, report and audit tables together
//! with the triggers that keep the append-only tables append-only.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: TABLES
        // ============================================================
        db.execute_unprepared(PROFILES_SQL).await?;
        db.execute_unprepared(GAUGE_RECORDS_SQL).await?;
        db.execute_unprepared(LEDGER_TRANSACTIONS_SQL).await?;
        db.execute_unprepared(TAX_DETERMINATIONS_SQL).await?;
        db.execute_unprepared(MONTHLY_REPORTS_SQL).await?;
        db.execute_unprepared(AUDIT_LOG_SQL).await?;

        // ============================================================
        // PART 2: TRIGGERS & FUNCTIONS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const PROFILES_SQL: &str = r"
CREATE TABLE company_compliance_profiles (
    company_id UUID PRIMARY KEY,
    legal_name TEXT NOT NULL CHECK (btrim(legal_name) <> ''),
    permit_number TEXT,
    employer_id TEXT,
    reduced_rate_eligible BOOLEAN NOT NULL DEFAULT FALSE,
    reduced_rate_threshold NUMERIC(14, 2) CHECK (reduced_rate_threshold >= 0),
    report_form VARCHAR(32) NOT NULL
        CHECK (report_form IN ('monthly_storage', 'monthly_production', 'monthly_processing')),
    schedule JSONB,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_profiles_scheduled ON company_compliance_profiles(company_id)
    WHERE schedule IS NOT NULL;
";

const GAUGE_RECORDS_SQL: &str = r"
CREATE TABLE gauge_records (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL,
    barrel_id UUID NOT NULL,
    purpose VARCHAR(16) NOT NULL CHECK (purpose IN ('fill', 'storage', 'removal')),
    measured_at TIMESTAMPTZ NOT NULL,
    observed_proof NUMERIC NOT NULL CHECK (observed_proof BETWEEN 0 AND 200),
    observed_temperature_f NUMERIC NOT NULL,
    observed_volume NUMERIC NOT NULL CHECK (observed_volume >= 0),
    wine_gallons NUMERIC(14, 2) NOT NULL CHECK (wine_gallons >= 0),
    proof_gallons NUMERIC(14, 2) NOT NULL CHECK (proof_gallons >= 0),
    operator TEXT,
    supersedes UUID REFERENCES gauge_records(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_gauges_barrel ON gauge_records(company_id, barrel_id, measured_at, created_at);
";

const LEDGER_TRANSACTIONS_SQL: &str = r"
CREATE TABLE ledger_transactions (
    id UUID PRIMARY KEY,
    sequence BIGINT GENERATED ALWAYS AS IDENTITY UNIQUE,
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
    company_id UUID NOT NULL,
    transaction_date DATE NOT NULL,
    transaction_type VARCHAR(32) NOT NULL CHECK (transaction_type IN (
        'production', 'transfer_in', 'transfer_out', 'loss', 'gain',
        'tax_determination', 'destruction', 'bottling'
    )),
    product_type TEXT NOT NULL CHECK (btrim(product_type) <> ''),
    spirits_class VARCHAR(32) NOT NULL CHECK (spirits_class IN (
        'whisky_under_160', 'whisky_over_160', 'brandy', 'rum', 'gin', 'vodka',
        'neutral_spirits', 'other'
    )),
    tax_status VARCHAR(16) NOT NULL
        CHECK (tax_status IN ('bonded', 'tax_paid', 'export', 'tax_free')),
    proof_gallons NUMERIC(14, 2) NOT NULL CHECK (proof_gallons >= 0),
    wine_gallons NUMERIC(14, 2) NOT NULL CHECK (wine_gallons >= 0),
    source_kind VARCHAR(32),
    source_reference TEXT,
    notes TEXT,
    CONSTRAINT chk_source_pair CHECK ((source_kind IS NULL) = (source_reference IS NULL))
);

-- Keyset pagination for period windows
CREATE INDEX idx_ledger_window ON ledger_transactions(company_id, transaction_date, sequence);

-- Year-to-date production sums
CREATE INDEX idx_ledger_production ON ledger_transactions(company_id, transaction_date)
    WHERE transaction_type = 'production';
";

const TAX_DETERMINATIONS_SQL: &str = r"
CREATE TABLE tax_determinations (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL,
    order_reference TEXT NOT NULL CHECK (btrim(order_reference) <> ''),
    determination_date DATE NOT NULL,
    prior_ytd_production_gallons NUMERIC(14, 2) NOT NULL,
    reduced_rate_eligible BOOLEAN NOT NULL,
    reduced_rate_threshold NUMERIC(14, 2) NOT NULL,
    reduced_rate NUMERIC(10, 4) NOT NULL,
    standard_rate NUMERIC(10, 4) NOT NULL,
    total_proof_gallons NUMERIC(14, 2) NOT NULL,
    reduced_rate_gallons NUMERIC(14, 2) NOT NULL,
    standard_rate_gallons NUMERIC(14, 2) NOT NULL,
    reduced_rate_tax NUMERIC(16, 2) NOT NULL,
    standard_rate_tax NUMERIC(16, 2) NOT NULL,
    total_tax_due NUMERIC(16, 2) NOT NULL,
    effective_tax_rate NUMERIC(10, 4) NOT NULL,
    payment_reference TEXT,
    payment_date DATE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_tax_order UNIQUE (company_id, order_reference),
    CONSTRAINT chk_tiers CHECK (reduced_rate_gallons + standard_rate_gallons = total_proof_gallons),
    CONSTRAINT chk_payment_pair CHECK ((payment_reference IS NULL) = (payment_date IS NULL))
);

CREATE INDEX idx_tax_period ON tax_determinations(company_id, determination_date, created_at);
";

const MONTHLY_REPORTS_SQL: &str = r"
CREATE TABLE monthly_reports (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL,
    period_year INTEGER NOT NULL,
    period_month INTEGER NOT NULL CHECK (period_month BETWEEN 1 AND 12),
    form_type VARCHAR(32) NOT NULL,
    status VARCHAR(32) NOT NULL CHECK (status IN (
        'draft', 'validation_failed', 'pending_review', 'approved',
        'submitted', 'archived', 'rejected'
    )),
    data JSONB NOT NULL,
    validation JSONB NOT NULL,
    history JSONB NOT NULL DEFAULT '[]'::jsonb,
    generated_by TEXT NOT NULL,
    generated_at TIMESTAMPTZ NOT NULL,
    submitted_for_review_by TEXT,
    submitted_for_review_at TIMESTAMPTZ,
    reviewed_by TEXT,
    reviewed_at TIMESTAMPTZ,
    review_notes TEXT,
    submitted_at TIMESTAMPTZ,
    confirmation_number TEXT,
    document_reference TEXT,
    superseded_by UUID REFERENCES monthly_reports(id),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- At most one live report per company and period
CREATE UNIQUE INDEX uq_reports_live_period
    ON monthly_reports(company_id, period_year, period_month)
    WHERE status <> 'rejected' AND superseded_by IS NULL;

CREATE INDEX idx_reports_period
    ON monthly_reports(company_id, period_year, period_month, generated_at);
";

const AUDIT_LOG_SQL: &str = r"
CREATE TABLE audit_log (
    id UUID PRIMARY KEY,
    sequence BIGINT GENERATED ALWAYS AS IDENTITY UNIQUE,
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
    entity_type VARCHAR(32) NOT NULL CHECK (entity_type IN (
        'gauge_record', 'ledger_transaction', 'monthly_report',
        'tax_determination', 'company_profile'
    )),
    entity_id UUID NOT NULL,
    action VARCHAR(16) NOT NULL CHECK (action IN ('create', 'update', 'delete')),
    actor TEXT NOT NULL,
    old_value JSONB,
    new_value JSONB,
    metadata JSONB,
    CONSTRAINT chk_snapshots CHECK (
        (action = 'create' AND old_value IS NULL AND new_value IS NOT NULL)
        OR (action = 'update' AND old_value IS NOT NULL AND new_value IS NOT NULL)
        OR (action = 'delete' AND old_value IS NOT NULL AND new_value IS NULL)
    )
);

CREATE INDEX idx_audit_entity ON audit_log(entity_type, entity_id, sequence);
CREATE INDEX idx_audit_actor ON audit_log(actor, sequence);
CREATE INDEX idx_audit_recorded ON audit_log(recorded_at);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_modification
-- Rejects UPDATE and DELETE on append-only tables
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_modification()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION '% is append-only; % rejected', TG_TABLE_NAME, TG_OP;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_ledger_append_only
BEFORE UPDATE OR DELETE ON ledger_transactions
FOR EACH ROW
EXECUTE FUNCTION prevent_modification();

CREATE TRIGGER trg_gauges_append_only
BEFORE UPDATE OR DELETE ON gauge_records
FOR EACH ROW
EXECUTE FUNCTION prevent_modification();

CREATE TRIGGER trg_audit_append_only
BEFORE UPDATE OR DELETE ON audit_log
FOR EACH ROW
EXECUTE FUNCTION prevent_modification();

CREATE TRIGGER trg_reports_no_delete
BEFORE DELETE ON monthly_reports
FOR EACH ROW
EXECUTE FUNCTION prevent_modification();

CREATE TRIGGER trg_tax_no_delete
BEFORE DELETE ON tax_determinations
FOR EACH ROW
EXECUTE FUNCTION prevent_modification();

-- ============================================================
-- FUNCTION: restrict_tax_update
-- Only the payment fields change, and only once
-- ============================================================
CREATE OR REPLACE FUNCTION restrict_tax_update()
RETURNS TRIGGER AS $$
BEGIN
    IF (to_jsonb(NEW) - 'payment_reference' - 'payment_date')
        IS DISTINCT FROM (to_jsonb(OLD) - 'payment_reference' - 'payment_date') THEN
        RAISE EXCEPTION 'Only payment fields of a tax determination may change';
    END IF;

    IF OLD.payment_reference IS NOT NULL THEN
        RAISE EXCEPTION 'Tax determination % is already paid', OLD.id;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_tax_payment_only
BEFORE UPDATE ON tax_determinations
FOR EACH ROW
EXECUTE FUNCTION restrict_tax_update();
";

const DROP_ALL_SQL: &str = r"
-- Drop triggers
DROP TRIGGER IF EXISTS trg_tax_payment_only ON tax_determinations;
DROP TRIGGER IF EXISTS trg_tax_no_delete ON tax_determinations;
DROP TRIGGER IF EXISTS trg_reports_no_delete ON monthly_reports;
DROP TRIGGER IF EXISTS trg_audit_append_only ON audit_log;
DROP TRIGGER IF EXISTS trg_gauges_append_only ON gauge_records;
DROP TRIGGER IF EXISTS trg_ledger_append_only ON ledger_transactions;

-- Drop functions
DROP FUNCTION IF EXISTS restrict_tax_update();
DROP FUNCTION IF EXISTS prevent_modification();

-- Drop tables (reverse order of creation)
DROP TABLE IF EXISTS audit_log CASCADE;
DROP TABLE IF EXISTS monthly_reports CASCADE;
DROP TABLE IF EXISTS tax_determinations CASCADE;
DROP TABLE IF EXISTS ledger_transactions CASCADE;
DROP TABLE IF EXISTS gauge_records CASCADE;
DROP TABLE IF EXISTS company_compliance_profiles CASCADE;
";
