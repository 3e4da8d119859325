//! Scheduled report trigger.
//!
//! Generates a Draft report for every company whose schedule is due at the
//! current hour. Intended to be run hourly by cron or a similar scheduler;
//! a period that already has a report is skipped.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use stillhouse_core::ComplianceSettings;
use stillhouse_core::audit::AuditContext;
use stillhouse_core::company::CompanyService;
use stillhouse_core::report::{ReportError, ReportLifecycleManager};
use stillhouse_db::{PgComplianceStore, connect};
use stillhouse_shared::AppConfig;
use stillhouse_shared::config::{LogFormat, LoggingConfig};

const ACTOR: &str = "report-runner";

fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));
    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);
    let settings = ComplianceSettings::from_config(&config.compliance)
        .context("Invalid compliance configuration")?;

    let db = connect(&config.database).await?;
    let store = Arc::new(PgComplianceStore::new(db));
    let companies = CompanyService::new(Arc::clone(&store));
    let manager = ReportLifecycleManager::new(
        Arc::clone(&store),
        settings.report_validator(),
        settings.page_size,
    );

    let now = Utc::now();
    let due = companies.due_for_generation(now).await?;
    info!(count = due.len(), %now, "Companies due for report generation");

    let ctx = AuditContext::system(ACTOR);
    let mut failures = 0_usize;
    for (profile, period) in due {
        let company_id = profile.company_id;
        match manager
            .generate(company_id, period.year(), period.month(), &ctx)
            .await
        {
            Ok(report) => info!(
                %company_id,
                %period,
                report_id = %report.id,
                valid = report.validation.is_valid(),
                "Report generated"
            ),
            Err(ReportError::AlreadyExists { .. }) => {
                info!(%company_id, %period, "Report already exists, skipping");
            }
            Err(e) => {
                failures += 1;
                error!(
                    %company_id,
                    %period,
                    error = %e,
                    code = e.error_code(),
                    "Report generation failed"
                );
            }
        }
    }

    anyhow::ensure!(failures == 0, "{failures} report(s) failed to generate");
    Ok(())
}
