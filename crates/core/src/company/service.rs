//! Company profile management.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use stillhouse_shared::types::CompanyId;

use crate::audit::{AuditAction, AuditContext, AuditEntityType, AuditLogger};
use crate::company::error::CompanyError;
use crate::company::profile::CompanyProfile;
use crate::company::schedule::ReportSchedule;
use crate::period::ReportPeriod;
use crate::store::{ComplianceStore, UnitOfWork};

/// Reads and writes company compliance profiles.
pub struct CompanyService<S> {
    store: Arc<S>,
}

impl<S: ComplianceStore> CompanyService<S> {
    /// Creates a new company service.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Creates or replaces a profile.
    ///
    /// The first save is audited as a Create, later ones as an Update with
    /// the previous profile as the old value.
    pub async fn save_profile(
        &self,
        mut profile: CompanyProfile,
        ctx: &AuditContext,
    ) -> Result<CompanyProfile, CompanyError> {
        profile.legal_name = profile.legal_name.trim().to_string();
        if profile.legal_name.is_empty() {
            return Err(CompanyError::LegalNameRequired);
        }
        if let Some(threshold) = profile.reduced_rate_threshold
            && threshold < Decimal::ZERO
        {
            return Err(CompanyError::InvalidThreshold(threshold));
        }
        if let Some(schedule) = &profile.schedule {
            schedule.validate()?;
        }
        profile.updated_at = Utc::now();

        let mut tx = self.store.begin().await?;
        let previous = tx.company_profile(profile.company_id).await?;
        tx.save_company_profile(&profile).await?;
        let action = if previous.is_some() {
            AuditAction::Update
        } else {
            AuditAction::Create
        };
        AuditLogger::record(
            &mut tx,
            AuditEntityType::CompanyProfile,
            profile.company_id.into(),
            action,
            ctx,
            previous.as_ref(),
            Some(&profile),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(company_id = %profile.company_id, %action, "Company profile saved");
        Ok(profile)
    }

    /// Finds a profile.
    pub async fn get_profile(&self, company_id: CompanyId) -> Result<CompanyProfile, CompanyError> {
        self.store
            .company_profile(company_id)
            .await?
            .ok_or(CompanyError::NotFound(company_id))
    }

    /// Companies whose schedule is due at `now`, with the period to generate.
    pub async fn due_for_generation(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<(CompanyProfile, ReportPeriod)>, CompanyError> {
        let period = ReportSchedule::period_for(now);
        Ok(self
            .store
            .scheduled_companies()
            .await?
            .into_iter()
            .filter(|p| p.schedule.is_some_and(|s| s.is_due(now)))
            .map(|p| (p, period))
            .collect())
    }
}
