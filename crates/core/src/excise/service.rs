//! Tax determination service.
//!
//! Year-to-date production is the sum of Production ledger entries from
//! January 1 through the determination date.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use stillhouse_shared::types::{CompanyId, GaugeRecordId, TaxDeterminationId};

use crate::audit::{AuditAction, AuditContext, AuditEntityType, AuditLogger};
use crate::excise::calculator::ExciseCalculator;
use crate::excise::error::ExciseError;
use crate::excise::types::{ExciseInput, TaxBreakdown, TaxDetermination, TaxOrder, TaxRates};
use crate::gauge::GaugePurpose;
use crate::period::DateRange;
use crate::store::{ComplianceStore, StoreError, UnitOfWork};

/// Determines, persists and settles excise tax for removals.
pub struct TaxService<S> {
    store: Arc<S>,
    rates: TaxRates,
    default_threshold: Decimal,
}

impl<S: ComplianceStore> TaxService<S> {
    /// Creates a tax service with the configured rates and default threshold.
    pub fn new(store: Arc<S>, rates: TaxRates, default_threshold: Decimal) -> Self {
        Self {
            store,
            rates,
            default_threshold,
        }
    }

    /// Computes the tax for an order without persisting anything.
    pub async fn preview(&self, order: &TaxOrder) -> Result<TaxBreakdown, ExciseError> {
        let input = self.input_for(order).await?;
        ExciseCalculator::calculate(&input, &self.rates)
    }

    /// Computes and persists the tax for an order.
    ///
    /// # Errors
    ///
    /// Returns `ExciseError::DuplicateDetermination` if the company already
    /// has a determination for the order.
    pub async fn determine(
        &self,
        order: TaxOrder,
        ctx: &AuditContext,
    ) -> Result<TaxDetermination, ExciseError> {
        self.persist(order, Vec::new(), ctx).await
    }

    /// Determines tax for the proof gallons of a set of removal gauges.
    ///
    /// A gauge listed more than once is counted once. Each gauge is taxed at
    /// most once, and only while no correction supersedes it.
    pub async fn determine_from_gauges(
        &self,
        company_id: CompanyId,
        order_reference: String,
        determination_date: NaiveDate,
        gauge_ids: &[GaugeRecordId],
        ctx: &AuditContext,
    ) -> Result<TaxDetermination, ExciseError> {
        if gauge_ids.is_empty() {
            return Err(ExciseError::NoGauges);
        }

        let gauge_ids: Vec<GaugeRecordId> = gauge_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut removal_proof_gallons = Decimal::ZERO;
        for &id in &gauge_ids {
            let gauge = self
                .store
                .gauge_record(company_id, id)
                .await?
                .ok_or(ExciseError::GaugeNotFound(id))?;
            if gauge.purpose != GaugePurpose::Removal {
                return Err(ExciseError::NonRemovalGauge(id));
            }
            let correction = self
                .store
                .gauges_for_barrel(company_id, gauge.barrel_id)
                .await?
                .into_iter()
                .find(|g| g.supersedes == Some(id));
            if let Some(correction) = correction {
                return Err(ExciseError::GaugeSuperseded {
                    gauge_id: id,
                    superseded_by: correction.id,
                });
            }
            removal_proof_gallons += gauge.proof_gallons;
        }

        let order = TaxOrder {
            company_id,
            order_reference,
            determination_date,
            removal_proof_gallons,
        };
        self.persist(order, gauge_ids, ctx).await
    }

    /// Records payment of a determination. A determination is paid once.
    pub async fn record_payment(
        &self,
        company_id: CompanyId,
        id: TaxDeterminationId,
        payment_reference: &str,
        payment_date: NaiveDate,
        ctx: &AuditContext,
    ) -> Result<TaxDetermination, ExciseError> {
        let payment_reference = payment_reference.trim();
        if payment_reference.is_empty() {
            return Err(ExciseError::PaymentReferenceRequired);
        }

        let mut tx = self.store.begin().await?;
        let before = tx
            .tax_determination(company_id, id)
            .await?
            .ok_or(ExciseError::DeterminationNotFound(id))?;
        if before.is_paid() {
            return Err(ExciseError::AlreadyPaid(id));
        }

        let mut after = before.clone();
        after.payment_reference = Some(payment_reference.to_string());
        after.payment_date = Some(payment_date);
        tx.update_tax_determination(&after).await?;
        AuditLogger::record(
            &mut tx,
            AuditEntityType::TaxDetermination,
            id.into(),
            AuditAction::Update,
            ctx,
            Some(&before),
            Some(&after),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(determination_id = %id, "Tax payment recorded");
        Ok(after)
    }

    /// Finds a determination.
    pub async fn get(
        &self,
        company_id: CompanyId,
        id: TaxDeterminationId,
    ) -> Result<TaxDetermination, ExciseError> {
        self.store
            .tax_determination(company_id, id)
            .await?
            .ok_or(ExciseError::DeterminationNotFound(id))
    }

    /// Lists a company's determinations dated inside `range`.
    pub async fn list(
        &self,
        company_id: CompanyId,
        range: DateRange,
    ) -> Result<Vec<TaxDetermination>, ExciseError> {
        Ok(self.store.tax_determinations(company_id, range).await?)
    }

    async fn persist(
        &self,
        order: TaxOrder,
        gauge_ids: Vec<GaugeRecordId>,
        ctx: &AuditContext,
    ) -> Result<TaxDetermination, ExciseError> {
        let input = self.input_for(&order).await?;
        let breakdown = ExciseCalculator::calculate(&input, &self.rates)?;

        let determination = TaxDetermination {
            id: TaxDeterminationId::new(),
            company_id: order.company_id,
            order_reference: order.order_reference.trim().to_string(),
            determination_date: order.determination_date,
            prior_ytd_production_gallons: input.prior_ytd_production_gallons,
            reduced_rate_eligible: input.reduced_rate_eligible,
            reduced_rate_threshold: input.reduced_rate_threshold,
            rates: self.rates,
            breakdown,
            gauge_ids,
            payment_reference: None,
            payment_date: None,
            created_at: Utc::now(),
        };

        let mut tx = self.store.begin().await?;
        match tx.insert_tax_determination(&determination).await {
            Err(StoreError::Conflict(_)) => {
                return Err(ExciseError::DuplicateDetermination(
                    determination.order_reference,
                ));
            }
            other => other?,
        }
        for &gauge_id in &determination.gauge_ids {
            match tx
                .claim_gauge(determination.company_id, gauge_id, determination.id)
                .await
            {
                Err(StoreError::Conflict(_)) => {
                    return Err(ExciseError::GaugeAlreadyDetermined(gauge_id));
                }
                other => other?,
            }
        }
        AuditLogger::record(
            &mut tx,
            AuditEntityType::TaxDetermination,
            determination.id.into(),
            AuditAction::Create,
            ctx,
            None,
            Some(&determination),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            determination_id = %determination.id,
            company_id = %determination.company_id,
            order_reference = %determination.order_reference,
            total_tax_due = %determination.breakdown.total_tax_due,
            gauges = determination.gauge_ids.len(),
            "Tax determined"
        );
        Ok(determination)
    }

    async fn input_for(&self, order: &TaxOrder) -> Result<ExciseInput, ExciseError> {
        if order.order_reference.trim().is_empty() {
            return Err(ExciseError::OrderReferenceRequired);
        }
        if order.removal_proof_gallons < Decimal::ZERO {
            return Err(ExciseError::InvalidQuantity {
                field: "removal_proof_gallons",
                value: order.removal_proof_gallons,
            });
        }

        let profile = self
            .store
            .company_profile(order.company_id)
            .await?
            .ok_or(ExciseError::CompanyNotFound(order.company_id))?;
        let prior_ytd_production_gallons = self
            .store
            .production_proof_gallons(
                order.company_id,
                DateRange::year_through(order.determination_date),
            )
            .await?;

        Ok(ExciseInput {
            removal_proof_gallons: order.removal_proof_gallons,
            prior_ytd_production_gallons,
            reduced_rate_eligible: profile.reduced_rate_eligible,
            reduced_rate_threshold: profile.threshold_or(self.default_threshold),
        })
    }
}
