//! Gauge persistence.

use std::sync::Arc;

use stillhouse_shared::types::{BarrelId, CompanyId, GaugeRecordId};

use crate::audit::{AuditAction, AuditContext, AuditEntityType, AuditLogger};
use crate::gauge::error::GaugeError;
use crate::gauge::processor::GaugeProcessor;
use crate::gauge::types::{GaugeMeasurement, GaugeRecord};
use crate::store::{ComplianceStore, UnitOfWork};

/// Records gauges and their corrections.
pub struct GaugeService<S> {
    store: Arc<S>,
    processor: GaugeProcessor,
}

impl<S: ComplianceStore> GaugeService<S> {
    /// Creates a new gauge service.
    pub fn new(store: Arc<S>, processor: GaugeProcessor) -> Self {
        Self { store, processor }
    }

    /// Normalizes and persists a measurement.
    pub async fn record(
        &self,
        company_id: CompanyId,
        measurement: GaugeMeasurement,
        ctx: &AuditContext,
    ) -> Result<GaugeRecord, GaugeError> {
        self.persist(company_id, measurement, None, ctx).await
    }

    /// Persists a new record superseding `original_id`.
    ///
    /// The original stays as written; readers follow `supersedes` to find
    /// the corrected figures.
    pub async fn correct(
        &self,
        company_id: CompanyId,
        original_id: GaugeRecordId,
        measurement: GaugeMeasurement,
        ctx: &AuditContext,
    ) -> Result<GaugeRecord, GaugeError> {
        let original = self
            .store
            .gauge_record(company_id, original_id)
            .await?
            .ok_or(GaugeError::NotFound(original_id))?;

        if original.barrel_id != measurement.barrel_id {
            return Err(GaugeError::BarrelMismatch {
                expected: original.barrel_id,
                actual: measurement.barrel_id,
            });
        }

        self.persist(company_id, measurement, Some(original_id), ctx)
            .await
    }

    /// Finds a gauge record.
    pub async fn get(
        &self,
        company_id: CompanyId,
        id: GaugeRecordId,
    ) -> Result<GaugeRecord, GaugeError> {
        self.store
            .gauge_record(company_id, id)
            .await?
            .ok_or(GaugeError::NotFound(id))
    }

    /// Lists a barrel's gauges in measurement order.
    pub async fn history(
        &self,
        company_id: CompanyId,
        barrel_id: BarrelId,
    ) -> Result<Vec<GaugeRecord>, GaugeError> {
        Ok(self.store.gauges_for_barrel(company_id, barrel_id).await?)
    }

    async fn persist(
        &self,
        company_id: CompanyId,
        measurement: GaugeMeasurement,
        supersedes: Option<GaugeRecordId>,
        ctx: &AuditContext,
    ) -> Result<GaugeRecord, GaugeError> {
        let normalized = self.processor.normalize(
            measurement.proof,
            measurement.temperature_f,
            measurement.volume_gallons,
        )?;
        let record = GaugeRecord::new(company_id, measurement, normalized, supersedes);

        let mut tx = self.store.begin().await?;
        tx.insert_gauge_record(&record).await?;
        AuditLogger::record(
            &mut tx,
            AuditEntityType::GaugeRecord,
            record.id.into(),
            AuditAction::Create,
            ctx,
            None,
            Some(&record),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            gauge_id = %record.id,
            barrel_id = %record.barrel_id,
            purpose = %record.purpose,
            proof_gallons = %record.proof_gallons,
            "Gauge recorded"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditFilter;
    use crate::gauge::types::GaugePurpose;
    use crate::store::InMemoryComplianceStore;
    use chrono::{Duration, Utc};
    use futures::TryStreamExt;
    use rust_decimal_macros::dec;

    fn service(store: &Arc<InMemoryComplianceStore>) -> GaugeService<InMemoryComplianceStore> {
        GaugeService::new(Arc::clone(store), GaugeProcessor::new(dec!(0.0004)))
    }

    fn measurement(barrel_id: BarrelId) -> GaugeMeasurement {
        GaugeMeasurement {
            barrel_id,
            purpose: GaugePurpose::Storage,
            measured_at: Utc::now(),
            proof: dec!(120),
            temperature_f: dec!(70),
            volume_gallons: dec!(50),
            operator: Some("gauger-1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_record_persists_with_audit() {
        let store = Arc::new(InMemoryComplianceStore::new());
        let company = CompanyId::new();
        let record = service(&store)
            .record(company, measurement(BarrelId::new()), &AuditContext::system("test"))
            .await
            .unwrap();

        assert_eq!(record.wine_gallons, dec!(49.80));
        assert_eq!(record.proof_gallons, dec!(59.76));

        let entries: Vec<_> = AuditLogger::stream(
            store.as_ref(),
            AuditFilter::for_entity(AuditEntityType::GaugeRecord, record.id.into()),
            None,
            10,
        )
        .try_collect()
        .await
        .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::Create);
    }

    #[tokio::test]
    async fn test_invalid_measurement_writes_nothing() {
        let store = Arc::new(InMemoryComplianceStore::new());
        let barrel = BarrelId::new();
        let mut bad = measurement(barrel);
        bad.proof = dec!(201);

        let err = service(&store)
            .record(CompanyId::new(), bad, &AuditContext::system("test"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_MEASUREMENT");

        let entries: Vec<_> = AuditLogger::stream(store.as_ref(), AuditFilter::default(), None, 10)
            .try_collect()
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_correction_supersedes_original() {
        let store = Arc::new(InMemoryComplianceStore::new());
        let service = service(&store);
        let company = CompanyId::new();
        let barrel = BarrelId::new();
        let ctx = AuditContext::system("test");

        let original = service.record(company, measurement(barrel), &ctx).await.unwrap();
        let mut fixed = measurement(barrel);
        fixed.measured_at = original.measured_at + Duration::minutes(5);
        fixed.volume_gallons = dec!(51);
        let correction = service
            .correct(company, original.id, fixed, &ctx)
            .await
            .unwrap();

        assert_eq!(correction.supersedes, Some(original.id));
        let history = service.history(company, barrel).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], original);
        assert_eq!(history[1].id, correction.id);
    }

    #[tokio::test]
    async fn test_correction_rejects_other_barrel() {
        let store = Arc::new(InMemoryComplianceStore::new());
        let service = service(&store);
        let company = CompanyId::new();
        let ctx = AuditContext::system("test");

        let original = service
            .record(company, measurement(BarrelId::new()), &ctx)
            .await
            .unwrap();
        let err = service
            .correct(company, original.id, measurement(BarrelId::new()), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, GaugeError::BarrelMismatch { .. }));
    }

    #[tokio::test]
    async fn test_correction_of_unknown_record() {
        let store = Arc::new(InMemoryComplianceStore::new());
        let err = service(&store)
            .correct(
                CompanyId::new(),
                GaugeRecordId::new(),
                measurement(BarrelId::new()),
                &AuditContext::system("test"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GaugeError::NotFound(_)));
    }
}
