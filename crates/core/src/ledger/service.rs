//! Ledger service for recording and streaming inventory movements.
//!
//! Transactions are never updated or removed. A correction is a new Gain or
//! Loss entry whose source points at the transaction it corrects.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::{Stream, TryStreamExt, stream};
use rust_decimal::Decimal;
use stillhouse_shared::types::{CompanyId, LedgerTransactionId, round_gallons};

use crate::audit::{AuditAction, AuditContext, AuditEntityType, AuditLogger};
use crate::ledger::error::LedgerError;
use crate::ledger::types::{
    LedgerCursor, LedgerQuery, LedgerTransaction, NewLedgerTransaction, SourceRef,
    TransactionType,
};
use crate::store::{ComplianceStore, StoreError, UnitOfWork};

/// An adjustment to a previously recorded transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerCorrection {
    /// The transaction being corrected.
    pub original_id: LedgerTransactionId,
    /// Business date of the correcting entry.
    pub transaction_date: NaiveDate,
    /// Signed proof-gallon adjustment.
    pub proof_delta: Decimal,
    /// Signed wine-gallon adjustment.
    pub wine_delta: Decimal,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Appends to and reads from the spirits ledger.
pub struct LedgerService<S> {
    store: Arc<S>,
    page_size: u64,
}

impl<S: ComplianceStore> LedgerService<S> {
    /// Creates a ledger service reading `page_size` rows per page.
    pub fn new(store: Arc<S>, page_size: u64) -> Self {
        Self { store, page_size }
    }

    /// Checks a transaction and normalizes its quantities.
    ///
    /// Gallons are rounded to two decimals and the product code is trimmed.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidQuantity` for negative gallons and
    /// `LedgerError::BlankProductType` for an empty product code.
    pub fn validate(mut tx: NewLedgerTransaction) -> Result<NewLedgerTransaction, LedgerError> {
        if tx.proof_gallons < Decimal::ZERO {
            return Err(LedgerError::InvalidQuantity {
                field: "proof_gallons",
                value: tx.proof_gallons,
            });
        }
        if tx.wine_gallons < Decimal::ZERO {
            return Err(LedgerError::InvalidQuantity {
                field: "wine_gallons",
                value: tx.wine_gallons,
            });
        }

        let product_type = tx.product_type.trim();
        if product_type.is_empty() {
            return Err(LedgerError::BlankProductType);
        }

        tx.product_type = product_type.to_string();
        tx.proof_gallons = round_gallons(tx.proof_gallons);
        tx.wine_gallons = round_gallons(tx.wine_gallons);
        Ok(tx)
    }

    /// Appends a transaction.
    pub async fn record(
        &self,
        new: NewLedgerTransaction,
        ctx: &AuditContext,
    ) -> Result<LedgerTransaction, LedgerError> {
        let new = Self::validate(new)?;

        let mut tx = self.store.begin().await?;
        let recorded = tx
            .insert_ledger_transaction(LedgerTransactionId::new(), new)
            .await?;
        AuditLogger::record(
            &mut tx,
            AuditEntityType::LedgerTransaction,
            recorded.id.into(),
            AuditAction::Create,
            ctx,
            None,
            Some(&recorded),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            transaction_id = %recorded.id,
            company_id = %recorded.company_id,
            transaction_type = %recorded.transaction_type,
            proof_gallons = %recorded.proof_gallons,
            "Ledger transaction recorded"
        );
        Ok(recorded)
    }

    /// Appends the Gain or Loss entry that adjusts an earlier transaction.
    ///
    /// Positive deltas produce a Gain, negative deltas a Loss. The entry keeps
    /// the original's product, spirits class and tax status.
    pub async fn correct(
        &self,
        company_id: CompanyId,
        correction: LedgerCorrection,
        ctx: &AuditContext,
    ) -> Result<LedgerTransaction, LedgerError> {
        let original = self
            .store
            .ledger_transaction(company_id, correction.original_id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(correction.original_id))?;

        let proof_delta = round_gallons(correction.proof_delta);
        let wine_delta = round_gallons(correction.wine_delta);
        if proof_delta.is_zero() && wine_delta.is_zero() {
            return Err(LedgerError::EmptyCorrection);
        }
        let increases = proof_delta > Decimal::ZERO || wine_delta > Decimal::ZERO;
        let decreases = proof_delta < Decimal::ZERO || wine_delta < Decimal::ZERO;
        if increases && decreases {
            return Err(LedgerError::MixedCorrection {
                proof_delta,
                wine_delta,
            });
        }

        let transaction_type = if increases {
            TransactionType::Gain
        } else {
            TransactionType::Loss
        };

        self.record(
            NewLedgerTransaction {
                company_id,
                transaction_date: correction.transaction_date,
                transaction_type,
                product_type: original.product_type,
                spirits_class: original.spirits_class,
                tax_status: original.tax_status,
                proof_gallons: proof_delta.abs(),
                wine_gallons: wine_delta.abs(),
                source: Some(SourceRef::LedgerTransaction(original.id)),
                notes: correction.notes,
            },
            ctx,
        )
        .await
    }

    /// Finds a transaction.
    pub async fn get(
        &self,
        company_id: CompanyId,
        id: LedgerTransactionId,
    ) -> Result<LedgerTransaction, LedgerError> {
        self.store
            .ledger_transaction(company_id, id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    /// Streams matching transactions ordered by date, then insertion order.
    pub fn query(
        &self,
        company_id: CompanyId,
        query: LedgerQuery,
        start_after: Option<LedgerCursor>,
    ) -> impl Stream<Item = Result<LedgerTransaction, LedgerError>> + Send + '_ {
        Self::stream(
            self.store.as_ref(),
            company_id,
            query,
            start_after,
            self.page_size,
        )
        .map_err(LedgerError::from)
    }

    /// Streams matching transactions from `store` in keyset pages.
    ///
    /// Passing the cursor of any yielded transaction as `start_after`
    /// resumes the stream right after it.
    pub fn stream<'a>(
        store: &'a S,
        company_id: CompanyId,
        query: LedgerQuery,
        start_after: Option<LedgerCursor>,
        page_size: u64,
    ) -> impl Stream<Item = Result<LedgerTransaction, StoreError>> + Send + 'a {
        let page_size = page_size.max(1);
        stream::try_unfold(
            (query, start_after, false),
            move |(query, after, exhausted)| async move {
                if exhausted {
                    return Ok(None);
                }
                let page = store.ledger_page(company_id, &query, after, page_size).await?;
                let Some(last) = page.last().map(LedgerTransaction::cursor) else {
                    return Ok(None);
                };
                let exhausted = (page.len() as u64) < page_size;
                Ok(Some((
                    stream::iter(page.into_iter().map(Ok::<_, StoreError>)),
                    (query, Some(last), exhausted),
                )))
            },
        )
        .try_flatten()
    }
}
