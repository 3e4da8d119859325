//! Reconciliation fold.
//!
//! Opening balances come from the previous report's closing balances; each
//! ledger entry in the month adds to exactly one section of its line.

use std::collections::BTreeMap;

use futures::{Stream, TryStreamExt};
use rust_decimal::Decimal;

use crate::ledger::{LedgerTransaction, TransactionType};
use crate::reconciliation::types::{GroupKey, MonthlyReportData, ReconciliationLine};

/// Stateless reconciliation aggregator.
pub struct ReconciliationAggregator;

impl ReconciliationAggregator {
    /// Opening balances for the period following `prior`.
    #[must_use]
    pub fn openings_from(prior: &MonthlyReportData) -> BTreeMap<GroupKey, Decimal> {
        prior.lines.iter().map(|l| (l.key(), l.closing)).collect()
    }

    /// Folds `transactions` onto `openings`.
    ///
    /// Lines come back in key order. Every opening key yields a line even
    /// without activity.
    #[must_use]
    pub fn aggregate<'a>(
        openings: BTreeMap<GroupKey, Decimal>,
        transactions: impl IntoIterator<Item = &'a LedgerTransaction>,
    ) -> Vec<ReconciliationLine> {
        let mut lines = Self::seed(openings);
        for tx in transactions {
            Self::apply(&mut lines, tx);
        }
        Self::finish(lines)
    }

    /// Folds a fallible stream of transactions onto `openings`.
    pub async fn aggregate_stream<St, E>(
        openings: BTreeMap<GroupKey, Decimal>,
        transactions: St,
    ) -> Result<Vec<ReconciliationLine>, E>
    where
        St: Stream<Item = Result<LedgerTransaction, E>>,
    {
        let lines = transactions
            .try_fold(Self::seed(openings), |mut lines, tx| async move {
                Self::apply(&mut lines, &tx);
                Ok(lines)
            })
            .await?;
        Ok(Self::finish(lines))
    }

    fn seed(openings: BTreeMap<GroupKey, Decimal>) -> BTreeMap<GroupKey, ReconciliationLine> {
        openings
            .into_iter()
            .map(|(key, opening)| (key.clone(), ReconciliationLine::opening(key, opening)))
            .collect()
    }

    fn apply(lines: &mut BTreeMap<GroupKey, ReconciliationLine>, tx: &LedgerTransaction) {
        let key = GroupKey {
            product_type: tx.product_type.clone(),
            spirits_class: tx.spirits_class,
        };
        let line = lines
            .entry(key.clone())
            .or_insert_with(|| ReconciliationLine::opening(key, Decimal::ZERO));
        let gallons = tx.proof_gallons;

        match tx.transaction_type {
            TransactionType::Production => line.production += gallons,
            TransactionType::TransferIn => line.transfers_in += gallons,
            TransactionType::Gain => line.gains += gallons,
            TransactionType::Loss => line.losses += gallons,
            TransactionType::TransferOut => {
                line.transfers_out += gallons;
                line.removals.transferred_in_bond += gallons;
            }
            TransactionType::TaxDetermination => {
                line.transfers_out += gallons;
                line.removals.tax_determined += gallons;
            }
            TransactionType::Destruction => {
                line.transfers_out += gallons;
                line.removals.destroyed += gallons;
            }
            TransactionType::Bottling => line.bottled += gallons,
        }
    }

    fn finish(lines: BTreeMap<GroupKey, ReconciliationLine>) -> Vec<ReconciliationLine> {
        lines
            .into_values()
            .map(|mut line| {
                line.closing = line.expected_closing();
                line
            })
            .collect()
    }
}
