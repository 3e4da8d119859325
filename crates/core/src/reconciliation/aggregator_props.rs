//! Property-based tests for ReconciliationAggregator.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stillhouse_shared::types::{CompanyId, LedgerTransactionId};

use crate::ledger::{LedgerTransaction, SpiritsClass, TaxStatus, TransactionType};
use crate::reconciliation::aggregator::ReconciliationAggregator;
use crate::reconciliation::types::GroupKey;

fn arb_gallons() -> impl Strategy<Value = Decimal> {
    (0i64..=1_000_000).prop_map(|g| Decimal::new(g, 2))
}

fn arb_product() -> impl Strategy<Value = String> {
    prop_oneof![Just("bourbon"), Just("rye"), Just("gin")].prop_map(str::to_string)
}

fn arb_class() -> impl Strategy<Value = SpiritsClass> {
    prop_oneof![
        Just(SpiritsClass::WhiskyUnder160),
        Just(SpiritsClass::Gin),
        Just(SpiritsClass::Vodka),
    ]
}

fn arb_type() -> impl Strategy<Value = TransactionType> {
    proptest::sample::select(TransactionType::ALL.to_vec())
}

fn arb_ledger() -> impl Strategy<Value = Vec<LedgerTransaction>> {
    prop::collection::vec(
        (arb_type(), arb_product(), arb_class(), arb_gallons(), 1u32..=31),
        0..60,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (transaction_type, product_type, spirits_class, proof, day))| {
                LedgerTransaction {
                    id: LedgerTransactionId::new(),
                    sequence: i64::try_from(i).unwrap_or(i64::MAX),
                    recorded_at: Utc::now(),
                    company_id: CompanyId::new(),
                    transaction_date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
                    transaction_type,
                    product_type,
                    spirits_class,
                    tax_status: TaxStatus::Bonded,
                    proof_gallons: proof,
                    wine_gallons: proof,
                    source: None,
                    notes: None,
                }
            })
            .collect()
    })
}

fn arb_openings() -> impl Strategy<Value = BTreeMap<GroupKey, Decimal>> {
    prop::collection::btree_map(
        (arb_product(), arb_class()).prop_map(|(product_type, spirits_class)| GroupKey {
            product_type,
            spirits_class,
        }),
        arb_gallons(),
        0..5,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every line balances within 0.01 gallons.
    #[test]
    fn prop_every_line_balances(openings in arb_openings(), ledger in arb_ledger()) {
        let lines = ReconciliationAggregator::aggregate(openings, &ledger);
        for line in &lines {
            prop_assert!(line.imbalance() <= dec!(0.01));
            prop_assert_eq!(line.transfers_out, line.removals.total());
        }
    }

    /// Aggregating the same ledger twice gives the same result.
    #[test]
    fn prop_aggregation_is_idempotent(openings in arb_openings(), ledger in arb_ledger()) {
        let first = ReconciliationAggregator::aggregate(openings.clone(), &ledger);
        let second = ReconciliationAggregator::aggregate(openings, &ledger);
        prop_assert_eq!(first, second);
    }

    /// Bottling never changes a closing balance.
    #[test]
    fn prop_bottling_has_no_balance_effect(openings in arb_openings(), ledger in arb_ledger()) {
        let without: Vec<_> = ledger
            .iter()
            .filter(|t| t.transaction_type != TransactionType::Bottling)
            .cloned()
            .collect();
        let closings = |txs: &[LedgerTransaction]| -> BTreeMap<GroupKey, Decimal> {
            ReconciliationAggregator::aggregate(openings.clone(), txs)
                .into_iter()
                .map(|l| (l.key(), l.closing))
                .filter(|(_, closing)| !closing.is_zero())
                .collect()
        };
        prop_assert_eq!(closings(&ledger), closings(&without));
    }

    /// Splitting a month and chaining the closings gives the same balances.
    #[test]
    fn prop_chained_periods_agree(
        openings in arb_openings(),
        ledger in arb_ledger(),
        split in 0usize..60,
    ) {
        let split = split.min(ledger.len());
        let whole = ReconciliationAggregator::aggregate(openings.clone(), &ledger);
        let first = ReconciliationAggregator::aggregate(openings, &ledger[..split]);
        let carried = first.iter().map(|l| (l.key(), l.closing)).collect();
        let second = ReconciliationAggregator::aggregate(carried, &ledger[split..]);

        let closings = |lines: &[crate::reconciliation::types::ReconciliationLine]| {
            lines.iter().map(|l| (l.key(), l.closing)).collect::<BTreeMap<_, _>>()
        };
        prop_assert_eq!(closings(&whole), closings(&second));
    }
}
