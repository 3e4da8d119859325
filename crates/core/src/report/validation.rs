//! Report validation rules.
//!
//! Errors block a report from leaving Draft; warnings are kept on the report
//! for the reviewer but never block.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stillhouse_shared::types::ReportId;

use crate::company::CompanyProfile;
use crate::ledger::SpiritsClass;
use crate::period::ReportPeriod;
use crate::reconciliation::{GroupKey, MonthlyReportData, OpeningSource, ReconciliationLine};
use crate::report::types::{MonthlyReport, ReportStatus};

/// A blocking validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ValidationError {
    /// A line's closing balance does not follow from its sections, or the
    /// line no longer matches the ledger it was folded from.
    ReconciliationImbalance {
        /// Product code.
        product_type: String,
        /// Spirits class.
        spirits_class: SpiritsClass,
        /// Closing implied by the sections or by the current ledger.
        expected: Decimal,
        /// Closing on the line.
        reported: Decimal,
        /// Largest absolute difference in any section.
        difference: Decimal,
    },
    /// A regulatory identifier is missing from the company profile.
    MissingIdentifier {
        /// Profile field name.
        field: String,
    },
}

/// A non-blocking validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// A line closes below zero.
    NegativeInventory {
        /// Product code.
        product_type: String,
        /// Spirits class.
        spirits_class: SpiritsClass,
        /// The negative closing balance.
        closing: Decimal,
    },
    /// Losses exceed the configured share of available inventory.
    LargeLoss {
        /// Product code.
        product_type: String,
        /// Spirits class.
        spirits_class: SpiritsClass,
        /// Losses in the period.
        losses: Decimal,
        /// Inventory available before removals and losses.
        available: Decimal,
    },
    /// Ledger tax-determined gallons disagree with the determinations.
    TaxVariance {
        /// Tax-determined gallons on the ledger.
        ledger_gallons: Decimal,
        /// Gallons across determinations.
        determined_gallons: Decimal,
    },
    /// Recorded tax differs from the tax recomputed from each split.
    TaxAmountMismatch {
        /// Tax as recorded.
        recorded: Decimal,
        /// Tax recomputed.
        recomputed: Decimal,
    },
    /// Openings are zero because the previous period has no report.
    MissingPriorPeriod {
        /// The previous period.
        period: ReportPeriod,
    },
    /// Openings come from a previous report that nobody has approved yet.
    PriorPeriodUnapproved {
        /// The previous period.
        period: ReportPeriod,
        /// The previous report.
        report_id: ReportId,
        /// Its status when the openings were taken.
        status: ReportStatus,
    },
    /// The previous report's closing no longer matches its own ledger.
    PriorPeriodChanged {
        /// The previous period.
        period: ReportPeriod,
        /// Product code.
        product_type: String,
        /// Spirits class.
        spirits_class: SpiritsClass,
        /// Closing on the previous report, carried as the opening.
        reported: Decimal,
        /// Closing the ledger yields today.
        current: Decimal,
    },
}

/// Validation outcome snapshotted on a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Blocking findings.
    pub errors: Vec<ValidationError>,
    /// Non-blocking findings.
    pub warnings: Vec<ValidationWarning>,
    /// When validation ran.
    pub validated_at: DateTime<Utc>,
}

impl ValidationReport {
    /// Returns true if nothing blocks the report.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Applies the validation rules to report data.
#[derive(Debug, Clone, Copy)]
pub struct ReportValidator {
    tolerance: Decimal,
    large_variance_percent: Decimal,
}

impl ReportValidator {
    /// Creates a validator.
    #[must_use]
    pub fn new(tolerance: Decimal, large_variance_percent: Decimal) -> Self {
        Self {
            tolerance,
            large_variance_percent,
        }
    }

    /// Validates `data` for the company described by `profile`.
    #[must_use]
    pub fn validate(&self, data: &MonthlyReportData, profile: &CompanyProfile) -> ValidationReport {
        self.check(data, None, profile)
    }

    /// Validates a stored snapshot against `current`, the same period folded
    /// again from today's ledger.
    ///
    /// A consistent snapshot line that differs from its current counterpart
    /// by more than the tolerance is a `ReconciliationImbalance`. A line
    /// present on only one side is compared against an empty line.
    #[must_use]
    pub fn validate_against_ledger(
        &self,
        snapshot: &MonthlyReportData,
        current: &MonthlyReportData,
        profile: &CompanyProfile,
    ) -> ValidationReport {
        self.check(snapshot, Some(current), profile)
    }

    /// Findings about `prior`, whose closings feed the next period's openings.
    ///
    /// `refolded` is the prior period folded again from the prior report's
    /// own openings.
    #[must_use]
    pub fn check_prior(
        &self,
        prior: &MonthlyReport,
        refolded: &[ReconciliationLine],
    ) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        if !matches!(
            prior.status,
            ReportStatus::Approved | ReportStatus::Submitted | ReportStatus::Archived
        ) {
            warnings.push(ValidationWarning::PriorPeriodUnapproved {
                period: prior.period,
                report_id: prior.id,
                status: prior.status,
            });
        }

        let reported = closings(&prior.data.lines);
        let current = closings(refolded);
        for key in reported.keys().chain(current.keys()).collect::<BTreeSet<_>>() {
            let was = reported.get(key).copied().unwrap_or_default();
            let now = current.get(key).copied().unwrap_or_default();
            if (was - now).abs() > self.tolerance {
                tracing::warn!(
                    company_id = %prior.company_id,
                    period = %prior.period,
                    product_type = %key.product_type,
                    reported = %was,
                    current = %now,
                    "Prior period closing no longer matches its ledger"
                );
                warnings.push(ValidationWarning::PriorPeriodChanged {
                    period: prior.period,
                    product_type: key.product_type.clone(),
                    spirits_class: key.spirits_class,
                    reported: was,
                    current: now,
                });
            }
        }
        warnings
    }

    fn check(
        &self,
        data: &MonthlyReportData,
        current: Option<&MonthlyReportData>,
        profile: &CompanyProfile,
    ) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let current_lines: BTreeMap<GroupKey, &ReconciliationLine> = current
            .map(|c| c.lines.iter().map(|l| (l.key(), l)).collect())
            .unwrap_or_default();

        for line in &data.lines {
            let difference = line.imbalance();
            if difference > self.tolerance {
                errors.push(ValidationError::ReconciliationImbalance {
                    product_type: line.product_type.clone(),
                    spirits_class: line.spirits_class,
                    expected: line.expected_closing(),
                    reported: line.closing,
                    difference,
                });
            } else if current.is_some() {
                let key = line.key();
                let empty = ReconciliationLine::opening(key.clone(), Decimal::ZERO);
                let now = current_lines.get(&key).copied().unwrap_or(&empty);
                let difference = section_gap(line, now);
                if difference > self.tolerance {
                    errors.push(ValidationError::ReconciliationImbalance {
                        product_type: line.product_type.clone(),
                        spirits_class: line.spirits_class,
                        expected: now.closing,
                        reported: line.closing,
                        difference,
                    });
                }
            }

            if line.closing < Decimal::ZERO {
                tracing::warn!(
                    company_id = %data.company_id,
                    period = %data.period,
                    product_type = %line.product_type,
                    spirits_class = %line.spirits_class,
                    closing = %line.closing,
                    "Negative inventory"
                );
                warnings.push(ValidationWarning::NegativeInventory {
                    product_type: line.product_type.clone(),
                    spirits_class: line.spirits_class,
                    closing: line.closing,
                });
            }

            let available = line.available();
            if available > Decimal::ZERO
                && line.losses * Decimal::ONE_HUNDRED > available * self.large_variance_percent
            {
                warnings.push(ValidationWarning::LargeLoss {
                    product_type: line.product_type.clone(),
                    spirits_class: line.spirits_class,
                    losses: line.losses,
                    available,
                });
            }
        }

        if let Some(current) = current {
            let stored: BTreeSet<GroupKey> =
                data.lines.iter().map(ReconciliationLine::key).collect();
            for line in current.lines.iter().filter(|l| !stored.contains(&l.key())) {
                let empty = ReconciliationLine::opening(line.key(), Decimal::ZERO);
                let difference = section_gap(&empty, line);
                if difference > self.tolerance {
                    errors.push(ValidationError::ReconciliationImbalance {
                        product_type: line.product_type.clone(),
                        spirits_class: line.spirits_class,
                        expected: line.closing,
                        reported: Decimal::ZERO,
                        difference,
                    });
                }
            }
        }

        errors.extend(
            profile
                .missing_identifiers()
                .into_iter()
                .map(|field| ValidationError::MissingIdentifier {
                    field: field.to_string(),
                }),
        );

        let summary = &data.tax_summary;
        if (summary.ledger_tax_determined_gallons - summary.determined_proof_gallons).abs()
            > self.tolerance
        {
            warnings.push(ValidationWarning::TaxVariance {
                ledger_gallons: summary.ledger_tax_determined_gallons,
                determined_gallons: summary.determined_proof_gallons,
            });
        }
        if summary.total_tax_due != summary.recomputed_tax_due {
            warnings.push(ValidationWarning::TaxAmountMismatch {
                recorded: summary.total_tax_due,
                recomputed: summary.recomputed_tax_due,
            });
        }

        if data.opening_source == OpeningSource::None {
            warnings.push(ValidationWarning::MissingPriorPeriod {
                period: data.period.previous(),
            });
        }

        ValidationReport {
            errors,
            warnings,
            validated_at: Utc::now(),
        }
    }
}

fn closings(lines: &[ReconciliationLine]) -> BTreeMap<GroupKey, Decimal> {
    lines.iter().map(|l| (l.key(), l.closing)).collect()
}

/// Largest absolute difference between two lines in any balance section.
fn section_gap(a: &ReconciliationLine, b: &ReconciliationLine) -> Decimal {
    [
        (a.opening, b.opening),
        (a.production, b.production),
        (a.transfers_in, b.transfers_in),
        (a.gains, b.gains),
        (a.transfers_out, b.transfers_out),
        (a.losses, b.losses),
        (a.closing, b.closing),
    ]
    .into_iter()
    .map(|(x, y)| (x - y).abs())
    .max()
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Actor;
    use crate::company::FormType;
    use crate::excise::TaxSummary;
    use crate::reconciliation::{GroupKey, ReconciliationLine};
    use rust_decimal_macros::dec;
    use stillhouse_shared::types::{CompanyId, ReportId};

    fn validator() -> ReportValidator {
        ReportValidator::new(dec!(0.01), dec!(10))
    }

    fn profile(company_id: CompanyId) -> CompanyProfile {
        let mut profile = CompanyProfile::new(company_id, "Copper Creek", FormType::MonthlyStorage);
        profile.permit_number = Some("DSP-KY-1".to_string());
        profile.employer_id = Some("12-3456789".to_string());
        profile
    }

    fn line(opening: Decimal, production: Decimal, losses: Decimal) -> ReconciliationLine {
        let mut line = ReconciliationLine::opening(
            GroupKey {
                product_type: "BOURBON".to_string(),
                spirits_class: SpiritsClass::WhiskyUnder160,
            },
            opening,
        );
        line.production = production;
        line.losses = losses;
        line.closing = line.expected_closing();
        line
    }

    fn data(lines: Vec<ReconciliationLine>) -> MonthlyReportData {
        let period = ReportPeriod::new(2026, 3).unwrap();
        MonthlyReportData {
            company_id: CompanyId::new(),
            period,
            lines,
            opening_source: OpeningSource::PriorReport {
                report_id: ReportId::new(),
                period: period.previous(),
            },
            tax_summary: TaxSummary::default(),
        }
    }

    #[test]
    fn test_balanced_data_is_clean() {
        let data = data(vec![line(dec!(100), dec!(50), dec!(1))]);
        let report = validator().validate(&data, &profile(data.company_id));
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_imbalance_beyond_tolerance_is_an_error() {
        let mut tampered = line(dec!(100), dec!(50), dec!(0));
        tampered.closing += dec!(0.02);
        let data = data(vec![tampered]);

        let report = validator().validate(&data, &profile(data.company_id));
        assert_eq!(
            report.errors,
            vec![ValidationError::ReconciliationImbalance {
                product_type: "BOURBON".to_string(),
                spirits_class: SpiritsClass::WhiskyUnder160,
                expected: dec!(150),
                reported: dec!(150.02),
                difference: dec!(0.02),
            }]
        );
    }

    #[test]
    fn test_imbalance_within_tolerance_passes() {
        let mut nudged = line(dec!(100), dec!(50), dec!(0));
        nudged.closing += dec!(0.01);
        let data = data(vec![nudged]);
        assert!(validator().validate(&data, &profile(data.company_id)).is_valid());
    }

    #[test]
    fn test_missing_identifiers_are_errors() {
        let data = data(vec![]);
        let bare = CompanyProfile::new(data.company_id, "Copper Creek", FormType::MonthlyStorage);
        let report = validator().validate(&data, &bare);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.contains(&ValidationError::MissingIdentifier {
            field: "permit_number".to_string()
        }));
    }

    #[test]
    fn test_warnings_do_not_block() {
        let mut period_data = data(vec![
            line(dec!(10), dec!(0), dec!(20)),
            line(dec!(100), dec!(0), dec!(11)),
        ]);
        period_data.opening_source = OpeningSource::None;
        period_data.tax_summary = TaxSummary {
            determination_count: 1,
            determined_proof_gallons: dec!(500),
            total_tax_due: dec!(1350),
            recomputed_tax_due: dec!(1350.01),
            ..TaxSummary::default()
        };

        let report = validator().validate(&period_data, &profile(period_data.company_id));
        assert!(report.is_valid());
        assert!(matches!(
            report.warnings[0],
            ValidationWarning::NegativeInventory { closing, .. } if closing == dec!(-10)
        ));
        let large_losses = report
            .warnings
            .iter()
            .filter(|w| matches!(w, ValidationWarning::LargeLoss { .. }))
            .count();
        assert_eq!(large_losses, 2);
        assert!(report.warnings.contains(&ValidationWarning::TaxVariance {
            ledger_gallons: dec!(0),
            determined_gallons: dec!(500),
        }));
        assert!(report.warnings.contains(&ValidationWarning::TaxAmountMismatch {
            recorded: dec!(1350),
            recomputed: dec!(1350.01),
        }));
        assert!(report.warnings.contains(&ValidationWarning::MissingPriorPeriod {
            period: ReportPeriod::new(2026, 2).unwrap(),
        }));
    }

    #[test]
    fn test_loss_at_threshold_is_not_large() {
        let data = data(vec![line(dec!(100), dec!(0), dec!(10))]);
        assert!(validator().validate(&data, &profile(data.company_id)).warnings.is_empty());
    }

    #[test]
    fn test_snapshot_behind_the_ledger_is_an_imbalance() {
        let snapshot = data(vec![line(dec!(0), dec!(100), dec!(0))]);
        let mut current = snapshot.clone();
        current.lines = vec![line(dec!(0), dec!(140), dec!(0))];

        let report = validator().validate_against_ledger(
            &snapshot,
            &current,
            &profile(snapshot.company_id),
        );
        assert_eq!(
            report.errors,
            vec![ValidationError::ReconciliationImbalance {
                product_type: "BOURBON".to_string(),
                spirits_class: SpiritsClass::WhiskyUnder160,
                expected: dec!(140),
                reported: dec!(100),
                difference: dec!(40),
            }]
        );
    }

    #[test]
    fn test_offsetting_ledger_change_is_still_caught() {
        let snapshot = data(vec![line(dec!(0), dec!(100), dec!(0))]);
        let mut current = snapshot.clone();
        current.lines = vec![line(dec!(0), dec!(130), dec!(30))];
        assert_eq!(current.lines[0].closing, snapshot.lines[0].closing);

        let report = validator().validate_against_ledger(
            &snapshot,
            &current,
            &profile(snapshot.company_id),
        );
        assert!(matches!(
            report.errors[..],
            [ValidationError::ReconciliationImbalance { difference, .. }] if difference == dec!(30)
        ));
    }

    #[test]
    fn test_line_missing_from_snapshot_is_an_imbalance() {
        let snapshot = data(vec![]);
        let mut current = snapshot.clone();
        current.lines = vec![line(dec!(0), dec!(25), dec!(0))];

        let report = validator().validate_against_ledger(
            &snapshot,
            &current,
            &profile(snapshot.company_id),
        );
        assert!(matches!(
            report.errors[..],
            [ValidationError::ReconciliationImbalance { expected, reported, .. }]
                if expected == dec!(25) && reported.is_zero()
        ));
    }

    #[test]
    fn test_unchanged_ledger_passes() {
        let snapshot = data(vec![line(dec!(10), dec!(100), dec!(1))]);
        let profile = profile(snapshot.company_id);
        let report = validator().validate_against_ledger(&snapshot, &snapshot, &profile);
        assert!(report.is_valid());
    }

    #[test]
    fn test_prior_report_findings() {
        let prior_data = data(vec![line(dec!(0), dec!(100), dec!(0))]);
        let mut prior = MonthlyReport::draft(
            FormType::MonthlyStorage,
            prior_data,
            validator().validate(&data(vec![]), &profile(CompanyId::new())),
            Actor::System("test".to_string()),
        );
        let refolded = vec![line(dec!(0), dec!(140), dec!(0))];

        let warnings = validator().check_prior(&prior, &refolded);
        assert_eq!(
            warnings,
            vec![
                ValidationWarning::PriorPeriodUnapproved {
                    period: prior.period,
                    report_id: prior.id,
                    status: ReportStatus::Draft,
                },
                ValidationWarning::PriorPeriodChanged {
                    period: prior.period,
                    product_type: "BOURBON".to_string(),
                    spirits_class: SpiritsClass::WhiskyUnder160,
                    reported: dec!(100),
                    current: dec!(140),
                },
            ]
        );

        prior.status = ReportStatus::Approved;
        assert!(validator().check_prior(&prior, &prior.data.lines).is_empty());
    }
}
