//! Ledger domain types.
//!
//! Every closed set (transaction type, spirits class, tax status) parses from
//! its wire form with an explicit error instead of a silent fallback.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use stillhouse_shared::types::{
    CompanyId, GaugeRecordId, LedgerTransactionId, TaxDeterminationId,
};

use crate::ledger::error::LedgerError;
use crate::period::DateRange;

/// Inventory-affecting event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Spirits produced by distillation.
    Production,
    /// Spirits received in bond from another premises.
    TransferIn,
    /// Spirits shipped in bond to another premises.
    TransferOut,
    /// Inventory loss (evaporation, leakage, correction).
    Loss,
    /// Inventory gain (correction).
    Gain,
    /// Removal on determination of tax.
    TaxDetermination,
    /// Spirits destroyed.
    Destruction,
    /// Spirits bottled; does not change the bulk balance.
    Bottling,
}

impl TransactionType {
    /// All transaction types.
    pub const ALL: [Self; 8] = [
        Self::Production,
        Self::TransferIn,
        Self::TransferOut,
        Self::Loss,
        Self::Gain,
        Self::TaxDetermination,
        Self::Destruction,
        Self::Bottling,
    ];

    /// Returns the string representation of the transaction type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::TransferIn => "transfer_in",
            Self::TransferOut => "transfer_out",
            Self::Loss => "loss",
            Self::Gain => "gain",
            Self::TaxDetermination => "tax_determination",
            Self::Destruction => "destruction",
            Self::Bottling => "bottling",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| LedgerError::UnknownValue {
                field: "transaction_type",
                value: s.to_string(),
            })
    }
}

/// Regulator-defined spirits categories used to segment reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpiritsClass {
    /// Whisky distilled at or below 160 proof.
    WhiskyUnder160,
    /// Whisky distilled above 160 proof.
    WhiskyOver160,
    /// Brandy.
    Brandy,
    /// Rum.
    Rum,
    /// Gin.
    Gin,
    /// Vodka.
    Vodka,
    /// Neutral spirits and alcohol at or above 190 proof.
    NeutralSpirits,
    /// Everything else.
    Other,
}

impl SpiritsClass {
    /// All spirits classes.
    pub const ALL: [Self; 8] = [
        Self::WhiskyUnder160,
        Self::WhiskyOver160,
        Self::Brandy,
        Self::Rum,
        Self::Gin,
        Self::Vodka,
        Self::NeutralSpirits,
        Self::Other,
    ];

    /// Returns the string representation of the spirits class.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WhiskyUnder160 => "whisky_under_160",
            Self::WhiskyOver160 => "whisky_over_160",
            Self::Brandy => "brandy",
            Self::Rum => "rum",
            Self::Gin => "gin",
            Self::Vodka => "vodka",
            Self::NeutralSpirits => "neutral_spirits",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for SpiritsClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpiritsClass {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| LedgerError::UnknownValue {
                field: "spirits_class",
                value: s.to_string(),
            })
    }
}

/// Tax status of the spirits moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxStatus {
    /// Held in bond, tax not yet determined.
    Bonded,
    /// Tax determined and paid.
    TaxPaid,
    /// Removed for export.
    Export,
    /// Removed free of tax.
    TaxFree,
}

impl TaxStatus {
    /// All tax statuses.
    pub const ALL: [Self; 4] = [Self::Bonded, Self::TaxPaid, Self::Export, Self::TaxFree];

    /// Returns the string representation of the tax status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bonded => "bonded",
            Self::TaxPaid => "tax_paid",
            Self::Export => "export",
            Self::TaxFree => "tax_free",
        }
    }
}

impl fmt::Display for TaxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| LedgerError::UnknownValue {
                field: "tax_status",
                value: s.to_string(),
            })
    }
}

/// The entity a ledger transaction originates from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SourceRef {
    /// A gauge record.
    GaugeRecord(GaugeRecordId),
    /// Another ledger transaction, for corrections.
    LedgerTransaction(LedgerTransactionId),
    /// A tax determination.
    TaxDetermination(TaxDeterminationId),
    /// A reference owned by an upstream system, such as an order number.
    External(String),
}

impl SourceRef {
    /// The kind tag stored alongside the reference.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GaugeRecord(_) => "gauge_record",
            Self::LedgerTransaction(_) => "ledger_transaction",
            Self::TaxDetermination(_) => "tax_determination",
            Self::External(_) => "external",
        }
    }

    /// The reference rendered as text.
    #[must_use]
    pub fn reference(&self) -> String {
        match self {
            Self::GaugeRecord(id) => id.to_string(),
            Self::LedgerTransaction(id) => id.to_string(),
            Self::TaxDetermination(id) => id.to_string(),
            Self::External(reference) => reference.clone(),
        }
    }

    /// Rebuilds a reference from its stored kind and text.
    pub fn from_parts(kind: &str, reference: &str) -> Result<Self, LedgerError> {
        let invalid = || LedgerError::UnknownValue {
            field: "source",
            value: format!("{kind}:{reference}"),
        };
        match kind {
            "gauge_record" => reference.parse().map(Self::GaugeRecord).map_err(|_| invalid()),
            "ledger_transaction" => reference
                .parse()
                .map(Self::LedgerTransaction)
                .map_err(|_| invalid()),
            "tax_determination" => reference
                .parse()
                .map(Self::TaxDetermination)
                .map_err(|_| invalid()),
            "external" => Ok(Self::External(reference.to_string())),
            _ => Err(invalid()),
        }
    }
}

/// A transaction to append to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLedgerTransaction {
    /// Owning company.
    pub company_id: CompanyId,
    /// Business date of the movement.
    pub transaction_date: NaiveDate,
    /// Event kind.
    pub transaction_type: TransactionType,
    /// Free-form product code.
    pub product_type: String,
    /// Spirits class.
    pub spirits_class: SpiritsClass,
    /// Tax status.
    pub tax_status: TaxStatus,
    /// Proof gallons moved.
    pub proof_gallons: Decimal,
    /// Wine gallons moved.
    pub wine_gallons: Decimal,
    /// Originating entity.
    pub source: Option<SourceRef>,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// A persisted, append-only ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Unique identifier.
    pub id: LedgerTransactionId,
    /// Store-assigned insertion order.
    pub sequence: i64,
    /// When the transaction was written.
    pub recorded_at: DateTime<Utc>,
    /// Owning company.
    pub company_id: CompanyId,
    /// Business date of the movement.
    pub transaction_date: NaiveDate,
    /// Event kind.
    pub transaction_type: TransactionType,
    /// Free-form product code.
    pub product_type: String,
    /// Spirits class.
    pub spirits_class: SpiritsClass,
    /// Tax status.
    pub tax_status: TaxStatus,
    /// Proof gallons moved.
    pub proof_gallons: Decimal,
    /// Wine gallons moved.
    pub wine_gallons: Decimal,
    /// Originating entity.
    pub source: Option<SourceRef>,
    /// Free-form notes.
    pub notes: Option<String>,
}

impl LedgerTransaction {
    /// Attaches store-assigned fields to a new transaction.
    #[must_use]
    pub fn from_new(
        id: LedgerTransactionId,
        sequence: i64,
        recorded_at: DateTime<Utc>,
        new: NewLedgerTransaction,
    ) -> Self {
        Self {
            id,
            sequence,
            recorded_at,
            company_id: new.company_id,
            transaction_date: new.transaction_date,
            transaction_type: new.transaction_type,
            product_type: new.product_type,
            spirits_class: new.spirits_class,
            tax_status: new.tax_status,
            proof_gallons: new.proof_gallons,
            wine_gallons: new.wine_gallons,
            source: new.source,
            notes: new.notes,
        }
    }

    /// The cursor positioned at this transaction.
    #[must_use]
    pub fn cursor(&self) -> LedgerCursor {
        LedgerCursor {
            transaction_date: self.transaction_date,
            sequence: self.sequence,
        }
    }
}

/// Position in a ledger query; reading resumes strictly after it.
///
/// Ordering is by business date, then insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LedgerCursor {
    /// Business date of the last transaction read.
    pub transaction_date: NaiveDate,
    /// Sequence of the last transaction read.
    pub sequence: i64,
}

/// Ledger query criteria. Empty filter lists match everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerQuery {
    /// Business-date window.
    pub range: DateRange,
    /// Restrict to these event kinds.
    pub transaction_types: Vec<TransactionType>,
    /// Restrict to these spirits classes.
    pub spirits_classes: Vec<SpiritsClass>,
    /// Restrict to these tax statuses.
    pub tax_statuses: Vec<TaxStatus>,
    /// Restrict to one product code.
    pub product_type: Option<String>,
}

impl LedgerQuery {
    /// Every transaction in `range`.
    #[must_use]
    pub fn for_range(range: DateRange) -> Self {
        Self {
            range,
            transaction_types: Vec::new(),
            spirits_classes: Vec::new(),
            tax_statuses: Vec::new(),
            product_type: None,
        }
    }

    /// Restricts the query to the given event kinds.
    #[must_use]
    pub fn with_types(mut self, types: impl IntoIterator<Item = TransactionType>) -> Self {
        self.transaction_types = types.into_iter().collect();
        self
    }

    /// Returns true if `tx` satisfies every criterion.
    #[must_use]
    pub fn matches(&self, tx: &LedgerTransaction) -> bool {
        self.range.contains(tx.transaction_date)
            && (self.transaction_types.is_empty()
                || self.transaction_types.contains(&tx.transaction_type))
            && (self.spirits_classes.is_empty() || self.spirits_classes.contains(&tx.spirits_class))
            && (self.tax_statuses.is_empty() || self.tax_statuses.contains(&tx.tax_status))
            && self
                .product_type
                .as_deref()
                .is_none_or(|p| p == tx.product_type)
    }
}
