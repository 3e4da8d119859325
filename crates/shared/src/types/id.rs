//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `BarrelId` where a `CompanyId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

typed_id!(UserId, "Unique identifier for a user (operator, preparer, reviewer).");
typed_id!(CompanyId, "Unique identifier for a distilling company (tenant).");
typed_id!(BarrelId, "Unique identifier for a barrel tracked by the warehouse.");
typed_id!(GaugeRecordId, "Unique identifier for a gauge record.");
typed_id!(LedgerTransactionId, "Unique identifier for a ledger transaction.");
typed_id!(TaxDeterminationId, "Unique identifier for a tax determination.");
typed_id!(ReportId, "Unique identifier for a monthly compliance report.");
typed_id!(AuditEntryId, "Unique identifier for an audit log entry.");
