//! Audit domain types.
//!
//! An audit entry is write-once: it is created in the same unit of work as
//! the mutation it describes and never updated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use stillhouse_shared::types::{AuditEntryId, UserId};
use uuid::Uuid;

/// The kind of compliance entity an audit entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntityType {
    /// A barrel gauge record.
    GaugeRecord,
    /// A ledger transaction.
    LedgerTransaction,
    /// A monthly compliance report.
    MonthlyReport,
    /// An excise tax determination.
    TaxDetermination,
    /// A company's compliance profile.
    CompanyProfile,
}

impl AuditEntityType {
    /// Returns the string representation of the entity type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GaugeRecord => "gauge_record",
            Self::LedgerTransaction => "ledger_transaction",
            Self::MonthlyReport => "monthly_report",
            Self::TaxDetermination => "tax_determination",
            Self::CompanyProfile => "company_profile",
        }
    }

    /// Parses an entity type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "gauge_record" => Some(Self::GaugeRecord),
            "ledger_transaction" => Some(Self::LedgerTransaction),
            "monthly_report" => Some(Self::MonthlyReport),
            "tax_determination" => Some(Self::TaxDetermination),
            "company_profile" => Some(Self::CompanyProfile),
            _ => None,
        }
    }
}

impl fmt::Display for AuditEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The mutation an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    /// Entity created; only a new value is captured.
    Create,
    /// Entity changed; both old and new values are captured.
    Update,
    /// Entity removed; only an old value is captured.
    Delete,
}

impl AuditAction {
    /// Returns the string representation of the action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Parses an action from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who performed a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Actor {
    /// An authenticated user.
    User(UserId),
    /// An automated process, such as the scheduled report trigger.
    System(String),
}

impl Actor {
    /// Returns the user id when the actor is a person.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::System(_) => None,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::System(name) => write!(f, "system:{name}"),
        }
    }
}

impl FromStr for Actor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("user", id)) => id
                .parse()
                .map(Self::User)
                .map_err(|e| format!("Invalid user actor {s}: {e}")),
            Some(("system", name)) if !name.is_empty() => Ok(Self::System(name.to_string())),
            _ => Err(format!("Unknown actor: {s}")),
        }
    }
}

/// Request details captured alongside a mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    /// Correlation id of the originating request.
    pub request_id: Option<String>,
    /// Client address.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
}

/// The actor and request details attached to every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditContext {
    /// Who performed the mutation.
    pub actor: Actor,
    /// Optional request details.
    pub metadata: Option<RequestMetadata>,
}

impl AuditContext {
    /// Context for a user-initiated mutation.
    #[must_use]
    pub fn user(user_id: UserId) -> Self {
        Self {
            actor: Actor::User(user_id),
            metadata: None,
        }
    }

    /// Context for an automated mutation.
    #[must_use]
    pub fn system(name: impl Into<String>) -> Self {
        Self {
            actor: Actor::System(name.into()),
            metadata: None,
        }
    }

    /// Attaches request metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: RequestMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// An audit entry ready to be written by a store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    /// Entity type.
    pub entity_type: AuditEntityType,
    /// Entity id.
    pub entity_id: Uuid,
    /// Mutation kind.
    pub action: AuditAction,
    /// Who performed the mutation.
    pub actor: Actor,
    /// Snapshot before the mutation.
    pub old_value: Option<serde_json::Value>,
    /// Snapshot after the mutation.
    pub new_value: Option<serde_json::Value>,
    /// Request details.
    pub metadata: Option<RequestMetadata>,
}

/// A persisted audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Unique identifier.
    pub id: AuditEntryId,
    /// Store-assigned, strictly increasing write order.
    pub sequence: i64,
    /// When the entry was written.
    pub recorded_at: DateTime<Utc>,
    /// Entity type.
    pub entity_type: AuditEntityType,
    /// Entity id.
    pub entity_id: Uuid,
    /// Mutation kind.
    pub action: AuditAction,
    /// Who performed the mutation.
    pub actor: Actor,
    /// Snapshot before the mutation.
    pub old_value: Option<serde_json::Value>,
    /// Snapshot after the mutation.
    pub new_value: Option<serde_json::Value>,
    /// Request details.
    pub metadata: Option<RequestMetadata>,
}

/// Position in the audit stream; reading resumes strictly after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AuditCursor {
    /// Sequence of the last entry read.
    pub sequence: i64,
}

impl AuditLogEntry {
    /// The cursor positioned at this entry.
    #[must_use]
    pub fn cursor(&self) -> AuditCursor {
        AuditCursor {
            sequence: self.sequence,
        }
    }
}

/// Filter for audit queries. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    /// Restrict to one entity type.
    pub entity_type: Option<AuditEntityType>,
    /// Restrict to one entity.
    pub entity_id: Option<Uuid>,
    /// Restrict to one actor.
    pub actor: Option<Actor>,
    /// Entries recorded at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Entries recorded before this instant.
    pub to: Option<DateTime<Utc>>,
}

impl AuditFilter {
    /// Entries for a single entity.
    #[must_use]
    pub fn for_entity(entity_type: AuditEntityType, entity_id: Uuid) -> Self {
        Self {
            entity_type: Some(entity_type),
            entity_id: Some(entity_id),
            ..Self::default()
        }
    }

    /// Returns true if the entry passes every set criterion.
    #[must_use]
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.entity_type.is_none_or(|t| t == entry.entity_type)
            && self.entity_id.is_none_or(|id| id == entry.entity_id)
            && self.actor.as_ref().is_none_or(|a| *a == entry.actor)
            && self.from.is_none_or(|from| entry.recorded_at >= from)
            && self.to.is_none_or(|to| entry.recorded_at < to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_round_trip() {
        for entity_type in [
            AuditEntityType::GaugeRecord,
            AuditEntityType::LedgerTransaction,
            AuditEntityType::MonthlyReport,
            AuditEntityType::TaxDetermination,
            AuditEntityType::CompanyProfile,
        ] {
            assert_eq!(AuditEntityType::parse(entity_type.as_str()), Some(entity_type));
        }
        assert_eq!(AuditEntityType::parse("barrel"), None);
    }

    #[test]
    fn test_actor_display_and_parse() {
        let user = UserId::new();
        let actor = Actor::User(user);
        assert_eq!(actor.to_string(), format!("user:{user}"));
        assert_eq!(actor.to_string().parse::<Actor>(), Ok(actor));

        let system: Actor = "system:report-runner".parse().unwrap();
        assert_eq!(system, Actor::System("report-runner".to_string()));
        assert!(system.user_id().is_none());

        assert!("system:".parse::<Actor>().is_err());
        assert!("robot:1".parse::<Actor>().is_err());
    }

    #[test]
    fn test_filter_matches() {
        let entity_id = Uuid::new_v4();
        let entry = AuditLogEntry {
            id: AuditEntryId::new(),
            sequence: 1,
            recorded_at: Utc::now(),
            entity_type: AuditEntityType::MonthlyReport,
            entity_id,
            action: AuditAction::Create,
            actor: Actor::System("test".to_string()),
            old_value: None,
            new_value: Some(serde_json::json!({"status": "draft"})),
            metadata: None,
        };

        assert!(AuditFilter::default().matches(&entry));
        assert!(AuditFilter::for_entity(AuditEntityType::MonthlyReport, entity_id).matches(&entry));
        assert!(!AuditFilter::for_entity(AuditEntityType::GaugeRecord, entity_id).matches(&entry));

        let later = AuditFilter {
            from: Some(entry.recorded_at + chrono::Duration::seconds(1)),
            ..AuditFilter::default()
        };
        assert!(!later.matches(&entry));
    }
}
