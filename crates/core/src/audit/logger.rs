//! Audit entry capture and export.

use futures::{Stream, TryStreamExt, stream};
use serde::Serialize;
use uuid::Uuid;

use crate::audit::types::{
    AuditAction, AuditContext, AuditCursor, AuditEntityType, AuditFilter, AuditLogEntry,
    NewAuditEntry,
};
use crate::store::{ComplianceStore, StoreError, UnitOfWork};

/// Captures before/after snapshots and writes them through a unit of work.
pub struct AuditLogger;

impl AuditLogger {
    /// Builds an audit entry from typed snapshots.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AuditWriteFailure` if a snapshot cannot be
    /// serialized or the snapshots do not fit the action: Create carries only
    /// a new value, Delete only an old value, Update both.
    pub fn entry<T: Serialize>(
        entity_type: AuditEntityType,
        entity_id: Uuid,
        action: AuditAction,
        ctx: &AuditContext,
        old: Option<&T>,
        new: Option<&T>,
    ) -> Result<NewAuditEntry, StoreError> {
        match (action, old.is_some(), new.is_some()) {
            (AuditAction::Create, false, true)
            | (AuditAction::Update, true, true)
            | (AuditAction::Delete, true, false) => {}
            _ => {
                return Err(StoreError::AuditWriteFailure(format!(
                    "inconsistent snapshots for {action} of {entity_type} {entity_id}"
                )));
            }
        }

        Ok(NewAuditEntry {
            entity_type,
            entity_id,
            action,
            actor: ctx.actor.clone(),
            old_value: old.map(snapshot).transpose()?,
            new_value: new.map(snapshot).transpose()?,
            metadata: ctx.metadata.clone(),
        })
    }

    /// Writes one audit entry inside `tx`.
    ///
    /// The entry only becomes visible when `tx` commits; if this call fails the
    /// caller must drop `tx` so the described mutation is rolled back as well.
    pub async fn record<U: UnitOfWork, T: Serialize>(
        tx: &mut U,
        entity_type: AuditEntityType,
        entity_id: Uuid,
        action: AuditAction,
        ctx: &AuditContext,
        old: Option<&T>,
        new: Option<&T>,
    ) -> Result<AuditLogEntry, StoreError> {
        let entry = Self::entry(entity_type, entity_id, action, ctx, old, new)?;
        let written = tx.append_audit(entry).await?;
        tracing::debug!(
            entity_type = %written.entity_type,
            entity_id = %written.entity_id,
            action = %written.action,
            sequence = written.sequence,
            "Audit entry recorded"
        );
        Ok(written)
    }

    /// Streams matching entries in write order.
    ///
    /// Entries are fetched in pages of `page_size`. Passing the cursor of any
    /// yielded entry as `start_after` resumes the stream right after it.
    pub fn stream<'a, S: ComplianceStore>(
        store: &'a S,
        filter: AuditFilter,
        start_after: Option<AuditCursor>,
        page_size: u64,
    ) -> impl Stream<Item = Result<AuditLogEntry, StoreError>> + Send + 'a {
        let page_size = page_size.max(1);
        stream::try_unfold(
            (filter, start_after, false),
            move |(filter, after, exhausted)| async move {
                if exhausted {
                    return Ok(None);
                }
                let page = store.audit_page(&filter, after, page_size).await?;
                let Some(last) = page.last().map(AuditLogEntry::cursor) else {
                    return Ok(None);
                };
                let exhausted = (page.len() as u64) < page_size;
                Ok(Some((
                    stream::iter(page.into_iter().map(Ok::<_, StoreError>)),
                    (filter, Some(last), exhausted),
                )))
            },
        )
        .try_flatten()
    }
}

fn snapshot<T: Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value)
        .map_err(|e| StoreError::AuditWriteFailure(format!("snapshot serialization failed: {e}")))
}
