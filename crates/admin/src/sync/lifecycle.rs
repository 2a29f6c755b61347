//! Record lifecycle: publish, toggle and remove.
//!
//! ```text
//! Draft --publish--> Active <--set_active--> Inactive
//!   |                   |                       |
//!   +------remove-------+-----------------------+--> (gone)
//! ```
//!
//! Each operation holds the engine's edit lock from loading the records to
//! saving them, so it never overwrites a concurrent edit or reconciliation.
//! Remote calls happen before the local save. If the save then fails, the
//! next reconciliation cleans up: a created object with no local record is an
//! orphan, and a deleted object's record is pruned.

use tracing::{info, instrument, warn};

use discount_sync_core::{DiscountRecord, RecordId, RemoteObjectSpec};

use super::SyncEngine;
use super::error::SyncError;
use super::writer::PersistOutcome;
use crate::store::{RemoteStore, with_deadline};

/// Record operations bound to an engine.
pub struct RecordService<'a, S: ?Sized> {
    engine: &'a SyncEngine<S>,
}

impl<'a, S: RemoteStore + ?Sized> RecordService<'a, S> {
    pub(super) const fn new(engine: &'a SyncEngine<S>) -> Self {
        Self { engine }
    }

    /// All stored records, in document order.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the document cannot be read.
    pub async fn list(&self) -> Result<Vec<DiscountRecord>, SyncError> {
        Ok(self.engine.writer.load().await?.unwrap_or_default())
    }

    /// Save `record` without touching the remote registry.
    ///
    /// Replaces the stored record with the same ID, or appends it.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Record` if the record is invalid and
    /// `SyncError::DuplicateName` if another record uses its name.
    #[instrument(skip(self, record), fields(record_id = %record.id))]
    pub async fn save(&self, record: DiscountRecord) -> Result<DiscountRecord, SyncError> {
        record.validate()?;
        let _edits = self.engine.lock_edits().await;
        let mut records = self.list().await?;
        upsert(&mut records, record.clone())?;
        self.engine.writer.persist(&records).await?;
        Ok(record)
    }

    /// Create the remote object for `record` and save it with its new
    /// reference. Already published records are just saved.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Record` or `SyncError::DuplicateName` before any
    /// remote call, and `SyncError::Store` if creation fails.
    #[instrument(skip(self, record), fields(record_id = %record.id, name = %record.name))]
    pub async fn publish(&self, mut record: DiscountRecord) -> Result<DiscountRecord, SyncError> {
        record.validate()?;
        let _edits = self.engine.lock_edits().await;
        let mut records = self.list().await?;
        upsert(&mut records, record.clone())?;

        if record.remote_ref.is_none() {
            let spec = RemoteObjectSpec::from_record(&record, self.engine.function_id.as_deref());
            let remote_ref = with_deadline(
                self.engine.config.request_timeout,
                self.engine.store.create_object(&spec),
            )
            .await?;
            info!(remote_id = %remote_ref, "Created remote discount");
            record.remote_ref = Some(remote_ref);
            upsert(&mut records, record.clone())?;
        }

        if let Err(e) = self.engine.writer.persist(&records).await {
            warn!(error = %e, "Remote object created but record not saved; next reconciliation will clean up");
            return Err(e);
        }
        Ok(record)
    }

    /// Toggle a record between Active and Inactive.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::RecordNotFound` for an unknown ID.
    #[instrument(skip(self))]
    pub async fn set_active(&self, id: &RecordId, active: bool) -> Result<DiscountRecord, SyncError> {
        let _edits = self.engine.lock_edits().await;
        let mut records = self.list().await?;
        let record = records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| SyncError::RecordNotFound(id.clone()))?;
        record.active = active;
        let updated = record.clone();

        self.engine.writer.persist(&records).await?;
        info!(state = %updated.state(), "Toggled record");
        Ok(updated)
    }

    /// Delete the record's remote object (absence counts as success), then
    /// the record itself.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::RecordNotFound` for an unknown ID, and
    /// `SyncError::Store` if the remote delete fails for any reason other
    /// than the object being gone. The record is kept in that case.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: &RecordId) -> Result<PersistOutcome, SyncError> {
        let _edits = self.engine.lock_edits().await;
        let mut records = self.list().await?;
        let remote_ref = records
            .iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| SyncError::RecordNotFound(id.clone()))?
            .remote_ref
            .clone();

        if let Some(remote_ref) = remote_ref {
            match with_deadline(
                self.engine.config.request_timeout,
                self.engine.store.delete_object(&remote_ref),
            )
            .await
            {
                Ok(()) => info!(remote_id = %remote_ref, "Deleted remote discount"),
                Err(e) if e.is_confirmed_absent() => {
                    info!(remote_id = %remote_ref, "Remote discount already gone");
                }
                Err(e) => return Err(e.into()),
            }
        }

        records.retain(|r| &r.id != id);
        self.engine.writer.persist(&records).await
    }
}

fn upsert(records: &mut Vec<DiscountRecord>, record: DiscountRecord) -> Result<(), SyncError> {
    if records.iter().any(|r| r.id != record.id && r.name == record.name) {
        return Err(SyncError::DuplicateName(record.name));
    }
    match records.iter_mut().find(|r| r.id == record.id) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
    Ok(())
}
