//! Two-way reconciliation between local records and remote objects.
//!
//! A pass:
//!
//! 1. lists every remote object;
//! 2. loads the local records;
//! 3. checks each linked record's remote object, concurrently and under a
//!    deadline, and prunes the records whose object is confirmed gone;
//! 4. deletes remote objects that are ours but have no local counterpart;
//! 5. persists the surviving records.
//!
//! Only a confirmed absence prunes a record. A timeout or any other failure
//! keeps it, so a flaky network never deletes configuration.

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use discount_sync_core::ownership::classify;
use discount_sync_core::{
    DiscountRecord, Ownership, OwnershipPolicy, OwnershipReason, RecordId, RemoteObjectRef,
    RemoteRef,
};

use super::SyncEngine;
use super::error::SyncError;
use super::writer::PersistOutcome;
use crate::store::{RemoteStore, StoreError, with_deadline};

/// Result of checking whether a record's remote object still exists.
#[derive(Debug)]
enum Existence {
    /// The record was never published.
    LocalOnly,
    Present,
    /// The remote confirmed the object is gone.
    Absent,
    /// The check failed; existence is unknown.
    Unknown(StoreError),
}

/// A remote object selected for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Orphan {
    pub id: RemoteRef,
    pub title: String,
    pub reason: OwnershipReason,
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Records that survived, in document order.
    pub valid_records: Vec<DiscountRecord>,
    /// Records dropped because their remote object is gone.
    pub pruned_records: Vec<RecordId>,
    /// Records kept although their existence check failed.
    pub unverified_records: Vec<RecordId>,
    /// Stored records kept as they are because they fail validation.
    pub invalid_records: Vec<RecordId>,
    /// Remote objects classified as orphans.
    pub orphaned_remote_refs: Vec<RemoteRef>,
    /// Orphans actually deleted.
    pub deleted_orphan_count: usize,
    /// Orphans whose deletion failed.
    pub failed_orphan_deletes: Vec<RemoteRef>,
    /// What the final save wrote.
    pub persisted: PersistOutcome,
}

/// Select the remote objects to delete.
///
/// Objects referenced by a surviving record are skipped. The rest go through
/// the classifier: a title match means a counterpart exists and the object
/// stays; any other owned reason makes it an orphan.
#[must_use]
pub fn find_orphans(
    remote: &[RemoteObjectRef],
    survivors: &[DiscountRecord],
    policy: &OwnershipPolicy,
) -> Vec<Orphan> {
    let referenced: HashSet<&RemoteRef> = survivors
        .iter()
        .filter_map(|r| r.remote_ref.as_ref())
        .collect();
    let titles: HashSet<String> = survivors.iter().map(|r| r.name.clone()).collect();

    remote
        .iter()
        .filter(|object| !referenced.contains(&object.id))
        .filter_map(|object| match classify(object, &titles, policy) {
            Ownership::Owned(reason) if !reason.has_local_counterpart() => Some(Orphan {
                id: object.id.clone(),
                title: object.title.clone(),
                reason,
            }),
            ownership => {
                debug!(remote_id = %object.id, ?ownership, "Leaving remote object in place");
                None
            }
        })
        .collect()
}

impl<S: RemoteStore + ?Sized> SyncEngine<S> {
    /// Run one reconciliation pass.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Busy` if a pass is already running. Record edits
    /// wait for the pass to finish. Listing, loading and persisting failures
    /// abort the pass; it is safe to retry.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> Result<SyncReport, SyncError> {
        let _guard = self
            .reconcile_busy
            .try_acquire()
            .ok_or(SyncError::Busy("reconciliation"))?;
        let _edits = self.lock_edits().await;

        let timeout = self.config.request_timeout;
        let remote = with_deadline(timeout, self.store.list_remote_objects()).await?;
        let local = self.writer.load().await?.unwrap_or_default();
        info!(remote = remote.len(), local = local.len(), "Starting reconciliation");

        let mut report = SyncReport::default();
        for (record, existence) in self.check_existence(local).await {
            match existence {
                Existence::LocalOnly | Existence::Present => report.valid_records.push(record),
                Existence::Absent => {
                    info!(record_id = %record.id, name = %record.name, "Pruning record, remote object is gone");
                    report.pruned_records.push(record.id);
                }
                Existence::Unknown(e) => {
                    warn!(record_id = %record.id, error = %e, "Existence check failed, keeping record");
                    report.unverified_records.push(record.id.clone());
                    report.valid_records.push(record);
                }
            }
        }

        let orphans = find_orphans(&remote, &report.valid_records, &self.policy);
        for orphan in &orphans {
            report.orphaned_remote_refs.push(orphan.id.clone());
            match with_deadline(timeout, self.store.delete_object(&orphan.id)).await {
                Ok(()) => {
                    info!(remote_id = %orphan.id, title = %orphan.title, reason = ?orphan.reason, "Deleted orphaned remote object");
                    report.deleted_orphan_count += 1;
                }
                Err(e) if e.is_confirmed_absent() => {
                    debug!(remote_id = %orphan.id, "Orphan already gone");
                }
                Err(e) => {
                    error!(remote_id = %orphan.id, error = %e, "Failed to delete orphaned remote object");
                    report.failed_orphan_deletes.push(orphan.id.clone());
                }
            }
        }

        report.persisted = self.writer.persist(&report.valid_records).await?;
        report.invalid_records.clone_from(&report.persisted.invalid);

        info!(
            valid = report.valid_records.len(),
            pruned = report.pruned_records.len(),
            unverified = report.unverified_records.len(),
            invalid = report.invalid_records.len(),
            orphans_deleted = report.deleted_orphan_count,
            orphan_delete_failures = report.failed_orphan_deletes.len(),
            "Reconciliation complete"
        );
        Ok(report)
    }

    /// Check every linked record with at most `worker_limit` calls in flight.
    /// Results come back in input order.
    async fn check_existence(&self, records: Vec<DiscountRecord>) -> Vec<(DiscountRecord, Existence)> {
        let timeout = self.config.request_timeout;
        let store = &self.store;

        let mut checked: Vec<(usize, DiscountRecord, Existence)> =
            stream::iter(records.into_iter().enumerate())
                .map(|(index, record)| async move {
                    let existence = match &record.remote_ref {
                        None => Existence::LocalOnly,
                        Some(id) => match with_deadline(timeout, store.get_remote_object(id)).await {
                            Ok(Some(_)) => Existence::Present,
                            Ok(None) => Existence::Absent,
                            Err(e) if e.is_confirmed_absent() => Existence::Absent,
                            Err(e) => Existence::Unknown(e),
                        },
                    };
                    (index, record, existence)
                })
                .buffer_unordered(self.config.worker_limit.max(1))
                .collect()
                .await;

        checked.sort_by_key(|(index, ..)| *index);
        checked
            .into_iter()
            .map(|(_, record, existence)| (record, existence))
            .collect()
    }
}
