//! Diffing, chunked persistence of managed documents.
//!
//! The writer owns a [`Snapshot`] of what it last saw in the remote store.
//! Each save computes a [`WritePlan`] against it with [`plan_writes`]:
//!
//! - fields whose value is unchanged are skipped;
//! - blank fields that are stored are deleted, never written empty;
//! - stored fields that are no longer desired are deleted.
//!
//! The plan is cut into chunks of at most `max_items_per_call` and issued as
//! sequential calls, sets before deletes. A failure at chunk *k* leaves
//! chunks before *k* applied; the snapshot advances by exactly those chunks
//! and the caller gets [`SyncError::PartialBatch`]. Nothing is rolled back:
//! re-running the save converges because the next plan only contains what is
//! still different.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use discount_sync_core::{DiscountRecord, PanelSettings, RecordId};

use super::documents::{ACTIVE_RECORDS_KEY, RECORDS_KEY, execution_subset};
use super::error::SyncError;
use super::guard::BusyFlag;
use crate::config::{MAX_ITEMS_PER_CALL, SyncConfig};
use crate::store::{DocumentKey, DocumentType, DocumentWrite, RemoteStore, with_deadline};

/// Last known remote value of every managed field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot(BTreeMap<DocumentKey, String>);

impl Snapshot {
    /// Empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored value of `key`.
    #[must_use]
    pub fn get(&self, key: &DocumentKey) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Record that `key` now holds `value`.
    pub fn insert(&mut self, key: DocumentKey, value: String) {
        self.0.insert(key, value);
    }

    /// Record that `key` is gone.
    pub fn remove(&mut self, key: &DocumentKey) {
        self.0.remove(key);
    }

    /// Keys stored under `namespace`.
    pub fn keys_in<'a>(&'a self, namespace: &'a str) -> impl Iterator<Item = &'a DocumentKey> {
        self.0.keys().filter(move |k| k.namespace == namespace)
    }

    /// Number of tracked fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What one save wants a namespace to contain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredFields {
    /// Namespace the fields live in; stored keys elsewhere are never touched.
    pub namespace: String,
    fields: BTreeMap<String, (String, DocumentType)>,
}

impl DesiredFields {
    /// Empty desired state for `namespace`.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Desire `key` to hold `value`. A blank value asks for deletion.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>, value_type: DocumentType) {
        self.fields.insert(key.into(), (value.into(), value_type));
    }

    /// Number of desired fields, blanks included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is desired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Field-level changes needed to move the remote store to a desired state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WritePlan {
    /// Fields to write.
    pub sets: Vec<DocumentWrite>,
    /// Fields to delete.
    pub deletes: Vec<DocumentKey>,
}

/// One remote call's worth of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteChunk {
    Set(Vec<DocumentWrite>),
    Delete(Vec<DocumentKey>),
}

impl WriteChunk {
    /// Items in the chunk.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Set(writes) => writes.len(),
            Self::Delete(keys) => keys.len(),
        }
    }

    /// Whether the chunk is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn apply_to(self, snapshot: &mut Snapshot) {
        match self {
            Self::Set(writes) => {
                for write in writes {
                    snapshot.insert(write.key, write.value);
                }
            }
            Self::Delete(keys) => {
                for key in &keys {
                    snapshot.remove(key);
                }
            }
        }
    }
}

impl WritePlan {
    /// Whether the remote store already matches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty() && self.deletes.is_empty()
    }

    /// Cut into calls of at most `max_items` (clamped to `1..=25`).
    #[must_use]
    pub fn into_chunks(self, max_items: usize) -> Vec<WriteChunk> {
        let size = max_items.clamp(1, MAX_ITEMS_PER_CALL);
        let mut chunks: Vec<WriteChunk> = self
            .sets
            .chunks(size)
            .map(|c| WriteChunk::Set(c.to_vec()))
            .collect();
        chunks.extend(
            self.deletes
                .chunks(size)
                .map(|c| WriteChunk::Delete(c.to_vec())),
        );
        chunks
    }
}

/// Diff `desired` against `snapshot`.
#[must_use]
pub fn plan_writes(snapshot: &Snapshot, desired: &DesiredFields) -> WritePlan {
    let mut plan = WritePlan::default();

    for (key, (value, value_type)) in &desired.fields {
        let doc_key = DocumentKey::new(desired.namespace.clone(), key.clone());
        let stored = snapshot.get(&doc_key);
        if value.trim().is_empty() {
            if stored.is_some() {
                plan.deletes.push(doc_key);
            }
        } else if stored != Some(value.as_str()) {
            plan.sets.push(DocumentWrite {
                key: doc_key,
                value: value.clone(),
                value_type: *value_type,
            });
        }
    }

    plan.deletes.extend(
        snapshot
            .keys_in(&desired.namespace)
            .filter(|k| !desired.fields.contains_key(&k.key))
            .cloned(),
    );

    plan
}

/// Result of a successful save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistOutcome {
    /// Fields written.
    pub fields_written: usize,
    /// Fields deleted.
    pub fields_deleted: usize,
    /// Remote calls issued.
    pub chunks: usize,
    /// Records dropped because the set exceeded the record ceiling.
    pub truncated: Vec<RecordId>,
    /// Stored records kept unchanged although they fail validation.
    pub invalid: Vec<RecordId>,
}

/// Persists records and panel settings through a diffed, chunked plan.
pub struct BatchedWriter<S: ?Sized> {
    store: Arc<S>,
    config: SyncConfig,
    snapshot: Mutex<Snapshot>,
    busy: BusyFlag,
}

impl<S: RemoteStore + ?Sized> BatchedWriter<S> {
    /// Create a writer with an empty snapshot.
    pub fn new(store: Arc<S>, config: SyncConfig) -> Self {
        Self {
            store,
            config,
            snapshot: Mutex::new(Snapshot::new()),
            busy: BusyFlag::new(),
        }
    }

    fn config_key(&self, key: &str) -> DocumentKey {
        DocumentKey::new(self.config.config_namespace.clone(), key)
    }

    /// Copy of the current snapshot.
    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.lock().await.clone()
    }

    /// Read the consolidated records document.
    ///
    /// Returns `None` when the document has never been written. The snapshot
    /// is updated with every config field read.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Store` if a read fails and `SyncError::Corrupt` if
    /// the document does not decode.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Option<Vec<DiscountRecord>>, SyncError> {
        let timeout = self.config.request_timeout;
        let records_key = self.config_key(RECORDS_KEY);
        let active_key = self.config_key(ACTIVE_RECORDS_KEY);

        let raw = with_deadline(timeout, self.store.get_document(&records_key)).await?;
        let active = with_deadline(timeout, self.store.get_document(&active_key)).await?;

        let records = raw
            .as_deref()
            .map(|json| {
                serde_json::from_str::<Vec<DiscountRecord>>(json).map_err(|e| {
                    SyncError::Corrupt {
                        key: records_key.clone(),
                        message: e.to_string(),
                    }
                })
            })
            .transpose()?;

        let mut snapshot = self.snapshot.lock().await;
        for (key, value) in [(records_key, raw), (active_key, active)] {
            match value {
                Some(value) => snapshot.insert(key, value),
                None => snapshot.remove(&key),
            }
        }

        debug!(count = records.as_ref().map_or(0, Vec::len), "Loaded records document");
        Ok(records)
    }

    /// Save `records` and their execution subset.
    ///
    /// Every record is validated first. A new or changed invalid record
    /// aborts the save before any remote call. A record that fails
    /// validation but is exactly what the store already holds (for example
    /// one written by a newer build) is kept as stored, left out of the
    /// execution subset, and listed in [`PersistOutcome::invalid`]. Records
    /// beyond `max_records` are dropped with a warning and listed in the
    /// outcome.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Busy` if another save is running,
    /// `SyncError::Record` for an invalid record, and
    /// `SyncError::PartialBatch` if a chunk fails.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn persist(&self, records: &[DiscountRecord]) -> Result<PersistOutcome, SyncError> {
        let _guard = self.busy.try_acquire().ok_or(SyncError::Busy("persist"))?;

        let stored = self.stored_records().await;
        let mut invalid = Vec::new();
        for record in records {
            if let Err(e) = record.validate() {
                if !stored.contains(record) {
                    return Err(e.into());
                }
                warn!(record_id = %record.id, error = %e, "Keeping stored record that fails validation");
                invalid.push(record.id.clone());
            }
        }

        let keep = records.len().min(self.config.max_records);
        let (kept, dropped) = records.split_at(keep);
        let truncated: Vec<RecordId> = dropped.iter().map(|r| r.id.clone()).collect();
        if !truncated.is_empty() {
            warn!(
                max_records = self.config.max_records,
                dropped = truncated.len(),
                ids = ?truncated,
                "Record set exceeds ceiling, truncating"
            );
        }
        invalid.retain(|id| !truncated.contains(id));

        let executable: Vec<DiscountRecord> = kept
            .iter()
            .filter(|r| !invalid.contains(&r.id))
            .cloned()
            .collect();

        let mut desired = DesiredFields::new(self.config.config_namespace.clone());
        desired.set(RECORDS_KEY, serde_json::to_string(kept)?, DocumentType::Json);
        desired.set(
            ACTIVE_RECORDS_KEY,
            serde_json::to_string(&execution_subset(&executable))?,
            DocumentType::Json,
        );

        let mut outcome = self.apply(&desired).await?;
        outcome.truncated = truncated;
        outcome.invalid = invalid;
        Ok(outcome)
    }

    /// Records as last read from or written to the store.
    async fn stored_records(&self) -> Vec<DiscountRecord> {
        let key = self.config_key(RECORDS_KEY);
        let snapshot = self.snapshot.lock().await;
        snapshot
            .get(&key)
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default()
    }

    /// Read panel settings and track them in the snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Store` if the listing fails.
    #[instrument(skip(self))]
    pub async fn load_panel(&self) -> Result<PanelSettings, SyncError> {
        let fields = with_deadline(
            self.config.request_timeout,
            self.store.list_documents(&self.config.panel_namespace),
        )
        .await?;

        let mut snapshot = self.snapshot.lock().await;
        let stale: Vec<DocumentKey> = snapshot
            .keys_in(&self.config.panel_namespace)
            .cloned()
            .collect();
        for key in &stale {
            snapshot.remove(key);
        }
        for (key, value) in &fields {
            snapshot.insert(key.clone(), value.clone());
        }

        Ok(fields.into_iter().map(|(k, v)| (k.key, v)).collect())
    }

    /// Save panel settings, one field per setting.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Busy` if another save is running and
    /// `SyncError::PartialBatch` if a chunk fails.
    #[instrument(skip(self, settings), fields(count = settings.len()))]
    pub async fn persist_panel(&self, settings: &PanelSettings) -> Result<PersistOutcome, SyncError> {
        let _guard = self.busy.try_acquire().ok_or(SyncError::Busy("persist"))?;

        let mut desired = DesiredFields::new(self.config.panel_namespace.clone());
        for (key, value) in settings.iter() {
            desired.set(key, value, DocumentType::SingleLineTextField);
        }

        self.apply(&desired).await
    }

    /// Delete arbitrary keys in chunks. Returns the number deleted.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::PartialBatch` if a chunk fails.
    #[instrument(skip(self, keys), fields(count = keys.len()))]
    pub async fn delete_documents(&self, keys: &[DocumentKey]) -> Result<usize, SyncError> {
        let _guard = self.busy.try_acquire().ok_or(SyncError::Busy("persist"))?;

        let plan = WritePlan {
            sets: Vec::new(),
            deletes: keys.to_vec(),
        };
        let mut snapshot = self.snapshot.lock().await;
        self.execute(plan, &mut snapshot).await?;
        Ok(keys.len())
    }

    async fn apply(&self, desired: &DesiredFields) -> Result<PersistOutcome, SyncError> {
        let mut snapshot = self.snapshot.lock().await;
        let plan = plan_writes(&snapshot, desired);
        if plan.is_empty() {
            debug!(namespace = %desired.namespace, "No changes to persist");
            return Ok(PersistOutcome::default());
        }

        let fields_written = plan.sets.len();
        let fields_deleted = plan.deletes.len();
        let chunks = self.execute(plan, &mut snapshot).await?;

        info!(
            namespace = %desired.namespace,
            fields_written,
            fields_deleted,
            chunks,
            "Persisted document changes"
        );

        Ok(PersistOutcome {
            fields_written,
            fields_deleted,
            chunks,
            ..PersistOutcome::default()
        })
    }

    /// Issue `plan` chunk by chunk, advancing `snapshot` after each success.
    async fn execute(&self, plan: WritePlan, snapshot: &mut Snapshot) -> Result<usize, SyncError> {
        let timeout = self.config.request_timeout;
        let chunks = plan.into_chunks(self.config.max_items_per_call);
        let total = chunks.len();

        for (index, chunk) in chunks.into_iter().enumerate() {
            let result = match &chunk {
                WriteChunk::Set(writes) => {
                    with_deadline(timeout, self.store.set_documents(writes)).await
                }
                WriteChunk::Delete(keys) => {
                    with_deadline(timeout, self.store.delete_documents(keys)).await
                }
            };

            if let Err(source) = result {
                warn!(
                    chunk = index + 1,
                    total,
                    applied = index,
                    error = %source,
                    "Write chunk failed, earlier chunks remain applied"
                );
                return Err(SyncError::PartialBatch {
                    chunk: index + 1,
                    total,
                    applied: index,
                    source,
                });
            }

            debug!(chunk = index + 1, total, items = chunk.len(), "Applied write chunk");
            chunk.apply_to(snapshot);
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(entries: &[(&str, &str, &str)]) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for (ns, key, value) in entries {
            snapshot.insert(DocumentKey::new(*ns, *key), (*value).to_string());
        }
        snapshot
    }

    fn desired(ns: &str, entries: &[(&str, &str)]) -> DesiredFields {
        let mut desired = DesiredFields::new(ns);
        for (key, value) in entries {
            desired.set(*key, *value, DocumentType::SingleLineTextField);
        }
        desired
    }

    #[test]
    fn test_unchanged_fields_are_skipped() {
        let plan = plan_writes(
            &snapshot(&[("panel", "title", "Deals")]),
            &desired("panel", &[("title", "Deals")]),
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn test_changed_and_new_fields_are_set() {
        let plan = plan_writes(
            &snapshot(&[("panel", "title", "Deals")]),
            &desired("panel", &[("title", "Offers"), ("color", "#fff")]),
        );
        let keys: Vec<&str> = plan.sets.iter().map(|w| w.key.key.as_str()).collect();
        assert_eq!(keys, ["color", "title"]);
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn test_blank_stored_field_is_deleted() {
        let plan = plan_writes(
            &snapshot(&[("panel", "subtitle", "Save now")]),
            &desired("panel", &[("subtitle", "  ")]),
        );
        assert!(plan.sets.is_empty());
        assert_eq!(plan.deletes, vec![DocumentKey::new("panel", "subtitle")]);
    }

    #[test]
    fn test_blank_unstored_field_is_ignored() {
        let plan = plan_writes(&Snapshot::new(), &desired("panel", &[("subtitle", "")]));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_disappeared_field_is_deleted_within_namespace_only() {
        let plan = plan_writes(
            &snapshot(&[
                ("panel", "old", "x"),
                ("config", "records", "[]"),
            ]),
            &desired("panel", &[]),
        );
        assert_eq!(plan.deletes, vec![DocumentKey::new("panel", "old")]);
    }

    #[test]
    fn test_chunking_respects_ceiling() {
        let writes: Vec<DocumentWrite> = (0..57)
            .map(|i| DocumentWrite {
                key: DocumentKey::new("panel", format!("k{i}")),
                value: "v".to_string(),
                value_type: DocumentType::SingleLineTextField,
            })
            .collect();
        let plan = WritePlan {
            sets: writes,
            deletes: vec![DocumentKey::new("panel", "gone")],
        };

        let sizes: Vec<usize> = plan.clone().into_chunks(25).iter().map(WriteChunk::len).collect();
        assert_eq!(sizes, [25, 25, 7, 1]);

        // Requests above the platform ceiling are clamped.
        assert_eq!(plan.into_chunks(100)[0].len(), 25);
    }

    #[test]
    fn test_chunk_apply_advances_snapshot() {
        let mut snap = snapshot(&[("panel", "gone", "x")]);
        WriteChunk::Set(vec![DocumentWrite {
            key: DocumentKey::new("panel", "title"),
            value: "Deals".to_string(),
            value_type: DocumentType::SingleLineTextField,
        }])
        .apply_to(&mut snap);
        WriteChunk::Delete(vec![DocumentKey::new("panel", "gone")]).apply_to(&mut snap);

        assert_eq!(snap.get(&DocumentKey::new("panel", "title")), Some("Deals"));
        assert_eq!(snap.get(&DocumentKey::new("panel", "gone")), None);
        assert_eq!(snap.len(), 1);
    }
}
