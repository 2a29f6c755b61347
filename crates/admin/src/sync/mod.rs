//! Synchronisation pipeline.
//!
//! [`SyncEngine`] ties the stages together around one [`RemoteStore`]:
//!
//! - [`migration`] - legacy per-field layout to the consolidated document
//! - [`reconciler`] - prune dead records, delete orphaned remote objects
//! - [`writer`] - diffed, chunked persistence
//! - [`lifecycle`] - publish, toggle and remove individual records
//!
//! Start-up runs migration, then reconciliation. Migration, reconciliation
//! and record edits each hold the engine's edit lock from the load of the
//! records document to its save, so they apply one after another.

pub mod documents;
mod error;
mod guard;
pub mod lifecycle;
pub mod migration;
pub mod reconciler;
pub mod writer;

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::instrument;

use discount_sync_core::OwnershipPolicy;

pub use error::SyncError;
pub use guard::{BusyFlag, BusyGuard};
pub use lifecycle::RecordService;
pub use reconciler::SyncReport;
pub use writer::{BatchedWriter, PersistOutcome, Snapshot, WritePlan, plan_writes};

use crate::config::{AppIdentityConfig, SyncConfig};
use crate::store::RemoteStore;

/// The sync pipeline bound to a remote store.
pub struct SyncEngine<S: ?Sized> {
    store: Arc<S>,
    writer: BatchedWriter<S>,
    config: SyncConfig,
    policy: OwnershipPolicy,
    function_id: Option<String>,
    reconcile_busy: BusyFlag,
    /// Held across every load-modify-persist of the records document.
    edits: Mutex<()>,
}

impl<S: RemoteStore + ?Sized> SyncEngine<S> {
    /// Create an engine for the configured app.
    pub fn new(store: Arc<S>, config: SyncConfig, app: &AppIdentityConfig) -> Self {
        Self::with_policy(store, config, app.ownership_policy(), app.function_id.clone())
    }

    /// Create an engine with an explicit ownership policy.
    pub fn with_policy(
        store: Arc<S>,
        config: SyncConfig,
        policy: OwnershipPolicy,
        function_id: Option<String>,
    ) -> Self {
        Self {
            writer: BatchedWriter::new(Arc::clone(&store), config.clone()),
            store,
            config,
            policy,
            function_id,
            reconcile_busy: BusyFlag::new(),
            edits: Mutex::new(()),
        }
    }

    /// The remote store.
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The document writer.
    pub const fn writer(&self) -> &BatchedWriter<S> {
        &self.writer
    }

    /// Record lifecycle operations.
    pub const fn records(&self) -> RecordService<'_, S> {
        RecordService::new(self)
    }

    /// Whether a reconciliation pass is running.
    pub fn is_reconciling(&self) -> bool {
        self.reconcile_busy.is_busy()
    }

    /// Serialise edits of the records document, so no save is computed from
    /// a list another edit has since replaced.
    pub(crate) async fn lock_edits(&self) -> MutexGuard<'_, ()> {
        self.edits.lock().await
    }

    /// Migrate if needed, then reconcile.
    ///
    /// # Errors
    ///
    /// Returns the first stage's error; the remaining stages do not run.
    #[instrument(skip(self))]
    pub async fn startup(&self) -> Result<SyncReport, SyncError> {
        self.migrate_if_needed().await?;
        self.reconcile().await
    }
}
