//! Integration test support for discount sync.
//!
//! [`MemoryStore`] is an in-memory [`RemoteStore`] that behaves like the
//! Shopify implementation where the pipeline can observe it:
//!
//! - missing objects read as `Ok(None)` and delete as `NotFound`;
//! - batches above the platform ceiling or with blank values are rejected;
//! - every call is recorded, so tests can assert call counts and chunk sizes;
//! - failures can be injected per operation or per object.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p discount-sync-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{BTreeMap, HashMap};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use discount_sync_admin::config::{
    AdminConfig, AppIdentityConfig, MAX_ITEMS_PER_CALL, ShopifyAdminConfig, SyncConfig,
};
use discount_sync_admin::state::AppState;
use discount_sync_admin::store::{DocumentKey, DocumentWrite, RemoteStore, StoreError};
use discount_sync_admin::sync::SyncEngine;
use discount_sync_core::{
    AppMetadata, DiscountMethod, OwnershipPolicy, RemoteObjectKind, RemoteObjectRef,
    RemoteObjectSpec, RemoteRef, RemoteStatus,
};

/// Handle the fake app uses for the objects it creates.
pub const APP_HANDLE: &str = "tiered-discounts";

/// Store operations, for call accounting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListRemoteObjects,
    GetRemoteObject,
    CreateObject,
    DeleteObject,
    GetDocument,
    ListDocuments,
    SetDocuments,
    DeleteDocuments,
}

/// One recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListRemoteObjects,
    GetRemoteObject(RemoteRef),
    CreateObject(String),
    DeleteObject(RemoteRef),
    GetDocument(DocumentKey),
    ListDocuments(String),
    SetDocuments(Vec<DocumentKey>),
    DeleteDocuments(Vec<DocumentKey>),
}

impl Call {
    /// Operation this call performed.
    #[must_use]
    pub const fn op(&self) -> Op {
        match self {
            Self::ListRemoteObjects => Op::ListRemoteObjects,
            Self::GetRemoteObject(_) => Op::GetRemoteObject,
            Self::CreateObject(_) => Op::CreateObject,
            Self::DeleteObject(_) => Op::DeleteObject,
            Self::GetDocument(_) => Op::GetDocument,
            Self::ListDocuments(_) => Op::ListDocuments,
            Self::SetDocuments(_) => Op::SetDocuments,
            Self::DeleteDocuments(_) => Op::DeleteDocuments,
        }
    }
}

/// A failure armed for the `nth` upcoming call of an operation.
#[derive(Debug)]
struct ArmedFailure {
    op: Op,
    remaining: usize,
    error: StoreError,
}

#[derive(Debug, Default)]
struct Inner {
    objects: Vec<RemoteObjectRef>,
    documents: BTreeMap<DocumentKey, String>,
    calls: Vec<Call>,
    armed: Vec<ArmedFailure>,
    lookup_failures: HashMap<RemoteRef, StoreError>,
    lookup_delay: Option<Duration>,
    next_id: u64,
}

/// In-memory remote store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread poisons the lock; the data is still usable.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    // ========================================================================
    // Seeding
    // ========================================================================

    /// Add a remote object.
    pub fn insert_object(&self, object: RemoteObjectRef) {
        self.lock().objects.push(object);
    }

    /// Add an app discount created by [`APP_HANDLE`].
    pub fn insert_app_object(&self, id: &str, title: &str) -> RemoteRef {
        let id = RemoteRef::new(id);
        self.insert_object(app_object(id.clone(), title, DiscountMethod::Automatic));
        id
    }

    /// Remove a remote object behind the pipeline's back.
    pub fn forget_object(&self, id: &RemoteRef) {
        self.lock().objects.retain(|o| &o.id != id);
    }

    /// Store a document field.
    pub fn insert_document(&self, namespace: &str, key: &str, value: impl Into<String>) {
        self.lock()
            .documents
            .insert(DocumentKey::new(namespace, key), value.into());
    }

    /// Append a record whose condition type this build does not know to the
    /// stored records document, the way a newer build would have written it.
    pub fn insert_unknown_condition_record(&self, id: &str) {
        let key = DocumentKey::new("config", "records");
        let mut inner = self.lock();
        let mut records: Vec<serde_json::Value> = inner
            .documents
            .get(&key)
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();
        records.push(serde_json::json!({
            "id": id,
            "name": format!("Newer {id}"),
            "valueKind": "percentage",
            "value": 10.0,
            "conditions": [
                { "id": "c-colour", "type": "cartColour", "operator": "equals", "value": "red" }
            ],
            "createdAt": "2026-05-01T00:00:00Z",
        }));
        inner
            .documents
            .insert(key, serde_json::Value::Array(records).to_string());
    }

    // ========================================================================
    // Failure injection
    // ========================================================================

    /// Fail the next call of `op` with `error`.
    pub fn fail_next(&self, op: Op, error: StoreError) {
        self.fail_nth(op, 1, error);
    }

    /// Fail the `nth` upcoming call (1-based) of `op` with `error`.
    pub fn fail_nth(&self, op: Op, nth: usize, error: StoreError) {
        self.lock().armed.push(ArmedFailure {
            op,
            remaining: nth.max(1),
            error,
        });
    }

    /// Make every existence check of `id` fail with `error`.
    pub fn fail_lookup(&self, id: &RemoteRef, error: StoreError) {
        self.lock().lookup_failures.insert(id.clone(), error);
    }

    /// Delay every existence check by `delay`.
    pub fn delay_lookups(&self, delay: Duration) {
        self.lock().lookup_delay = Some(delay);
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of calls made of `op`.
    #[must_use]
    pub fn count(&self, op: Op) -> usize {
        self.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Sizes of every `set_documents` batch, in order.
    #[must_use]
    pub fn set_batch_sizes(&self) -> Vec<usize> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::SetDocuments(keys) => Some(keys.len()),
                _ => None,
            })
            .collect()
    }

    /// IDs passed to `delete_object`, in order.
    #[must_use]
    pub fn deleted_objects(&self) -> Vec<RemoteRef> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::DeleteObject(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Current remote objects.
    #[must_use]
    pub fn objects(&self) -> Vec<RemoteObjectRef> {
        self.lock().objects.clone()
    }

    /// Whether `id` exists remotely.
    #[must_use]
    pub fn has_object(&self, id: &RemoteRef) -> bool {
        self.lock().objects.iter().any(|o| &o.id == id)
    }

    /// Stored value of a document field.
    #[must_use]
    pub fn document(&self, namespace: &str, key: &str) -> Option<String> {
        self.lock()
            .documents
            .get(&DocumentKey::new(namespace, key))
            .cloned()
    }

    /// Keys stored under `namespace`.
    #[must_use]
    pub fn document_keys(&self, namespace: &str) -> Vec<String> {
        self.lock()
            .documents
            .keys()
            .filter(|k| k.namespace == namespace)
            .map(|k| k.key.clone())
            .collect()
    }

    /// Record `call` and return the armed failure it triggers, if any.
    fn enter(&self, call: Call) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let op = call.op();
        inner.calls.push(call);

        let mut triggered = None;
        for (index, armed) in inner.armed.iter_mut().enumerate() {
            if armed.op == op {
                armed.remaining -= 1;
                if armed.remaining == 0 && triggered.is_none() {
                    triggered = Some(index);
                }
            }
        }
        match triggered {
            Some(index) => Err(inner.armed.remove(index).error),
            None => Ok(()),
        }
    }
}

/// An app discount attributed to [`APP_HANDLE`].
#[must_use]
pub fn app_object(id: RemoteRef, title: &str, method: DiscountMethod) -> RemoteObjectRef {
    RemoteObjectRef {
        id,
        title: title.to_string(),
        status: RemoteStatus::Active,
        method,
        kind: RemoteObjectKind::App {
            metadata: Some(AppMetadata {
                handle: Some(APP_HANDLE.to_string()),
                ..Default::default()
            }),
        },
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list_remote_objects(&self) -> Result<Vec<RemoteObjectRef>, StoreError> {
        self.enter(Call::ListRemoteObjects)?;
        Ok(self.objects())
    }

    async fn get_remote_object(
        &self,
        id: &RemoteRef,
    ) -> Result<Option<RemoteObjectRef>, StoreError> {
        self.enter(Call::GetRemoteObject(id.clone()))?;
        let delay = self.lock().lookup_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let inner = self.lock();
        if let Some(error) = inner.lookup_failures.get(id) {
            return Err(error.clone());
        }
        Ok(inner.objects.iter().find(|o| &o.id == id).cloned())
    }

    async fn create_object(&self, spec: &RemoteObjectSpec) -> Result<RemoteRef, StoreError> {
        self.enter(Call::CreateObject(spec.title.clone()))?;
        let mut inner = self.lock();
        inner.next_id += 1;
        let node = match spec.method {
            DiscountMethod::Automatic => "DiscountAutomaticNode",
            DiscountMethod::Code => "DiscountCodeNode",
        };
        let id = RemoteRef::new(format!("gid://shopify/{node}/{}", inner.next_id));
        inner
            .objects
            .push(app_object(id.clone(), &spec.title, spec.method));
        Ok(id)
    }

    async fn delete_object(&self, id: &RemoteRef) -> Result<(), StoreError> {
        self.enter(Call::DeleteObject(id.clone()))?;
        let mut inner = self.lock();
        let before = inner.objects.len();
        inner.objects.retain(|o| &o.id != id);
        if inner.objects.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn get_document(&self, key: &DocumentKey) -> Result<Option<String>, StoreError> {
        self.enter(Call::GetDocument(key.clone()))?;
        Ok(self.lock().documents.get(key).cloned())
    }

    async fn list_documents(
        &self,
        namespace: &str,
    ) -> Result<Vec<(DocumentKey, String)>, StoreError> {
        self.enter(Call::ListDocuments(namespace.to_string()))?;
        Ok(self
            .lock()
            .documents
            .iter()
            .filter(|(k, _)| k.namespace == namespace)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn set_documents(&self, writes: &[DocumentWrite]) -> Result<(), StoreError> {
        self.enter(Call::SetDocuments(
            writes.iter().map(|w| w.key.clone()).collect(),
        ))?;
        if writes.len() > MAX_ITEMS_PER_CALL {
            return Err(StoreError::Rejected(format!(
                "{} metafields exceeds the limit of {MAX_ITEMS_PER_CALL}",
                writes.len()
            )));
        }
        if let Some(blank) = writes.iter().find(|w| w.value.trim().is_empty()) {
            return Err(StoreError::Rejected(format!("{} has a blank value", blank.key)));
        }

        let mut inner = self.lock();
        for write in writes {
            inner
                .documents
                .insert(write.key.clone(), write.value.clone());
        }
        Ok(())
    }

    async fn delete_documents(&self, keys: &[DocumentKey]) -> Result<(), StoreError> {
        self.enter(Call::DeleteDocuments(keys.to_vec()))?;
        let mut inner = self.lock();
        for key in keys {
            inner.documents.remove(key);
        }
        Ok(())
    }
}

/// Sync settings for tests: default namespaces, short timeout.
#[must_use]
pub fn test_config() -> SyncConfig {
    SyncConfig {
        request_timeout: Duration::from_millis(200),
        ..SyncConfig::default()
    }
}

/// Policy for [`APP_HANDLE`] with heuristics on.
#[must_use]
pub fn test_policy() -> OwnershipPolicy {
    OwnershipPolicy::new(APP_HANDLE)
}

/// A fresh store and an engine over it.
#[must_use]
pub fn engine_with(config: SyncConfig) -> (Arc<MemoryStore>, SyncEngine<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = SyncEngine::with_policy(
        Arc::clone(&store),
        config,
        test_policy(),
        Some("fn-tiered".to_string()),
    );
    (store, engine)
}

/// A fresh store and an engine with [`test_config`].
#[must_use]
pub fn engine() -> (Arc<MemoryStore>, SyncEngine<MemoryStore>) {
    engine_with(test_config())
}

/// Admin configuration for in-process HTTP tests. Never loaded from the
/// environment.
#[must_use]
pub fn test_admin_config() -> AdminConfig {
    AdminConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3001,
        shopify: ShopifyAdminConfig {
            store: "test-store".to_string(),
            api_version: "2026-01".to_string(),
            access_token: SecretString::from("shpat_in_memory_only".to_string()),
        },
        app: AppIdentityConfig {
            handle: APP_HANDLE.to_string(),
            title: None,
            function_id: Some("fn-tiered".to_string()),
            heuristic_ownership: true,
        },
        sync: test_config(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 1.0,
    }
}

/// A fresh store and HTTP state over it.
#[must_use]
pub fn app_state() -> (Arc<MemoryStore>, AppState) {
    let store = Arc::new(MemoryStore::new());
    let remote: Arc<dyn RemoteStore> = store.clone();
    (store, AppState::new(test_admin_config(), remote))
}
