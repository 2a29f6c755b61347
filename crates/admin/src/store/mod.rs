//! Remote store interface consumed by the sync pipeline.
//!
//! The remote platform stores two kinds of things this crate cares about:
//! discount objects (which it executes) and documents (namespaced key/value
//! fields, Shopify metafields in production). [`RemoteStore`] is the seam
//! between the pipeline and the platform: [`crate::shopify::AdminClient`]
//! implements it against the Admin API, and tests implement it in memory.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use discount_sync_core::{RemoteObjectRef, RemoteObjectSpec, RemoteRef};

/// Errors returned by a [`RemoteStore`].
///
/// Only [`StoreError::NotFound`] means the remote confirmed something is
/// absent. Everything else leaves existence unknown.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The remote confirmed the object does not exist (or the ID is invalid).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network or server failure; the call may succeed if retried.
    #[error("Transient error: {0}")]
    Transient(String),

    /// Rate limited by the platform.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The call did not complete before its deadline.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Credentials were rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The platform rejected the request (validation or query errors).
    #[error("Rejected: {0}")]
    Rejected(String),

    /// A response could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether the remote definitively reported the object as absent.
    #[must_use]
    pub const fn is_confirmed_absent(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether a retry at a higher layer may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transient(_) | Self::RateLimited(_) | Self::Timeout(_)
        )
    }
}

/// Address of a document field in the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentKey {
    /// Namespace grouping related fields.
    pub namespace: String,
    /// Key within the namespace.
    pub key: String,
}

impl DocumentKey {
    /// Create a key.
    #[must_use]
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.namespace, self.key)
    }
}

/// Value type of a stored document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// JSON document.
    Json,
    /// Single line of text.
    SingleLineTextField,
}

impl DocumentType {
    /// Platform type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::SingleLineTextField => "single_line_text_field",
        }
    }
}

/// A single document field write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentWrite {
    /// Field address.
    pub key: DocumentKey,
    /// Serialized value; never blank.
    pub value: String,
    /// Value type.
    pub value_type: DocumentType,
}

/// Operations the sync pipeline needs from the remote platform.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List every discount object in the registry, following pagination.
    async fn list_remote_objects(&self) -> Result<Vec<RemoteObjectRef>, StoreError>;

    /// Look up one discount object.
    ///
    /// `Ok(None)` and `Err(StoreError::NotFound(_))` both mean the remote
    /// confirmed the object is absent.
    async fn get_remote_object(
        &self,
        id: &RemoteRef,
    ) -> Result<Option<RemoteObjectRef>, StoreError>;

    /// Create a discount object, returning its ID.
    async fn create_object(&self, spec: &RemoteObjectSpec) -> Result<RemoteRef, StoreError>;

    /// Delete a discount object.
    async fn delete_object(&self, id: &RemoteRef) -> Result<(), StoreError>;

    /// Read one document field.
    async fn get_document(&self, key: &DocumentKey) -> Result<Option<String>, StoreError>;

    /// Read every field in `namespace`.
    async fn list_documents(
        &self,
        namespace: &str,
    ) -> Result<Vec<(DocumentKey, String)>, StoreError>;

    /// Write fields in one call. Callers keep `writes` within the platform's
    /// per-call item ceiling.
    async fn set_documents(&self, writes: &[DocumentWrite]) -> Result<(), StoreError>;

    /// Delete fields in one call, under the same ceiling.
    async fn delete_documents(&self, keys: &[DocumentKey]) -> Result<(), StoreError>;
}

/// Run a store call under a deadline; an elapsed deadline is a
/// [`StoreError::Timeout`].
///
/// # Errors
///
/// Returns the call's own error, or `Timeout` if it did not finish in time.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(deadline, call)
        .await
        .map_err(|_| StoreError::Timeout(deadline))?
}
