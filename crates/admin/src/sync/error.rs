//! Sync pipeline errors.

use thiserror::Error;

use discount_sync_core::{RecordError, RecordId};

use crate::store::{DocumentKey, StoreError};

/// Errors from migration, reconciliation, persistence and record lifecycle.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote call failed.
    #[error("Remote store error: {0}")]
    Store(#[from] StoreError),

    /// A record violates its invariants.
    #[error("Invalid record: {0}")]
    Record(#[from] RecordError),

    /// A stored document could not be decoded.
    #[error("Stored document {key} is corrupt: {message}")]
    Corrupt { key: DocumentKey, message: String },

    /// A document could not be encoded.
    #[error("Failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),

    /// A chunked write stopped part way. Chunks before `chunk` stay applied.
    #[error("Write chunk {chunk} of {total} failed after {applied} applied: {source}")]
    PartialBatch {
        /// 1-based index of the failed chunk.
        chunk: usize,
        /// Number of chunks in the plan.
        total: usize,
        /// Chunks applied before the failure.
        applied: usize,
        #[source]
        source: StoreError,
    },

    /// The operation is already running.
    #[error("A {0} is already in progress")]
    Busy(&'static str),

    /// No record with this ID exists locally.
    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    /// Another record already uses this name.
    #[error("A record named '{0}' already exists")]
    DuplicateName(String),
}

impl SyncError {
    /// Whether retrying the whole operation later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) | Self::PartialBatch { source: e, .. } => e.is_transient(),
            Self::Busy(_) => true,
            _ => false,
        }
    }
}
