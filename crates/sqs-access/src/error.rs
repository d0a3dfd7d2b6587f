//! Error types for permission evaluation.

use sqs_store::StoreError;
use sqs_types::StreamId;
use thiserror::Error;

/// Errors that can occur while evaluating an access's permissions.
#[derive(Debug, Error)]
pub enum AccessError {
    /// A permission entry or forced stream id cannot be used.
    #[error("invalid permission entry {id}: {reason}")]
    InvalidEntry { id: StreamId, reason: String },

    /// Two permission entries target the same stream.
    #[error("duplicate permission entry for stream {0}")]
    DuplicateEntry(StreamId),

    /// The stream tree could not answer an ancestry query.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result alias for access operations.
pub type AccessResult<T> = Result<T, AccessError>;
