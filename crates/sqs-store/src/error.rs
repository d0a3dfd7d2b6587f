use sqs_types::{StoreId, StreamId};

/// Errors from stream tree operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A stream with this id already exists in the store.
    #[error("duplicate stream id: {0}")]
    DuplicateStream(StreamId),

    /// A stream references a parent that is not in the store.
    #[error("parent {parent} of stream {id} not found")]
    MissingParent { id: StreamId, parent: StreamId },

    /// Following parent links came back to an already visited stream.
    #[error("cycle detected at stream {0}")]
    Cycle(StreamId),

    /// The wildcard is not a valid stream id.
    #[error("reserved stream id: {0}")]
    ReservedId(StreamId),

    /// A store with this id is already registered.
    #[error("store already registered: {0}")]
    DuplicateStore(StoreId),

    /// The backend could not answer (network, I/O, shutdown...).
    #[error("store {store} unavailable: {reason}")]
    Unavailable { store: StoreId, reason: String },

    /// An internal lock was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
