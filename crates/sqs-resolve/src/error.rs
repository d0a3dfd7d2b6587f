use std::time::Duration;

use sqs_access::AccessError;
use sqs_query::QueryError;
use sqs_store::StoreError;
use sqs_types::StreamId;

/// Errors that abort the resolution of a streams query.
///
/// Every variant is terminal for the request: no partially resolved query
/// is ever returned alongside an error.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The query is malformed.
    #[error(transparent)]
    Structure(#[from] QueryError),

    /// One or more referenced streams do not exist (full ids, request order).
    #[error("unknown referenced streams: {}", join(.0))]
    UnknownStreams(Vec<StreamId>),

    /// The caller may not read this stream (full id).
    #[error("forbidden: no read permission on stream {0}")]
    Forbidden(StreamId),

    /// The stream tree failed to answer.
    #[error("stream lookup failed: {0}")]
    Backend(#[from] StoreError),

    /// The caller's permissions could not be evaluated.
    #[error("permission evaluation failed: {0}")]
    Access(#[from] AccessError),

    /// Resolution did not finish in time.
    #[error("streams query resolution timed out after {0:?}")]
    Timeout(Duration),
}

fn join(ids: &[StreamId]) -> String {
    ids.iter()
        .map(StreamId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ResolveError {
    /// Stable error id for client-visible responses.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Structure(e) if e.is_structure_error() => "invalid-request-structure",
            Self::Structure(_) => "unexpected-error",
            Self::UnknownStreams(_) => "unknown-referenced-resource",
            Self::Forbidden(_) => "forbidden",
            Self::Backend(_) | Self::Access(_) => "unexpected-error",
            Self::Timeout(_) => "timeout",
        }
    }

    /// Whether the caller is at fault (as opposed to the server or a backend).
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Structure(e) => e.is_structure_error(),
            Self::UnknownStreams(_) | Self::Forbidden(_) => true,
            Self::Backend(_) | Self::Access(_) | Self::Timeout(_) => false,
        }
    }
}

/// Result alias for resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use sqs_types::StoreId;

    use super::*;

    #[test]
    fn error_ids() {
        let structure = ResolveError::from(QueryError::MixedForms {
            param: "streams".into(),
        });
        assert_eq!(structure.id(), "invalid-request-structure");
        assert!(structure.is_client_error());

        let config = ResolveError::from(QueryError::Config("bad".into()));
        assert_eq!(config.id(), "unexpected-error");
        assert!(!config.is_client_error());

        let unknown = ResolveError::UnknownStreams(vec!["ghost".into(), ":dummy:x".into()]);
        assert_eq!(unknown.id(), "unknown-referenced-resource");
        assert_eq!(unknown.to_string(), "unknown referenced streams: ghost, :dummy:x");

        assert_eq!(ResolveError::Forbidden("work".into()).id(), "forbidden");

        let backend = ResolveError::from(StoreError::Unavailable {
            store: StoreId::from("dummy"),
            reason: "connection refused".into(),
        });
        assert_eq!(backend.id(), "unexpected-error");
        assert!(!backend.is_client_error());

        let timeout = ResolveError::Timeout(Duration::from_millis(5));
        assert_eq!(timeout.id(), "timeout");
    }
}
