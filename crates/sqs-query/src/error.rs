use thiserror::Error;

/// Errors raised while normalizing or validating a streams query.
///
/// Every variant except [`QueryError::Config`] is a request structure
/// error: the caller sent something malformed and retrying cannot help.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// The parameter looked like JSON but did not parse.
    #[error("error in \"{param}\" parameter: malformed JSON: {message}")]
    MalformedJson { param: String, message: String },

    /// Plain stream ids and structured queries were sent together.
    #[error("error in \"{param}\" parameter: streams queries and stream ids cannot be mixed")]
    MixedForms { param: String },

    /// A value has the wrong shape (not an object, not an array, ...).
    #[error("error in \"{param}\" parameter: {reason}")]
    InvalidValue { param: String, reason: String },

    /// A clause violates the query schema.
    #[error("error in \"{param}\" parameter: streams query {clause}: {reason}")]
    InvalidClause {
        param: String,
        clause: String,
        reason: String,
    },

    /// A stream id contains forbidden characters or marker combinations.
    #[error("error in \"{param}\" parameter: invalid stream id {id:?}: {reason}")]
    InvalidStreamId {
        param: String,
        id: String,
        reason: String,
    },

    /// A clause references streams from two different stores.
    #[error(
        "error in \"{param}\" parameter: streams query {clause} must be grouped by store, \
         found {first:?} and {second:?}"
    )]
    MixedStores {
        param: String,
        clause: String,
        first: String,
        second: String,
    },

    /// The id conventions are inconsistent.
    #[error("invalid id conventions: {0}")]
    Config(String),
}

impl QueryError {
    /// Whether this error describes a malformed request.
    pub fn is_structure_error(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}

/// Result alias for query normalization and validation.
pub type QueryResult<T> = Result<T, QueryError>;
