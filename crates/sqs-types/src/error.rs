use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid permission level: {0}")]
    InvalidPermissionLevel(String),

    #[error("invalid stream state: {0}")]
    InvalidStreamState(String),
}
