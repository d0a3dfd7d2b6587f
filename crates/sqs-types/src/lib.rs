//! Foundation types for Stream Query Scope (SQS).
//!
//! This crate provides the identifiers, permission model and query shapes
//! shared by every stage of the stream query pipeline. Every other SQS crate
//! depends on `sqs-types`.
//!
//! # Key Types
//!
//! - [`StreamId`]: Opaque stream identifier, local to one store
//! - [`StoreId`]: Identifier of the storage backend owning a stream forest
//! - [`Stream`]: A node of a per-store stream forest
//! - [`PermissionEntry`] / [`PermissionLevel`]: Grants held by an access
//! - [`QueryClause`]: One validated `any`/`all`/`not` clause tagged with its store
//! - [`ResolvedQuery`]: The normalized, backend-ready form of a streams query

pub mod error;
pub mod permission;
pub mod query;
pub mod stream;

pub use error::TypeError;
pub use permission::{PermissionEntry, PermissionLevel};
pub use query::{AnyIds, ClauseBranch, QueryClause, ResolvedClause, ResolvedQuery};
pub use stream::{StoreId, Stream, StreamId, StreamState};
