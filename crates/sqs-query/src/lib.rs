//! Streams query normalization and validation for Stream Query Scope.
//!
//! A read request names the streams it wants through a `streams` parameter
//! that arrives in many shapes: nothing at all, a single id, a list of ids,
//! JSON text, or structured `{any, all, not}` clauses. This crate turns that
//! parameter into validated [`QueryClause`](sqs_types::QueryClause)s, each
//! bound to exactly one store.
//!
//! # Stages
//!
//! 1. [`normalize`]: canonicalizes legacy shorthand into raw clauses
//! 2. [`validate_and_partition`]: checks clause shape and ids, splits off
//!    store prefixes and tags every clause with its store
//!
//! Both stages are pure: they never mutate their input and either return a
//! complete result or a [`QueryError`].
//!
//! # Id conventions
//!
//! Store prefixes, the do-not-expand marker and legacy prefixes are not
//! hard-coded: they come from an [`IdConventions`] value validated at
//! construction.

pub mod conventions;
pub mod error;
pub mod legacy;
pub mod normalize;
pub mod validate;

pub use conventions::{IdConventions, IdConventionsBuilder};
pub use error::{QueryError, QueryResult};
pub use legacy::LegacyPrefixes;
pub use normalize::{normalize, RawClause, StreamsParam};
pub use validate::validate_and_partition;
