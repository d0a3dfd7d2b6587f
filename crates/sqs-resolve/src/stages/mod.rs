//! The resolution stages that follow query validation, in pipeline order.

pub mod algebra;
pub mod compile;
pub mod expand;
pub mod permissions;

pub use algebra::reduce_clauses;
pub use compile::{compile_all, compile_for_store, compile_predicate, StreamPredicate};
pub use expand::{expand_clauses, ExpandedClause};
pub use permissions::resolve_permissions;
