//! Permission-scoped streams query resolution for Stream Query Scope.
//!
//! Every read request names the streams it wants and carries an access
//! whose permissions bound what it may see. [`StreamQueryResolver`] turns
//! both into the exact set of stream ids to query, before any storage
//! backend is touched.
//!
//! # Pipeline
//!
//! | Stage        | Function                                   | Output              |
//! |--------------|--------------------------------------------|---------------------|
//! | normalize    | [`sqs_query::normalize`]                   | raw clauses         |
//! | validate     | [`sqs_query::validate_and_partition`]      | store-bound clauses |
//! | permissions  | [`resolve_permissions`]                    | authorized clauses  |
//! | expand       | [`expand_clauses`]                         | expanded id sets    |
//! | algebra      | [`reduce_clauses`]                         | [`ResolvedQuery`]   |
//!
//! Backends then compile the resolved query with [`compile_predicate`],
//! [`compile_for_store`] or [`compile_all`].
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use sqs_access::{Access, AccessLogic};
//! use sqs_resolve::{ResolveRequest, ResolverConfig, StreamQueryResolver};
//! use sqs_store::{DescendantLookup, InMemoryStreamTree, StoreRegistry};
//! use sqs_types::{PermissionLevel, Stream};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let tree = InMemoryStreamTree::from_streams(vec![
//!     Stream::root("work"),
//!     Stream::child("meetings", "work"),
//!     Stream::root("home"),
//! ])
//! .unwrap();
//! let lookup: Arc<dyn DescendantLookup> =
//!     Arc::new(StoreRegistry::new().with_store("local", Arc::new(tree)).unwrap());
//!
//! let config = ResolverConfig::default();
//! let access = Access::app("app").grant("work", PermissionLevel::Read);
//! let caller = AccessLogic::new(access, &config.conventions, lookup.clone()).unwrap();
//! let resolver = StreamQueryResolver::new(config, lookup).unwrap();
//!
//! let report = resolver
//!     .resolve(&ResolveRequest::new(Some(json!({"any": ["*"]}))), &caller)
//!     .await
//!     .unwrap();
//! assert_eq!(report.query.stream_ids().len(), 2);
//! # }
//! ```
//!
//! [`ResolvedQuery`]: sqs_types::ResolvedQuery

pub mod config;
pub mod error;
pub mod resolver;
pub mod stages;

pub use config::ResolverConfig;
pub use error::{ResolveError, ResolveResult};
pub use resolver::{ResolveReport, ResolveRequest, StageTiming, StreamQueryResolver};
pub use stages::{
    compile_all, compile_for_store, compile_predicate, expand_clauses, reduce_clauses,
    resolve_permissions, ExpandedClause, StreamPredicate,
};
