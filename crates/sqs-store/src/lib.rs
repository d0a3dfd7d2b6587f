//! Stream tree backends for Stream Query Scope.
//!
//! Every store owns a forest of streams. The query pipeline never mutates
//! that forest: it only asks a store whether a stream exists, which
//! ancestors it has, and which streams lie below it.
//!
//! # Backends
//!
//! All backends implement the [`StreamTree`] trait:
//!
//! - [`InMemoryStreamTree`] -- `HashMap`-based forest for tests and embedding
//!
//! [`StoreRegistry`] routes calls to the right backend by [`StoreId`] and
//! implements [`DescendantLookup`], the capability the resolver is handed.
//!
//! # Rules
//!
//! 1. Absence is not emptiness: lookups return `Ok(None)` for a missing
//!    stream and `Ok(Some(vec![]))` for a stream pruned away entirely.
//! 2. Expansion prunes whole subtrees: an excluded or hidden stream takes
//!    its descendants with it.
//! 3. Lookups are idempotent and side-effect free for a given snapshot.
//! 4. Backend failures are propagated, never turned into empty results.
//!
//! [`StoreId`]: sqs_types::StoreId

pub mod error;
pub mod memory;
pub mod registry;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStreamTree;
pub use registry::StoreRegistry;
pub use traits::{DescendantLookup, StreamTree};
