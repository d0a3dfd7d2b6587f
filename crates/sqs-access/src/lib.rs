//! Caller permissions for Stream Query Scope.
//!
//! An [`Access`] is an already-authenticated credential: a set of
//! [`PermissionEntry`](sqs_types::PermissionEntry)s plus streams a store
//! forces into every read. [`AccessLogic`] answers the questions the
//! resolver asks about it through the [`CallerPermissions`] trait:
//!
//! - does the caller read everything in a store?
//! - may it read this particular stream?
//! - which roots, forced streams and forbidden streams apply to a store?
//!
//! Stream-level decisions walk the stream's ancestors: the nearest one
//! carrying an explicit entry decides, and a store-wide entry applies when
//! none does.

pub mod access;
pub mod error;
pub mod logic;

pub use access::{Access, AccessKind};
pub use error::{AccessError, AccessResult};
pub use logic::{AccessLogic, CallerPermissions};
