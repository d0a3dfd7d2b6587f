//! Permission resolution: wildcard replacement, reference checks, forced
//! and forbidden stream injection.

use sqs_access::CallerPermissions;
use sqs_query::IdConventions;
use sqs_store::DescendantLookup;
use sqs_types::{AnyIds, QueryClause, StoreId, StreamId};

use crate::error::{ResolveError, ResolveResult};

/// Ids that failed the reference checks, across all clauses of a request.
#[derive(Debug, Default)]
struct Offenders {
    forbidden: Option<StreamId>,
    unknown: Vec<StreamId>,
}

impl Offenders {
    fn unknown(&mut self, id: StreamId) {
        if !self.unknown.contains(&id) {
            self.unknown.push(id);
        }
    }

    fn forbidden(&mut self, id: StreamId) {
        self.forbidden.get_or_insert(id);
    }

    /// Forbidden wins over unknown references.
    fn into_result(self) -> ResolveResult<()> {
        if let Some(id) = self.forbidden {
            tracing::warn!(stream = %id, "streams query rejected: forbidden stream");
            return Err(ResolveError::Forbidden(id));
        }
        if !self.unknown.is_empty() {
            tracing::warn!(count = self.unknown.len(), "streams query rejected: unknown streams");
            return Err(ResolveError::UnknownStreams(self.unknown));
        }
        Ok(())
    }
}

/// Resolve the caller's permissions into every clause.
///
/// - A wildcard `any` is kept when the caller reads the whole store and is
///   otherwise replaced by the caller's existing readable roots.
/// - Concrete `any` and `all` ids must exist and be readable. The first
///   unreadable id fails the request with [`ResolveError::Forbidden`];
///   otherwise all missing ids fail it with [`ResolveError::UnknownStreams`].
/// - Forced streams go to `forced`, forbidden streams are appended to `not`.
///   Neither is checked: both come from the access itself.
pub async fn resolve_permissions(
    clauses: Vec<QueryClause>,
    caller: &dyn CallerPermissions,
    lookup: &dyn DescendantLookup,
    conventions: &IdConventions,
) -> ResolveResult<Vec<QueryClause>> {
    let mut offenders = Offenders::default();
    let mut resolved = Vec::with_capacity(clauses.len());
    tracing::debug!(
        clauses = clauses.len(),
        entries = caller.permissions().len(),
        "resolving permissions"
    );

    for mut clause in clauses {
        let store = clause.store_id.clone();

        if clause.is_wildcard() && !caller.has_blanket_read(&store).await? {
            let roots = existing_roots(&store, caller, lookup).await?;
            tracing::debug!(
                store = %store,
                roots = roots.len(),
                "wildcard replaced by readable roots"
            );
            clause.any = Some(AnyIds::Ids(roots));
        }

        let referenced = clause.any_ids().iter().chain(clause.all.iter());
        for id in referenced {
            let local = conventions.strip_marker(id);
            let full = StreamId::from(conventions.full_id(&store, &local));
            if lookup.find(&local, &store).await?.is_none() {
                offenders.unknown(full);
            } else if !caller.can_read_stream(&local, &store).await? {
                offenders.forbidden(full);
            }
        }

        for forced in caller.forced_stream_ids(&store).await? {
            if !clause.all.contains(&forced) && !clause.forced.contains(&forced) {
                clause.forced.push(forced);
            }
        }
        for forbidden in caller.forbidden_stream_ids(&store).await? {
            if !clause.not.contains(&forbidden) {
                clause.not.push(forbidden);
            }
        }
        resolved.push(clause);
    }

    offenders.into_result()?;
    Ok(resolved)
}

/// Readable roots of the caller that exist in the store. Stale grants on
/// deleted streams are skipped.
async fn existing_roots(
    store: &StoreId,
    caller: &dyn CallerPermissions,
    lookup: &dyn DescendantLookup,
) -> ResolveResult<Vec<StreamId>> {
    let mut roots = Vec::new();
    for id in caller.readable_root_ids(store).await? {
        if lookup.find(&id, store).await?.is_some() {
            roots.push(id);
        } else {
            tracing::debug!(store = %store, stream = %id, "readable root not found, skipped");
        }
    }
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sqs_access::{Access, AccessLogic};
    use sqs_store::{InMemoryStreamTree, StoreRegistry};
    use sqs_types::{PermissionLevel, Stream};

    use super::*;

    fn ids(list: &[&str]) -> Vec<StreamId> {
        list.iter().map(|s| StreamId::from(*s)).collect()
    }

    /// local: work ── meetings, home, private
    /// dummy: x
    fn registry() -> Arc<StoreRegistry> {
        let local = InMemoryStreamTree::from_streams(vec![
            Stream::root("work"),
            Stream::child("meetings", "work"),
            Stream::root("home"),
            Stream::root("private"),
        ])
        .unwrap();
        let dummy = InMemoryStreamTree::from_streams(vec![Stream::root("x")]).unwrap();
        Arc::new(
            StoreRegistry::new()
                .with_store("local", Arc::new(local))
                .unwrap()
                .with_store("dummy", Arc::new(dummy))
                .unwrap(),
        )
    }

    async fn run(access: Access, clauses: Vec<QueryClause>) -> ResolveResult<Vec<QueryClause>> {
        let conventions = IdConventions::default();
        let lookup = registry();
        let caller = AccessLogic::new(access, &conventions, lookup.clone()).unwrap();
        resolve_permissions(clauses, &caller, lookup.as_ref(), &conventions).await
    }

    // -----------------------------------------------------------------------
    // 1. Wildcard kept under a blanket grant
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn wildcard_kept_for_blanket_read() {
        let out = run(Access::personal("me"), vec![QueryClause::wildcard("local")])
            .await
            .unwrap();
        assert!(out[0].is_wildcard());
    }

    // -----------------------------------------------------------------------
    // 2. Wildcard replaced by readable roots
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn wildcard_replaced_by_roots() {
        let access = Access::app("a")
            .grant("work", PermissionLevel::Read)
            .grant("deleted", PermissionLevel::Read)
            .grant("home", PermissionLevel::CreateOnly);
        let out = run(access, vec![QueryClause::wildcard("local")]).await.unwrap();
        assert_eq!(out[0].any, Some(AnyIds::Ids(ids(&["work"]))));
        assert_eq!(out[0].not, ids(&["home"]));
    }

    #[tokio::test]
    async fn wildcard_without_grants_becomes_empty() {
        let access = Access::app("a").grant("work", PermissionLevel::Read);
        let out = run(access, vec![QueryClause::wildcard("dummy")]).await.unwrap();
        assert_eq!(out[0].any, Some(AnyIds::Ids(Vec::new())));
    }

    // -----------------------------------------------------------------------
    // 3. Reference checks
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn unknown_ids_are_batched() {
        let access = Access::app("a").grant("*", PermissionLevel::Read);
        let clauses = vec![
            QueryClause::any("local", ids(&["ghost", "work", "#phantom"])),
            QueryClause::any("dummy", ids(&["nope"])),
            QueryClause::any("local", ids(&["ghost"])),
        ];
        let err = run(access, clauses).await.unwrap_err();
        match err {
            ResolveError::UnknownStreams(list) => {
                assert_eq!(list, ids(&["ghost", "phantom", ":dummy:nope"]))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn forbidden_reports_first_offender() {
        let access = Access::app("a").grant("work", PermissionLevel::Read);
        let clauses = vec![QueryClause::any("local", ids(&["work", "home", "private"]))];
        let err = run(access, clauses).await.unwrap_err();
        assert!(matches!(err, ResolveError::Forbidden(ref id) if id.as_str() == "home"));
    }

    #[tokio::test]
    async fn forbidden_takes_priority_over_unknown() {
        let access = Access::app("a").grant("work", PermissionLevel::Read);
        let clauses = vec![
            QueryClause::any("local", ids(&["ghost"])),
            QueryClause::any("local", ids(&["home"])),
        ];
        let err = run(access, clauses).await.unwrap_err();
        assert_eq!(err.id(), "forbidden");
    }

    #[tokio::test]
    async fn create_only_grant_is_forbidden() {
        let access = Access::app("a").grant("home", PermissionLevel::CreateOnly);
        let err = run(access, vec![QueryClause::any("local", ids(&["home"]))])
            .await
            .unwrap_err();
        assert_eq!(err.id(), "forbidden");
    }

    #[tokio::test]
    async fn all_ids_are_checked() {
        let access = Access::app("a").grant("work", PermissionLevel::Read);
        let clause = QueryClause {
            store_id: StoreId::from("local"),
            any: None,
            all: ids(&["work", "home"]),
            not: Vec::new(),
            forced: Vec::new(),
        };
        let err = run(access, vec![clause]).await.unwrap_err();
        assert_eq!(err.id(), "forbidden");
    }

    #[tokio::test]
    async fn not_ids_are_not_checked() {
        let access = Access::app("a").grant("work", PermissionLevel::Read);
        let clause = QueryClause {
            not: ids(&["ghost", "home"]),
            ..QueryClause::any("local", ids(&["work"]))
        };
        let out = run(access, vec![clause]).await.unwrap();
        assert_eq!(out[0].not, ids(&["ghost", "home"]));
    }

    // -----------------------------------------------------------------------
    // 4. Forced and forbidden injection
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn forced_and_forbidden_are_injected() {
        let access = Access::app("a")
            .grant("*", PermissionLevel::Read)
            .grant("private", PermissionLevel::None)
            .force("work")
            .force(":dummy:x");
        let clause = QueryClause {
            not: ids(&["private"]),
            ..QueryClause::any("local", ids(&["home"]))
        };
        let out = run(access, vec![clause]).await.unwrap();
        assert!(out[0].all.is_empty());
        assert_eq!(out[0].forced, ids(&["work"]));
        assert_eq!(out[0].not, ids(&["private"]));
        assert_eq!(out[0].any, Some(AnyIds::Ids(ids(&["home"]))));
    }
}
