//! Tree expansion: every referenced stream becomes itself plus its
//! descendants.

use std::collections::HashSet;

use serde::Serialize;
use sqs_query::IdConventions;
use sqs_store::DescendantLookup;
use sqs_types::{AnyIds, QueryClause, StoreId, StreamId, StreamState};

use crate::error::{ResolveError, ResolveResult};

/// A clause after expansion, before the set algebra is applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedClause {
    pub store_id: StoreId,
    /// Expanded `any`, `None` when the clause had no `any`.
    pub any: Option<Vec<StreamId>>,
    /// One expanded set per `all` element, in request order.
    pub all: Vec<Vec<StreamId>>,
    /// Expanded `not`.
    pub not: Vec<StreamId>,
    /// One expanded set per forced stream of the access.
    pub forced: Vec<Vec<StreamId>>,
}

/// Insertion-ordered set union.
#[derive(Debug, Default)]
struct Union {
    seen: HashSet<StreamId>,
    ids: Vec<StreamId>,
}

impl Union {
    fn extend(&mut self, ids: impl IntoIterator<Item = StreamId>) {
        for id in ids {
            if self.seen.insert(id.clone()) {
                self.ids.push(id);
            }
        }
    }

    fn into_vec(self) -> Vec<StreamId> {
        self.ids
    }
}

/// Expands the clauses of one request against a descendant lookup.
struct Expander<'a> {
    lookup: &'a dyn DescendantLookup,
    conventions: &'a IdConventions,
    state: StreamState,
    missing: Vec<StreamId>,
}

impl Expander<'_> {
    /// Expand seeds that must exist. Missing seeds are recorded.
    async fn expand_included(
        &mut self,
        store: &StoreId,
        seeds: &[StreamId],
        excluded: &[StreamId],
    ) -> ResolveResult<Vec<StreamId>> {
        let mut union = Union::default();
        for seed in seeds {
            if self.conventions.is_no_expand(seed) {
                union.extend([self.conventions.strip_marker(seed)]);
                continue;
            }
            match self.lookup.expand(seed, store, excluded, self.state).await? {
                Some(ids) => {
                    tracing::trace!(
                        store = %store,
                        seed = %seed,
                        count = ids.len(),
                        "seed expanded"
                    );
                    union.extend(ids);
                }
                None => {
                    let full = StreamId::from(self.conventions.full_id(store, seed));
                    if !self.missing.contains(&full) {
                        self.missing.push(full);
                    }
                }
            }
        }
        Ok(union.into_vec())
    }

    /// Expand exclusion seeds. A missing seed is kept as a literal id.
    async fn expand_excluded(
        &mut self,
        store: &StoreId,
        seeds: &[StreamId],
        excluded: &[StreamId],
    ) -> ResolveResult<Vec<StreamId>> {
        let mut union = Union::default();
        for seed in seeds {
            if self.conventions.is_no_expand(seed) {
                union.extend([self.conventions.strip_marker(seed)]);
                continue;
            }
            match self.lookup.expand(seed, store, excluded, self.state).await? {
                Some(ids) => union.extend(ids),
                None => {
                    tracing::debug!(
                        store = %store,
                        seed = %seed,
                        "excluded stream not found, kept as is"
                    );
                    union.extend([seed.clone()]);
                }
            }
        }
        Ok(union.into_vec())
    }

    /// Expand one forced stream. The access named it, not the request, so a
    /// missing stream is logged and yields an empty set instead of an
    /// unknown reference.
    async fn expand_forced(
        &mut self,
        store: &StoreId,
        seed: &StreamId,
        excluded: &[StreamId],
    ) -> ResolveResult<Vec<StreamId>> {
        if self.conventions.is_no_expand(seed) {
            return Ok(vec![self.conventions.strip_marker(seed)]);
        }
        match self.lookup.expand(seed, store, excluded, self.state).await? {
            Some(ids) => Ok(ids),
            None => {
                tracing::warn!(store = %store, stream = %seed, "forced stream not found");
                Ok(Vec::new())
            }
        }
    }

    async fn expand_clause(&mut self, clause: &QueryClause) -> ResolveResult<ExpandedClause> {
        let store = &clause.store_id;
        let not_ids = self.strip_all(&clause.not);
        let any_ids = self.strip_all(clause.any_ids());

        let any = match &clause.any {
            None => None,
            Some(AnyIds::Wildcard) => {
                let seeds = [StreamId::wildcard()];
                Some(self.expand_included(store, &seeds, &not_ids).await?)
            }
            Some(AnyIds::Ids(seeds)) => Some(self.expand_included(store, seeds, &not_ids).await?),
        };

        let mut all = Vec::with_capacity(clause.all.len());
        for seed in &clause.all {
            let branch = self
                .expand_included(store, std::slice::from_ref(seed), &not_ids)
                .await?;
            all.push(branch);
        }

        let mut forced = Vec::with_capacity(clause.forced.len());
        for seed in &clause.forced {
            forced.push(self.expand_forced(store, seed, &not_ids).await?);
        }

        let not = self.expand_excluded(store, &clause.not, &any_ids).await?;

        Ok(ExpandedClause {
            store_id: store.clone(),
            any,
            all,
            not,
            forced,
        })
    }

    fn strip_all(&self, ids: &[StreamId]) -> Vec<StreamId> {
        ids.iter().map(|id| self.conventions.strip_marker(id)).collect()
    }
}

/// Expand every clause, sequentially and in order.
///
/// `any` seeds are expanded with the clause's `not` ids pruned, each `all`
/// seed on its own, and `not` seeds with the clause's `any` ids pruned so
/// that an explicitly included stream is never excluded by a wider `not`.
/// Ids carrying the do-not-expand marker stand for themselves only.
///
/// A missing `any` or `all` seed fails the request with
/// [`ResolveError::UnknownStreams`]; a missing forced stream expands to an
/// empty set. Lookup failures abort immediately.
pub async fn expand_clauses(
    clauses: &[QueryClause],
    lookup: &dyn DescendantLookup,
    conventions: &IdConventions,
    state: StreamState,
) -> ResolveResult<Vec<ExpandedClause>> {
    let mut expander = Expander {
        lookup,
        conventions,
        state,
        missing: Vec::new(),
    };
    let mut expanded = Vec::with_capacity(clauses.len());
    for clause in clauses {
        expanded.push(expander.expand_clause(clause).await?);
    }
    if !expander.missing.is_empty() {
        tracing::warn!(count = expander.missing.len(), "streams query rejected: unknown streams");
        return Err(ResolveError::UnknownStreams(expander.missing));
    }
    Ok(expanded)
}
