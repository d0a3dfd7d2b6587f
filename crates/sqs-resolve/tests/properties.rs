//! Property tests over randomly generated stream forests.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use sqs_query::IdConventions;
use sqs_resolve::{compile_predicate, expand_clauses, reduce_clauses, ExpandedClause};
use sqs_store::{InMemoryStreamTree, StoreRegistry};
use sqs_types::{ClauseBranch, QueryClause, StoreId, Stream, StreamId, StreamState};

/// A forest of `n` streams `s0..sn`; stream `i` has parent `parents[i]`
/// when that index is smaller than `i`.
#[derive(Clone, Debug)]
struct Forest {
    parents: Vec<Option<usize>>,
    trashed: Vec<bool>,
}

impl Forest {
    fn id(i: usize) -> StreamId {
        StreamId::from(format!("s{i}"))
    }

    fn streams(&self) -> Vec<Stream> {
        self.parents
            .iter()
            .zip(&self.trashed)
            .enumerate()
            .map(|(i, (parent, trashed))| {
                let stream = match parent {
                    Some(p) => Stream::child(Self::id(i), Self::id(*p)),
                    None => Stream::root(Self::id(i)),
                };
                stream.trashed(*trashed)
            })
            .collect()
    }

    fn registry(&self) -> StoreRegistry {
        let tree = InMemoryStreamTree::from_streams(self.streams()).unwrap();
        StoreRegistry::new()
            .with_store("local", Arc::new(tree))
            .unwrap()
    }

    /// Whether `node` is `ancestor` or lies below it.
    fn is_under(&self, mut node: usize, ancestor: usize) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.parents[node] {
                Some(p) => node = p,
                None => return false,
            }
        }
    }
}

fn forest() -> impl Strategy<Value = Forest> {
    (1usize..24).prop_flat_map(|n| {
        let parents = (0..n)
            .map(|i| {
                if i == 0 {
                    Just(None).boxed()
                } else {
                    prop::option::weighted(0.8, 0..i).boxed()
                }
            })
            .collect::<Vec<_>>();
        let trashed = prop::collection::vec(prop::bool::weighted(0.15), n);
        (parents, trashed).prop_map(|(parents, trashed)| Forest { parents, trashed })
    })
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn expand(forest: &Forest, clause: QueryClause, state: StreamState) -> Vec<ExpandedClause> {
    let registry = forest.registry();
    block_on(expand_clauses(&[clause], &registry, &IdConventions::default(), state)).unwrap()
}

fn clause(any: Vec<StreamId>, all: Vec<StreamId>, not: Vec<StreamId>) -> QueryClause {
    QueryClause {
        store_id: StoreId::from("local"),
        any: if any.is_empty() { None } else { Some(sqs_types::AnyIds::Ids(any)) },
        all,
        not,
        forced: Vec::new(),
    }
}

proptest! {
    // -----------------------------------------------------------------------
    // Expansion is idempotent and duplicate-free
    // -----------------------------------------------------------------------
    #[test]
    fn expansion_is_idempotent(
        forest in forest(),
        seeds in prop::collection::vec(any::<prop::sample::Index>(), 1..5),
    ) {
        let n = forest.parents.len();
        let seeds: Vec<StreamId> = seeds.iter().map(|s| Forest::id(s.index(n))).collect();
        let query = clause(seeds, Vec::new(), Vec::new());

        let first = expand(&forest, query.clone(), StreamState::Default);
        let second = expand(&forest, query, StreamState::Default);
        prop_assert_eq!(&first, &second);

        let any = first[0].any.clone().unwrap_or_default();
        let unique: HashSet<&StreamId> = any.iter().collect();
        prop_assert_eq!(unique.len(), any.len());
        for id in &any {
            let index: usize = id.as_str()[1..].parse().unwrap();
            prop_assert!(!forest.trashed[index]);
        }
    }

    // -----------------------------------------------------------------------
    // A `not` subtree is never part of the scope
    // -----------------------------------------------------------------------
    #[test]
    fn excluded_subtree_never_matches(
        forest in forest(),
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
    ) {
        let n = forest.parents.len();
        let (a, b) = (a.index(n), b.index(n));
        let query = clause(Vec::new(), vec![Forest::id(a)], vec![Forest::id(b)]);
        let resolved = reduce_clauses(expand(&forest, query, StreamState::All));
        let predicate = compile_predicate(&resolved);

        for node in 0..n {
            let record = [Forest::id(node)];
            let expected = forest.is_under(node, a) && !forest.is_under(node, b);
            prop_assert_eq!(predicate.matches(&record), expected, "node s{}", node);
        }
    }

    // -----------------------------------------------------------------------
    // Clauses without inclusions are dropped, empty `all` elements omitted
    // -----------------------------------------------------------------------
    #[test]
    fn empty_clauses_are_dropped(
        forest in forest(),
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
    ) {
        let n = forest.parents.len();
        let (a, b) = (a.index(n), b.index(n));
        let query = clause(Vec::new(), vec![Forest::id(a), Forest::id(b)], Vec::new());
        let resolved = reduce_clauses(expand(&forest, query, StreamState::Default));

        let live = [a, b].iter().filter(|i| !forest.trashed[**i]).count();
        if live == 0 {
            prop_assert!(resolved.is_empty());
        } else {
            prop_assert_eq!(resolved.len(), 1);
            prop_assert!(resolved.clauses[0].has_inclusion());
            prop_assert_eq!(resolved.clauses[0].and.len(), live);
            for branch in &resolved.clauses[0].and {
                prop_assert!(matches!(branch, ClauseBranch::Any(ids) if !ids.is_empty()));
            }
        }
    }
}
