use std::collections::BTreeSet;

use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

use crate::stream::{StoreId, StreamId};

// ---------------------------------------------------------------------------
// QueryClause
// ---------------------------------------------------------------------------

/// The `any` part of a clause: either the store wildcard or concrete ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnyIds {
    /// `['*']`: every stream the caller may read in the store.
    Wildcard,
    /// Concrete ids, possibly empty once a wildcard has been resolved.
    Ids(Vec<StreamId>),
}

impl AnyIds {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard)
    }

    /// Concrete ids, or an empty slice for the wildcard.
    pub fn ids(&self) -> &[StreamId] {
        match self {
            Self::Wildcard => &[],
            Self::Ids(ids) => ids,
        }
    }

    /// `true` when no stream can be included through this set.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Wildcard => false,
            Self::Ids(ids) => ids.is_empty(),
        }
    }
}

impl Serialize for AnyIds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Wildcard => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element(StreamId::WILDCARD)?;
                seq.end()
            }
            Self::Ids(ids) => ids.serialize(serializer),
        }
    }
}

/// A validated clause of a streams query, bound to exactly one store.
///
/// Ids are store-local (prefix stripped) and may still carry the
/// do-not-expand marker. An empty `all` or `not` means the combinator was
/// absent from the request.
///
/// `forced` holds the access's mandatory streams. They are conjuncts like
/// `all` elements but only ever narrow the clause: they never count as one
/// of its inclusions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryClause {
    pub store_id: StoreId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any: Option<AnyIds>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub all: Vec<StreamId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub not: Vec<StreamId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub forced: Vec<StreamId>,
}

impl QueryClause {
    /// A clause with only an `any` set.
    pub fn any(store_id: impl Into<StoreId>, ids: Vec<StreamId>) -> Self {
        Self {
            store_id: store_id.into(),
            any: Some(AnyIds::Ids(ids)),
            all: Vec::new(),
            not: Vec::new(),
            forced: Vec::new(),
        }
    }

    /// A clause selecting everything readable in the store.
    pub fn wildcard(store_id: impl Into<StoreId>) -> Self {
        Self {
            store_id: store_id.into(),
            any: Some(AnyIds::Wildcard),
            all: Vec::new(),
            not: Vec::new(),
            forced: Vec::new(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.any.as_ref().is_some_and(AnyIds::is_wildcard)
    }

    /// Concrete ids of `any`, empty for the wildcard or when absent.
    pub fn any_ids(&self) -> &[StreamId] {
        self.any.as_ref().map(AnyIds::ids).unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// ResolvedQuery
// ---------------------------------------------------------------------------

/// A conjunct of a resolved clause.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClauseBranch {
    /// The record must carry at least one of these streams.
    Any(Vec<StreamId>),
    /// The record must carry none of these streams.
    Not(Vec<StreamId>),
}

impl ClauseBranch {
    pub fn ids(&self) -> &[StreamId] {
        match self {
            Self::Any(ids) | Self::Not(ids) => ids,
        }
    }

    pub fn is_inclusion(&self) -> bool {
        matches!(self, Self::Any(_))
    }
}

/// One backend-ready clause: `any` AND every branch of `and`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedClause {
    pub store_id: StoreId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any: Option<Vec<StreamId>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub and: Vec<ClauseBranch>,
}

impl ResolvedClause {
    /// Whether the clause includes at least one stream positively.
    pub fn has_inclusion(&self) -> bool {
        self.any.as_ref().is_some_and(|ids| !ids.is_empty())
            || self
                .and
                .iter()
                .any(|b| b.is_inclusion() && !b.ids().is_empty())
    }

    /// Ids from the exclusion branches.
    pub fn excluded_ids(&self) -> impl Iterator<Item = &StreamId> {
        self.and
            .iter()
            .filter(|b| !b.is_inclusion())
            .flat_map(|b| b.ids())
    }
}

/// The normalized union of clauses a read is scoped to.
///
/// An empty query means "no clause survived": it must compile to a
/// predicate matching nothing, never to an unscoped read.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedQuery {
    pub clauses: Vec<ResolvedClause>,
}

impl ResolvedQuery {
    pub fn new(clauses: Vec<ResolvedClause>) -> Self {
        Self { clauses }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Stores referenced by at least one clause, sorted.
    pub fn store_ids(&self) -> Vec<StoreId> {
        let set: BTreeSet<&StoreId> = self.clauses.iter().map(|c| &c.store_id).collect();
        set.into_iter().cloned().collect()
    }

    /// Clauses targeting one store.
    pub fn for_store<'a>(
        &'a self,
        store_id: &'a StoreId,
    ) -> impl Iterator<Item = &'a ResolvedClause> + 'a {
        self.clauses.iter().filter(move |c| &c.store_id == store_id)
    }

    /// Every positively included `(store, stream)` pair, sorted and
    /// deduplicated.
    pub fn stream_ids(&self) -> Vec<(StoreId, StreamId)> {
        let mut set = BTreeSet::new();
        for clause in &self.clauses {
            let positives = clause
                .any
                .iter()
                .flatten()
                .chain(clause.and.iter().filter(|b| b.is_inclusion()).flat_map(|b| b.ids()));
            for id in positives {
                set.insert((clause.store_id.clone(), id.clone()));
            }
        }
        set.into_iter().collect()
    }
}
