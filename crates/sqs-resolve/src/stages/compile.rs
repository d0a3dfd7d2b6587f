//! Backend compilation: a resolved query becomes a stream predicate.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sqs_types::{ClauseBranch, ResolvedClause, ResolvedQuery, StoreId, StreamId};

/// A backend-neutral predicate over the stream ids attached to a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamPredicate {
    /// The record carries this stream.
    Eq(StreamId),
    /// The record carries at least one of these streams. Matches nothing
    /// when empty.
    In(Vec<StreamId>),
    /// The record does not carry this stream.
    Ne(StreamId),
    /// The record carries none of these streams.
    NotIn(Vec<StreamId>),
    /// Every predicate holds.
    And(Vec<StreamPredicate>),
    /// At least one predicate holds.
    Or(Vec<StreamPredicate>),
}

impl StreamPredicate {
    /// The predicate no record satisfies.
    pub fn nothing() -> Self {
        Self::In(Vec::new())
    }

    fn inclusion(ids: &[StreamId]) -> Self {
        match ids {
            [single] => Self::Eq(single.clone()),
            many => Self::In(many.to_vec()),
        }
    }

    fn exclusion(ids: &[StreamId]) -> Self {
        match ids {
            [single] => Self::Ne(single.clone()),
            many => Self::NotIn(many.to_vec()),
        }
    }

    /// Evaluate against the stream ids of one record.
    pub fn matches(&self, record_streams: &[StreamId]) -> bool {
        match self {
            Self::Eq(id) => record_streams.contains(id),
            Self::In(ids) => ids.iter().any(|id| record_streams.contains(id)),
            Self::Ne(id) => !record_streams.contains(id),
            Self::NotIn(ids) => !ids.iter().any(|id| record_streams.contains(id)),
            Self::And(parts) => parts.iter().all(|p| p.matches(record_streams)),
            Self::Or(parts) => parts.iter().any(|p| p.matches(record_streams)),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, ids: &[StreamId]) -> fmt::Result {
    f.write_str("(")?;
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{id}")?;
    }
    f.write_str(")")
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[StreamPredicate], op: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            write!(f, " {op} ")?;
        }
        write!(f, "{part}")?;
    }
    f.write_str(")")
}

impl fmt::Display for StreamPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq(id) => write!(f, "streamIds = {id}"),
            Self::Ne(id) => write!(f, "streamIds != {id}"),
            Self::In(ids) => {
                f.write_str("streamIds IN ")?;
                write_list(f, ids)
            }
            Self::NotIn(ids) => {
                f.write_str("streamIds NOT IN ")?;
                write_list(f, ids)
            }
            Self::And(parts) => write_joined(f, parts, "AND"),
            Self::Or(parts) => write_joined(f, parts, "OR"),
        }
    }
}

fn compile_clause(clause: &ResolvedClause) -> StreamPredicate {
    let mut parts = Vec::with_capacity(clause.and.len() + 1);
    if let Some(any) = &clause.any {
        parts.push(StreamPredicate::inclusion(any));
    }
    for branch in &clause.and {
        parts.push(match branch {
            ClauseBranch::Any(ids) => StreamPredicate::inclusion(ids),
            ClauseBranch::Not(ids) => StreamPredicate::exclusion(ids),
        });
    }
    match parts.len() {
        1 => parts.remove(0),
        _ => StreamPredicate::And(parts),
    }
}

fn compile_clauses<'a>(clauses: impl Iterator<Item = &'a ResolvedClause>) -> StreamPredicate {
    let mut predicates: Vec<StreamPredicate> = clauses.map(compile_clause).collect();
    match predicates.len() {
        0 => StreamPredicate::nothing(),
        1 => predicates.remove(0),
        _ => StreamPredicate::Or(predicates),
    }
}

/// Compile a whole resolved query, clauses of every store together.
///
/// An empty query compiles to [`StreamPredicate::nothing`].
pub fn compile_predicate(query: &ResolvedQuery) -> StreamPredicate {
    compile_clauses(query.clauses.iter())
}

/// Compile the clauses targeting one store.
pub fn compile_for_store(query: &ResolvedQuery, store_id: &StoreId) -> StreamPredicate {
    compile_clauses(query.for_store(store_id))
}

/// One predicate per store referenced by the query.
pub fn compile_all(query: &ResolvedQuery) -> BTreeMap<StoreId, StreamPredicate> {
    query
        .store_ids()
        .into_iter()
        .map(|store| {
            let predicate = compile_for_store(query, &store);
            (store, predicate)
        })
        .collect()
}
