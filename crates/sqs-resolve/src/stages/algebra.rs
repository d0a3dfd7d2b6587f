//! Set algebra: reduce expanded clauses to the backend-ready form.

use sqs_types::{ClauseBranch, ResolvedClause, ResolvedQuery, StreamId};

use super::expand::ExpandedClause;

/// Reduce expanded clauses into a [`ResolvedQuery`].
///
/// Each surviving clause reads `any AND branch1 AND branch2 ...`, where the
/// branches are one `any` per non-empty `all` element, then one `any` per
/// forced stream, then at most one merged `not`.
///
/// Only `any` and `all` count as inclusions. A clause is dropped when:
///
/// - `any` is empty or absent and every `all` element expanded to nothing;
/// - a forced stream expanded to nothing, which no record can match.
///
/// Forced and `not` branches only narrow a clause, so they never keep one
/// alive on their own. Empty `any` sets and empty `all` elements are
/// omitted rather than emitted as "match nothing".
pub fn reduce_clauses(expanded: Vec<ExpandedClause>) -> ResolvedQuery {
    let mut clauses = Vec::with_capacity(expanded.len());

    for clause in expanded {
        let any = clause.any.filter(|ids| !ids.is_empty());
        let all: Vec<Vec<StreamId>> = clause
            .all
            .into_iter()
            .filter(|ids| !ids.is_empty())
            .collect();
        if any.is_none() && all.is_empty() {
            tracing::debug!(store = %clause.store_id, "clause dropped: no inclusion");
            continue;
        }
        if clause.forced.iter().any(Vec::is_empty) {
            tracing::debug!(store = %clause.store_id, "clause dropped: empty forced stream");
            continue;
        }

        let mut and: Vec<ClauseBranch> = all
            .into_iter()
            .chain(clause.forced)
            .map(ClauseBranch::Any)
            .collect();
        if !clause.not.is_empty() {
            and.push(ClauseBranch::Not(clause.not));
        }

        clauses.push(ResolvedClause {
            store_id: clause.store_id,
            any,
            and,
        });
    }

    ResolvedQuery::new(clauses)
}

#[cfg(test)]
mod tests {
    use sqs_types::StoreId;

    use super::*;

    fn ids(list: &[&str]) -> Vec<StreamId> {
        list.iter().map(|s| StreamId::from(*s)).collect()
    }

    fn expanded(any: Option<&[&str]>, all: &[&[&str]], not: &[&str]) -> ExpandedClause {
        ExpandedClause {
            store_id: StoreId::from("local"),
            any: any.map(ids),
            all: all.iter().map(|a| ids(a)).collect(),
            not: ids(not),
            forced: Vec::new(),
        }
    }

    fn forced(clause: ExpandedClause, forced: &[&[&str]]) -> ExpandedClause {
        ExpandedClause {
            forced: forced.iter().map(|f| ids(f)).collect(),
            ..clause
        }
    }

    #[test]
    fn any_only_clause() {
        let out = reduce_clauses(vec![expanded(Some(&["work", "meetings"]), &[], &[])]);
        assert_eq!(out.len(), 1);
        assert_eq!(out.clauses[0].any, Some(ids(&["work", "meetings"])));
        assert!(out.clauses[0].and.is_empty());
    }

    #[test]
    fn all_and_not_become_branches() {
        let out = reduce_clauses(vec![expanded(None, &[&["A", "A1"], &["B"]], &["C", "C1"])]);
        assert_eq!(
            out.clauses[0].and,
            vec![
                ClauseBranch::Any(ids(&["A", "A1"])),
                ClauseBranch::Any(ids(&["B"])),
                ClauseBranch::Not(ids(&["C", "C1"])),
            ]
        );
        assert_eq!(out.clauses[0].any, None);
    }

    #[test]
    fn empty_clauses_are_dropped() {
        let out = reduce_clauses(vec![
            expanded(Some(&[]), &[], &[]),
            expanded(Some(&[]), &[], &["C"]),
            expanded(None, &[&[], &[]], &["C"]),
            expanded(Some(&["B"]), &[], &[]),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out.clauses[0].any, Some(ids(&["B"])));
    }

    #[test]
    fn empty_all_elements_are_omitted() {
        let out = reduce_clauses(vec![expanded(None, &[&["work", "meetings"], &[]], &[])]);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out.clauses[0].and,
            vec![ClauseBranch::Any(ids(&["work", "meetings"]))]
        );
    }

    // -----------------------------------------------------------------------
    // Forced streams narrow but never include
    // -----------------------------------------------------------------------
    #[test]
    fn forced_streams_follow_all_branches() {
        let out = reduce_clauses(vec![forced(
            expanded(Some(&["home"]), &[&["A"]], &["C"]),
            &[&["work", "meetings"]],
        )]);
        assert_eq!(
            out.clauses[0].and,
            vec![
                ClauseBranch::Any(ids(&["A"])),
                ClauseBranch::Any(ids(&["work", "meetings"])),
                ClauseBranch::Not(ids(&["C"])),
            ]
        );
    }

    #[test]
    fn forced_streams_alone_are_no_inclusion() {
        let out = reduce_clauses(vec![
            forced(expanded(Some(&[]), &[], &["home"]), &[&["secret"]]),
            forced(expanded(None, &[&[]], &[]), &[&["secret"]]),
        ]);
        assert!(out.is_empty());
    }

    #[test]
    fn empty_forced_stream_drops_clause() {
        let out = reduce_clauses(vec![forced(
            expanded(Some(&["home"]), &[], &[]),
            &[&[]],
        )]);
        assert!(out.is_empty());
    }

    #[test]
    fn empty_any_is_omitted_next_to_all() {
        let out = reduce_clauses(vec![expanded(Some(&[]), &[&["A"]], &[])]);
        assert_eq!(out.clauses[0].any, None);
        assert_eq!(out.clauses[0].and, vec![ClauseBranch::Any(ids(&["A"]))]);
    }

    #[test]
    fn nothing_in_nothing_out() {
        assert!(reduce_clauses(Vec::new()).is_empty());
    }
}
