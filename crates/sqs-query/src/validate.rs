//! Schema validation and store partitioning of raw clauses.
//!
//! Rules enforced for every clause:
//!
//! - at least one of `any` / `all` must be present and name a stream
//! - only `any`, `all` and `not` are accepted as properties
//! - values are arrays of strings; a lone `"*"` string is accepted in `any`
//! - `*` may only appear alone, and only inside `any`; never with `all`
//! - `#*` (marker on the wildcard) is rejected
//! - ids must not contain forbidden characters
//! - every id of a clause must belong to the same store
//!
//! On success ids are store-local and the clause carries its store id.

use serde_json::Value;
use sqs_types::{AnyIds, QueryClause, StoreId, StreamId};

use crate::conventions::IdConventions;
use crate::error::{QueryError, QueryResult};
use crate::normalize::RawClause;

/// Characters never accepted in a stream id.
const FORBIDDEN_CHARS: &[char] = &['"', ',', '\\', '[', ']', '{', '}'];

const COMBINATORS: [&str; 3] = ["any", "all", "not"];

/// Validate every clause and bind it to its store.
///
/// Fails on the first invalid clause; no partially validated output is
/// returned.
pub fn validate_and_partition(
    param: &str,
    clauses: &[RawClause],
    conventions: &IdConventions,
) -> QueryResult<Vec<QueryClause>> {
    clauses
        .iter()
        .map(|clause| ClauseValidator::new(param, clause, conventions).validate())
        .collect()
}

/// Validation state for a single clause.
struct ClauseValidator<'a> {
    param: &'a str,
    raw: &'a RawClause,
    conventions: &'a IdConventions,
    /// Store of the first id seen, with that id for error reporting.
    store: Option<(StoreId, String)>,
}

impl<'a> ClauseValidator<'a> {
    fn new(param: &'a str, raw: &'a RawClause, conventions: &'a IdConventions) -> Self {
        Self {
            param,
            raw,
            conventions,
            store: None,
        }
    }

    fn clause_error(&self, reason: impl Into<String>) -> QueryError {
        QueryError::InvalidClause {
            param: self.param.to_string(),
            clause: self.raw.to_string(),
            reason: reason.into(),
        }
    }

    fn id_error(&self, id: &str, reason: impl Into<String>) -> QueryError {
        QueryError::InvalidStreamId {
            param: self.param.to_string(),
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    fn validate(mut self) -> QueryResult<QueryClause> {
        let raw = self.raw;
        let fields = raw.fields();
        if !fields.contains_key("any") && !fields.contains_key("all") {
            return Err(self.clause_error(
                "must contain at least one of \"any\" or \"all\" property",
            ));
        }
        if let Some(key) = fields.keys().find(|k| !COMBINATORS.contains(&k.as_str())) {
            return Err(self.clause_error(format!("unknown property {key:?}")));
        }

        let any = match fields.get("any") {
            Some(value) => Some(self.validate_any(value)?),
            None => None,
        };
        let all = match fields.get("all") {
            Some(value) => self.validate_ids("all", value)?,
            None => Vec::new(),
        };
        let not = match fields.get("not") {
            Some(value) => self.validate_ids("not", value)?,
            None => Vec::new(),
        };

        let wildcard = any.as_ref().is_some_and(AnyIds::is_wildcard);
        if wildcard && fields.contains_key("all") {
            return Err(self.clause_error("{any: \"*\"} cannot be mixed with \"all\""));
        }
        if any.as_ref().map_or(true, AnyIds::is_empty) && all.is_empty() {
            return Err(self.clause_error(
                "must reference at least one stream in \"any\" or \"all\"",
            ));
        }

        let store_id = match self.store {
            Some((store, _)) => store,
            None => self.conventions.default_store().clone(),
        };
        Ok(QueryClause {
            store_id,
            any,
            all,
            not,
            forced: Vec::new(),
        })
    }

    fn validate_any(&mut self, value: &Value) -> QueryResult<AnyIds> {
        if value.as_str() == Some(StreamId::WILDCARD) {
            return Ok(AnyIds::Wildcard);
        }
        let ids = self.validate_ids("any", value)?;
        if ids.len() == 1 && ids[0].is_wildcard() {
            Ok(AnyIds::Wildcard)
        } else {
            Ok(AnyIds::Ids(ids))
        }
    }

    fn validate_ids(&mut self, property: &str, value: &Value) -> QueryResult<Vec<StreamId>> {
        let Value::Array(items) = value else {
            return Err(self.clause_error(format!(
                "value of {property:?} must be an array, found {value}"
            )));
        };
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let Value::String(full_id) = item else {
                return Err(self.clause_error(format!(
                    "all items of {property:?} must be stream ids, found {item}"
                )));
            };
            let (store, local) = self.conventions.split(full_id);
            self.check_store(full_id, store)?;
            self.check_local_id(property, full_id, &local, items.len())?;
            ids.push(StreamId::from(local));
        }
        Ok(ids)
    }

    fn check_store(&mut self, full_id: &str, store: StoreId) -> QueryResult<()> {
        if let Some((expected, first)) = &self.store {
            if *expected != store {
                return Err(QueryError::MixedStores {
                    param: self.param.to_string(),
                    clause: self.raw.to_string(),
                    first: first.clone(),
                    second: full_id.to_string(),
                });
            }
            return Ok(());
        }
        self.store = Some((store, full_id.to_string()));
        Ok(())
    }

    fn check_local_id(
        &self,
        property: &str,
        full_id: &str,
        local: &str,
        siblings: usize,
    ) -> QueryResult<()> {
        let marker = self.conventions.no_expand_marker();
        if local == StreamId::WILDCARD {
            if property != "any" {
                return Err(self.clause_error(format!(
                    "\"*\" is only allowed in \"any\", found in {property:?}"
                )));
            }
            if siblings > 1 {
                return Err(self.clause_error(
                    "\"*\" cannot be mixed with other stream ids in \"any\"",
                ));
            }
            return Ok(());
        }

        let body = local.strip_prefix(marker).unwrap_or(local);
        if body == StreamId::WILDCARD {
            return Err(self.id_error(full_id, format!("\"{marker}*\" is not valid")));
        }
        if body.is_empty() {
            return Err(self.id_error(full_id, "stream id must not be empty"));
        }
        if body.contains(marker) {
            return Err(self.id_error(
                full_id,
                format!("{marker:?} is only allowed as the first character"),
            ));
        }
        if body.contains('*') {
            return Err(self.id_error(full_id, "\"*\" is only valid as a complete stream id"));
        }
        if let Some(ch) = body
            .chars()
            .find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_CHARS.contains(c))
        {
            return Err(self.id_error(full_id, format!("forbidden character {ch:?}")));
        }
        Ok(())
    }
}
