//! Canonicalization of the `streams` request parameter.
//!
//! Accepted shapes:
//!
//! | Input                        | Result                                 |
//! |------------------------------|----------------------------------------|
//! | absent / `null`              | the caller-supplied default clauses    |
//! | `"diary"`                    | `[{any: ["diary"]}]`                   |
//! | `["a", ":dummy:b"]`          | `[{any: ["a"]}, {any: [":dummy:b"]}]`  |
//! | `{any: [...], not: [...]}`   | `[{any: [...], not: [...]}]`           |
//! | `[{...}, {...}]`             | unchanged                              |
//! | `"[...]"` / `"{...}"`        | parsed as JSON, then as above          |
//!
//! Flat id lists are grouped by store so that ids from different stores
//! never share a clause. Mixing flat ids and structured clauses in one
//! collection is rejected.

use std::fmt;

use serde_json::{Map, Value};
use sqs_types::StoreId;

use crate::conventions::IdConventions;
use crate::error::{QueryError, QueryResult};

/// A structured clause as sent by the caller, not yet validated.
#[derive(Clone, Debug, PartialEq)]
pub struct RawClause(Map<String, Value>);

impl RawClause {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// `{any: ["*"]}`: everything the caller may read in the default store.
    pub fn wildcard() -> Self {
        let mut fields = Map::new();
        fields.insert("any".into(), Value::Array(vec![Value::from("*")]));
        Self(fields)
    }

    /// `{any: ids}`.
    pub fn any<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids = ids.into_iter().map(|s| Value::String(s.into())).collect();
        let mut fields = Map::new();
        fields.insert("any".into(), Value::Array(ids));
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Apply `f` to every string found under `any`, `all` and `not`.
    fn map_ids(&self, f: impl Fn(&str) -> String) -> Self {
        let mut fields = self.0.clone();
        for key in ["any", "all", "not"] {
            match fields.get_mut(key) {
                Some(Value::String(s)) => *s = f(s.as_str()),
                Some(Value::Array(items)) => {
                    for item in items.iter_mut() {
                        if let Value::String(s) = item {
                            *s = f(s.as_str());
                        }
                    }
                }
                _ => {}
            }
        }
        Self(fields)
    }
}

impl fmt::Display for RawClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{:?}", self.0),
        }
    }
}

/// The `streams` parameter after shape detection.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamsParam {
    /// Not sent, or `null`.
    Absent,
    /// One or more flat stream ids.
    Ids(Vec<String>),
    /// Structured clauses.
    Clauses(Vec<RawClause>),
}

impl StreamsParam {
    /// Detect the shape of a raw parameter value.
    pub fn parse(param: &str, raw: Option<&Value>) -> QueryResult<Self> {
        match raw {
            None => Ok(Self::Absent),
            Some(value) => Self::from_value(param, value, true),
        }
    }

    fn from_value(param: &str, value: &Value, json_text_allowed: bool) -> QueryResult<Self> {
        match value {
            Value::Null => Ok(Self::Absent),
            Value::String(text) if json_text_allowed && looks_like_json(text) => {
                let parsed: Value =
                    serde_json::from_str(text).map_err(|e| QueryError::MalformedJson {
                        param: param.to_string(),
                        message: e.to_string(),
                    })?;
                Self::from_value(param, &parsed, false)
            }
            Value::String(id) => Ok(Self::Ids(vec![id.clone()])),
            Value::Object(fields) => Ok(Self::Clauses(vec![RawClause(fields.clone())])),
            Value::Array(items) => Self::from_array(param, items),
            other => Err(QueryError::InvalidValue {
                param: param.to_string(),
                reason: format!(
                    "expected a stream id, a list of stream ids or streams queries, found {other}"
                ),
            }),
        }
    }

    fn from_array(param: &str, items: &[Value]) -> QueryResult<Self> {
        let mut ids = Vec::new();
        let mut clauses = Vec::new();
        for item in items {
            match item {
                Value::String(id) => ids.push(id.clone()),
                Value::Object(fields) => clauses.push(RawClause(fields.clone())),
                other => {
                    return Err(QueryError::InvalidValue {
                        param: param.to_string(),
                        reason: format!(
                            "items must be stream ids or streams queries, found {other}"
                        ),
                    })
                }
            }
        }
        match (ids.is_empty(), clauses.is_empty()) {
            (false, false) => Err(QueryError::MixedForms {
                param: param.to_string(),
            }),
            (false, true) => Ok(Self::Ids(ids)),
            _ => Ok(Self::Clauses(clauses)),
        }
    }
}

fn looks_like_json(text: &str) -> bool {
    matches!(text.trim_start().chars().next(), Some('[') | Some('{'))
}

/// Canonicalize a raw `streams` parameter into unvalidated clauses.
///
/// `default` is returned when the parameter is absent. With `legacy` set,
/// legacy-prefixed ids are rewritten to the current scheme first (a no-op
/// when the conventions define no legacy prefixes).
pub fn normalize(
    param: &str,
    raw: Option<&Value>,
    default: &[RawClause],
    conventions: &IdConventions,
    legacy: bool,
) -> QueryResult<Vec<RawClause>> {
    let parsed = StreamsParam::parse(param, raw)?;
    let translate = |id: &str| match (legacy, conventions.legacy()) {
        (true, Some(prefixes)) => prefixes.to_current(id, conventions.no_expand_marker()),
        _ => id.to_string(),
    };

    let clauses = match parsed {
        StreamsParam::Absent => default.to_vec(),
        StreamsParam::Clauses(clauses) => clauses.iter().map(|c| c.map_ids(translate)).collect(),
        StreamsParam::Ids(ids) => {
            let ids: Vec<String> = ids.iter().map(|id| translate(id.as_str())).collect();
            group_by_store(&ids, conventions)
        }
    };
    tracing::trace!(param, clauses = clauses.len(), "streams parameter normalized");
    Ok(clauses)
}

/// One `{any: [...]}` clause per store, in order of first appearance.
fn group_by_store(ids: &[String], conventions: &IdConventions) -> Vec<RawClause> {
    let mut groups: Vec<(StoreId, Vec<&str>)> = Vec::new();
    for id in ids {
        let store = conventions.store_of(id);
        match groups.iter_mut().find(|(s, _)| *s == store) {
            Some((_, members)) => members.push(id.as_str()),
            None => groups.push((store, vec![id.as_str()])),
        }
    }
    groups
        .into_iter()
        .map(|(_, members)| RawClause::any(members))
        .collect()
}
