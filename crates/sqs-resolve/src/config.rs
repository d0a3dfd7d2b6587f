use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqs_query::{normalize, IdConventions, QueryError, RawClause};

/// Configuration for the streams query resolver.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Store prefixes, markers and legacy prefixes.
    pub conventions: IdConventions,
    /// Query used when the request sends none. Any shape the normalizer
    /// accepts, including JSON text.
    pub default_query: Value,
    /// Maximum wall-clock time allowed for one resolution.
    pub timeout: Duration,
    /// Parameter name reported in structure errors.
    pub param_name: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            conventions: IdConventions::default(),
            default_query: json!([{ "any": ["*"] }]),
            timeout: Duration::from_secs(30),
            param_name: "streams".into(),
        }
    }
}

impl ResolverConfig {
    /// Parse a configuration from TOML text; omitted keys keep defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, QueryError> {
        toml::from_str(text).map_err(|e| QueryError::Config(e.to_string()))
    }

    /// The default query as raw clauses.
    pub fn default_clauses(&self) -> Result<Vec<RawClause>, QueryError> {
        let clauses = normalize(
            &self.param_name,
            Some(&self.default_query),
            &[],
            &self.conventions,
            false,
        )?;
        if clauses.is_empty() {
            return Err(QueryError::Config("default query must not be empty".into()));
        }
        Ok(clauses)
    }
}
