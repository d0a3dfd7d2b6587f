//! Backward-compatible stream id prefixes.
//!
//! Older clients address system streams with a single-dot prefix
//! (`.account`); the current scheme uses a store-style prefix
//! (`:_system:account`). When a request opts into backward compatibility,
//! ids are translated to the current scheme before normalization and back
//! to the legacy scheme in responses.

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};

/// A pair of equivalent prefixes: the legacy one and its current form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyPrefixes {
    pub legacy: String,
    pub current: String,
}

impl Default for LegacyPrefixes {
    fn default() -> Self {
        Self {
            legacy: ".".into(),
            current: ":_system:".into(),
        }
    }
}

impl LegacyPrefixes {
    pub(crate) fn validate(&self, marker: char) -> QueryResult<()> {
        if self.legacy.is_empty() || self.current.is_empty() {
            return Err(QueryError::Config("legacy prefixes must not be empty".into()));
        }
        if self.legacy == self.current
            || self.current.starts_with(&self.legacy)
            || self.legacy.starts_with(&self.current)
        {
            return Err(QueryError::Config(format!(
                "legacy prefix {:?} and current prefix {:?} overlap",
                self.legacy, self.current
            )));
        }
        if self.legacy.starts_with(marker) || self.current.starts_with(marker) {
            return Err(QueryError::Config(
                "legacy prefixes must not start with the no-expand marker".into(),
            ));
        }
        Ok(())
    }

    /// Rewrite a legacy-prefixed id into the current scheme.
    ///
    /// Ids without the legacy prefix are returned unchanged. A leading
    /// no-expand marker is preserved.
    pub fn to_current(&self, id: &str, marker: char) -> String {
        Self::swap(id, marker, &self.legacy, &self.current)
    }

    /// Rewrite a current-scheme id back to its legacy form.
    pub fn to_legacy(&self, id: &str, marker: char) -> String {
        Self::swap(id, marker, &self.current, &self.legacy)
    }

    fn swap(id: &str, marker: char, from: &str, to: &str) -> String {
        let (head, body) = match id.strip_prefix(marker) {
            Some(body) => (Some(marker), body),
            None => (None, id),
        };
        match body.strip_prefix(from) {
            Some(rest) if !rest.is_empty() => {
                let mut out = String::with_capacity(id.len() + to.len());
                out.extend(head);
                out.push_str(to);
                out.push_str(rest);
                out
            }
            _ => id.to_string(),
        }
    }
}
