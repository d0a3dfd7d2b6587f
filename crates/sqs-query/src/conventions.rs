use serde::{Deserialize, Serialize};
use sqs_types::{StoreId, StreamId};

use crate::error::{QueryError, QueryResult};
use crate::legacy::LegacyPrefixes;

/// On-disk form of [`IdConventions`]; every field is optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConventionsFile {
    default_store: Option<String>,
    store_delimiter: Option<char>,
    no_expand_marker: Option<char>,
    system_store_aliases: Option<Vec<String>>,
    legacy: Option<LegacyPrefixes>,
}

/// How stream ids encode their store and expansion flag.
///
/// - `:dummy:diary` lives in store `dummy` with local id `diary`.
/// - `diary` (no leading delimiter) lives in the default store.
/// - `:_system:account` names a system store alias and stays in the
///   default store under its full id.
/// - `#diary` means "diary only, not its descendants".
///
/// Values are immutable once built and always valid: construct them with
/// [`IdConventions::builder`], [`IdConventions::from_toml_str`] or
/// `Default`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ConventionsFile")]
pub struct IdConventions {
    default_store: StoreId,
    store_delimiter: char,
    no_expand_marker: char,
    system_store_aliases: Vec<String>,
    legacy: Option<LegacyPrefixes>,
}

impl Default for IdConventions {
    fn default() -> Self {
        Self {
            default_store: StoreId::from("local"),
            store_delimiter: ':',
            no_expand_marker: '#',
            system_store_aliases: vec!["_system".into(), "system".into()],
            legacy: Some(LegacyPrefixes::default()),
        }
    }
}

impl TryFrom<ConventionsFile> for IdConventions {
    type Error = QueryError;

    fn try_from(file: ConventionsFile) -> QueryResult<Self> {
        let mut builder = Self::builder();
        if let Some(store) = file.default_store {
            builder = builder.default_store(store);
        }
        if let Some(delimiter) = file.store_delimiter {
            builder = builder.store_delimiter(delimiter);
        }
        if let Some(marker) = file.no_expand_marker {
            builder = builder.no_expand_marker(marker);
        }
        if let Some(aliases) = file.system_store_aliases {
            builder = builder.system_store_aliases(aliases);
        }
        builder.legacy(file.legacy).build()
    }
}

impl IdConventions {
    pub fn builder() -> IdConventionsBuilder {
        IdConventionsBuilder {
            inner: Self::default(),
        }
    }

    /// Parse and validate conventions from TOML text.
    ///
    /// Omitted keys keep their defaults, except legacy translation, which is
    /// only enabled when a `[legacy]` table is present.
    pub fn from_toml_str(text: &str) -> QueryResult<Self> {
        toml::from_str(text).map_err(|e| QueryError::Config(e.to_string()))
    }

    pub fn default_store(&self) -> &StoreId {
        &self.default_store
    }

    pub fn store_delimiter(&self) -> char {
        self.store_delimiter
    }

    pub fn no_expand_marker(&self) -> char {
        self.no_expand_marker
    }

    pub fn legacy(&self) -> Option<&LegacyPrefixes> {
        self.legacy.as_ref()
    }

    /// Split a full id into its store and store-local id.
    ///
    /// The do-not-expand marker may precede the store prefix and is carried
    /// over to the local id (`#:dummy:a` becomes `dummy` / `#a`). A prefix
    /// with an empty local part (`:dummy:`) denotes the store wildcard.
    pub fn split(&self, full_id: &str) -> (StoreId, String) {
        let (marked, rest) = match full_id.strip_prefix(self.no_expand_marker) {
            Some(rest) => (true, rest),
            None => (false, full_id),
        };
        let Some(after) = rest.strip_prefix(self.store_delimiter) else {
            return (self.default_store.clone(), full_id.to_string());
        };
        let Some(pos) = after.find(self.store_delimiter) else {
            return (self.default_store.clone(), full_id.to_string());
        };
        let store = &after[..pos];
        if store.is_empty() || self.system_store_aliases.iter().any(|a| a == store) {
            return (self.default_store.clone(), full_id.to_string());
        }
        let mut local = after[pos + self.store_delimiter.len_utf8()..].to_string();
        if local.is_empty() {
            local = StreamId::WILDCARD.to_string();
        }
        if marked {
            local.insert(0, self.no_expand_marker);
        }
        (StoreId::from(store), local)
    }

    /// The store a full id belongs to.
    pub fn store_of(&self, full_id: &str) -> StoreId {
        self.split(full_id).0
    }

    /// Inverse of [`Self::split`] for unmarked ids.
    pub fn full_id(&self, store_id: &StoreId, local_id: &StreamId) -> String {
        if *store_id == self.default_store {
            local_id.to_string()
        } else {
            let d = self.store_delimiter;
            format!("{d}{store_id}{d}{local_id}")
        }
    }

    /// Whether the id carries the do-not-expand marker.
    pub fn is_no_expand(&self, id: &StreamId) -> bool {
        id.as_str().starts_with(self.no_expand_marker)
    }

    /// The id without its do-not-expand marker.
    pub fn strip_marker(&self, id: &StreamId) -> StreamId {
        match id.as_str().strip_prefix(self.no_expand_marker) {
            Some(rest) => StreamId::from(rest),
            None => id.clone(),
        }
    }
}

/// Builder for [`IdConventions`]; [`IdConventionsBuilder::build`] validates.
#[derive(Clone, Debug)]
pub struct IdConventionsBuilder {
    inner: IdConventions,
}

impl IdConventionsBuilder {
    pub fn default_store(mut self, store: impl Into<StoreId>) -> Self {
        self.inner.default_store = store.into();
        self
    }

    pub fn store_delimiter(mut self, delimiter: char) -> Self {
        self.inner.store_delimiter = delimiter;
        self
    }

    pub fn no_expand_marker(mut self, marker: char) -> Self {
        self.inner.no_expand_marker = marker;
        self
    }

    pub fn system_store_aliases(mut self, aliases: Vec<String>) -> Self {
        self.inner.system_store_aliases = aliases;
        self
    }

    /// Set or clear the legacy prefix pair.
    pub fn legacy(mut self, legacy: Option<LegacyPrefixes>) -> Self {
        self.inner.legacy = legacy;
        self
    }

    pub fn build(self) -> QueryResult<IdConventions> {
        let c = self.inner;
        let store = c.default_store.as_str();
        if store.is_empty() {
            return Err(QueryError::Config("default store must not be empty".into()));
        }
        if store.contains(c.store_delimiter) {
            return Err(QueryError::Config(format!(
                "default store {store:?} must not contain the store delimiter"
            )));
        }
        let reserved = ['*', '"', ',', '\\', '[', ']', '{', '}'];
        for (name, ch) in [
            ("store delimiter", c.store_delimiter),
            ("no-expand marker", c.no_expand_marker),
        ] {
            if ch.is_whitespace() || ch.is_control() || reserved.contains(&ch) {
                return Err(QueryError::Config(format!("{name} {ch:?} is reserved")));
            }
        }
        if c.store_delimiter == c.no_expand_marker {
            return Err(QueryError::Config(
                "store delimiter and no-expand marker must differ".into(),
            ));
        }
        if c.system_store_aliases.iter().any(|a| a.is_empty()) {
            return Err(QueryError::Config("system store aliases must not be empty".into()));
        }
        if let Some(legacy) = &c.legacy {
            legacy.validate(c.no_expand_marker)?;
        }
        Ok(c)
    }
}
