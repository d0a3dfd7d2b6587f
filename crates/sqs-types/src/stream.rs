use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identifier of a stream.
///
/// Stream ids are opaque strings, unique within the store that owns them.
/// Before validation an id may still carry a store prefix or the
/// do-not-expand marker; after validation it is store-local.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    /// The universal wildcard, standing for every stream of a store.
    pub const WILDCARD: &'static str = "*";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The wildcard id `*`.
    pub fn wildcard() -> Self {
        Self(Self::WILDCARD.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Returns `true` if this id is exactly the wildcard.
    pub fn is_wildcard(&self) -> bool {
        self.0 == Self::WILDCARD
    }
}

impl fmt::Debug for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamId({})", self.0)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StreamId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for StreamId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of a storage backend ("store").
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(String);

impl StoreId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoreId({})", self.0)
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StoreId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StoreId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A node in a per-store stream forest.
///
/// Streams are owned by their store; the query pipeline only reads them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub id: StreamId,
    #[serde(default)]
    pub parent_id: Option<StreamId>,
    #[serde(default)]
    pub trashed: bool,
}

impl Stream {
    /// A live root stream.
    pub fn root(id: impl Into<StreamId>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            trashed: false,
        }
    }

    /// A live stream under `parent`.
    pub fn child(id: impl Into<StreamId>, parent: impl Into<StreamId>) -> Self {
        Self {
            id: id.into(),
            parent_id: Some(parent.into()),
            trashed: false,
        }
    }

    /// Builder-style toggle for the trashed flag.
    pub fn trashed(mut self, trashed: bool) -> Self {
        self.trashed = trashed;
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Visibility state requested for a read.
///
/// `Default` hides trashed streams (and everything below them);
/// `Trashed` and `All` keep them in scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    #[default]
    Default,
    Trashed,
    All,
}

impl StreamState {
    /// Whether trashed streams are part of the expansion.
    pub fn includes_trashed(&self) -> bool {
        !matches!(self, Self::Default)
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Trashed => f.write_str("trashed"),
            Self::All => f.write_str("all"),
        }
    }
}

impl FromStr for StreamState {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "trashed" => Ok(Self::Trashed),
            "all" => Ok(Self::All),
            other => Err(TypeError::InvalidStreamState(other.to_string())),
        }
    }
}
