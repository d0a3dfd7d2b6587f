use serde::{Deserialize, Serialize};
use sqs_types::{PermissionEntry, PermissionLevel, StreamId};

/// What kind of credential an access is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    /// The account owner's own access: reads everything.
    Personal,
    /// An access granted to a third-party application.
    #[default]
    App,
    /// An access shared with another person.
    Shared,
}

/// An authenticated credential and the grants it carries.
///
/// Stream ids in `permissions` and `forced_streams` are full ids and may
/// carry a store prefix (`:dummy:diary`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Access {
    pub id: String,
    #[serde(default)]
    pub kind: AccessKind,
    #[serde(default)]
    pub permissions: Vec<PermissionEntry>,
    /// Streams every read through this access is restricted to.
    #[serde(default)]
    pub forced_streams: Vec<StreamId>,
}

impl Access {
    pub fn new(id: impl Into<String>, kind: AccessKind) -> Self {
        Self {
            id: id.into(),
            kind,
            permissions: Vec::new(),
            forced_streams: Vec::new(),
        }
    }

    pub fn personal(id: impl Into<String>) -> Self {
        Self::new(id, AccessKind::Personal)
    }

    pub fn app(id: impl Into<String>) -> Self {
        Self::new(id, AccessKind::App)
    }

    /// Builder-style grant.
    pub fn grant(mut self, stream_id: impl Into<StreamId>, level: PermissionLevel) -> Self {
        self.permissions.push(PermissionEntry::new(stream_id, level));
        self
    }

    /// Builder-style forced stream.
    pub fn force(mut self, stream_id: impl Into<StreamId>) -> Self {
        self.forced_streams.push(stream_id.into());
        self
    }

    pub fn is_personal(&self) -> bool {
        self.kind == AccessKind::Personal
    }
}
