use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::stream::StreamId;

/// Level of a permission granted on a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionLevel {
    Read,
    Contribute,
    Manage,
    /// May add events to the stream but never read them back.
    CreateOnly,
    /// Explicit denial, typically carving a hole in a wider grant.
    None,
}

impl PermissionLevel {
    /// Whether events on a stream at this level may be read.
    pub fn can_read(&self) -> bool {
        matches!(self, Self::Read | Self::Contribute | Self::Manage)
    }

    /// Whether streams at this level must be excluded from any read scope.
    pub fn forbids_read(&self) -> bool {
        matches!(self, Self::CreateOnly | Self::None)
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Read => "read",
            Self::Contribute => "contribute",
            Self::Manage => "manage",
            Self::CreateOnly => "create-only",
            Self::None => "none",
        };
        f.write_str(s)
    }
}

impl FromStr for PermissionLevel {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "contribute" => Ok(Self::Contribute),
            "manage" => Ok(Self::Manage),
            "create-only" => Ok(Self::CreateOnly),
            "none" => Ok(Self::None),
            other => Err(TypeError::InvalidPermissionLevel(other.to_string())),
        }
    }
}

/// A single grant held by an access.
///
/// `stream_id` is the full, possibly store-prefixed id (`:dummy:a`), or
/// the wildcard for a store-wide grant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionEntry {
    pub stream_id: StreamId,
    pub level: PermissionLevel,
}

impl PermissionEntry {
    pub fn new(stream_id: impl Into<StreamId>, level: PermissionLevel) -> Self {
        Self {
            stream_id: stream_id.into(),
            level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_capable_levels() {
        assert!(PermissionLevel::Read.can_read());
        assert!(PermissionLevel::Contribute.can_read());
        assert!(PermissionLevel::Manage.can_read());
        assert!(!PermissionLevel::CreateOnly.can_read());
        assert!(!PermissionLevel::None.can_read());
        assert!(PermissionLevel::CreateOnly.forbids_read());
        assert!(!PermissionLevel::Manage.forbids_read());
    }

    #[test]
    fn level_round_trips_through_text() {
        for level in [
            PermissionLevel::Read,
            PermissionLevel::Contribute,
            PermissionLevel::Manage,
            PermissionLevel::CreateOnly,
            PermissionLevel::None,
        ] {
            assert_eq!(level.to_string().parse::<PermissionLevel>().unwrap(), level);
        }
        assert_eq!(
            "admin".parse::<PermissionLevel>(),
            Err(TypeError::InvalidPermissionLevel("admin".into()))
        );
    }

    #[test]
    fn entry_deserializes_kebab_level() {
        let entry: PermissionEntry =
            serde_json::from_str(r#"{"streamId":"diary","level":"create-only"}"#).unwrap();
        assert_eq!(entry, PermissionEntry::new("diary", PermissionLevel::CreateOnly));
    }
}
