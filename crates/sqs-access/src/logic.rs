//! Permission evaluation over a stream tree.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqs_query::IdConventions;
use sqs_store::DescendantLookup;
use sqs_types::{PermissionEntry, PermissionLevel, StoreId, StreamId};

use crate::access::Access;
use crate::error::{AccessError, AccessResult};

/// Read-only questions the resolver asks about the calling access.
///
/// Every store id passed in is a resolved store; every stream id is
/// store-local and unmarked.
#[async_trait]
pub trait CallerPermissions: Send + Sync {
    /// The raw permission entries of the access.
    fn permissions(&self) -> &[PermissionEntry];

    /// Whether the caller may read every stream of the store.
    async fn has_blanket_read(&self, store_id: &StoreId) -> AccessResult<bool>;

    /// Whether the caller may read events of this stream.
    async fn can_read_stream(&self, id: &StreamId, store_id: &StoreId) -> AccessResult<bool>;

    /// Streams the caller was explicitly granted read on, in grant order.
    async fn readable_root_ids(&self, store_id: &StoreId) -> AccessResult<Vec<StreamId>>;

    /// Streams that every read in the store must also match.
    async fn forced_stream_ids(&self, store_id: &StoreId) -> AccessResult<Vec<StreamId>>;

    /// Streams that every read in the store must exclude.
    async fn forbidden_stream_ids(&self, store_id: &StoreId) -> AccessResult<Vec<StreamId>>;
}

/// Entries of one store, split off their prefixes.
#[derive(Debug, Default)]
struct StoreGrants {
    store_wide: Option<PermissionLevel>,
    /// Stream-level entries, in grant order.
    entries: Vec<(StreamId, PermissionLevel)>,
    forced: Vec<StreamId>,
}

impl StoreGrants {
    fn level_of(&self, id: &StreamId) -> Option<PermissionLevel> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == id)
            .map(|(_, level)| *level)
    }
}

/// [`CallerPermissions`] for an [`Access`], backed by a descendant lookup
/// for ancestry.
pub struct AccessLogic {
    access: Access,
    lookup: Arc<dyn DescendantLookup>,
    grants: HashMap<StoreId, StoreGrants>,
}

impl AccessLogic {
    /// Index the access's grants per store.
    ///
    /// Rejects empty or marked ids, a forced wildcard, and two entries on
    /// the same stream.
    pub fn new(
        access: Access,
        conventions: &IdConventions,
        lookup: Arc<dyn DescendantLookup>,
    ) -> AccessResult<Self> {
        let mut grants: HashMap<StoreId, StoreGrants> = HashMap::new();

        for entry in &access.permissions {
            let (store_id, local) = Self::split_entry(&entry.stream_id, conventions)?;
            let store = grants.entry(store_id).or_default();
            if local.is_wildcard() {
                if store.store_wide.replace(entry.level).is_some() {
                    return Err(AccessError::DuplicateEntry(entry.stream_id.clone()));
                }
            } else if store.level_of(&local).is_some() {
                return Err(AccessError::DuplicateEntry(entry.stream_id.clone()));
            } else {
                store.entries.push((local, entry.level));
            }
        }

        for forced in &access.forced_streams {
            let (store_id, local) = Self::split_entry(forced, conventions)?;
            if local.is_wildcard() {
                return Err(AccessError::InvalidEntry {
                    id: forced.clone(),
                    reason: "a forced stream cannot be the wildcard".into(),
                });
            }
            grants.entry(store_id).or_default().forced.push(local);
        }

        tracing::debug!(
            access = %access.id,
            kind = ?access.kind,
            stores = grants.len(),
            "access permissions indexed"
        );
        Ok(Self {
            access,
            lookup,
            grants,
        })
    }

    fn split_entry(
        id: &StreamId,
        conventions: &IdConventions,
    ) -> AccessResult<(StoreId, StreamId)> {
        let invalid = |reason: &str| AccessError::InvalidEntry {
            id: id.clone(),
            reason: reason.into(),
        };
        if id.as_str().is_empty() {
            return Err(invalid("empty stream id"));
        }
        if conventions.is_no_expand(id) {
            return Err(invalid("permission ids cannot carry the no-expand marker"));
        }
        let (store_id, local) = conventions.split(id.as_str());
        if local.is_empty() {
            return Err(invalid("empty stream id"));
        }
        Ok((store_id, StreamId::from(local)))
    }

    pub fn access(&self) -> &Access {
        &self.access
    }

    /// The level deciding access to a stream: the nearest ancestor (the
    /// stream included) with an explicit entry, else the store-wide entry.
    pub async fn level_for(
        &self,
        id: &StreamId,
        store_id: &StoreId,
    ) -> AccessResult<Option<PermissionLevel>> {
        let Some(grants) = self.grants.get(store_id) else {
            return Ok(None);
        };
        let chain = match self.lookup.ancestors(id, store_id).await? {
            Some(chain) => chain,
            None => vec![id.clone()],
        };
        let explicit = chain.iter().find_map(|ancestor| grants.level_of(ancestor));
        Ok(explicit.or(grants.store_wide))
    }
}

impl std::fmt::Debug for AccessLogic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessLogic")
            .field("access", &self.access.id)
            .field("stores", &self.grants.len())
            .finish()
    }
}

#[async_trait]
impl CallerPermissions for AccessLogic {
    fn permissions(&self) -> &[PermissionEntry] {
        &self.access.permissions
    }

    async fn has_blanket_read(&self, store_id: &StoreId) -> AccessResult<bool> {
        if self.access.is_personal() {
            return Ok(true);
        }
        Ok(self
            .grants
            .get(store_id)
            .and_then(|g| g.store_wide)
            .is_some_and(|level| level.can_read()))
    }

    async fn can_read_stream(&self, id: &StreamId, store_id: &StoreId) -> AccessResult<bool> {
        if self.access.is_personal() {
            return Ok(true);
        }
        let level = self.level_for(id, store_id).await?;
        tracing::trace!(stream = %id, store = %store_id, ?level, "read permission evaluated");
        Ok(level.is_some_and(|l| l.can_read()))
    }

    async fn readable_root_ids(&self, store_id: &StoreId) -> AccessResult<Vec<StreamId>> {
        Ok(self
            .grants
            .get(store_id)
            .map(|g| {
                g.entries
                    .iter()
                    .filter(|(_, level)| level.can_read())
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn forced_stream_ids(&self, store_id: &StoreId) -> AccessResult<Vec<StreamId>> {
        Ok(self
            .grants
            .get(store_id)
            .map(|g| g.forced.clone())
            .unwrap_or_default())
    }

    async fn forbidden_stream_ids(&self, store_id: &StoreId) -> AccessResult<Vec<StreamId>> {
        Ok(self
            .grants
            .get(store_id)
            .map(|g| {
                g.entries
                    .iter()
                    .filter(|(_, level)| level.forbids_read())
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}
