//! Multi-store routing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqs_types::{StoreId, Stream, StreamId, StreamState};

use crate::error::{StoreError, StoreResult};
use crate::traits::{DescendantLookup, StreamTree};

/// Maps store ids to their stream tree backends.
///
/// A store that is not registered holds no streams: every lookup in it
/// answers `Ok(None)`, which the resolver reports as an unknown reference.
#[derive(Clone, Default)]
pub struct StoreRegistry {
    stores: HashMap<StoreId, Arc<dyn StreamTree>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under `store_id`.
    pub fn register(
        &mut self,
        store_id: impl Into<StoreId>,
        tree: Arc<dyn StreamTree>,
    ) -> StoreResult<()> {
        let store_id = store_id.into();
        if self.stores.contains_key(&store_id) {
            return Err(StoreError::DuplicateStore(store_id));
        }
        tracing::debug!(store = %store_id, "store registered");
        self.stores.insert(store_id, tree);
        Ok(())
    }

    /// Builder-style [`Self::register`].
    pub fn with_store(
        mut self,
        store_id: impl Into<StoreId>,
        tree: Arc<dyn StreamTree>,
    ) -> StoreResult<Self> {
        self.register(store_id, tree)?;
        Ok(self)
    }

    pub fn get(&self, store_id: &StoreId) -> Option<&Arc<dyn StreamTree>> {
        self.stores.get(store_id)
    }

    /// Registered store ids, sorted.
    pub fn store_ids(&self) -> Vec<StoreId> {
        let mut ids: Vec<StoreId> = self.stores.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    fn route(&self, store_id: &StoreId) -> Option<&Arc<dyn StreamTree>> {
        let tree = self.stores.get(store_id);
        if tree.is_none() {
            tracing::debug!(store = %store_id, "lookup in unregistered store");
        }
        tree
    }
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("stores", &self.store_ids())
            .finish()
    }
}

#[async_trait]
impl DescendantLookup for StoreRegistry {
    async fn find(&self, id: &StreamId, store_id: &StoreId) -> StoreResult<Option<Stream>> {
        match self.route(store_id) {
            Some(tree) => tree.find(id).await,
            None => Ok(None),
        }
    }

    async fn expand(
        &self,
        id: &StreamId,
        store_id: &StoreId,
        excluded: &[StreamId],
        state: StreamState,
    ) -> StoreResult<Option<Vec<StreamId>>> {
        match self.route(store_id) {
            Some(tree) => tree.expand(id, excluded, state).await,
            None => Ok(None),
        }
    }

    async fn ancestors(
        &self,
        id: &StreamId,
        store_id: &StoreId,
    ) -> StoreResult<Option<Vec<StreamId>>> {
        match self.route(store_id) {
            Some(tree) => tree.ancestors(id).await,
            None => Ok(None),
        }
    }
}
