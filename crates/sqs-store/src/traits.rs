use async_trait::async_trait;
use sqs_types::{StoreId, Stream, StreamId, StreamState};

use crate::error::{StoreError, StoreResult};

/// A store's forest of streams, seen read-only.
///
/// All implementations must satisfy these invariants:
/// - `Ok(None)` means the stream does not exist; it is never used for
///   "exists but expands to nothing".
/// - Expansion returns the seed first, then its descendants, without
///   duplicates.
/// - Calls are idempotent and side-effect free for a given snapshot.
/// - Backend failures surface as `Err`, never as empty results.
#[async_trait]
pub trait StreamTree: Send + Sync {
    /// Look up a single stream by its store-local id.
    async fn find(&self, id: &StreamId) -> StoreResult<Option<Stream>>;

    /// The seed and all of its descendants.
    ///
    /// Subtrees rooted at an `excluded` id are pruned, as are trashed
    /// subtrees unless `state` includes trashed streams. The wildcard seed
    /// expands every root of the store.
    async fn expand(
        &self,
        id: &StreamId,
        excluded: &[StreamId],
        state: StreamState,
    ) -> StoreResult<Option<Vec<StreamId>>>;

    /// The stream followed by its ancestors, nearest first.
    ///
    /// Default implementation walks parent links with [`Self::find`].
    /// Backends may override for better performance (e.g., one query).
    async fn ancestors(&self, id: &StreamId) -> StoreResult<Option<Vec<StreamId>>> {
        let Some(mut current) = self.find(id).await? else {
            return Ok(None);
        };
        let mut chain = vec![current.id.clone()];
        while let Some(parent_id) = current.parent_id.clone() {
            if chain.contains(&parent_id) {
                return Err(StoreError::Cycle(parent_id));
            }
            match self.find(&parent_id).await? {
                Some(parent) => {
                    chain.push(parent.id.clone());
                    current = parent;
                }
                None => break,
            }
        }
        Ok(Some(chain))
    }
}

/// Descendant lookup across stores: the capability handed to the resolver.
#[async_trait]
pub trait DescendantLookup: Send + Sync {
    /// Look up a stream in a store. Unknown stores hold no streams.
    async fn find(&self, id: &StreamId, store_id: &StoreId) -> StoreResult<Option<Stream>>;

    /// Expand a seed in a store; see [`StreamTree::expand`].
    async fn expand(
        &self,
        id: &StreamId,
        store_id: &StoreId,
        excluded: &[StreamId],
        state: StreamState,
    ) -> StoreResult<Option<Vec<StreamId>>>;

    /// Ancestor chain of a stream in a store; see [`StreamTree::ancestors`].
    async fn ancestors(
        &self,
        id: &StreamId,
        store_id: &StoreId,
    ) -> StoreResult<Option<Vec<StreamId>>>;
}
