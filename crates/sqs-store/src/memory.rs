//! In-memory stream forest for testing and embedding.
//!
//! [`InMemoryStreamTree`] keeps all streams in a `HashMap` protected by a
//! `RwLock`, with a child index for expansion. It implements the full
//! [`StreamTree`] trait.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use sqs_types::{Stream, StreamId, StreamState};

use crate::error::{StoreError, StoreResult};
use crate::traits::StreamTree;

#[derive(Debug, Default)]
struct Forest {
    streams: HashMap<StreamId, Stream>,
    /// Children of each stream, in insertion order.
    children: HashMap<StreamId, Vec<StreamId>>,
    /// Root ids, in insertion order.
    roots: Vec<StreamId>,
}

impl Forest {
    fn insert(&mut self, stream: Stream) -> StoreResult<()> {
        if stream.id.is_wildcard() {
            return Err(StoreError::ReservedId(stream.id));
        }
        if self.streams.contains_key(&stream.id) {
            return Err(StoreError::DuplicateStream(stream.id));
        }
        match &stream.parent_id {
            Some(parent) if !self.streams.contains_key(parent) => {
                return Err(StoreError::MissingParent {
                    id: stream.id.clone(),
                    parent: parent.clone(),
                });
            }
            Some(parent) => self
                .children
                .entry(parent.clone())
                .or_default()
                .push(stream.id.clone()),
            None => self.roots.push(stream.id.clone()),
        }
        self.streams.insert(stream.id.clone(), stream);
        Ok(())
    }

    /// Pre-order walk from `seeds`, pruning excluded and hidden subtrees.
    fn collect(
        &self,
        seeds: &[StreamId],
        excluded: &HashSet<&StreamId>,
        include_trashed: bool,
    ) -> Vec<StreamId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack: Vec<&StreamId> = seeds.iter().rev().collect();
        while let Some(id) = stack.pop() {
            if excluded.contains(id) || !seen.insert(id) {
                continue;
            }
            let Some(stream) = self.streams.get(id) else {
                continue;
            };
            if stream.trashed && !include_trashed {
                continue;
            }
            out.push(id.clone());
            if let Some(children) = self.children.get(id) {
                stack.extend(children.iter().rev());
            }
        }
        out
    }
}

/// An in-memory implementation of [`StreamTree`].
///
/// Parents must be inserted before their children, so the forest is
/// acyclic by construction. Data is lost when the tree is dropped.
#[derive(Debug, Default)]
pub struct InMemoryStreamTree {
    forest: RwLock<Forest>,
}

impl InMemoryStreamTree {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from streams in any order.
    ///
    /// Fails on duplicate ids, dangling parents and parent cycles.
    pub fn from_streams(streams: Vec<Stream>) -> StoreResult<Self> {
        let mut pending: Vec<Stream> = streams;
        let tree = Self::new();
        loop {
            let before = pending.len();
            let mut deferred = Vec::new();
            for stream in pending {
                let ready = match &stream.parent_id {
                    None => true,
                    Some(parent) => tree.contains(parent)?,
                };
                if ready {
                    tree.insert(stream)?;
                } else {
                    deferred.push(stream);
                }
            }
            if deferred.is_empty() {
                return Ok(tree);
            }
            if deferred.len() == before {
                return Err(Self::diagnose(&deferred));
            }
            pending = deferred;
        }
    }

    /// Explain why streams could not be attached: a cycle among them, or a
    /// parent that does not exist at all.
    fn diagnose(stuck: &[Stream]) -> StoreError {
        let parents: HashMap<&StreamId, Option<&StreamId>> = stuck
            .iter()
            .map(|s| (&s.id, s.parent_id.as_ref()))
            .collect();
        for stream in stuck {
            let mut visited = HashSet::new();
            let mut cursor = Some(&stream.id);
            while let Some(id) = cursor {
                if !visited.insert(id) {
                    return StoreError::Cycle(id.clone());
                }
                match parents.get(id) {
                    Some(parent) => cursor = *parent,
                    None => break,
                }
            }
        }
        let first = &stuck[0];
        StoreError::MissingParent {
            id: first.id.clone(),
            parent: first.parent_id.clone().unwrap_or_else(|| first.id.clone()),
        }
    }

    /// Insert a stream. Its parent, if any, must already be present.
    pub fn insert(&self, stream: Stream) -> StoreResult<()> {
        let mut forest = self
            .forest
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        forest.insert(stream)
    }

    /// Flag or unflag a stream as trashed. Returns `false` if unknown.
    pub fn set_trashed(&self, id: &StreamId, trashed: bool) -> StoreResult<bool> {
        let mut forest = self
            .forest
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        match forest.streams.get_mut(id) {
            Some(stream) => {
                stream.trashed = trashed;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn contains(&self, id: &StreamId) -> StoreResult<bool> {
        let forest = self
            .forest
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        Ok(forest.streams.contains_key(id))
    }

    /// Number of streams in the tree.
    pub fn len(&self) -> usize {
        self.forest.read().map(|f| f.streams.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StreamTree for InMemoryStreamTree {
    async fn find(&self, id: &StreamId) -> StoreResult<Option<Stream>> {
        let forest = self
            .forest
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        Ok(forest.streams.get(id).cloned())
    }

    async fn expand(
        &self,
        id: &StreamId,
        excluded: &[StreamId],
        state: StreamState,
    ) -> StoreResult<Option<Vec<StreamId>>> {
        let forest = self
            .forest
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        let excluded: HashSet<&StreamId> = excluded.iter().collect();
        let include_trashed = state.includes_trashed();

        if id.is_wildcard() {
            return Ok(Some(forest.collect(&forest.roots, &excluded, include_trashed)));
        }
        if !forest.streams.contains_key(id) {
            return Ok(None);
        }
        let expanded = forest.collect(std::slice::from_ref(id), &excluded, include_trashed);
        tracing::trace!(seed = %id, count = expanded.len(), "stream expanded");
        Ok(Some(expanded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<StreamId> {
        list.iter().map(|s| StreamId::from(*s)).collect()
    }

    /// work ─┬─ meetings ── standup
    ///       └─ travel (trashed)
    /// home ─── diary
    fn sample() -> InMemoryStreamTree {
        InMemoryStreamTree::from_streams(vec![
            Stream::child("standup", "meetings"),
            Stream::root("work"),
            Stream::child("meetings", "work"),
            Stream::child("travel", "work").trashed(true),
            Stream::root("home"),
            Stream::child("diary", "home"),
        ])
        .unwrap()
    }

    // ---- Test 1: Expansion includes the seed and all descendants ----
    #[tokio::test]
    async fn expand_includes_descendants() {
        let tree = sample();
        let out = tree
            .expand(&"work".into(), &[], StreamState::All)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out, ids(&["work", "meetings", "standup", "travel"]));
    }

    // ---- Test 2: Default state prunes trashed subtrees ----
    #[tokio::test]
    async fn default_state_hides_trashed() {
        let tree = sample();
        let out = tree
            .expand(&"work".into(), &[], StreamState::Default)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out, ids(&["work", "meetings", "standup"]));

        let trashed_seed = tree
            .expand(&"travel".into(), &[], StreamState::Default)
            .await
            .unwrap();
        assert_eq!(trashed_seed, Some(Vec::new()));
    }

    // ---- Test 3: Excluded ids prune their whole subtree ----
    #[tokio::test]
    async fn exclusions_prune_subtrees() {
        let tree = sample();
        let out = tree
            .expand(&"work".into(), &ids(&["meetings"]), StreamState::All)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out, ids(&["work", "travel"]));

        let seed_excluded = tree
            .expand(&"work".into(), &ids(&["work"]), StreamState::All)
            .await
            .unwrap();
        assert_eq!(seed_excluded, Some(Vec::new()));
    }

    // ---- Test 4: Missing stream is None, not empty ----
    #[tokio::test]
    async fn missing_stream_is_none() {
        let tree = sample();
        let out = tree.expand(&"ghost".into(), &[], StreamState::All).await.unwrap();
        assert!(out.is_none());
        assert!(tree.find(&"ghost".into()).await.unwrap().is_none());
    }

    // ---- Test 5: Wildcard expands every root ----
    #[tokio::test]
    async fn wildcard_expands_everything() {
        let tree = sample();
        let out = tree
            .expand(&StreamId::wildcard(), &ids(&["home"]), StreamState::Default)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out, ids(&["work", "meetings", "standup"]));
    }

    // ---- Test 6: Ancestor chain, nearest first ----
    #[tokio::test]
    async fn ancestors_nearest_first() {
        let tree = sample();
        let chain = tree.ancestors(&"standup".into()).await.unwrap().unwrap();
        assert_eq!(chain, ids(&["standup", "meetings", "work"]));
        assert!(tree.ancestors(&"ghost".into()).await.unwrap().is_none());
    }

    // ---- Test 7: Construction errors ----
    #[test]
    fn rejects_duplicates_and_dangling_parents() {
        let dup = InMemoryStreamTree::from_streams(vec![Stream::root("a"), Stream::root("a")]);
        assert!(matches!(dup, Err(StoreError::DuplicateStream(_))));

        let dangling = InMemoryStreamTree::from_streams(vec![Stream::child("a", "nowhere")]);
        assert!(matches!(dangling, Err(StoreError::MissingParent { .. })));

        let wildcard = InMemoryStreamTree::from_streams(vec![Stream::root("*")]);
        assert!(matches!(wildcard, Err(StoreError::ReservedId(_))));
    }

    #[test]
    fn rejects_cycles() {
        let cyclic = InMemoryStreamTree::from_streams(vec![
            Stream::child("a", "b"),
            Stream::child("b", "a"),
        ]);
        assert!(matches!(cyclic, Err(StoreError::Cycle(_))));
    }

    // ---- Test 8: Trash flag can be toggled ----
    #[tokio::test]
    async fn set_trashed_toggles_visibility() {
        let tree = sample();
        assert!(tree.set_trashed(&"meetings".into(), true).unwrap());
        assert!(!tree.set_trashed(&"ghost".into(), true).unwrap());
        let out = tree
            .expand(&"work".into(), &[], StreamState::Default)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out, ids(&["work"]));
        assert_eq!(tree.len(), 6);
    }
}
