//! TOML fixtures: stores, their streams, and the calling access.
//!
//! ```toml
//! [resolver]
//! timeout = { secs = 5, nanos = 0 }
//!
//! [access]
//! id = "diary-app"
//! kind = "app"
//! forcedStreams = []
//!
//! [[access.permissions]]
//! streamId = "diary"
//! level = "read"
//!
//! [[stores.local.streams]]
//! id = "diary"
//!
//! [[stores.local.streams]]
//! id = "travel"
//! parentId = "diary"
//! trashed = true
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;
use sqs_access::Access;
use sqs_resolve::ResolverConfig;
use sqs_store::{InMemoryStreamTree, StoreRegistry};
use sqs_types::Stream;

#[derive(Debug, Default, Deserialize)]
pub struct StoreFixture {
    #[serde(default)]
    pub streams: Vec<Stream>,
}

#[derive(Debug, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub resolver: ResolverConfig,
    pub access: Access,
    #[serde(default)]
    pub stores: BTreeMap<String, StoreFixture>,
}

impl Fixture {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read fixture {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid fixture {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// One in-memory tree per store.
    pub fn registry(&self) -> anyhow::Result<StoreRegistry> {
        let mut registry = StoreRegistry::new();
        for (store, fixture) in &self.stores {
            let tree = InMemoryStreamTree::from_streams(fixture.streams.clone())
                .with_context(|| format!("invalid streams in store {store}"))?;
            registry.register(store.as_str(), Arc::new(tree))?;
        }
        Ok(registry)
    }
}
