//! Alias resolution and generation partitioning.
//!
//! For one collection type, the alias names the *current* collection. Every
//! other collection of the type is either:
//!
//! - **newer** than the current one: debris from a rebuild that was started
//!   but never activated, or
//! - **older**: a retired generation kept for retention or awaiting deletion.
//!
//! ```text
//!   newest ─────────────────────────────────────────────▶ oldest
//!   product_shop_3000   product_shop_2000   product_shop_1000
//!        (newer)            (current)            (older)
//! ```
//!
//! With no alias (bootstrap) nothing was ever activated, so every existing
//! collection of the type counts as newer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::SearchEngine;
use crate::error::EngineResult;
use crate::naming::CollectionNamer;

/// The alias target and every collection of one type at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSnapshot {
    /// Collection the alias points to, if the alias exists.
    pub current: Option<String>,
    /// Every collection of the type, newest first.
    pub collections: Vec<String>,
}

impl TypeSnapshot {
    /// Builds a snapshot, sorting `collections` newest first.
    pub fn new(current: Option<String>, mut collections: Vec<String>) -> Self {
        sort_newest_first(&mut collections);
        Self {
            current,
            collections,
        }
    }

    fn current_timestamp(&self) -> Option<i64> {
        self.current
            .as_deref()
            .map(CollectionNamer::extract_timestamp)
    }

    fn is_current(&self, name: &str) -> bool {
        self.current.as_deref() == Some(name)
    }

    /// Collections newer than the current one, newest first.
    pub fn newer(&self) -> Vec<String> {
        match self.current_timestamp() {
            None => self.collections.clone(),
            Some(current_ts) => self
                .collections
                .iter()
                .filter(|name| !self.is_current(name))
                .filter(|name| CollectionNamer::extract_timestamp(name) > current_ts)
                .cloned()
                .collect(),
        }
    }

    /// Collections strictly older than the current one, newest first.
    pub fn older(&self) -> Vec<String> {
        match self.current_timestamp() {
            None => Vec::new(),
            Some(current_ts) => self
                .collections
                .iter()
                .filter(|name| !self.is_current(name))
                .filter(|name| CollectionNamer::extract_timestamp(name) < current_ts)
                .cloned()
                .collect(),
        }
    }

    /// Older collections beyond the `keep_count` most recent ones.
    ///
    /// `keep_count` counts prior generations only; the current collection is
    /// never part of the result. The result has `older().len() - keep_count`
    /// entries, or none if there are no more than `keep_count`.
    pub fn older_beyond(&self, keep_count: usize) -> Vec<String> {
        self.older().into_iter().skip(keep_count).collect()
    }

    /// Largest timestamp embedded in any collection of the type.
    pub fn newest_timestamp(&self) -> Option<i64> {
        self.collections
            .iter()
            .map(|name| CollectionNamer::extract_timestamp(name))
            .max()
    }
}

/// Sorts collection names by embedded timestamp, newest first.
///
/// Ties (including every malformed name, which all carry timestamp 0) are
/// broken by name so the order is deterministic.
pub fn sort_newest_first(names: &mut [String]) {
    names.sort_by(|a, b| {
        CollectionNamer::extract_timestamp(b)
            .cmp(&CollectionNamer::extract_timestamp(a))
            .then_with(|| b.cmp(a))
    });
}

/// Resolves aliases and lists collections for collection types.
#[derive(Debug)]
pub struct AliasResolver<E: SearchEngine> {
    engine: Arc<E>,
    namer: CollectionNamer,
}

impl<E: SearchEngine> Clone for AliasResolver<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            namer: self.namer.clone(),
        }
    }
}

impl<E: SearchEngine> AliasResolver<E> {
    /// Creates a resolver.
    pub fn new(engine: Arc<E>, namer: CollectionNamer) -> Self {
        Self { engine, namer }
    }

    /// Returns the namer.
    pub fn namer(&self) -> &CollectionNamer {
        &self.namer
    }

    /// Returns the collection the type's alias points to; `None` on bootstrap.
    pub async fn current_collection(&self, collection_type: &str) -> EngineResult<Option<String>> {
        self.engine
            .get_alias(&self.namer.alias_name(collection_type))
            .await
    }

    /// Every collection of the type, newest first.
    pub async fn all_collections(&self, collection_type: &str) -> EngineResult<Vec<String>> {
        let mut names: Vec<String> = self
            .engine
            .list_collections()
            .await?
            .into_iter()
            .filter(|name| self.namer.belongs_to(collection_type, name))
            .collect();
        sort_newest_first(&mut names);
        tracing::debug!(
            collection_type = %collection_type,
            count = names.len(),
            "Listed collections"
        );
        Ok(names)
    }

    /// Resolves the alias and lists collections together.
    pub async fn snapshot(&self, collection_type: &str) -> EngineResult<TypeSnapshot> {
        let current = self.current_collection(collection_type).await?;
        let collections = self.all_collections(collection_type).await?;
        Ok(TypeSnapshot::new(current, collections))
    }

    /// Collections left behind by rebuilds that never reached activation.
    pub async fn newer_than_current(&self, collection_type: &str) -> EngineResult<Vec<String>> {
        Ok(self.snapshot(collection_type).await?.newer())
    }

    /// Collections older than the current one, beyond the `keep_count` most recent.
    pub async fn older_than_current(
        &self,
        collection_type: &str,
        keep_count: usize,
    ) -> EngineResult<Vec<String>> {
        Ok(self.snapshot(collection_type).await?.older_beyond(keep_count))
    }
}
