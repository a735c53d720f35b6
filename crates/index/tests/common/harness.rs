//! A lifecycle manager and indexer wired to an in-memory engine and a
//! manual clock.

use std::sync::Arc;

use shelfsync_index::backends::memory::InMemoryEngine;
use shelfsync_index::clock::ManualClock;
use shelfsync_index::config::IndexConfig;
use shelfsync_index::indexer::BatchIndexer;
use shelfsync_index::lifecycle::CollectionLifecycleManager;
use shelfsync_index::schema::SchemaDefinition;

use super::fixtures::product_schema;

/// Everything a lifecycle test needs.
pub struct TestContext {
    pub engine: Arc<InMemoryEngine>,
    pub clock: Arc<ManualClock>,
    pub manager: CollectionLifecycleManager<InMemoryEngine>,
    pub indexer: BatchIndexer<InMemoryEngine>,
}

impl TestContext {
    /// Creates a context for site `shop` at time `now`.
    pub fn new(now: i64) -> Self {
        Self::with_config(IndexConfig::for_site("shop"), now)
    }

    /// Creates a context with a custom configuration.
    pub fn with_config(config: IndexConfig, now: i64) -> Self {
        let engine = Arc::new(InMemoryEngine::new());
        let clock = Arc::new(ManualClock::new(now));
        let manager = CollectionLifecycleManager::new(engine.clone(), config)
            .expect("test config is valid")
            .with_clock(clock.clone());
        let indexer = BatchIndexer::new(engine.clone());
        Self {
            engine,
            clock,
            manager,
            indexer,
        }
    }

    /// Seeds an active generation: collection `{type}_shop_{ts}` behind the alias.
    pub fn seed_active(&self, collection_type: &str, ts: i64) -> String {
        let name = self.seed_collection(collection_type, ts);
        self.engine
            .seed_alias(format!("{}_shop", collection_type), name.clone());
        name
    }

    /// Seeds a collection without touching the alias.
    pub fn seed_collection(&self, collection_type: &str, ts: i64) -> String {
        let name = format!("{}_shop_{}", collection_type, ts);
        self.engine.seed_collection(name.clone(), self.schema());
        name
    }

    fn schema(&self) -> SchemaDefinition {
        product_schema()
    }
}
