//! # shelfsync-index
//!
//! Zero-downtime rebuilds of catalog search collections.
//!
//! Readers query a stable alias (`{type}_{site}`). A rebuild creates a fresh,
//! timestamped collection (`{type}_{site}_{ts}`), fills it page by page, and
//! then repoints the alias in a single request. Readers never see a
//! half-written collection.
//!
//! ## Components
//!
//! - [`CollectionNamer`](naming::CollectionNamer): alias and collection names
//! - [`AliasResolver`](alias::AliasResolver): current, newer and older collections of a type
//! - [`CollectionLifecycleManager`](lifecycle::CollectionLifecycleManager):
//!   begin, activate, reap, stale cleanup, rollback, status
//! - [`BatchIndexer`](indexer::BatchIndexer): one page of ingestion per call
//! - [`rebuild`](rebuild::rebuild): the whole loop in one call
//!
//! The search engine and the content source are traits
//! ([`SearchEngine`](engine::SearchEngine), [`ContentSource`](source::ContentSource));
//! a Typesense client and an in-memory engine are provided in [`backends`].
//!
//! ## Driving a rebuild across requests
//!
//! Nothing here keeps state between calls. The caller holds a
//! [`SyncSession`](session::SyncSession) and feeds it back in:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use shelfsync_index::backends::memory::InMemoryEngine;
//! use shelfsync_index::config::IndexConfig;
//! use shelfsync_index::indexer::BatchIndexer;
//! use shelfsync_index::lifecycle::CollectionLifecycleManager;
//! use shelfsync_index::source::{ContentSource, StaticSource};
//!
//! # async fn example(source: StaticSource) -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Arc::new(InMemoryEngine::new());
//! let manager = CollectionLifecycleManager::new(engine.clone(), IndexConfig::for_site("shop"))?;
//! let indexer = BatchIndexer::new(engine);
//!
//! let mut session = manager.begin("product", &source.schema()).await?.session;
//! let pages = indexer.page_count(&source, session.page_size).await?;
//! while !session.is_complete(pages) {
//!     indexer.process_session(&mut session, &source).await?;
//! }
//! manager.activate("product", &session.target_collection).await?;
//! # Ok(())
//! # }
//! ```

pub mod alias;
pub mod backends;
pub mod clock;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod indexer;
pub mod lifecycle;
pub mod naming;
pub mod rebuild;
pub mod schema;
pub mod session;
pub mod source;

pub use config::{ImportAction, IndexConfig};
pub use document::Document;
pub use engine::SearchEngine;
pub use error::{EngineError, IndexError, IndexResult};
pub use indexer::{BatchIndexer, PageStats};
pub use lifecycle::CollectionLifecycleManager;
pub use schema::SchemaDefinition;
pub use session::SyncSession;
pub use source::ContentSource;
