//! In-process full rebuild: begin, every page, activate.
//!
//! This is the outer loop an external driver would otherwise run across
//! bounded requests, collapsed into a single call for command-line use.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::SearchEngine;
use crate::error::{IndexError, IndexResult};
use crate::indexer::BatchIndexer;
use crate::lifecycle::{ActivationReport, CollectionLifecycleManager};
use crate::session::SyncSession;
use crate::source::ContentSource;

/// Options for [`rebuild`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildOptions {
    /// Identifiers per page.
    pub page_size: u64,
    /// Upper bound on pages processed, guarding against a source whose
    /// count keeps growing.
    pub max_iterations: u64,
}

impl Default for RebuildOptions {
    fn default() -> Self {
        Self {
            page_size: 5,
            max_iterations: 1000,
        }
    }
}

/// Result of a completed rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
    /// Final session counters.
    pub session: SyncSession,
    /// The cutover.
    pub activation: ActivationReport,
    /// Pages processed.
    pub pages_processed: u64,
    /// Wall time.
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Rebuilds the collection of `source`'s type and activates it.
///
/// Stops without activating if a page fails in transport, the source
/// cannot be read, or `max_iterations` pages were processed before the
/// source was exhausted. The new collection is left for the next `begin` to
/// clean up and the alias keeps pointing at the previous generation.
///
/// A zero `page_size` or `max_iterations` is refused before anything is
/// created.
pub async fn rebuild<E, S>(
    manager: &CollectionLifecycleManager<E>,
    indexer: &BatchIndexer<E>,
    source: &S,
    options: RebuildOptions,
) -> IndexResult<RebuildReport>
where
    E: SearchEngine,
    S: ContentSource,
{
    if options.page_size == 0 || options.max_iterations == 0 {
        return Err(IndexError::InvalidConfig {
            message: format!(
                "rebuild needs a positive page size and iteration limit, got page_size={} max_iterations={}",
                options.page_size, options.max_iterations
            ),
        });
    }

    let started = Instant::now();
    let collection_type = source.collection_type().to_string();

    let begun = manager.begin(&collection_type, &source.schema()).await?;
    let mut session = SyncSession {
        page_size: options.page_size,
        ..begun.session
    };

    let total_pages = indexer.page_count(source, options.page_size).await?;
    info!(
        collection_type = %collection_type,
        collection = %session.target_collection,
        total_pages,
        page_size = options.page_size,
        "Starting rebuild"
    );

    let mut pages_processed = 0;
    while !session.is_complete(total_pages) {
        if pages_processed >= options.max_iterations {
            warn!(
                collection_type = %collection_type,
                collection = %session.target_collection,
                max_iterations = options.max_iterations,
                total_pages,
                "Rebuild reached iteration limit before the source was exhausted"
            );
            return Err(IndexError::RebuildAborted {
                collection_type,
                page: session.page,
                reason: format!("iteration limit of {} pages reached", options.max_iterations),
            });
        }

        let stats = indexer.process_session(&mut session, source).await?;
        pages_processed += 1;

        if stats.transport_failed {
            return Err(IndexError::RebuildAborted {
                collection_type,
                page: stats.page,
                reason: "bulk import failed in transport".to_string(),
            });
        }
        if stats.is_empty() {
            break;
        }
    }

    let activation = manager
        .activate(&collection_type, &session.target_collection)
        .await?;

    let elapsed = started.elapsed();
    info!(
        collection_type = %collection_type,
        collection = %activation.collection,
        pages = pages_processed,
        seen = session.total_seen,
        imported = session.imported_count,
        elapsed_ms = elapsed.as_millis() as u64,
        "Rebuild complete"
    );

    Ok(RebuildReport {
        session,
        activation,
        pages_processed,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backends::memory::InMemoryEngine;
    use crate::clock::ManualClock;
    use crate::config::IndexConfig;
    use crate::document::Document;
    use crate::schema::{FieldType, SchemaDefinition};
    use crate::source::StaticSource;
    use serde_json::json;

    fn source(n: usize) -> StaticSource {
        let mut source = StaticSource::new(
            "page",
            SchemaDefinition::new().field("title", FieldType::String),
        );
        for i in 1..=n {
            source.push_document(Document::new(json!({"id": i, "title": "t"})).unwrap());
        }
        source
    }

    fn seed_active(engine: &InMemoryEngine) {
        engine.seed_collection(
            "page_shop_100",
            SchemaDefinition::new().field("title", FieldType::String),
        );
        engine.seed_alias("page_shop", "page_shop_100");
    }

    fn setup() -> (
        Arc<InMemoryEngine>,
        CollectionLifecycleManager<InMemoryEngine>,
        BatchIndexer<InMemoryEngine>,
    ) {
        let engine = Arc::new(InMemoryEngine::new());
        let manager = CollectionLifecycleManager::new(engine.clone(), IndexConfig::for_site("shop"))
            .unwrap()
            .with_clock(Arc::new(ManualClock::new(500)));
        let indexer = BatchIndexer::new(engine.clone());
        (engine, manager, indexer)
    }

    #[tokio::test]
    async fn test_rebuild_activates() {
        let (engine, manager, indexer) = setup();
        let report = rebuild(&manager, &indexer, &source(12), RebuildOptions::default())
            .await
            .unwrap();

        assert_eq!(report.pages_processed, 3);
        assert_eq!(report.session.total_seen, 12);
        assert_eq!(report.session.imported_count, 12);
        assert_eq!(report.activation.collection, "page_shop_500");
        assert_eq!(
            engine.alias_target("page_shop").as_deref(),
            Some("page_shop_500")
        );
    }

    #[tokio::test]
    async fn test_rebuild_of_empty_source_activates_empty_collection() {
        let (engine, manager, indexer) = setup();
        let report = rebuild(&manager, &indexer, &source(0), RebuildOptions::default())
            .await
            .unwrap();
        assert_eq!(report.pages_processed, 0);
        assert_eq!(engine.document_count("page_shop_500"), 0);
        assert!(engine.alias_target("page_shop").is_some());
    }

    #[tokio::test]
    async fn test_iteration_limit_aborts_without_activating() {
        let (engine, manager, indexer) = setup();
        seed_active(&engine);

        let options = RebuildOptions {
            page_size: 1,
            max_iterations: 2,
        };
        let err = rebuild(&manager, &indexer, &source(5), options)
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::RebuildAborted { page: 3, .. }));
        assert_eq!(
            engine.alias_target("page_shop").as_deref(),
            Some("page_shop_100")
        );
        assert_eq!(engine.document_count("page_shop_500"), 2);
    }

    #[tokio::test]
    async fn test_iteration_limit_matching_page_count_activates() {
        let (engine, manager, indexer) = setup();
        let options = RebuildOptions {
            page_size: 1,
            max_iterations: 3,
        };
        let report = rebuild(&manager, &indexer, &source(3), options)
            .await
            .unwrap();
        assert_eq!(report.pages_processed, 3);
        assert_eq!(engine.document_count("page_shop_500"), 3);
        assert_eq!(
            engine.alias_target("page_shop").as_deref(),
            Some("page_shop_500")
        );
    }

    #[tokio::test]
    async fn test_zero_options_rejected_before_begin() {
        let (engine, manager, indexer) = setup();
        seed_active(&engine);

        for options in [
            RebuildOptions {
                page_size: 0,
                ..RebuildOptions::default()
            },
            RebuildOptions {
                max_iterations: 0,
                ..RebuildOptions::default()
            },
        ] {
            let err = rebuild(&manager, &indexer, &source(3), options)
                .await
                .unwrap_err();
            assert!(matches!(err, IndexError::InvalidConfig { .. }));
        }

        assert_eq!(engine.collection_names(), vec!["page_shop_100"]);
        assert_eq!(
            engine.alias_target("page_shop").as_deref(),
            Some("page_shop_100")
        );
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_activate() {
        let (engine, manager, indexer) = setup();
        engine.fail_imports(true);

        let err = rebuild(&manager, &indexer, &source(3), RebuildOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::RebuildAborted { page: 1, .. }));
        assert_eq!(engine.alias_target("page_shop"), None);
        assert!(engine.collection_exists("page_shop_500"));
    }
}
