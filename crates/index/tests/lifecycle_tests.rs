//! Lifecycle integration tests.
//!
//! These run whole rebuild attempts against the in-memory engine: begin,
//! paged ingestion, activation and retention, including interrupted and
//! failing attempts.

mod common;

use std::time::Duration;

use serde_json::json;

use common::*;
use shelfsync_index::config::IndexConfig;
use shelfsync_index::document::Document;
use shelfsync_index::error::{EngineError, IndexError};
use shelfsync_index::indexer::RejectionKind;
use shelfsync_index::lifecycle::CollectionRole;
use shelfsync_index::rebuild::{RebuildOptions, rebuild};
use shelfsync_index::source::{ContentSource, StaticSource};

// ============================================================================
// Begin
// ============================================================================

#[tokio::test]
async fn test_begin_twice_leaves_one_attempt() {
    let ctx = TestContext::new(2000);
    ctx.seed_active("product", 1000);

    let first = ctx.manager.begin("product", &product_schema()).await.unwrap();
    ctx.clock.advance(10);
    let second = ctx.manager.begin("product", &product_schema()).await.unwrap();

    assert_eq!(second.cleanup.deleted, vec![first.session.target_collection.clone()]);
    assert_collections(
        &ctx.engine,
        "product_shop_",
        &["product_shop_1000", "product_shop_2010"],
    );
    assert_alias(&ctx.engine, "product_shop", Some("product_shop_1000"));
}

#[tokio::test]
async fn test_alias_untouched_until_activate() {
    let ctx = TestContext::new(2000);
    ctx.seed_active("product", 1000);
    let source = product_source(7);

    let begun = ctx.manager.begin("product", &source.schema()).await.unwrap();
    assert_eq!(begun.current.as_deref(), Some("product_shop_1000"));

    let mut session = begun.session;
    while !session.is_complete(ctx.indexer.page_count(&source, 5).await.unwrap()) {
        ctx.indexer
            .process_session(&mut session, &source)
            .await
            .unwrap();
        assert_eq!(
            ctx.manager
                .resolver()
                .current_collection("product")
                .await
                .unwrap()
                .as_deref(),
            Some("product_shop_1000")
        );
    }

    ctx.manager
        .activate("product", &session.target_collection)
        .await
        .unwrap();
    assert_alias(&ctx.engine, "product_shop", Some("product_shop_2000"));
}

#[tokio::test]
async fn test_begin_create_failure_propagates() {
    let ctx = TestContext::new(2000);
    ctx.seed_active("product", 1000);
    ctx.seed_collection("product", 1500);
    ctx.engine.fail_create("product_shop_2000");

    let err = ctx
        .manager
        .begin("product", &product_schema())
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::Engine(EngineError::Transport { .. })));

    // The abandoned attempt was still erased; the active one is untouched.
    assert_collections(&ctx.engine, "product_shop_", &["product_shop_1000"]);
    assert_alias(&ctx.engine, "product_shop", Some("product_shop_1000"));
}

#[tokio::test]
async fn test_begin_on_name_conflict() {
    let ctx = TestContext::new(2000);
    // A collection of the type that the alias already considers newest.
    ctx.seed_active("product", 2000);

    let begun = ctx.manager.begin("product", &product_schema()).await.unwrap();
    assert_eq!(begun.session.target_collection, "product_shop_2001");
}

#[tokio::test]
async fn test_begin_cleanup_failure_is_not_fatal() {
    let ctx = TestContext::new(3000);
    ctx.seed_active("product", 1000);
    ctx.seed_collection("product", 2000);
    ctx.engine.fail_delete("product_shop_2000");

    let begun = ctx.manager.begin("product", &product_schema()).await.unwrap();
    assert_eq!(begun.cleanup.failed.len(), 1);
    assert_eq!(begun.cleanup.failed[0].collection, "product_shop_2000");
    assert!(!begun.cleanup.is_clean());
    assert_eq!(begun.session.target_collection, "product_shop_3000");
}

// ============================================================================
// Activation and retention
// ============================================================================

#[tokio::test]
async fn test_rebuild_scenario_retains_one_prior_generation() {
    let ctx = TestContext::new(2000);
    ctx.seed_active("product", 1000);
    let source = product_source(10);

    let begun = ctx.manager.begin("product", &source.schema()).await.unwrap();
    assert_eq!(begun.session.target_collection, "product_shop_2000");
    assert!(begun.cleanup.deleted.is_empty());

    let mut seen = 0;
    let mut accepted = 0;
    for page in 1..=2 {
        let stats = ctx
            .indexer
            .process_page(&source, "product_shop_2000", page, 5)
            .await
            .unwrap();
        seen += stats.documents_seen;
        accepted += stats.documents_accepted;
    }
    assert_eq!((seen, accepted), (10, 10));

    let report = ctx
        .manager
        .activate("product", "product_shop_2000")
        .await
        .unwrap();
    assert_eq!(report.alias, "product_shop");
    assert_eq!(report.previous.as_deref(), Some("product_shop_1000"));
    assert!(report.reap.deleted.is_empty());
    assert_eq!(
        ctx.manager
            .resolver()
            .current_collection("product")
            .await
            .unwrap()
            .as_deref(),
        Some("product_shop_2000")
    );
    assert_collections(
        &ctx.engine,
        "product_shop_",
        &["product_shop_1000", "product_shop_2000"],
    );

    // The next activation retires 2000 and reaps 1000.
    ctx.clock.set(3000);
    let begun = ctx.manager.begin("product", &source.schema()).await.unwrap();
    let report = ctx
        .manager
        .activate("product", &begun.session.target_collection)
        .await
        .unwrap();
    assert_eq!(report.reap.deleted, vec!["product_shop_1000"]);
    assert_collections(
        &ctx.engine,
        "product_shop_",
        &["product_shop_2000", "product_shop_3000"],
    );
}

#[tokio::test]
async fn test_older_than_current_respects_keep_count() {
    let ctx = TestContext::new(9000);
    for ts in [1000, 2000, 3000, 4000] {
        ctx.seed_collection("page", ts);
    }
    ctx.seed_active("page", 5000);

    let resolver = ctx.manager.resolver();
    for keep in 0..=5 {
        let older = resolver.older_than_current("page", keep).await.unwrap();
        assert_eq!(older.len(), 4usize.saturating_sub(keep), "keep_count {}", keep);
    }
    assert_eq!(
        resolver.older_than_current("page", 2).await.unwrap(),
        vec!["page_shop_2000", "page_shop_1000"]
    );
}

#[tokio::test]
async fn test_keep_count_zero_reaps_everything_older() {
    let ctx = TestContext::with_config(IndexConfig::for_site("shop").with_keep_count(0), 3000);
    ctx.seed_collection("product", 1000);
    ctx.seed_active("product", 2000);

    let begun = ctx.manager.begin("product", &product_schema()).await.unwrap();
    let report = ctx
        .manager
        .activate("product", &begun.session.target_collection)
        .await
        .unwrap();
    let mut deleted = report.reap.deleted.clone();
    deleted.sort();
    assert_eq!(deleted, vec!["product_shop_1000", "product_shop_2000"]);
}

#[tokio::test]
async fn test_reap_failure_does_not_fail_activation() {
    let ctx = TestContext::with_config(IndexConfig::for_site("shop").with_keep_count(0), 3000);
    ctx.seed_active("product", 1000);
    ctx.engine.fail_delete("product_shop_1000");

    let begun = ctx.manager.begin("product", &product_schema()).await.unwrap();
    let report = ctx
        .manager
        .activate("product", &begun.session.target_collection)
        .await
        .unwrap();

    assert_alias(&ctx.engine, "product_shop", Some("product_shop_3000"));
    assert_eq!(report.reap.failed.len(), 1);
    assert!(ctx.engine.collection_exists("product_shop_1000"));

    // Retried on the next reap once the engine cooperates.
    ctx.engine.clear_failures();
    let reaped = ctx.manager.reap("product", 0).await.unwrap();
    assert_eq!(reaped.deleted, vec!["product_shop_1000"]);
}

#[tokio::test]
async fn test_types_do_not_interfere() {
    let ctx = TestContext::new(2000);
    ctx.seed_active("product", 1000);
    ctx.seed_active("page", 1000);
    ctx.seed_collection("page", 1500);

    ctx.manager.begin("product", &product_schema()).await.unwrap();

    assert_collections(&ctx.engine, "page_shop_", &["page_shop_1000", "page_shop_1500"]);
    assert_alias(&ctx.engine, "page_shop", Some("page_shop_1000"));
}

// ============================================================================
// Bootstrap
// ============================================================================

#[tokio::test]
async fn test_bootstrap_rebuild() {
    let ctx = TestContext::new(1000);
    assert_eq!(
        ctx.manager
            .resolver()
            .current_collection("product")
            .await
            .unwrap(),
        None
    );

    let report = rebuild(
        &ctx.manager,
        &ctx.indexer,
        &product_source(3),
        RebuildOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.activation.previous, None);
    assert_eq!(report.session.imported_count, 3);
    assert_alias(&ctx.engine, "product_shop", Some("product_shop_1000"));
}

#[tokio::test]
async fn test_bootstrap_begin_removes_unactivated_collections() {
    let ctx = TestContext::new(5000);
    ctx.seed_collection("product", 1000);
    ctx.seed_collection("product", 2000);

    let begun = ctx.manager.begin("product", &product_schema()).await.unwrap();
    let mut deleted = begun.cleanup.deleted.clone();
    deleted.sort();
    assert_eq!(deleted, vec!["product_shop_1000", "product_shop_2000"]);
    assert_collections(&ctx.engine, "product_shop_", &["product_shop_5000"]);
}

// ============================================================================
// Pagination and rejections
// ============================================================================

#[tokio::test]
async fn test_pagination_covers_every_item_once() {
    for (count, page_size) in [(0u64, 5u64), (1, 5), (5, 5), (11, 5), (12, 1), (7, 3)] {
        let ctx = TestContext::new(1000);
        let source = product_source(count);
        let begun = ctx.manager.begin("product", &source.schema()).await.unwrap();
        let collection = begun.session.target_collection;

        let pages = ctx.indexer.page_count(&source, page_size).await.unwrap();
        let mut seen = 0;
        for page in 1..=pages {
            let stats = ctx
                .indexer
                .process_page(&source, &collection, page, page_size)
                .await
                .unwrap();
            seen += stats.documents_seen;
        }

        assert_eq!(seen, count, "{} items, page size {}", count, page_size);
        assert_eq!(ctx.engine.document_count(&collection), count as usize);
    }
}

#[tokio::test]
async fn test_duplicate_id_rejection_is_isolated() {
    let ctx = TestContext::new(1000);
    let mut source = StaticSource::new("product", product_schema());
    for id in 1..=4 {
        source.push_document(product_doc(id));
    }
    source.push_document(product_doc(2));

    let begun = ctx.manager.begin("product", &source.schema()).await.unwrap();
    let stats = ctx
        .indexer
        .process_page(&source, &begun.session.target_collection, 1, 5)
        .await
        .unwrap();

    assert_eq!(stats.documents_seen, 5);
    assert_eq!(stats.documents_accepted, 4);
    assert_eq!(stats.rejections.len(), 1);
    assert_eq!(stats.rejections[0].id, "2");
    assert_eq!(stats.rejections[0].kind, RejectionKind::Duplicate);
}

#[tokio::test]
async fn test_engine_rejections_are_reported_per_document() {
    let ctx = TestContext::new(1000);
    ctx.engine.reject_documents(|doc| {
        doc.get("price")
            .filter(|price| !price.is_number())
            .map(|_| "Field `price` must be a float.".to_string())
    });

    let mut source = product_source(3);
    source.push_document(
        Document::new(json!({"id": "bad", "name": "x", "price": "free", "updatedAt": 1})).unwrap(),
    );
    source.push_skipped("draft", "status is draft");

    let begun = ctx.manager.begin("product", &source.schema()).await.unwrap();
    let stats = ctx
        .indexer
        .process_page(&source, &begun.session.target_collection, 1, 10)
        .await
        .unwrap();

    assert_eq!(stats.documents_seen, 5);
    assert_eq!(stats.documents_skipped, 1);
    assert_eq!(stats.documents_submitted, 4);
    assert_eq!(stats.documents_accepted, 3);
    assert_eq!(stats.rejections.len(), 1);
    assert_eq!(stats.rejections[0].kind, RejectionKind::Engine);
    assert!(stats.rejections[0].reason.contains("price"));
}

// ============================================================================
// Hygiene, rollback and status
// ============================================================================

#[tokio::test]
async fn test_abort_if_stale_keeps_in_progress_rebuild() {
    let ctx = TestContext::new(10_000);
    ctx.seed_active("product", 1000);
    ctx.seed_collection("product", 2000);
    ctx.seed_collection("product", 9_500);

    let report = ctx
        .manager
        .abort_if_stale("product", Duration::from_secs(3600))
        .await
        .unwrap();

    assert_eq!(report.deleted, vec!["product_shop_2000"]);
    assert_collections(
        &ctx.engine,
        "product_shop_",
        &["product_shop_1000", "product_shop_9500"],
    );
}

#[tokio::test]
async fn test_rollback_after_bad_release() {
    let ctx = TestContext::new(3000);
    ctx.seed_collection("product", 1000);
    ctx.seed_active("product", 2000);

    let report = ctx.manager.rollback("product").await.unwrap();
    assert_eq!(report.collection, "product_shop_1000");
    assert_alias(&ctx.engine, "product_shop", Some("product_shop_1000"));

    let status = ctx.manager.status("product").await.unwrap();
    assert_eq!(status.collections[0].name, "product_shop_2000");
    assert_eq!(status.collections[0].role, CollectionRole::Pending);
    assert_eq!(status.collections[1].role, CollectionRole::Active);
}

#[tokio::test]
async fn test_activate_rejects_unknown_collection() {
    let ctx = TestContext::new(3000);
    ctx.seed_active("product", 1000);

    let err = ctx
        .manager
        .activate("product", "product_shop_4242")
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::UnknownCollection { .. }));
    assert_alias(&ctx.engine, "product_shop", Some("product_shop_1000"));
}

#[tokio::test]
async fn test_rebuild_transport_failure_keeps_previous_generation() {
    let ctx = TestContext::new(3000);
    ctx.seed_active("product", 1000);
    ctx.engine.fail_imports(true);

    let err = rebuild(
        &ctx.manager,
        &ctx.indexer,
        &product_source(4),
        RebuildOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, IndexError::RebuildAborted { .. }));
    assert_alias(&ctx.engine, "product_shop", Some("product_shop_1000"));

    // The next attempt clears the debris and succeeds.
    ctx.engine.clear_failures();
    ctx.clock.advance(60);
    let report = rebuild(
        &ctx.manager,
        &ctx.indexer,
        &product_source(4),
        RebuildOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(report.activation.collection, "product_shop_3060");
    assert_collections(
        &ctx.engine,
        "product_shop_",
        &["product_shop_1000", "product_shop_3060"],
    );
}
