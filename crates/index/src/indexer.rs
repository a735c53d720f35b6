//! Paginated batch ingestion.
//!
//! [`BatchIndexer::process_page`] is one bounded unit of rebuild work: pull a
//! page of identifiers from the source, convert each to a document, submit
//! the page as one bulk import, and report what happened. Per-document
//! failures never abort the page; they are collected in [`PageStats`].

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ImportAction;
use crate::document::Document;
use crate::engine::SearchEngine;
use crate::error::{IndexError, IndexResult};
use crate::session::SyncSession;
use crate::source::{ContentSource, Conversion};

/// Where a document rejection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// The engine refused the document.
    Engine,
    /// Another document on the same page already used this id.
    Duplicate,
    /// The source could not convert the identifier.
    Source,
    /// The bulk request never reached the engine.
    Transport,
}

/// A document that did not make it into the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// Document or item id.
    pub id: String,
    /// Where the rejection came from.
    pub kind: RejectionKind,
    /// Reason given.
    pub reason: String,
}

/// Statistics for one processed page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStats {
    /// Page number (1-based).
    pub page: u64,

    /// Identifiers on the page.
    pub documents_seen: u64,

    /// Identifiers skipped as not publishable.
    pub documents_skipped: u64,

    /// Documents sent in the bulk request.
    pub documents_submitted: u64,

    /// Documents the engine accepted.
    pub documents_accepted: u64,

    /// Every document that was not accepted, with its reason.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejections: Vec<Rejection>,

    /// The bulk request failed in transport; resubmitting the page may succeed.
    #[serde(default)]
    pub transport_failed: bool,
}

impl PageStats {
    fn new(page: u64) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }

    /// Returns true if the page should be resubmitted as a whole.
    pub fn is_retryable(&self) -> bool {
        self.transport_failed
    }

    /// Returns true if the source had no identifiers for this page.
    pub fn is_empty(&self) -> bool {
        self.documents_seen == 0
    }

    fn reject(&mut self, id: impl Into<String>, kind: RejectionKind, reason: impl Into<String>) {
        self.rejections.push(Rejection {
            id: id.into(),
            kind,
            reason: reason.into(),
        });
    }
}

/// Number of pages of `page_size` covering every item of `source`.
pub async fn page_count<S: ContentSource>(source: &S, page_size: u64) -> IndexResult<u64> {
    Ok(source.total_pages(page_size).await?)
}

/// Feeds pages of documents into a collection.
pub struct BatchIndexer<E: SearchEngine> {
    engine: Arc<E>,
    action: ImportAction,
}

impl<E: SearchEngine> BatchIndexer<E> {
    /// Creates an indexer importing with [`ImportAction::Upsert`].
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            action: ImportAction::default(),
        }
    }

    /// Sets the import action.
    pub fn with_action(mut self, action: ImportAction) -> Self {
        self.action = action;
        self
    }

    /// Number of pages of `page_size` covering every item of `source`.
    pub async fn page_count<S: ContentSource>(&self, source: &S, page_size: u64) -> IndexResult<u64> {
        page_count(source, page_size).await
    }

    /// Imports page `page` of `source` into `collection`.
    ///
    /// Failing to list the page's identifiers is an error. Everything after
    /// that (conversion failures, duplicate ids, engine rejections, and a
    /// transport failure of the bulk request) is recorded in the returned
    /// stats.
    pub async fn process_page<S: ContentSource>(
        &self,
        source: &S,
        collection: &str,
        page: u64,
        page_size: u64,
    ) -> IndexResult<PageStats> {
        if page == 0 || page_size == 0 {
            return Err(IndexError::InvalidPage { page, page_size });
        }

        let ids = source.ids(page, page_size).await?;
        let mut stats = PageStats::new(page);
        stats.documents_seen = ids.len() as u64;

        let mut seen_ids = HashSet::new();
        let mut documents: Vec<Document> = Vec::with_capacity(ids.len());

        for id in &ids {
            match source.to_document(id).await {
                Ok(Conversion::Document(document)) => {
                    if seen_ids.insert(document.id().to_string()) {
                        documents.push(document);
                    } else {
                        stats.reject(
                            document.id(),
                            RejectionKind::Duplicate,
                            "duplicate id on page",
                        );
                    }
                }
                Ok(Conversion::Skip { reason }) => {
                    debug!(collection = %collection, id = %id, reason = %reason, "Skipping item");
                    stats.documents_skipped += 1;
                }
                Err(e) => {
                    warn!(collection = %collection, id = %id, error = %e, "Failed to convert item");
                    stats.reject(id.to_string(), RejectionKind::Source, e.to_string());
                }
            }
        }

        stats.documents_submitted = documents.len() as u64;
        if !documents.is_empty() {
            self.submit(collection, &documents, &mut stats).await?;
        }

        info!(
            collection = %collection,
            page,
            seen = stats.documents_seen,
            skipped = stats.documents_skipped,
            accepted = stats.documents_accepted,
            rejected = stats.rejections.len(),
            "Processed page"
        );

        Ok(stats)
    }

    /// Processes the session's next page and records it.
    ///
    /// A page whose bulk request failed in transport is not recorded, so the
    /// session stays on the same page for a retry.
    pub async fn process_session<S: ContentSource>(
        &self,
        session: &mut SyncSession,
        source: &S,
    ) -> IndexResult<PageStats> {
        let stats = self
            .process_page(
                source,
                &session.target_collection,
                session.page,
                session.page_size,
            )
            .await?;

        if !stats.transport_failed {
            session.record(&stats);
        }
        Ok(stats)
    }

    async fn submit(
        &self,
        collection: &str,
        documents: &[Document],
        stats: &mut PageStats,
    ) -> IndexResult<()> {
        let results = match self
            .engine
            .bulk_upsert(collection, documents, self.action)
            .await
        {
            Ok(results) => results,
            Err(e) if e.is_transient() => {
                warn!(
                    collection = %collection,
                    page = stats.page,
                    error = %e,
                    "Bulk import failed in transport; page can be resubmitted"
                );
                stats.transport_failed = true;
                for document in documents {
                    stats.reject(document.id(), RejectionKind::Transport, e.to_string());
                }
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        for (index, document) in documents.iter().enumerate() {
            match results.get(index) {
                Some(result) if result.success => stats.documents_accepted += 1,
                Some(result) => {
                    warn!(
                        collection = %collection,
                        id = %document.id(),
                        reason = %result.reason(),
                        "Document rejected by engine"
                    );
                    stats.reject(document.id(), RejectionKind::Engine, result.reason());
                }
                None => {
                    warn!(collection = %collection, id = %document.id(), "No import result for document");
                    stats.reject(
                        document.id(),
                        RejectionKind::Engine,
                        "no result returned for document",
                    );
                }
            }
        }

        Ok(())
    }
}
