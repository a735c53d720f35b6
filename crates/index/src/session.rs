//! Caller-held rebuild progress.
//!
//! A rebuild spans many bounded requests, and nothing in this crate persists
//! state between them. The driver keeps a [`SyncSession`] wherever it likes
//! (a queue message, a database row, a client token), feeds it back into
//! each page call, and folds the returned stats into it.

use serde::{Deserialize, Serialize};

use crate::indexer::PageStats;

/// Progress of one rebuild attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSession {
    /// Collection type being rebuilt.
    pub collection_type: String,

    /// Not-yet-active collection receiving documents.
    pub target_collection: String,

    /// Next page to process (1-based).
    pub page: u64,

    /// Identifiers per page.
    pub page_size: u64,

    /// Documents the engine accepted so far.
    #[serde(default)]
    pub imported_count: u64,

    /// Identifiers seen so far.
    #[serde(default)]
    pub total_seen: u64,

    /// Identifiers skipped as not publishable.
    #[serde(default)]
    pub skipped_count: u64,

    /// Documents rejected so far (by the engine or before submission).
    #[serde(default)]
    pub rejected_count: u64,
}

impl SyncSession {
    /// Starts a session at page 1.
    pub fn new(
        collection_type: impl Into<String>,
        target_collection: impl Into<String>,
        page_size: u64,
    ) -> Self {
        Self {
            collection_type: collection_type.into(),
            target_collection: target_collection.into(),
            page: 1,
            page_size,
            imported_count: 0,
            total_seen: 0,
            skipped_count: 0,
            rejected_count: 0,
        }
    }

    /// Folds a page's stats into the session and moves to the next page.
    ///
    /// Stats for a page other than the session's current one are ignored and
    /// `false` is returned, so replaying an old response cannot double-count.
    pub fn record(&mut self, stats: &PageStats) -> bool {
        if stats.page != self.page {
            tracing::warn!(
                collection = %self.target_collection,
                expected_page = self.page,
                page = stats.page,
                "Ignoring stats for unexpected page"
            );
            return false;
        }
        self.imported_count += stats.documents_accepted;
        self.total_seen += stats.documents_seen;
        self.skipped_count += stats.documents_skipped;
        self.rejected_count += stats.rejections.len() as u64;
        self.page += 1;
        true
    }

    /// Returns true once every page up to `page_count` has been recorded.
    pub fn is_complete(&self, page_count: u64) -> bool {
        self.page > page_count
    }
}
