//! Search engine abstraction.
//!
//! This module defines the [`SearchEngine`] trait, the narrow set of
//! collection, alias and document operations a rebuild needs. Backends live
//! in [`crate::backends`].
//!
//! The only atomic primitive the lifecycle relies on is
//! [`SearchEngine::upsert_alias`]: one request that repoints an alias.

pub mod ndjson;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ImportAction;
use crate::document::Document;
use crate::error::EngineResult;
use crate::schema::SchemaDefinition;

/// Outcome of deleting a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// The collection existed and was deleted.
    Deleted,
    /// The collection did not exist.
    NotFound,
}

/// An alias and the collection it points to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasMapping {
    /// Alias name.
    pub name: String,
    /// Target collection name.
    pub collection_name: String,
}

/// Result of importing one document, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    /// Whether the engine accepted the document.
    pub success: bool,

    /// Document id (filled from the input when the engine omits it).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Rejection reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// The raw document or response line the engine echoed back on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,

    /// Engine status code for the failed line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

impl ImportResult {
    /// Creates a successful result.
    pub fn accepted(id: impl Into<String>) -> Self {
        Self {
            success: true,
            id: Some(id.into()),
            error: None,
            document: None,
            code: None,
        }
    }

    /// Creates a failed result.
    pub fn rejected(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            id: Some(id.into()),
            error: Some(error.into()),
            document: None,
            code: None,
        }
    }

    /// Returns the rejection reason, or a placeholder when the engine gave none.
    pub fn reason(&self) -> &str {
        self.error.as_deref().unwrap_or("rejected without a reason")
    }
}

impl fmt::Display for ImportResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id.as_deref().unwrap_or("?");
        if self.success {
            write!(f, "{}: ok", id)
        } else {
            write!(f, "{}: {}", id, self.reason())
        }
    }
}

/// Collection, alias and document operations over a search engine.
///
/// Implementations must be safe to share between tasks; each call is a
/// single request to the engine and is not retried here.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Returns a short backend name for logs.
    fn name(&self) -> &'static str;

    /// Checks that the engine is reachable and healthy.
    async fn health(&self) -> EngineResult<()>;

    /// Creates a collection.
    ///
    /// Returns [`EngineError::SchemaConflict`](crate::error::EngineError::SchemaConflict)
    /// if the name is taken.
    async fn create_collection(&self, name: &str, schema: &SchemaDefinition) -> EngineResult<()>;

    /// Deletes a collection.
    async fn delete_collection(&self, name: &str) -> EngineResult<DeleteOutcome>;

    /// Lists every collection name on the engine.
    async fn list_collections(&self) -> EngineResult<Vec<String>>;

    /// Returns the collection an alias points to, or `None` if the alias is absent.
    async fn get_alias(&self, alias: &str) -> EngineResult<Option<String>>;

    /// Creates or repoints an alias in one request.
    async fn upsert_alias(&self, alias: &str, target: &str) -> EngineResult<()>;

    /// Lists every alias on the engine.
    async fn list_aliases(&self) -> EngineResult<Vec<AliasMapping>>;

    /// Imports documents in one request, returning one result per input document.
    async fn bulk_upsert(
        &self,
        collection: &str,
        documents: &[Document],
        action: ImportAction,
    ) -> EngineResult<Vec<ImportResult>>;
}
