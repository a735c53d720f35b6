//! Error types for collection rebuilds.
//!
//! Errors are split by where they originate: the search engine, the content
//! source feeding documents, document validation, and the lifecycle
//! preconditions enforced by this crate. [`IndexError`] wraps all of them.
//!
//! Per-document failures during a page import are *not* errors; they are
//! folded into [`PageStats`](crate::indexer::PageStats) instead.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for lifecycle and indexing operations.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Search engine errors
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Content source errors
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Document shape errors
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Schema definition errors
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The collection to activate does not exist or belongs to another type.
    #[error("unknown collection '{collection}' for type '{collection_type}'")]
    UnknownCollection {
        collection_type: String,
        collection: String,
    },

    /// The collection has been activated and no longer takes imports.
    #[error("collection '{collection}' of type '{collection_type}' has been activated and is read-only")]
    ActivatedCollection {
        collection_type: String,
        collection: String,
    },

    /// No retained generation is available to roll back to.
    #[error("no previous collection to roll back to for type '{collection_type}'")]
    NoRollbackTarget { collection_type: String },

    /// The page or page size is out of range.
    #[error("invalid page {page} with page size {page_size}")]
    InvalidPage { page: u64, page_size: u64 },

    /// Configuration is unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A rebuild stopped before activation.
    #[error("rebuild of '{collection_type}' aborted at page {page}: {reason}")]
    RebuildAborted {
        collection_type: String,
        page: u64,
        reason: String,
    },
}

/// Errors reported by a search engine backend.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// The engine could not be reached, timed out, or answered with a 5xx.
    #[error("transport error talking to search engine: {message}")]
    Transport { message: String },

    /// A collection with this name already exists.
    #[error("collection already exists: {name}")]
    SchemaConflict { name: String },

    /// The addressed collection or alias does not exist.
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// Any other non-success answer from the engine.
    #[error("search engine returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The engine answered with a body that could not be decoded.
    #[error("invalid response from search engine: {message}")]
    InvalidResponse { message: String },
}

impl EngineError {
    /// Creates a transport error from any displayable cause.
    pub fn transport(message: impl Into<String>) -> Self {
        EngineError::Transport {
            message: message.into(),
        }
    }

    /// Returns true if retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Transport { .. })
    }
}

/// Errors reported by a content source.
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    /// The source could not be read.
    #[error("content source unavailable: {message}")]
    Unavailable { message: String },

    /// A single item could not be converted into a document.
    #[error("failed to convert item {id}: {message}")]
    Conversion { id: String, message: String },
}

/// Errors raised when a JSON value cannot be used as a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("document must be a JSON object")]
    NotAnObject,

    #[error("document is missing a string 'id' field")]
    MissingId,

    #[error("document 'id' must not be empty")]
    EmptyId,
}

/// Errors raised by [`SchemaDefinition::validate`](crate::schema::SchemaDefinition::validate).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema has no fields")]
    NoFields,

    #[error("duplicate field '{name}' in schema")]
    DuplicateField { name: String },

    #[error("default sorting field '{name}' is not declared")]
    UnknownSortingField { name: String },

    #[error("default sorting field '{name}' must be a required numeric field")]
    InvalidSortingField { name: String },
}

/// Result type alias for lifecycle and indexing operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Result type alias for search engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
