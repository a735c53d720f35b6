//! Content sources.
//!
//! A [`ContentSource`] provides the items of one collection type: how many
//! there are, their identifiers page by page, and the search document for each
//! identifier. How a catalog item becomes a document is entirely the source's
//! business.
//!
//! Paging is 1-based and must be stable for the duration of one rebuild: the
//! same `(page, page_size)` returns the same identifiers even if unrelated
//! items change meanwhile.

use std::fmt;
use std::hash::Hash;

use async_trait::async_trait;

use crate::document::Document;
use crate::error::SourceError;
use crate::schema::SchemaDefinition;

/// The result of converting one identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    /// The item is publishable and produced a document.
    Document(Document),
    /// The item should not be indexed (e.g. no longer published).
    Skip {
        /// Why the item was skipped.
        reason: String,
    },
}

impl Conversion {
    /// Creates a skip with a reason.
    pub fn skip(reason: impl Into<String>) -> Self {
        Conversion::Skip {
            reason: reason.into(),
        }
    }
}

/// Number of pages needed to cover `total` items.
pub fn page_count(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Provider of identifiers and documents for one collection type.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Identifier type; only equality and display are relied upon.
    type Id: Clone + Eq + Hash + fmt::Display + Send + Sync;

    /// The collection type this source feeds (e.g. `"product"`).
    fn collection_type(&self) -> &str;

    /// The schema for this collection type.
    fn schema(&self) -> SchemaDefinition;

    /// Total number of items that will be paged over.
    async fn total_items(&self) -> Result<u64, SourceError>;

    /// Identifiers on `page` (1-based) of size `page_size`, in stable order.
    async fn ids(&self, page: u64, page_size: u64) -> Result<Vec<Self::Id>, SourceError>;

    /// Converts one identifier into a document, or a skip.
    async fn to_document(&self, id: &Self::Id) -> Result<Conversion, SourceError>;

    /// Number of pages of `page_size` covering all items.
    async fn total_pages(&self, page_size: u64) -> Result<u64, SourceError> {
        Ok(page_count(self.total_items().await?, page_size))
    }
}

/// One pre-converted entry of a [`StaticSource`].
#[derive(Debug, Clone, PartialEq)]
pub struct StaticItem {
    /// Item identifier.
    pub id: String,
    /// What converting the identifier yields.
    pub conversion: Conversion,
}

/// A content source over items already held in memory.
///
/// Items keep their insertion order, which makes paging trivially stable.
#[derive(Debug, Clone)]
pub struct StaticSource {
    collection_type: String,
    schema: SchemaDefinition,
    items: Vec<StaticItem>,
}

impl StaticSource {
    /// Creates an empty source.
    pub fn new(collection_type: impl Into<String>, schema: SchemaDefinition) -> Self {
        Self {
            collection_type: collection_type.into(),
            schema,
            items: Vec::new(),
        }
    }

    /// Appends a publishable document.
    pub fn push_document(&mut self, document: Document) {
        self.items.push(StaticItem {
            id: document.id().to_string(),
            conversion: Conversion::Document(document),
        });
    }

    /// Appends an item that converts to a skip.
    pub fn push_skipped(&mut self, id: impl Into<String>, reason: impl Into<String>) {
        self.items.push(StaticItem {
            id: id.into(),
            conversion: Conversion::skip(reason),
        });
    }

    /// Appends a publishable document (builder form).
    pub fn with_document(mut self, document: Document) -> Self {
        self.push_document(document);
        self
    }

    /// Number of items held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the source holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl ContentSource for StaticSource {
    type Id = String;

    fn collection_type(&self) -> &str {
        &self.collection_type
    }

    fn schema(&self) -> SchemaDefinition {
        self.schema.clone()
    }

    async fn total_items(&self) -> Result<u64, SourceError> {
        Ok(self.items.len() as u64)
    }

    async fn ids(&self, page: u64, page_size: u64) -> Result<Vec<String>, SourceError> {
        if page == 0 || page_size == 0 {
            return Ok(Vec::new());
        }
        let offset = (page - 1).saturating_mul(page_size);
        Ok(self
            .items
            .iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(page_size).unwrap_or(usize::MAX))
            .map(|item| item.id.clone())
            .collect())
    }

    async fn to_document(&self, id: &String) -> Result<Conversion, SourceError> {
        // First match wins so duplicate ids resolve deterministically.
        self.items
            .iter()
            .find(|item| &item.id == id)
            .map(|item| item.conversion.clone())
            .ok_or_else(|| SourceError::Conversion {
                id: id.clone(),
                message: "item no longer exists".to_string(),
            })
    }
}
