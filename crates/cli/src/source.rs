//! File-backed content source.
//!
//! Reads catalog records from an NDJSON file (one JSON object per line) and
//! the collection schema from a JSON file. A record with a `status` field
//! other than `"publish"` is kept in paging but converts to a skip, the same
//! way an unpublished catalog item would. Ids must be unique within a file.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, bail};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use shelfsync_index::document::Document;
use shelfsync_index::error::SourceError;
use shelfsync_index::schema::SchemaDefinition;
use shelfsync_index::source::{ContentSource, Conversion, StaticSource};

const PUBLISHED: &str = "publish";

/// Loads a schema definition from a JSON file.
pub fn load_schema(path: &Path) -> anyhow::Result<SchemaDefinition> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema file {}", path.display()))?;
    let schema: SchemaDefinition = serde_json::from_str(&text)
        .with_context(|| format!("Invalid schema in {}", path.display()))?;
    schema
        .validate()
        .with_context(|| format!("Invalid schema in {}", path.display()))?;
    Ok(schema)
}

/// A content source over the records of one NDJSON file.
#[derive(Debug, Clone)]
pub struct NdjsonSource {
    inner: StaticSource,
}

impl NdjsonSource {
    /// Reads `records` and `schema` for `collection_type`.
    pub fn open(collection_type: &str, records: &Path, schema: &Path) -> anyhow::Result<Self> {
        let schema = load_schema(schema)?;
        let text = std::fs::read_to_string(records)
            .with_context(|| format!("Failed to read source file {}", records.display()))?;
        Self::parse(collection_type, schema, &text)
            .with_context(|| format!("Invalid record in {}", records.display()))
    }

    /// Builds a source from NDJSON text.
    pub fn parse(collection_type: &str, schema: SchemaDefinition, text: &str) -> anyhow::Result<Self> {
        let mut inner = StaticSource::new(collection_type, schema);
        let mut first_line: HashMap<String, usize> = HashMap::new();

        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut value: Value = serde_json::from_str(line)
                .with_context(|| format!("line {} is not valid JSON", index + 1))?;
            let Some(record) = value.as_object_mut() else {
                bail!("line {} is not a JSON object", index + 1);
            };

            let status = record.remove("status");
            let document = Document::new(value)
                .with_context(|| format!("line {} is not a valid document", index + 1))?;
            if let Some(line) = first_line.insert(document.id().to_string(), index + 1) {
                bail!(
                    "line {} repeats id '{}' from line {}",
                    index + 1,
                    document.id(),
                    line
                );
            }

            match status {
                Some(Value::String(s)) if s == PUBLISHED => inner.push_document(document),
                None => inner.push_document(document),
                Some(other) => {
                    let status = other.as_str().map_or_else(|| other.to_string(), str::to_string);
                    debug!(id = %document.id(), status = %status, "Record is not published");
                    inner.push_skipped(document.id(), format!("status is {}", status));
                }
            }
        }

        Ok(Self { inner })
    }

    /// Number of records, published or not.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if the file held no records.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl ContentSource for NdjsonSource {
    type Id = String;

    fn collection_type(&self) -> &str {
        self.inner.collection_type()
    }

    fn schema(&self) -> SchemaDefinition {
        self.inner.schema()
    }

    async fn total_items(&self) -> Result<u64, SourceError> {
        self.inner.total_items().await
    }

    async fn ids(&self, page: u64, page_size: u64) -> Result<Vec<String>, SourceError> {
        self.inner.ids(page, page_size).await
    }

    async fn to_document(&self, id: &String) -> Result<Conversion, SourceError> {
        self.inner.to_document(id).await
    }
}
