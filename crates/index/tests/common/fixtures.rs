//! Catalog fixtures: schemas, documents and sources.

use serde_json::json;

use shelfsync_index::document::Document;
use shelfsync_index::schema::{FieldType, SchemaDefinition};
use shelfsync_index::source::StaticSource;

/// The product schema used by the storefront search.
pub fn product_schema() -> SchemaDefinition {
    SchemaDefinition::new()
        .field("name", FieldType::String)
        .field("slug", FieldType::String)
        .facet("categories", FieldType::StringArray)
        .optional("description", FieldType::String)
        .field("price", FieldType::Float)
        .field("updatedAt", FieldType::Int64)
        .with_default_sorting_field("updatedAt")
}

/// A product document with every required field set.
pub fn product_doc(id: u64) -> Document {
    Document::new(json!({
        "id": id,
        "name": format!("Product {}", id),
        "slug": format!("product-{}", id),
        "categories": ["shirts"],
        "price": 19.5,
        "updatedAt": 1_700_000_000 + id as i64,
    }))
    .expect("fixture document is valid")
}

/// A product source holding products `1..=count`.
pub fn product_source(count: u64) -> StaticSource {
    let mut source = StaticSource::new("product", product_schema());
    for id in 1..=count {
        source.push_document(product_doc(id));
    }
    source
}
