//! Collection schema definitions.
//!
//! A [`SchemaDefinition`] describes one collection type: its fields, which
//! of them are facetable or sortable, and the default sorting field. The
//! same definition is used for every generation of that type's collections.
//!
//! # Example
//!
//! ```
//! use shelfsync_index::schema::{FieldType, SchemaDefinition};
//!
//! let schema = SchemaDefinition::new()
//!     .field("name", FieldType::String)
//!     .facet("slug", FieldType::String)
//!     .optional("thumbnail", FieldType::Object)
//!     .field("updatedAt", FieldType::Int64)
//!     .with_default_sorting_field("updatedAt")
//!     .with_nested_fields();
//!
//! assert!(schema.validate().is_ok());
//! let payload = schema.to_collection_payload("page_shop_1700000000");
//! assert_eq!(payload["name"], "page_shop_1700000000");
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::SchemaError;

/// Field types understood by the search engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "string[]")]
    StringArray,
    #[serde(rename = "int32")]
    Int32,
    #[serde(rename = "int32[]")]
    Int32Array,
    #[serde(rename = "int64")]
    Int64,
    #[serde(rename = "int64[]")]
    Int64Array,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "float[]")]
    FloatArray,
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "bool[]")]
    BoolArray,
    #[serde(rename = "object")]
    Object,
    #[serde(rename = "object[]")]
    ObjectArray,
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "string*")]
    StringAuto,
}

impl FieldType {
    /// Returns true for single-valued numeric types usable as a default sort.
    pub fn is_sortable_numeric(&self) -> bool {
        matches!(self, FieldType::Int32 | FieldType::Int64 | FieldType::Float)
    }
}

/// A single field in a collection schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name; dotted names address nested object fields.
    pub name: String,

    /// Field type.
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Whether the field can be faceted on.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub facet: bool,

    /// Whether documents may omit the field.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,

    /// Explicit sortability (engine default when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<bool>,

    /// Explicit indexing flag (engine default when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<bool>,
}

impl FieldDefinition {
    /// Creates a required, non-facet field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            facet: false,
            optional: false,
            sort: None,
            index: None,
        }
    }
}

/// Schema for one collection type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Declared fields, in order.
    pub fields: Vec<FieldDefinition>,

    /// Field used to sort results when a query gives no explicit order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sorting_field: Option<String>,

    /// Whether nested object fields are indexed.
    #[serde(default)]
    pub enable_nested_fields: bool,
}

impl SchemaDefinition {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required field.
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDefinition::new(name, field_type));
        self
    }

    /// Adds a required facet field.
    pub fn facet(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        let mut field = FieldDefinition::new(name, field_type);
        field.facet = true;
        self.fields.push(field);
        self
    }

    /// Adds an optional field.
    pub fn optional(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        let mut field = FieldDefinition::new(name, field_type);
        field.optional = true;
        self.fields.push(field);
        self
    }

    /// Adds an optional facet field.
    pub fn optional_facet(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        let mut field = FieldDefinition::new(name, field_type);
        field.facet = true;
        field.optional = true;
        self.fields.push(field);
        self
    }

    /// Adds a required field with sorting explicitly enabled.
    pub fn sortable(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        let mut field = FieldDefinition::new(name, field_type);
        field.sort = Some(true);
        self.fields.push(field);
        self
    }

    /// Adds a fully specified field.
    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Sets the default sorting field.
    pub fn with_default_sorting_field(mut self, name: impl Into<String>) -> Self {
        self.default_sorting_field = Some(name.into());
        self
    }

    /// Enables nested field indexing.
    pub fn with_nested_fields(mut self) -> Self {
        self.enable_nested_fields = true;
        self
    }

    /// Looks up a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of all facet fields.
    pub fn facet_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.facet)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Checks the schema for problems the engine would reject.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.fields.is_empty() {
            return Err(SchemaError::NoFields);
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    name: field.name.clone(),
                });
            }
        }

        if let Some(ref sort_field) = self.default_sorting_field {
            let field =
                self.get_field(sort_field)
                    .ok_or_else(|| SchemaError::UnknownSortingField {
                        name: sort_field.clone(),
                    })?;
            if field.optional || !field.field_type.is_sortable_numeric() {
                return Err(SchemaError::InvalidSortingField {
                    name: sort_field.clone(),
                });
            }
        }

        Ok(())
    }

    /// Renders the create-collection request body for `name`.
    pub fn to_collection_payload(&self, name: &str) -> Value {
        let mut payload = json!({
            "name": name,
            "fields": self.fields,
            "enable_nested_fields": self.enable_nested_fields,
        });
        if let Some(ref sort_field) = self.default_sorting_field {
            payload["default_sorting_field"] = json!(sort_field);
        }
        payload
    }
}
