//! Search documents.
//!
//! A [`Document`] is an opaque JSON object with a required, non-empty string
//! `id`. The core never inspects other fields; they are passed to the engine
//! verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DocumentError;

/// A single document ready to be imported into a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Document {
    fields: Map<String, Value>,
}

impl Document {
    /// Creates a document from a JSON value.
    ///
    /// Integer ids are converted to strings, matching how catalog ids are
    /// stored by the engine.
    pub fn new(value: Value) -> Result<Self, DocumentError> {
        let Value::Object(mut fields) = value else {
            return Err(DocumentError::NotAnObject);
        };

        let id = match fields.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) if n.is_u64() || n.is_i64() => n.to_string(),
            _ => return Err(DocumentError::MissingId),
        };

        if id.trim().is_empty() {
            return Err(DocumentError::EmptyId);
        }

        fields.insert("id".to_string(), Value::String(id));
        Ok(Self { fields })
    }

    /// Returns the document id.
    pub fn id(&self) -> &str {
        self.fields
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Returns a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns all fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Serializes the document as a single JSON line.
    pub fn to_json_line(&self) -> String {
        Value::Object(self.fields.clone()).to_string()
    }
}

impl TryFrom<Value> for Document {
    type Error = DocumentError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Document::new(value)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Object(doc.fields)
    }
}
