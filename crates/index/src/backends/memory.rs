//! In-process search engine.
//!
//! Holds collections, documents and aliases behind a lock and follows the
//! same contract as a real node: duplicate collection names conflict,
//! deleting a missing collection reports `NotFound`, an alias upsert is one
//! atomic swap. Failures can be injected per operation for testing the
//! lifecycle's error paths.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::config::ImportAction;
use crate::document::Document;
use crate::engine::{AliasMapping, DeleteOutcome, ImportResult, SearchEngine};
use crate::error::{EngineError, EngineResult};
use crate::schema::SchemaDefinition;

/// Decides whether the engine refuses a document; `Some(reason)` rejects it.
pub type RejectFn = dyn Fn(&Document) -> Option<String> + Send + Sync;

#[derive(Debug, Clone)]
struct StoredCollection {
    schema: SchemaDefinition,
    documents: BTreeMap<String, Document>,
}

#[derive(Default)]
struct Failures {
    offline: bool,
    imports: bool,
    create: HashSet<String>,
    delete: HashSet<String>,
    reject: Option<Arc<RejectFn>>,
}

#[derive(Default)]
struct State {
    collections: HashMap<String, StoredCollection>,
    aliases: HashMap<String, String>,
    failures: Failures,
}

/// A search engine held entirely in memory.
#[derive(Default)]
pub struct InMemoryEngine {
    state: RwLock<State>,
}

impl std::fmt::Debug for InMemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("InMemoryEngine")
            .field("collections", &state.collections.len())
            .field("aliases", &state.aliases.len())
            .finish()
    }
}

impl InMemoryEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every operation fail with a transport error while `offline`.
    pub fn set_offline(&self, offline: bool) {
        self.state.write().failures.offline = offline;
    }

    /// Makes bulk imports fail with a transport error.
    pub fn fail_imports(&self, fail: bool) {
        self.state.write().failures.imports = fail;
    }

    /// Makes creating `name` fail with a transport error.
    pub fn fail_create(&self, name: impl Into<String>) {
        self.state.write().failures.create.insert(name.into());
    }

    /// Makes deleting `name` fail with a transport error.
    pub fn fail_delete(&self, name: impl Into<String>) {
        self.state.write().failures.delete.insert(name.into());
    }

    /// Rejects every imported document for which `reject` returns a reason.
    pub fn reject_documents<F>(&self, reject: F)
    where
        F: Fn(&Document) -> Option<String> + Send + Sync + 'static,
    {
        self.state.write().failures.reject = Some(Arc::new(reject));
    }

    /// Clears every injected failure.
    pub fn clear_failures(&self) {
        self.state.write().failures = Failures::default();
    }

    /// Adds a collection directly, bypassing failure injection.
    pub fn seed_collection(&self, name: impl Into<String>, schema: SchemaDefinition) {
        self.state.write().collections.insert(
            name.into(),
            StoredCollection {
                schema,
                documents: BTreeMap::new(),
            },
        );
    }

    /// Points an alias directly, bypassing failure injection.
    pub fn seed_alias(&self, alias: impl Into<String>, target: impl Into<String>) {
        self.state.write().aliases.insert(alias.into(), target.into());
    }

    /// Returns true if the collection exists.
    pub fn collection_exists(&self, name: &str) -> bool {
        self.state.read().collections.contains_key(name)
    }

    /// Every collection name, sorted.
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().collections.keys().cloned().collect();
        names.sort();
        names
    }

    /// The collection an alias points to.
    pub fn alias_target(&self, alias: &str) -> Option<String> {
        self.state.read().aliases.get(alias).cloned()
    }

    /// Number of documents in a collection (0 if it does not exist).
    pub fn document_count(&self, collection: &str) -> usize {
        self.state
            .read()
            .collections
            .get(collection)
            .map_or(0, |c| c.documents.len())
    }

    /// A stored document.
    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.state
            .read()
            .collections
            .get(collection)
            .and_then(|c| c.documents.get(id).cloned())
    }

    /// The schema a collection was created with.
    pub fn collection_schema(&self, collection: &str) -> Option<SchemaDefinition> {
        self.state
            .read()
            .collections
            .get(collection)
            .map(|c| c.schema.clone())
    }

    fn check_online(state: &State) -> EngineResult<()> {
        if state.failures.offline {
            return Err(EngineError::transport("engine offline"));
        }
        Ok(())
    }
}

fn merge(existing: &Document, incoming: &Document) -> Result<Document, String> {
    let mut fields = existing.fields().clone();
    for (key, value) in incoming.fields() {
        fields.insert(key.clone(), value.clone());
    }
    Document::new(Value::Object(fields)).map_err(|e| e.to_string())
}

fn import_one(
    stored: &mut StoredCollection,
    document: &Document,
    action: ImportAction,
) -> Result<(), String> {
    let id = document.id().to_string();
    let existing = stored.documents.get(&id);

    let resolved = match (action, existing) {
        (ImportAction::Create, Some(_)) => {
            return Err(format!("A document with id {} already exists.", id));
        }
        (ImportAction::Update, None) => {
            return Err(format!("Could not find a document with id: {}", id));
        }
        (ImportAction::Update | ImportAction::Emplace, Some(existing)) => merge(existing, document)?,
        _ => document.clone(),
    };

    stored.documents.insert(id, resolved);
    Ok(())
}

#[async_trait]
impl SearchEngine for InMemoryEngine {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn health(&self) -> EngineResult<()> {
        Self::check_online(&self.state.read())
    }

    async fn create_collection(&self, name: &str, schema: &SchemaDefinition) -> EngineResult<()> {
        let mut state = self.state.write();
        Self::check_online(&state)?;

        if state.failures.create.contains(name) {
            return Err(EngineError::transport(format!(
                "injected failure creating {}",
                name
            )));
        }
        if state.collections.contains_key(name) {
            return Err(EngineError::SchemaConflict {
                name: name.to_string(),
            });
        }

        state.collections.insert(
            name.to_string(),
            StoredCollection {
                schema: schema.clone(),
                documents: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> EngineResult<DeleteOutcome> {
        let mut state = self.state.write();
        Self::check_online(&state)?;

        if state.failures.delete.contains(name) {
            return Err(EngineError::transport(format!(
                "injected failure deleting {}",
                name
            )));
        }
        Ok(match state.collections.remove(name) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }

    async fn list_collections(&self) -> EngineResult<Vec<String>> {
        let state = self.state.read();
        Self::check_online(&state)?;
        Ok(state.collections.keys().cloned().collect())
    }

    async fn get_alias(&self, alias: &str) -> EngineResult<Option<String>> {
        let state = self.state.read();
        Self::check_online(&state)?;
        Ok(state.aliases.get(alias).cloned())
    }

    async fn upsert_alias(&self, alias: &str, target: &str) -> EngineResult<()> {
        let mut state = self.state.write();
        Self::check_online(&state)?;

        if !state.collections.contains_key(target) {
            return Err(EngineError::NotFound {
                resource: format!("collection {}", target),
            });
        }
        state.aliases.insert(alias.to_string(), target.to_string());
        Ok(())
    }

    async fn list_aliases(&self) -> EngineResult<Vec<AliasMapping>> {
        let state = self.state.read();
        Self::check_online(&state)?;

        let mut aliases: Vec<AliasMapping> = state
            .aliases
            .iter()
            .map(|(name, target)| AliasMapping {
                name: name.clone(),
                collection_name: target.clone(),
            })
            .collect();
        aliases.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(aliases)
    }

    async fn bulk_upsert(
        &self,
        collection: &str,
        documents: &[Document],
        action: ImportAction,
    ) -> EngineResult<Vec<ImportResult>> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        Self::check_online(state)?;

        if state.failures.imports {
            return Err(EngineError::transport("injected import failure"));
        }
        let reject = state.failures.reject.clone();
        let stored = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| EngineError::NotFound {
                resource: format!("collection {}", collection),
            })?;

        let results = documents
            .iter()
            .map(|document| {
                if let Some(reason) = reject.as_ref().and_then(|f| f(document)) {
                    return ImportResult::rejected(document.id(), reason);
                }
                match import_one(stored, document, action) {
                    Ok(()) => ImportResult::accepted(document.id()),
                    Err(reason) => ImportResult::rejected(document.id(), reason),
                }
            })
            .collect();

        Ok(results)
    }
}
