//! Collection lifecycle: create, populate, activate, retire, reap.
//!
//! # Lifecycle of one rebuild attempt
//!
//! ```text
//! begin(type)              activate(type, C)           next begin / reap
//!   ├── delete newer         ├── upsert alias → C        ├── delete older
//!   │   (abandoned runs)     │   (atomic cutover)        │   beyond keep_count
//!   └── create C             └── reap(keep_count)        └── ...
//!        │
//!        └── process_page × N   (BatchIndexer, externally driven)
//! ```
//!
//! There is no persisted "failed" state. An attempt that never reaches
//! `activate` leaves a collection newer than the alias target, and the next
//! `begin` for the type deletes it before creating its own. Readers only ever
//! query the alias, which is repointed in a single request.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::alias::{AliasResolver, TypeSnapshot};
use crate::clock::{Clock, SystemClock};
use crate::config::IndexConfig;
use crate::engine::{DeleteOutcome, SearchEngine};
use crate::error::{IndexError, IndexResult};
use crate::naming::CollectionNamer;
use crate::schema::SchemaDefinition;
use crate::session::SyncSession;

/// A collection that could not be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupFailure {
    /// Collection name.
    pub collection: String,
    /// Error message.
    pub error: String,
}

/// Outcome of deleting a set of collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Collections deleted.
    pub deleted: Vec<String>,
    /// Collections that were already gone.
    pub already_gone: Vec<String>,
    /// Collections whose deletion failed; retried on the next cycle.
    pub failed: Vec<CleanupFailure>,
}

impl CleanupReport {
    /// Returns true if every targeted collection is gone.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of [`CollectionLifecycleManager::begin`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeginReport {
    /// Session for the new attempt; `target_collection` is the new collection.
    pub session: SyncSession,
    /// Collection the alias pointed to when the attempt began.
    pub current: Option<String>,
    /// Abandoned attempts removed before creating the new collection.
    pub cleanup: CleanupReport,
}

/// Result of an alias cutover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationReport {
    /// Alias that was repointed.
    pub alias: String,
    /// Collection the alias now points to.
    pub collection: String,
    /// Collection the alias pointed to before.
    pub previous: Option<String>,
    /// Retired generations removed after the cutover.
    pub reap: CleanupReport,
    /// Set when the post-cutover reap could not list collections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reap_error: Option<String>,
}

/// Role of a collection relative to its type's alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionRole {
    /// The alias points here.
    Active,
    /// Newer than the active collection: being built, or abandoned.
    Pending,
    /// Older than the active collection.
    Retired,
}

/// One collection in a [`TypeStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStatus {
    /// Collection name.
    pub name: String,
    /// Embedded timestamp (0 when unparsable).
    pub timestamp: i64,
    /// Role relative to the alias.
    pub role: CollectionRole,
}

/// Alias and collections of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeStatus {
    /// Collection type.
    pub collection_type: String,
    /// Alias name.
    pub alias: String,
    /// Alias target, if the alias exists.
    pub current: Option<String>,
    /// Every collection, newest first.
    pub collections: Vec<CollectionStatus>,
}

/// Manages the collections and alias of every collection type for one site.
pub struct CollectionLifecycleManager<E: SearchEngine> {
    engine: Arc<E>,
    resolver: AliasResolver<E>,
    config: IndexConfig,
    clock: Arc<dyn Clock>,
}

impl<E: SearchEngine> std::fmt::Debug for CollectionLifecycleManager<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionLifecycleManager")
            .field("engine", &self.engine.name())
            .field("site", &self.resolver.namer().site())
            .field("keep_count", &self.config.keep_count)
            .finish_non_exhaustive()
    }
}

impl<E: SearchEngine> CollectionLifecycleManager<E> {
    /// Creates a manager using the system clock.
    pub fn new(engine: Arc<E>, config: IndexConfig) -> IndexResult<Self> {
        config
            .validate()
            .map_err(|errors| IndexError::InvalidConfig {
                message: errors.join("; "),
            })?;

        let resolver = AliasResolver::new(Arc::clone(&engine), CollectionNamer::from_config(&config));
        Ok(Self {
            engine,
            resolver,
            config,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the clock used to timestamp new collections.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the alias resolver.
    pub fn resolver(&self) -> &AliasResolver<E> {
        &self.resolver
    }

    /// Returns the namer.
    pub fn namer(&self) -> &CollectionNamer {
        self.resolver.namer()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Starts a rebuild attempt for `collection_type`.
    ///
    /// Deletes every collection newer than the alias target (debris of
    /// earlier attempts that never activated), then creates a fresh,
    /// not-yet-visible collection. Deletion failures are logged and skipped;
    /// listing and creation failures abort the attempt.
    pub async fn begin(
        &self,
        collection_type: &str,
        schema: &SchemaDefinition,
    ) -> IndexResult<BeginReport> {
        schema.validate()?;

        let snapshot = self.resolver.snapshot(collection_type).await?;
        let abandoned = snapshot.newer();
        if !abandoned.is_empty() {
            info!(
                collection_type = %collection_type,
                collections = ?abandoned,
                "Removing collections from abandoned rebuilds"
            );
        }
        let cleanup = self.delete_all(collection_type, &abandoned).await;

        let timestamp = self.next_timestamp(&snapshot);
        let name = self
            .namer()
            .new_collection_name(collection_type, timestamp);

        self.engine.create_collection(&name, schema).await?;
        info!(
            collection_type = %collection_type,
            collection = %name,
            current = ?snapshot.current,
            "Created collection for rebuild"
        );

        Ok(BeginReport {
            session: SyncSession::new(collection_type, name, self.config.page_size),
            current: snapshot.current,
            cleanup,
        })
    }

    /// Points the type's alias at `collection`, then reaps old generations.
    ///
    /// The alias upsert is the single cutover step. Its failure is returned
    /// and nothing is deleted. A failure of the follow-up reap is reported in
    /// the result but does not undo or fail the activation.
    pub async fn activate(
        &self,
        collection_type: &str,
        collection: &str,
    ) -> IndexResult<ActivationReport> {
        let unknown = || IndexError::UnknownCollection {
            collection_type: collection_type.to_string(),
            collection: collection.to_string(),
        };

        if !self.namer().belongs_to(collection_type, collection) {
            return Err(unknown());
        }
        let exists = self
            .engine
            .list_collections()
            .await?
            .iter()
            .any(|name| name == collection);
        if !exists {
            return Err(unknown());
        }

        let previous = self.resolver.current_collection(collection_type).await?;
        let alias = self.switch_alias(collection_type, collection, previous.as_deref()).await?;

        let (reap, reap_error) = match self.reap(collection_type, self.config.keep_count).await {
            Ok(report) => (report, None),
            Err(e) => {
                warn!(
                    collection_type = %collection_type,
                    error = %e,
                    "Reap after activation failed; will retry on next activation"
                );
                (CleanupReport::default(), Some(e.to_string()))
            }
        };

        Ok(ActivationReport {
            alias,
            collection: collection.to_string(),
            previous,
            reap,
            reap_error,
        })
    }

    /// Checks that `collection` is a pending collection of `collection_type`
    /// that may still take imports.
    ///
    /// The alias target and every older generation have been activated at
    /// some point and are refused, as are collections that do not exist or
    /// belong to another type.
    pub async fn ensure_pending(&self, collection_type: &str, collection: &str) -> IndexResult<()> {
        if !self.namer().belongs_to(collection_type, collection) {
            return Err(IndexError::UnknownCollection {
                collection_type: collection_type.to_string(),
                collection: collection.to_string(),
            });
        }

        let snapshot = self.resolver.snapshot(collection_type).await?;
        if !snapshot.collections.iter().any(|name| name == collection) {
            return Err(IndexError::UnknownCollection {
                collection_type: collection_type.to_string(),
                collection: collection.to_string(),
            });
        }
        if !snapshot.newer().iter().any(|name| name == collection) {
            return Err(IndexError::ActivatedCollection {
                collection_type: collection_type.to_string(),
                collection: collection.to_string(),
            });
        }
        Ok(())
    }

    /// Deletes generations older than the active one, keeping the
    /// `keep_count` most recent of them.
    ///
    /// With no alias nothing is older, so nothing is deleted.
    pub async fn reap(&self, collection_type: &str, keep_count: usize) -> IndexResult<CleanupReport> {
        let snapshot = self.resolver.snapshot(collection_type).await?;
        let retired = snapshot.older_beyond(keep_count);
        debug!(
            collection_type = %collection_type,
            keep_count,
            collections = ?retired,
            "Reaping retired collections"
        );
        Ok(self.delete_all(collection_type, &retired).await)
    }

    /// Deletes abandoned attempts whose collection is older than `max_age`.
    ///
    /// This is the pre-flight deletion of [`begin`](Self::begin) without the
    /// rebuild, for scheduled hygiene. Younger pending collections are left
    /// alone since a rebuild may still be filling them.
    pub async fn abort_if_stale(
        &self,
        collection_type: &str,
        max_age: Duration,
    ) -> IndexResult<CleanupReport> {
        let max_age_secs = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
        let cutoff = self.clock.now().saturating_sub(max_age_secs);

        let snapshot = self.resolver.snapshot(collection_type).await?;
        let stale: Vec<String> = snapshot
            .newer()
            .into_iter()
            .filter(|name| CollectionNamer::extract_timestamp(name) <= cutoff)
            .collect();

        if !stale.is_empty() {
            info!(
                collection_type = %collection_type,
                collections = ?stale,
                max_age_secs,
                "Removing stale abandoned collections"
            );
        }
        Ok(self.delete_all(collection_type, &stale).await)
    }

    /// Points the alias back at the most recent retained older generation.
    ///
    /// The collection that was active becomes newer than the alias target and
    /// is cleaned up by the next [`begin`](Self::begin).
    pub async fn rollback(&self, collection_type: &str) -> IndexResult<ActivationReport> {
        let snapshot = self.resolver.snapshot(collection_type).await?;
        let target = snapshot
            .older()
            .into_iter()
            .next()
            .ok_or_else(|| IndexError::NoRollbackTarget {
                collection_type: collection_type.to_string(),
            })?;

        let alias = self
            .switch_alias(collection_type, &target, snapshot.current.as_deref())
            .await?;

        Ok(ActivationReport {
            alias,
            collection: target,
            previous: snapshot.current,
            reap: CleanupReport::default(),
            reap_error: None,
        })
    }

    /// Describes the alias and every collection of a type.
    pub async fn status(&self, collection_type: &str) -> IndexResult<TypeStatus> {
        let snapshot = self.resolver.snapshot(collection_type).await?;
        let pending = snapshot.newer();

        let collections = snapshot
            .collections
            .iter()
            .map(|name| {
                let role = if snapshot.current.as_deref() == Some(name.as_str()) {
                    CollectionRole::Active
                } else if pending.contains(name) {
                    CollectionRole::Pending
                } else {
                    CollectionRole::Retired
                };
                CollectionStatus {
                    name: name.clone(),
                    timestamp: CollectionNamer::extract_timestamp(name),
                    role,
                }
            })
            .collect();

        Ok(TypeStatus {
            collection_type: collection_type.to_string(),
            alias: self.namer().alias_name(collection_type),
            current: snapshot.current,
            collections,
        })
    }

    /// Timestamp for a new collection: now, or one past the newest existing
    /// collection if that is not in the past, so names stay unique and
    /// ordered even for two attempts within one second.
    fn next_timestamp(&self, snapshot: &TypeSnapshot) -> i64 {
        let now = self.clock.now();
        match snapshot.newest_timestamp() {
            Some(newest) if newest >= now => newest + 1,
            _ => now,
        }
    }

    async fn switch_alias(
        &self,
        collection_type: &str,
        collection: &str,
        previous: Option<&str>,
    ) -> IndexResult<String> {
        let alias = self.namer().alias_name(collection_type);
        self.engine.upsert_alias(&alias, collection).await?;
        info!(
            collection_type = %collection_type,
            alias = %alias,
            collection = %collection,
            previous = ?previous,
            "Alias switched"
        );
        Ok(alias)
    }

    async fn delete_all(&self, collection_type: &str, names: &[String]) -> CleanupReport {
        let mut report = CleanupReport::default();

        for name in names {
            match self.engine.delete_collection(name).await {
                Ok(DeleteOutcome::Deleted) => {
                    info!(collection_type = %collection_type, collection = %name, "Deleted collection");
                    report.deleted.push(name.clone());
                }
                Ok(DeleteOutcome::NotFound) => {
                    debug!(collection_type = %collection_type, collection = %name, "Collection already gone");
                    report.already_gone.push(name.clone());
                }
                Err(e) => {
                    warn!(
                        collection_type = %collection_type,
                        collection = %name,
                        error = %e,
                        "Failed to delete collection; will retry on next cycle"
                    );
                    report.failed.push(CleanupFailure {
                        collection: name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }
}
