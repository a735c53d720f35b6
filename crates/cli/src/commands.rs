//! Subcommands.
//!
//! Every command is one bounded operation against the engine and yields a
//! JSON value for stdout, so a scheduler or shell script can carry the
//! session from `begin` through `process-page` to `activate`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use serde_json::{Value, json};
use tracing::info;

use shelfsync_index::config::IndexConfig;
use shelfsync_index::engine::SearchEngine;
use shelfsync_index::indexer::BatchIndexer;
use shelfsync_index::lifecycle::CollectionLifecycleManager;
use shelfsync_index::rebuild::{RebuildOptions, rebuild};

use crate::source::{NdjsonSource, load_schema};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start a rebuild: remove abandoned attempts and create a new collection
    Begin {
        /// Collection type (e.g. product, page)
        #[arg(long = "type")]
        collection_type: String,
        /// Schema JSON file
        #[arg(long)]
        schema: PathBuf,
    },
    /// Import one page of records into a collection
    ProcessPage {
        /// Collection type
        #[arg(long = "type")]
        collection_type: String,
        /// Target collection returned by `begin`
        #[arg(long)]
        collection: String,
        /// Page number (1-based)
        #[arg(long)]
        page: u64,
        /// NDJSON records file
        #[arg(long)]
        source: PathBuf,
        /// Schema JSON file
        #[arg(long)]
        schema: PathBuf,
    },
    /// Point the alias at a collection and reap old generations
    Activate {
        /// Collection type
        #[arg(long = "type")]
        collection_type: String,
        /// Collection to activate
        #[arg(long)]
        collection: String,
    },
    /// Delete generations older than the active one
    Reap {
        /// Collection type
        #[arg(long = "type")]
        collection_type: String,
        /// Prior generations to keep (defaults to --keep-count)
        #[arg(long)]
        keep: Option<usize>,
    },
    /// Delete abandoned attempts older than a maximum age
    Cleanup {
        /// Collection type
        #[arg(long = "type")]
        collection_type: String,
        /// Minimum age of an abandoned collection, e.g. 2h or 30m
        #[arg(long, value_parser = humantime::parse_duration)]
        max_age: Duration,
    },
    /// Point the alias back at the previous generation
    Rollback {
        /// Collection type
        #[arg(long = "type")]
        collection_type: String,
    },
    /// Show the alias and collections of a type
    Status {
        /// Collection type
        #[arg(long = "type")]
        collection_type: String,
    },
    /// List every alias on the engine
    Aliases,
    /// Check the engine is reachable
    Health,
    /// Run a complete rebuild in one process
    Sync {
        /// Collection type
        #[arg(long = "type")]
        collection_type: String,
        /// NDJSON records file
        #[arg(long)]
        source: PathBuf,
        /// Schema JSON file
        #[arg(long)]
        schema: PathBuf,
        /// Maximum pages to process
        #[arg(long, default_value = "1000")]
        max_iterations: u64,
    },
}

/// Formats a duration as `hh:mm:ss`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

impl Command {
    /// Runs the command against `engine` and returns its JSON output.
    pub async fn execute<E: SearchEngine>(
        self,
        engine: Arc<E>,
        config: &IndexConfig,
    ) -> anyhow::Result<Value> {
        let manager = CollectionLifecycleManager::new(Arc::clone(&engine), config.clone())?;
        let indexer = BatchIndexer::new(Arc::clone(&engine)).with_action(config.import_action);

        let output = match self {
            Command::Begin {
                collection_type,
                schema,
            } => {
                let schema = load_schema(&schema)?;
                serde_json::to_value(manager.begin(&collection_type, &schema).await?)?
            }
            Command::ProcessPage {
                collection_type,
                collection,
                page,
                source,
                schema,
            } => {
                manager.ensure_pending(&collection_type, &collection).await?;
                let source = NdjsonSource::open(&collection_type, &source, &schema)?;
                let stats = indexer
                    .process_page(&source, &collection, page, config.page_size)
                    .await?;
                serde_json::to_value(stats)?
            }
            Command::Activate {
                collection_type,
                collection,
            } => serde_json::to_value(manager.activate(&collection_type, &collection).await?)?,
            Command::Reap {
                collection_type,
                keep,
            } => {
                let keep = keep.unwrap_or(config.keep_count);
                serde_json::to_value(manager.reap(&collection_type, keep).await?)?
            }
            Command::Cleanup {
                collection_type,
                max_age,
            } => serde_json::to_value(manager.abort_if_stale(&collection_type, max_age).await?)?,
            Command::Rollback { collection_type } => {
                serde_json::to_value(manager.rollback(&collection_type).await?)?
            }
            Command::Status { collection_type } => {
                serde_json::to_value(manager.status(&collection_type).await?)?
            }
            Command::Aliases => serde_json::to_value(engine.list_aliases().await?)?,
            Command::Health => {
                engine.health().await?;
                json!({ "ok": true, "engine": engine.name() })
            }
            Command::Sync {
                collection_type,
                source,
                schema,
                max_iterations,
            } => {
                let source = NdjsonSource::open(&collection_type, &source, &schema)?;
                info!(
                    collection_type = %collection_type,
                    records = source.len(),
                    "Starting full sync"
                );
                let options = RebuildOptions {
                    page_size: config.page_size,
                    max_iterations,
                };
                let report = rebuild(&manager, &indexer, &source, options).await?;
                json!({
                    "collection": report.activation.collection,
                    "previous": report.activation.previous,
                    "pages": report.pages_processed,
                    "seen": report.session.total_seen,
                    "accepted": report.session.imported_count,
                    "skipped": report.session.skipped_count,
                    "rejected": report.session.rejected_count,
                    "reaped": report.activation.reap.deleted,
                    "elapsed": format_elapsed(report.elapsed),
                })
            }
        };

        Ok(output)
    }
}
