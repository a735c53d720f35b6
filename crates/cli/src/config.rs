//! Command-line configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SHELFSYNC_ENGINE_URL` | http://localhost:8108 | Search engine node |
//! | `SHELFSYNC_API_KEY` | (empty) | Engine API key |
//! | `SHELFSYNC_SITE` | default | Site identifier in alias and collection names |
//! | `SHELFSYNC_LOG_LEVEL` | info | Log level |
//! | `SHELFSYNC_REQUEST_TIMEOUT_MS` | 30000 | Per-request timeout |
//! | `SHELFSYNC_PAGE_SIZE` | 5 | Identifiers per page |
//! | `SHELFSYNC_KEEP_COUNT` | 1 | Prior generations kept after activation |
//! | `SHELFSYNC_IMPORT_ACTION` | upsert | Bulk import action |

use clap::Parser;
use shelfsync_index::config::{ImportAction, IndexConfig};

use crate::commands::Command;

/// Rebuild catalog search collections without downtime.
#[derive(Debug, Parser)]
#[command(name = "shelfsync", version, about)]
pub struct Cli {
    /// Search engine node URL.
    #[arg(
        long,
        env = "SHELFSYNC_ENGINE_URL",
        default_value = "http://localhost:8108",
        global = true
    )]
    pub engine_url: String,

    /// API key sent with every engine request.
    #[arg(long, env = "SHELFSYNC_API_KEY", default_value = "", hide_env_values = true, global = true)]
    pub api_key: String,

    /// Site identifier embedded in alias and collection names.
    #[arg(long, env = "SHELFSYNC_SITE", default_value = "default", global = true)]
    pub site: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "SHELFSYNC_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Request timeout in milliseconds.
    #[arg(long, env = "SHELFSYNC_REQUEST_TIMEOUT_MS", default_value = "30000", global = true)]
    pub request_timeout_ms: u64,

    /// Default page size for page processing and sync.
    #[arg(long, env = "SHELFSYNC_PAGE_SIZE", default_value = "5", global = true)]
    pub page_size: u64,

    /// Prior generations kept after an activation.
    #[arg(long, env = "SHELFSYNC_KEEP_COUNT", default_value = "1", global = true)]
    pub keep_count: usize,

    /// Bulk import action (create, upsert, update, emplace).
    #[arg(long, env = "SHELFSYNC_IMPORT_ACTION", default_value = "upsert", global = true)]
    pub import_action: ImportAction,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Builds the library configuration from the global flags.
    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            site: self.site.clone(),
            nodes: vec![self.engine_url.clone()],
            api_key: self.api_key.clone(),
            request_timeout_ms: self.request_timeout_ms,
            page_size: self.page_size,
            keep_count: self.keep_count,
            import_action: self.import_action,
        }
    }

    /// Validates the flags and returns every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = match self.index_config().validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        };

        if !self.engine_url.starts_with("http://") && !self.engine_url.starts_with("https://") {
            errors.push(format!(
                "Engine URL must start with http:// or https://, got '{}'",
                self.engine_url
            ));
        }

        if !matches!(
            self.log_level.to_lowercase().as_str(),
            "error" | "warn" | "info" | "debug" | "trace"
        ) {
            errors.push(format!("Unknown log level '{}'", self.log_level));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Initializes the tracing subscriber.
///
/// Logs go to stderr so stdout carries only the command's JSON output.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("shelfsync={level},shelfsync_index={level}"))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
