//! Configuration shared by every component of a rebuild.
//!
//! The configuration is built once (from the CLI, a file, or code) and
//! injected into the namer, lifecycle manager, indexer and engine client.
//! Nothing in this crate reads ambient global state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How the engine should treat a document whose id already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportAction {
    /// Fail if the id exists.
    Create,
    /// Insert or replace.
    #[default]
    Upsert,
    /// Fail if the id does not exist; merge fields otherwise.
    Update,
    /// Insert or merge.
    Emplace,
}

impl ImportAction {
    /// Returns the engine's query-string value for this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportAction::Create => "create",
            ImportAction::Upsert => "upsert",
            ImportAction::Update => "update",
            ImportAction::Emplace => "emplace",
        }
    }
}

impl fmt::Display for ImportAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ImportAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(ImportAction::Create),
            "upsert" => Ok(ImportAction::Upsert),
            "update" => Ok(ImportAction::Update),
            "emplace" => Ok(ImportAction::Emplace),
            other => Err(format!("unknown import action '{}'", other)),
        }
    }
}

/// Configuration for collection rebuilds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Site identifier embedded in every alias and collection name.
    pub site: String,

    /// Search engine node URLs (e.g., `["http://localhost:8108"]`).
    /// Currently uses the first node.
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    /// Static API key sent with every engine request.
    #[serde(default)]
    pub api_key: String,

    /// Request timeout in milliseconds (default: 30000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Identifiers fetched per page (default: 5).
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Older generations retained after an activation, not counting the
    /// active collection (default: 1).
    #[serde(default = "default_keep_count")]
    pub keep_count: usize,

    /// Import action used for bulk upserts (default: upsert).
    #[serde(default)]
    pub import_action: ImportAction,
}

fn default_nodes() -> Vec<String> {
    vec!["http://localhost:8108".to_string()]
}

fn default_request_timeout_ms() -> u64 {
    30000
}

fn default_page_size() -> u64 {
    5
}

fn default_keep_count() -> usize {
    1
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            site: "default".to_string(),
            nodes: default_nodes(),
            api_key: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
            page_size: default_page_size(),
            keep_count: default_keep_count(),
            import_action: ImportAction::default(),
        }
    }
}

impl IndexConfig {
    /// Creates a configuration for the given site with default settings.
    pub fn for_site(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            ..Default::default()
        }
    }

    /// Sets the engine node URL.
    pub fn with_node(mut self, url: impl Into<String>) -> Self {
        self.nodes = vec![url.into()];
        self
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the retention count.
    pub fn with_keep_count(mut self, keep_count: usize) -> Self {
        self.keep_count = keep_count;
        self
    }

    /// Sets the import action.
    pub fn with_import_action(mut self, action: ImportAction) -> Self {
        self.import_action = action;
        self
    }

    /// Returns the first configured node URL without a trailing slash.
    pub fn primary_node(&self) -> Option<&str> {
        self.nodes.first().map(|n| n.trim_end_matches('/'))
    }

    /// Validates the configuration and returns every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.site.trim().is_empty() {
            errors.push("Site identifier cannot be empty".to_string());
        } else if !self.site.chars().any(|c| c.is_ascii_alphanumeric()) {
            errors.push("Site identifier must contain at least one letter or digit".to_string());
        }

        if self.nodes.is_empty() {
            errors.push("At least one search engine node is required".to_string());
        }

        if self.request_timeout_ms == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if self.page_size == 0 {
            errors.push("Page size cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
