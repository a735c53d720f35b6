//! Collection and alias naming.
//!
//! Every collection type has one stable alias, `{type}_{site}`, and any
//! number of physical collections, `{type}_{site}_{timestamp}`. The embedded
//! timestamp (unix seconds) is both the uniqueness token and the recency key
//! used to order generations.

use crate::config::IndexConfig;

/// Builds and parses alias and collection names for one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionNamer {
    site: String,
}

impl CollectionNamer {
    /// Creates a namer for `site`.
    ///
    /// The site is normalised to lowercase alphanumeric runs joined by `-`,
    /// so `Shop.Example.com` becomes `shop-example-com` and never contains
    /// the `_` separator.
    pub fn new(site: &str) -> Self {
        Self {
            site: normalize_site(site),
        }
    }

    /// Creates a namer from the configured site.
    pub fn from_config(config: &IndexConfig) -> Self {
        Self::new(&config.site)
    }

    /// Returns the normalised site identifier.
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Returns the alias readers query for a collection type.
    pub fn alias_name(&self, collection_type: &str) -> String {
        format!("{}_{}", collection_type, self.site)
    }

    /// Returns the physical collection name for `collection_type` at `timestamp`.
    pub fn new_collection_name(&self, collection_type: &str, timestamp: i64) -> String {
        format!("{}_{}_{}", collection_type, self.site, timestamp)
    }

    /// Returns true if `name` is a physical collection of `collection_type`.
    ///
    /// Names with an unparsable suffix still belong to the type; they sort
    /// last and become cleanup candidates.
    pub fn belongs_to(&self, collection_type: &str, name: &str) -> bool {
        let prefix = format!("{}_", self.alias_name(collection_type));
        name.strip_prefix(&prefix)
            .is_some_and(|suffix| !suffix.is_empty())
    }

    /// Extracts the embedded timestamp, or 0 if the name has none.
    pub fn extract_timestamp(name: &str) -> i64 {
        name.rsplit_once('_')
            .and_then(|(_, suffix)| suffix.parse::<i64>().ok())
            .filter(|ts| *ts >= 0)
            .unwrap_or(0)
    }
}

fn normalize_site(site: &str) -> String {
    site.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
