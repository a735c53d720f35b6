//! Search engine backend implementations.
//!
//! # Available Backends
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | Typesense | `typesense` | HTTP client for a Typesense node |
//! | In-memory | always | Engine semantics in process, with failure injection |
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "typesense")]
//! use shelfsync_index::backends::typesense::TypesenseClient;
//! use shelfsync_index::config::IndexConfig;
//!
//! # #[cfg(feature = "typesense")]
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = IndexConfig::for_site("shop").with_api_key("xyz");
//! let client = TypesenseClient::new(&config)?;
//! # Ok(())
//! # }
//! ```

pub mod memory;

#[cfg(feature = "typesense")]
pub mod typesense;
