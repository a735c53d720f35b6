//! Shared test infrastructure for lifecycle and client tests.

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;
pub mod harness;

pub use assertions::*;
pub use fixtures::*;
pub use harness::*;
