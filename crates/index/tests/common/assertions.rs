//! Assertion helpers over the in-memory engine.

use shelfsync_index::backends::memory::InMemoryEngine;

/// Asserts the alias points at `expected` (or is absent for `None`).
pub fn assert_alias(engine: &InMemoryEngine, alias: &str, expected: Option<&str>) {
    assert_eq!(
        engine.alias_target(alias).as_deref(),
        expected,
        "Alias {} points to the wrong collection",
        alias
    );
}

/// Asserts exactly `expected` collections exist whose names start with `prefix`.
pub fn assert_collections(engine: &InMemoryEngine, prefix: &str, expected: &[&str]) {
    let mut actual: Vec<String> = engine
        .collection_names()
        .into_iter()
        .filter(|name| name.starts_with(prefix))
        .collect();
    actual.sort();

    let mut expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    expected.sort();

    assert_eq!(actual, expected, "Collections with prefix {}", prefix);
}
