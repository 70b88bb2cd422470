//! Test assertions for schemas, contracts and diffs.

use crate::contract::Contract;
use crate::diff::DiffResult;
use crate::events::CollectingErrorSink;
use crate::routes::HttpMethod;
use crate::schema::{SchemaNode, SchemaType};

/// Asserts that the node at `path` has the expected type.
pub fn assert_field_type(schema: &SchemaNode, path: &str, expected: SchemaType) {
    let node = schema
        .at_path(path)
        .unwrap_or_else(|| panic!("Expected field '{path}' in schema, but it is missing"));
    assert_eq!(
        node.schema_type(),
        expected,
        "Expected '{path}' to be {expected}, got {}",
        node.schema_type()
    );
}

/// Asserts that the node at `path` is required.
pub fn assert_field_required(schema: &SchemaNode, path: &str) {
    let node = schema
        .at_path(path)
        .unwrap_or_else(|| panic!("Expected field '{path}' in schema, but it is missing"));
    assert!(node.is_required(), "Expected '{path}' to be required");
}

/// Asserts that the contract has an entry for the pair.
pub fn assert_has_route(contract: &Contract, path: &str, method: HttpMethod) {
    assert!(
        contract.contains(path, method),
        "Expected route {method} {path}. Routes: {:?}",
        contract
            .route_keys()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
    );
}

/// Asserts that two contracts are equivalent.
pub fn assert_no_changes(diff: &DiffResult) {
    assert!(
        diff.is_empty(),
        "Expected no changes, got {}: {:?}",
        diff.summary(),
        diff
    );
}

/// Asserts the codes reported to `sink`, in order.
pub fn assert_error_codes(sink: &CollectingErrorSink, expected: &[&str]) {
    let codes = sink.codes();
    assert_eq!(
        codes, expected,
        "Expected error codes {expected:?}, got {codes:?}"
    );
}
