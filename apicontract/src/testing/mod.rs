//! Testing utilities for contract generation.
//!
//! This module provides:
//! - Sample handlers, transformers, models and routes
//! - A canned instance synthesizer
//! - Assertions for schemas, contracts and diffs

mod assertions;
mod fixtures;

pub use assertions::{
    assert_error_codes, assert_field_required, assert_field_type, assert_has_route,
    assert_no_changes,
};
pub use fixtures::{
    closure_transformer, present_post, sample_models, sample_post, sample_registry,
    sample_routes, sample_store, sample_synthesizer, sample_transformers, FixtureSynthesizer,
};
