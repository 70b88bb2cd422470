//! Error code catalogue and remediation suggestions.
//!
//! This module provides:
//! - Stable extraction error codes
//! - A registry mapping codes to remediation steps

pub mod codes;
mod suggestions;

pub use suggestions::{
    get_contract_suggestion, list_suggestions, register_suggestion, ContractSuggestion,
};
