//! Error types for contract generation.
//!
//! Two families live here:
//!
//! - [`ContractError`] is returned by operations that must not silently
//!   degrade: persisting, snapshotting, restoring and loading configuration.
//! - [`ExtractionError`] is a structured record for problems scoped to a
//!   single route. It is reported through an
//!   [`ErrorSink`](crate::events::ErrorSink) and never aborts a build.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::contracts::get_contract_suggestion;

/// Fatal errors raised by persistence and configuration.
#[derive(Debug, Error)]
pub enum ContractError {
    /// IO error while reading or writing contract files.
    #[error("IO error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Requested version snapshot does not exist.
    #[error("Contract version '{0}' not found")]
    VersionNotFound(String),

    /// Version id contains path separators or is otherwise unusable.
    #[error("Invalid contract version id '{0}'")]
    InvalidVersionId(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ContractError {
    /// Wraps an IO error with the path it occurred on.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for ContractError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Which extraction phase produced an [`ExtractionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Handler reference or reflection problems.
    RouteAnalysis,
    /// Validator / request rule problems.
    RequestSchema,
    /// Transformer / model problems.
    ResponseSchema,
    /// Code outside the known prefixes.
    Other,
}

/// Structured, per-route extraction failure.
///
/// Carries a machine-readable code, a human message, structured context and
/// a remediation suggestion.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("[{code}] {message}")]
pub struct ExtractionError {
    /// Stable error code, e.g. `ROUTE_HANDLER_NOT_FOUND`.
    pub code: String,
    /// Human-readable description of the issue.
    pub message: String,
    /// Arbitrary structured data that helps downstream tooling render rich errors.
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
    /// Remediation guidance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ExtractionError {
    /// Creates a new error, defaulting the suggestion from the registry.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        let suggestion = get_contract_suggestion(&code).map(|s| s.remediation());
        Self {
            code,
            message: message.into(),
            context: HashMap::new(),
            suggestion,
        }
    }

    /// Adds a context entry.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Overrides the remediation suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Classifies the error by its code prefix.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        if self.code.starts_with("ROUTE_") {
            ErrorKind::RouteAnalysis
        } else if self.code.starts_with("FORM_REQUEST_") {
            ErrorKind::RequestSchema
        } else if self.code.starts_with("RESOURCE_") {
            ErrorKind::ResponseSchema
        } else {
            ErrorKind::Other
        }
    }

    /// Serialize the record for logging or API responses.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut dict = HashMap::new();
        dict.insert("code".to_string(), serde_json::json!(self.code));
        dict.insert("message".to_string(), serde_json::json!(self.message));
        dict.insert("suggestion".to_string(), serde_json::json!(self.suggestion));
        dict.insert("context".to_string(), serde_json::json!(self.context));
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::codes;

    #[test]
    fn test_extraction_error_defaults_suggestion() {
        let err = ExtractionError::new(codes::ROUTE_HANDLER_NOT_FOUND, "Handler 'X' missing");
        assert_eq!(err.code, "ROUTE_HANDLER_NOT_FOUND");
        assert!(err.suggestion.is_some());
        assert_eq!(err.kind(), ErrorKind::RouteAnalysis);
    }

    #[test]
    fn test_extraction_error_builder() {
        let err = ExtractionError::new(codes::RESOURCE_TRANSFORM_FAILED, "boom")
            .with_context("transformer", "PostResource")
            .with_suggestion("Check the transformer");

        assert_eq!(err.context.get("transformer"), Some(&serde_json::json!("PostResource")));
        assert_eq!(err.suggestion.as_deref(), Some("Check the transformer"));
        assert_eq!(err.kind(), ErrorKind::ResponseSchema);
        assert_eq!(err.to_string(), "[RESOURCE_TRANSFORM_FAILED] boom");
    }

    #[test]
    fn test_unknown_code_has_no_suggestion() {
        let err = ExtractionError::new("SOMETHING_ELSE", "odd");
        assert!(err.suggestion.is_none());
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_extraction_error_serialization() {
        let err = ExtractionError::new(codes::FORM_REQUEST_INVALID_RULES, "bad rules")
            .with_context("validator", "StorePostRequest");

        let json = serde_json::to_string(&err).unwrap();
        let back: ExtractionError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
        assert_eq!(back.kind(), ErrorKind::RequestSchema);
    }

    #[test]
    fn test_contract_error_display() {
        let err = ContractError::io(
            "/tmp/api.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/api.json"));

        let err = ContractError::VersionNotFound("2024-01-01-000000".to_string());
        assert!(err.to_string().contains("2024-01-01-000000"));
    }
}
