//! Configuration for contract generation, storage and route analysis.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::errors::ContractError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Where and how contracts are persisted.
    #[serde(default)]
    pub store: StoreConfig,
    /// Middleware classification rules.
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    /// Response extraction options.
    #[serde(default)]
    pub response: ResponseConfig,
}

impl ContractConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses configuration from a JSON string.
    pub fn from_json_str(text: &str) -> Result<Self, ContractError> {
        serde_json::from_str(text).map_err(|err| ContractError::Config(err.to_string()))
    }

    /// Loads configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ContractError> {
        let text = std::fs::read_to_string(path).map_err(|err| ContractError::io(path, err))?;
        Self::from_json_str(&text)
    }

    /// Sets the base directory for the contract and its versions.
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store.base_dir = dir.into();
        self
    }

    /// Enables status code inference.
    #[must_use]
    pub fn with_inferred_status_codes(mut self) -> Self {
        self.store.infer_status_codes = true;
        self
    }

    /// Snapshots the live contract before every persist.
    #[must_use]
    pub fn with_snapshot_before_overwrite(mut self) -> Self {
        self.store.snapshot_before_overwrite = true;
        self
    }

    /// Wraps every observed response shape under `key`.
    #[must_use]
    pub fn with_response_wrap_key(mut self, key: impl Into<String>) -> Self {
        self.response.wrap_key = Some(key.into());
        self
    }
}

/// Storage layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the live contract and the versions directory.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    /// File name of the live contract.
    #[serde(default = "default_contract_file")]
    pub contract_file: String,
    /// Name of the version history directory under `base_dir`.
    #[serde(default = "default_versions_dir")]
    pub versions_dir: String,
    /// Take a snapshot of the live contract before `persist` overwrites it.
    #[serde(default)]
    pub snapshot_before_overwrite: bool,
    /// Infer status codes for entries whose handler declares none.
    #[serde(default)]
    pub infer_status_codes: bool,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("storage/api-contracts")
}

fn default_contract_file() -> String {
    "api.json".to_string()
}

fn default_versions_dir() -> String {
    "versions".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            contract_file: default_contract_file(),
            versions_dir: default_versions_dir(),
            snapshot_before_overwrite: false,
            infer_status_codes: false,
        }
    }
}

impl StoreConfig {
    /// Full path of the live contract file.
    #[must_use]
    pub fn contract_path(&self) -> PathBuf {
        self.base_dir.join(&self.contract_file)
    }

    /// Full path of the version history directory.
    #[must_use]
    pub fn versions_path(&self) -> PathBuf {
        self.base_dir.join(&self.versions_dir)
    }
}

/// A header implied by a middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRule {
    /// Header name.
    pub name: String,
    /// Whether the header must be sent.
    #[serde(default = "default_true")]
    pub required: bool,
    /// Description for documentation.
    #[serde(default)]
    pub description: String,
}

impl HeaderRule {
    /// Creates a header rule.
    #[must_use]
    pub fn new(name: impl Into<String>, required: bool, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required,
            description: description.into(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Middleware classification used by the route analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Middleware implying bearer-token authentication.
    #[serde(default = "default_bearer_middleware")]
    pub bearer_middleware: Vec<String>,
    /// Middleware implying session authentication.
    #[serde(default = "default_session_middleware")]
    pub session_middleware: Vec<String>,
    /// Middleware implying API-key authentication.
    #[serde(default = "default_api_key_middleware")]
    pub api_key_middleware: Vec<String>,
    /// Middleware implying HTTP basic authentication.
    #[serde(default = "default_basic_middleware")]
    pub basic_middleware: Vec<String>,
    /// Name of the rate limiting middleware.
    #[serde(default = "default_throttle_middleware")]
    pub throttle_middleware: String,
    /// Descriptions for named rate limiters.
    #[serde(default)]
    pub rate_limit_descriptions: HashMap<String, String>,
    /// Headers required by middleware, keyed by middleware name.
    #[serde(default = "default_header_middleware")]
    pub header_middleware: HashMap<String, Vec<HeaderRule>>,
}

fn default_bearer_middleware() -> Vec<String> {
    ["auth:sanctum", "auth:api", "auth.bearer", "jwt.auth", "auth:jwt"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_session_middleware() -> Vec<String> {
    ["auth:web", "auth.session", "auth"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_api_key_middleware() -> Vec<String> {
    ["auth.apikey", "auth:api-key", "api_key", "apikey"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_basic_middleware() -> Vec<String> {
    vec!["auth.basic".to_string()]
}

fn default_throttle_middleware() -> String {
    "throttle".to_string()
}

fn default_header_middleware() -> HashMap<String, Vec<HeaderRule>> {
    let mut map = HashMap::new();
    map.insert(
        "tenant".to_string(),
        vec![HeaderRule::new("X-Tenant-Id", true, "Tenant the request is scoped to")],
    );
    map.insert(
        "localization".to_string(),
        vec![HeaderRule::new("Accept-Language", false, "Preferred response language")],
    );
    map.insert(
        "idempotent".to_string(),
        vec![HeaderRule::new(
            "Idempotency-Key",
            true,
            "Client-generated key that makes retries safe",
        )],
    );
    map
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            bearer_middleware: default_bearer_middleware(),
            session_middleware: default_session_middleware(),
            api_key_middleware: default_api_key_middleware(),
            basic_middleware: default_basic_middleware(),
            throttle_middleware: default_throttle_middleware(),
            rate_limit_descriptions: HashMap::new(),
            header_middleware: default_header_middleware(),
        }
    }
}

impl AnalyzerConfig {
    /// Adds a description for a named rate limiter.
    #[must_use]
    pub fn with_rate_limit_description(
        mut self,
        limiter: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.rate_limit_descriptions
            .insert(limiter.into(), description.into());
        self
    }

    /// Declares headers required by a middleware.
    #[must_use]
    pub fn with_header_middleware(mut self, middleware: impl Into<String>, headers: Vec<HeaderRule>) -> Self {
        self.header_middleware.insert(middleware.into(), headers);
        self
    }
}

/// Response extraction options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Wrap observed shapes under this key (e.g. `"data"`).
    #[serde(default)]
    pub wrap_key: Option<String>,
    /// Directory scanned to preload transformer instances.
    #[serde(default)]
    pub transformer_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ContractConfig::default();
        assert_eq!(config.store.contract_file, "api.json");
        assert_eq!(config.store.versions_dir, "versions");
        assert!(!config.store.snapshot_before_overwrite);
        assert_eq!(config.analyzer.throttle_middleware, "throttle");
        assert!(config.analyzer.header_middleware.contains_key("tenant"));
        assert!(config.response.wrap_key.is_none());
    }

    #[test]
    fn test_paths() {
        let config = ContractConfig::new().with_base_dir("/srv/contracts");
        assert_eq!(config.store.contract_path(), PathBuf::from("/srv/contracts/api.json"));
        assert_eq!(config.store.versions_path(), PathBuf::from("/srv/contracts/versions"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ContractConfig::from_json_str(
            r#"{"store": {"base_dir": "out", "infer_status_codes": true},
                "response": {"wrap_key": "data"}}"#,
        )
        .unwrap();

        assert_eq!(config.store.base_dir, PathBuf::from("out"));
        assert!(config.store.infer_status_codes);
        assert_eq!(config.store.contract_file, "api.json");
        assert_eq!(config.response.wrap_key.as_deref(), Some("data"));
        assert!(!config.analyzer.bearer_middleware.is_empty());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = ContractConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ContractError::Config(_)));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contract.json");
        std::fs::write(&path, r#"{"analyzer": {"throttle_middleware": "rate"}}"#).unwrap();

        let config = ContractConfig::from_json_file(&path).unwrap();
        assert_eq!(config.analyzer.throttle_middleware, "rate");

        let missing = ContractConfig::from_json_file(&dir.path().join("nope.json"));
        assert!(matches!(missing, Err(ContractError::Io { .. })));
    }
}
