//! Contract data model and its canonical JSON form.

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;

use crate::errors::ContractError;
use crate::routes::{AuthType, HeaderRequirement, HttpMethod, PathParameter, RateLimit};
use crate::schema::SchemaNode;
use crate::utils::OrderedMap;

/// Authentication block of an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    /// Scheme.
    #[serde(rename = "type")]
    pub auth_type: AuthType,
}

/// Everything known about one (path, method) pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractEntry {
    /// Summary from handler docs, or `Handler@method`.
    pub description: String,
    /// Authentication requirement.
    #[serde(default)]
    pub auth: AuthInfo,
    /// URI placeholders.
    #[serde(default)]
    pub path_parameters: OrderedMap<String, PathParameter>,
    /// Request body shape.
    #[serde(default)]
    pub request_schema: SchemaNode,
    /// Response body shape.
    #[serde(default)]
    pub response_schema: SchemaNode,
    /// Applied rate limiter.
    #[serde(default)]
    pub rate_limit: Option<RateLimit>,
    /// Headers implied by middleware.
    #[serde(default)]
    pub custom_headers: Vec<HeaderRequirement>,
    /// Version segment of the URI.
    #[serde(default)]
    pub api_version: Option<String>,
    /// Declared or inferred response status codes.
    #[serde(default)]
    pub status_codes: Option<BTreeSet<u16>>,
}

impl ContractEntry {
    /// Creates an entry with empty schemas and no metadata.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }
}

/// A (path, method) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteKey {
    /// URI template.
    pub path: String,
    /// HTTP method.
    pub method: HttpMethod,
}

impl RouteKey {
    /// Creates a route key.
    #[must_use]
    pub fn new(path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            path: path.into(),
            method,
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Path → method → entry, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Contract {
    paths: OrderedMap<String, OrderedMap<HttpMethod, ContractEntry>>,
}

impl Contract {
    /// Creates an empty contract.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, returning the one it replaced.
    pub fn insert(
        &mut self,
        path: impl Into<String>,
        method: HttpMethod,
        entry: ContractEntry,
    ) -> Option<ContractEntry> {
        self.paths
            .get_or_insert_with(path.into(), OrderedMap::new)
            .insert(method, entry)
    }

    /// Looks up one entry.
    #[must_use]
    pub fn get(&self, path: &str, method: HttpMethod) -> Option<&ContractEntry> {
        self.paths.get(path)?.get(&method)
    }

    /// Whether the pair is present.
    #[must_use]
    pub fn contains(&self, path: &str, method: HttpMethod) -> bool {
        self.get(path, method).is_some()
    }

    /// Methods registered for a path, in insertion order.
    #[must_use]
    pub fn methods(&self, path: &str) -> Vec<HttpMethod> {
        self.paths
            .get(path)
            .map(|methods| methods.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Paths in insertion order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }

    /// Every entry in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, HttpMethod, &ContractEntry)> {
        self.paths.iter().flat_map(|(path, methods)| {
            methods
                .iter()
                .map(move |(method, entry)| (path.as_str(), *method, entry))
        })
    }

    /// Every (path, method) pair in insertion order.
    #[must_use]
    pub fn route_keys(&self) -> Vec<RouteKey> {
        self.iter()
            .map(|(path, method, _)| RouteKey::new(path, method))
            .collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.values().map(OrderedMap::len).sum()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Canonical on-disk form: 4-space indented JSON with a trailing newline.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, ContractError> {
        let mut bytes = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut bytes, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut serializer)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Parses a contract document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ContractError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// SHA-256 of the canonical form, hex encoded.
    pub fn fingerprint(&self) -> Result<String, ContractError> {
        Ok(digest(&self.to_canonical_bytes()?))
    }
}

/// Hex SHA-256 of `bytes`.
pub(crate) fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
