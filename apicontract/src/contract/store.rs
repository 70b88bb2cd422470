//! Contract assembly, persistence and version history.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::cache::ContractCache;
use super::model::{digest, AuthInfo, Contract, ContractEntry};
use crate::config::{ContractConfig, StoreConfig};
use crate::contracts::codes;
use crate::errors::{ContractError, ExtractionError};
use crate::events::ErrorSink;
use crate::handlers::{
    HandlerIntrospector, InstanceSynthesizer, ModelCatalog, TransformerRegistry,
};
use crate::observability::SpanTimer;
use crate::routes::{HttpMethod, RouteAnalyzer, RouteDescriptor};
use crate::schema::{RequestSchemaExtractor, ResponseSchemaExtractor, SchemaNode};
use crate::utils::timestamps::parse_version_timestamp;
use crate::utils::{now_utc, version_timestamp, write_atomic, Timestamp};

/// Metadata of one stored version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Timestamp id, `YYYY-MM-DD-HHMMSS` with an optional `_NNN` suffix.
    pub id: String,
    /// When the snapshot was taken (second precision).
    pub timestamp: Timestamp,
    /// Snapshot file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Hex SHA-256 of the file contents.
    pub digest: String,
}

/// A loaded version.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionSnapshot {
    /// Timestamp id.
    pub id: String,
    /// When the snapshot was taken.
    pub timestamp: Timestamp,
    /// Parsed contract.
    pub contract: Contract,
    /// Size in bytes.
    pub size: u64,
}

/// Builds contracts from routes and manages their files.
pub struct ContractStore {
    config: StoreConfig,
    analyzer: RouteAnalyzer,
    introspector: Box<dyn HandlerIntrospector>,
    requests: RequestSchemaExtractor,
    responses: ResponseSchemaExtractor,
}

impl std::fmt::Debug for ContractStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractStore")
            .field("config", &self.config)
            .field("analyzer", &self.analyzer)
            .field("responses", &self.responses)
            .finish_non_exhaustive()
    }
}

impl ContractStore {
    /// Creates a store inspecting handlers through `introspector`.
    pub fn new(config: ContractConfig, introspector: impl HandlerIntrospector + 'static) -> Self {
        Self {
            analyzer: RouteAnalyzer::new(config.analyzer),
            requests: RequestSchemaExtractor::new(),
            responses: ResponseSchemaExtractor::new(config.response),
            introspector: Box::new(introspector),
            config: config.store,
        }
    }

    /// Uses `transformers` for response extraction.
    #[must_use]
    pub fn with_transformers(mut self, transformers: TransformerRegistry) -> Self {
        self.responses = self.responses.with_transformers(transformers);
        self
    }

    /// Uses `models` for zero-valued instances.
    #[must_use]
    pub fn with_models(mut self, models: ModelCatalog) -> Self {
        self.responses = self.responses.with_models(models);
        self
    }

    /// Uses `synthesizer` to create model instances.
    #[must_use]
    pub fn with_synthesizer(mut self, synthesizer: impl InstanceSynthesizer + 'static) -> Self {
        self.responses = self.responses.with_synthesizer(Box::new(synthesizer));
        self
    }

    /// Path of the live contract file.
    #[must_use]
    pub fn contract_path(&self) -> PathBuf {
        self.config.contract_path()
    }

    /// Directory holding version snapshots.
    #[must_use]
    pub fn versions_dir(&self) -> PathBuf {
        self.config.versions_path()
    }

    /// Builds a contract from `routes`.
    ///
    /// Each route is extracted on its own; problems are reported to `sink`
    /// and leave a degraded entry behind instead of failing the build.
    pub fn build(&self, routes: &[RouteDescriptor], sink: &dyn ErrorSink) -> Contract {
        let timer = SpanTimer::start("build");
        let preloaded = self.responses.preload();

        let contract = timer.span().in_scope(|| {
            let mut contract = Contract::new();
            for route in routes {
                let entry = panic::catch_unwind(AssertUnwindSafe(|| self.build_entry(route, sink)))
                    .unwrap_or_else(|payload| {
                        let reason = panic_message(payload.as_ref());
                        sink.report(
                            &ExtractionError::new(
                                codes::ROUTE_REFLECTION_FAILED,
                                format!("Extraction panicked for {} {}: {reason}", route.method, route.uri),
                            )
                            .with_context("action", route.action.clone()),
                        );
                        ContractEntry::new(route.action.clone())
                    });

                if contract.insert(route.uri.clone(), route.method, entry).is_some() {
                    warn!(path = %route.uri, method = %route.method, "Duplicate route replaced earlier entry");
                }
            }
            contract
        });

        let duration_ms = timer.finish();
        info!(
            routes = routes.len(),
            entries = contract.len(),
            preloaded,
            duration_ms,
            "Contract built"
        );
        contract
    }

    fn build_entry(&self, route: &RouteDescriptor, sink: &dyn ErrorSink) -> ContractEntry {
        debug!(method = %route.method, uri = %route.uri, action = %route.action, "Extracting route");

        let auth_type = self.analyzer.determine_auth(route);
        let rate_limit = self.analyzer.extract_rate_limit(route);

        let (description, request_schema, response_schema, declared_codes) = match route.handler() {
            Err(error) => {
                sink.report(&error);
                (route.action.clone(), SchemaNode::empty_object(), SchemaNode::empty_object(), Vec::new())
            }
            Ok(handler) => {
                let fallback = format!("{}@{}", handler.short_handler(), handler.method);
                match self.introspector.describe(&handler) {
                    Err(error) => {
                        sink.report(&error);
                        (fallback, SchemaNode::empty_object(), SchemaNode::empty_object(), Vec::new())
                    }
                    Ok(descriptor) => (
                        descriptor.description.clone().unwrap_or(fallback),
                        self.requests
                            .extract_from(&descriptor, self.introspector.as_ref(), sink),
                        self.responses.extract_from(&descriptor, sink),
                        descriptor.status_codes,
                    ),
                }
            }
        };

        let path_parameters = self.analyzer.path_parameter_specs(&route.uri, &request_schema);

        let status_codes = if !declared_codes.is_empty() {
            Some(declared_codes.into_iter().collect())
        } else if self.config.infer_status_codes {
            Some(infer_status_codes(
                route.method,
                auth_type.is_authenticated(),
                !path_parameters.is_empty(),
                !request_schema.children().is_empty(),
                rate_limit.is_some(),
            ))
        } else {
            None
        };

        ContractEntry {
            description,
            auth: AuthInfo { auth_type },
            path_parameters,
            request_schema,
            response_schema,
            rate_limit,
            custom_headers: self.analyzer.extract_custom_headers(route),
            api_version: self.analyzer.extract_api_version(&route.uri),
            status_codes,
        }
    }

    /// Writes `contract` to the live file atomically.
    ///
    /// With `snapshot_before_overwrite` the current file is snapshotted
    /// first; a failed snapshot aborts the write.
    pub fn persist(&self, contract: &Contract) -> Result<PathBuf, ContractError> {
        let path = self.contract_path();
        if self.config.snapshot_before_overwrite {
            self.snapshot()?;
        }

        let bytes = contract.to_canonical_bytes()?;
        write_atomic(&path, &bytes).map_err(|err| ContractError::io(&path, err))?;
        info!(path = %path.display(), entries = contract.len(), bytes = bytes.len(), "Contract persisted");
        Ok(path)
    }

    /// Loads the live contract through `cache`.
    pub fn load(&self, cache: &ContractCache) -> Option<Contract> {
        cache.load(&self.contract_path())
    }

    /// Copies the live file into the version history.
    ///
    /// Returns `Ok(None)` when no contract has been persisted yet.
    pub fn snapshot(&self) -> Result<Option<VersionInfo>, ContractError> {
        let live = self.contract_path();
        let bytes = match std::fs::read(&live) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %live.display(), "Nothing to snapshot");
                return Ok(None);
            }
            Err(err) => return Err(ContractError::io(&live, err)),
        };

        let versions = self.versions_dir();
        std::fs::create_dir_all(&versions).map_err(|err| ContractError::io(&versions, err))?;

        let timestamp = now_utc();
        let base = version_timestamp(&timestamp);
        let mut id = base.clone();
        let mut suffix = 0_u32;
        while versions.join(self.version_file_name(&id)).exists() {
            suffix += 1;
            id = format!("{base}_{suffix:03}");
        }

        let path = versions.join(self.version_file_name(&id));
        write_atomic(&path, &bytes).map_err(|err| ContractError::io(&path, err))?;
        info!(version = %id, path = %path.display(), "Contract snapshot written");

        Ok(Some(VersionInfo {
            timestamp: parse_version_timestamp(&id).unwrap_or(timestamp),
            id,
            path,
            size: bytes.len() as u64,
            digest: digest(&bytes),
        }))
    }

    /// Versions sorted by file name, oldest first.
    pub fn list_versions(&self) -> Result<Vec<VersionInfo>, ContractError> {
        let dir = self.versions_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(ContractError::io(&dir, err)),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let path = entry.map_err(|err| ContractError::io(&dir, err))?.path();
            let Some(id) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| self.version_id_from_file_name(name))
            else {
                continue;
            };
            let Ok(timestamp) = parse_version_timestamp(&id) else {
                debug!(path = %path.display(), "Skipping file with unparseable version id");
                continue;
            };
            let bytes = std::fs::read(&path).map_err(|err| ContractError::io(&path, err))?;
            versions.push(VersionInfo {
                id,
                timestamp,
                size: bytes.len() as u64,
                digest: digest(&bytes),
                path,
            });
        }
        versions.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(versions)
    }

    /// Loads and parses one version.
    ///
    /// `id` may be the timestamp id or the full file name.
    pub fn load_version(&self, id: &str) -> Result<VersionSnapshot, ContractError> {
        let (id, path) = self.resolve_version(id)?;
        let bytes = std::fs::read(&path).map_err(|err| ContractError::io(&path, err))?;
        let contract = Contract::from_slice(&bytes)?;
        let timestamp =
            parse_version_timestamp(&id).map_err(|_| ContractError::InvalidVersionId(id.clone()))?;
        Ok(VersionSnapshot {
            id,
            timestamp,
            contract,
            size: bytes.len() as u64,
        })
    }

    /// Replaces the live contract with a stored version.
    ///
    /// The current live file is snapshotted first and the version's bytes
    /// are copied verbatim. Returns the backup snapshot, if one was taken.
    pub fn restore(&self, id: &str) -> Result<Option<VersionInfo>, ContractError> {
        let (id, source) = self.resolve_version(id)?;
        let bytes = std::fs::read(&source).map_err(|err| ContractError::io(&source, err))?;
        Contract::from_slice(&bytes)?;

        let backup = self.snapshot()?;
        let live = self.contract_path();
        write_atomic(&live, &bytes).map_err(|err| ContractError::io(&live, err))?;
        info!(
            version = %id,
            backup = backup.as_ref().map_or("none", |b| b.id.as_str()),
            "Contract restored"
        );
        Ok(backup)
    }

    fn file_stem(&self) -> &str {
        Path::new(&self.config.contract_file)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("api")
    }

    fn version_file_name(&self, id: &str) -> String {
        format!("{}-{id}.json", self.file_stem())
    }

    fn version_id_from_file_name(&self, name: &str) -> Option<String> {
        name.strip_prefix(self.file_stem())?
            .strip_prefix('-')?
            .strip_suffix(".json")
            .map(String::from)
    }

    fn resolve_version(&self, id: &str) -> Result<(String, PathBuf), ContractError> {
        let id = id.trim();
        let id = self.version_id_from_file_name(id).unwrap_or_else(|| id.to_string());
        if !is_valid_version_id(&id) {
            return Err(ContractError::InvalidVersionId(id));
        }
        let path = self.versions_dir().join(self.version_file_name(&id));
        if !path.is_file() {
            return Err(ContractError::VersionNotFound(id));
        }
        Ok((id, path))
    }
}

/// `YYYY-MM-DD-HHMMSS` with an optional numeric `_N` suffix.
fn is_valid_version_id(id: &str) -> bool {
    let (base, suffix) = match id.split_once('_') {
        Some((base, suffix)) => (base, Some(suffix)),
        None => (id, None),
    };
    let suffix_ok = suffix.map_or(true, |s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()));
    suffix_ok && parse_version_timestamp(base).is_ok()
}

fn infer_status_codes(
    method: HttpMethod,
    authenticated: bool,
    has_path_params: bool,
    has_body: bool,
    rate_limited: bool,
) -> BTreeSet<u16> {
    let mut codes = BTreeSet::new();
    codes.insert(match method {
        HttpMethod::Post => 201,
        HttpMethod::Delete => 204,
        _ => 200,
    });
    if authenticated {
        codes.insert(401);
    }
    if has_path_params {
        codes.insert(404);
    }
    if has_body {
        codes.insert(422);
    }
    if rate_limited {
        codes.insert(429);
    }
    codes
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingErrorSink;
    use crate::handlers::{HandlerRef, HandlerRegistry, MethodDefinition};
    use serde_json::json;

    fn store(dir: &Path) -> ContractStore {
        let mut registry = HandlerRegistry::new();
        registry
            .register_method("PostController", "index", MethodDefinition::new().described("List posts"))
            .register_method("PostController", "store", MethodDefinition::new().validated_by("StorePost"))
            .register_rules("StorePost", json!({"title": "required|string"}));
        ContractStore::new(ContractConfig::new().with_base_dir(dir), registry)
    }

    fn routes() -> Vec<RouteDescriptor> {
        vec![
            RouteDescriptor::new(HttpMethod::Get, "/posts", "PostController@index"),
            RouteDescriptor::new(HttpMethod::Post, "/posts", "PostController@store")
                .with_middleware(["auth:sanctum", "throttle:60,1"]),
        ]
    }

    #[test]
    fn test_build_groups_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let contract = store(dir.path()).build(&routes(), &CollectingErrorSink::new());

        assert_eq!(contract.paths().collect::<Vec<_>>(), vec!["/posts"]);
        assert_eq!(contract.methods("/posts"), vec![HttpMethod::Get, HttpMethod::Post]);
        assert_eq!(contract.get("/posts", HttpMethod::Get).unwrap().description, "List posts");

        let create = contract.get("/posts", HttpMethod::Post).unwrap();
        assert_eq!(create.description, "PostController@store");
        assert!(create.request_schema.child("title").unwrap().is_required());
        assert_eq!(create.rate_limit.as_ref().unwrap().name, "60,1");
        assert_eq!(create.status_codes, None);
    }

    #[test]
    fn test_duplicate_route_last_wins() {
        let dir = tempfile::tempdir().unwrap();
        let routes = vec![
            RouteDescriptor::new(HttpMethod::Get, "/posts", "PostController@store"),
            RouteDescriptor::new(HttpMethod::Get, "/posts", "PostController@index"),
        ];
        let contract = store(dir.path()).build(&routes, &CollectingErrorSink::new());
        assert_eq!(contract.len(), 1);
        assert_eq!(contract.get("/posts", HttpMethod::Get).unwrap().description, "List posts");
    }

    #[test]
    fn test_invalid_action_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CollectingErrorSink::new();
        let routes = vec![RouteDescriptor::new(HttpMethod::Get, "/webhook", "Closure")];

        let contract = store(dir.path()).build(&routes, &sink);

        assert_eq!(sink.codes(), vec![codes::ROUTE_INVALID_ACTION_FORMAT.to_string()]);
        let entry = contract.get("/webhook", HttpMethod::Get).unwrap();
        assert!(entry.request_schema.is_empty_object());
        assert_eq!(entry.description, "Closure");
    }

    #[test]
    fn test_panicking_introspector_is_contained() {
        struct Exploding;

        impl HandlerIntrospector for Exploding {
            fn describe(&self, handler: &HandlerRef) -> Result<crate::handlers::HandlerDescriptor, ExtractionError> {
                if handler.method == "boom" {
                    panic!("reflection blew up");
                }
                Ok(crate::handlers::HandlerDescriptor::default())
            }

            fn validator_rules(&self, validator: &str) -> Result<serde_json::Value, ExtractionError> {
                Err(ExtractionError::new(codes::FORM_REQUEST_NOT_FOUND, validator))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let store = ContractStore::new(ContractConfig::new().with_base_dir(dir.path()), Exploding);
        let sink = CollectingErrorSink::new();
        let routes = vec![
            RouteDescriptor::new(HttpMethod::Get, "/a", "C@boom"),
            RouteDescriptor::new(HttpMethod::Get, "/b", "C@fine"),
        ];

        let contract = store.build(&routes, &sink);

        assert_eq!(contract.len(), 2);
        assert_eq!(sink.codes(), vec![codes::ROUTE_REFLECTION_FAILED.to_string()]);
        assert_eq!(contract.get("/b", HttpMethod::Get).unwrap().description, "C@fine");
    }

    #[test]
    fn test_inferred_status_codes() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = HandlerRegistry::new();
        registry
            .register_method("PostController", "update", MethodDefinition::new().validated_by("UpdatePost"))
            .register_method("PostController", "show", MethodDefinition::new().status_codes([200, 404]))
            .register_rules("UpdatePost", json!({"title": "string"}));
        let store = ContractStore::new(
            ContractConfig::new().with_base_dir(dir.path()).with_inferred_status_codes(),
            registry,
        );
        let routes = vec![
            RouteDescriptor::new(HttpMethod::Put, "/posts/{post}", "PostController@update")
                .with_middleware(["auth:sanctum", "throttle:api"]),
            RouteDescriptor::new(HttpMethod::Get, "/posts/{post}", "PostController@show"),
        ];

        let contract = store.build(&routes, &CollectingErrorSink::new());

        let update = contract.get("/posts/{post}", HttpMethod::Put).unwrap();
        assert_eq!(
            update.status_codes.as_ref().unwrap().iter().copied().collect::<Vec<_>>(),
            vec![200, 401, 404, 422, 429]
        );
        let show = contract.get("/posts/{post}", HttpMethod::Get).unwrap();
        assert_eq!(
            show.status_codes.as_ref().unwrap().iter().copied().collect::<Vec<_>>(),
            vec![200, 404]
        );
    }

    #[test]
    fn test_snapshot_without_contract() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert!(store.snapshot().unwrap().is_none());
        assert!(store.list_versions().unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_collisions_get_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store.persist(&Contract::new()).unwrap();

        let first = store.snapshot().unwrap().unwrap();
        let second = store.snapshot().unwrap().unwrap();
        let third = store.snapshot().unwrap().unwrap();

        let ids: Vec<_> = store.list_versions().unwrap().into_iter().map(|v| v.id).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&first.id) && ids.contains(&second.id) && ids.contains(&third.id));
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(first.digest, second.digest);
        assert!(second.id.ends_with("_001") || !second.id.contains('_'));
    }

    #[test]
    fn test_many_snapshots_list_in_creation_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store.persist(&Contract::new()).unwrap();

        let created: Vec<_> = (0..12).map(|_| store.snapshot().unwrap().unwrap().id).collect();
        let listed: Vec<_> = store.list_versions().unwrap().into_iter().map(|v| v.id).collect();

        assert_eq!(listed, created);
        assert!(created.iter().all(|id| is_valid_version_id(id)));
    }

    #[test]
    fn test_version_id_validation() {
        assert!(is_valid_version_id("2024-01-15-103000"));
        assert!(is_valid_version_id("2024-01-15-103000_2"));
        assert!(!is_valid_version_id("2024-01-15-103000_x"));
        assert!(!is_valid_version_id("../api"));

        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert!(matches!(
            store.load_version("../../etc/passwd"),
            Err(ContractError::InvalidVersionId(_))
        ));
        assert!(matches!(
            store.load_version("2020-01-01-000000"),
            Err(ContractError::VersionNotFound(_))
        ));
        assert!(matches!(
            store.restore("api-2020-01-01-000000.json"),
            Err(ContractError::VersionNotFound(_))
        ));
    }

    #[test]
    fn test_persist_snapshots_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContractStore::new(
            ContractConfig::new()
                .with_base_dir(dir.path())
                .with_snapshot_before_overwrite(),
            HandlerRegistry::new(),
        );

        store.persist(&Contract::new()).unwrap();
        assert!(store.list_versions().unwrap().is_empty());

        store.persist(&Contract::new()).unwrap();
        assert_eq!(store.list_versions().unwrap().len(), 1);
    }

    #[test]
    fn test_persist_reports_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"a file, not a directory").unwrap();
        let store = ContractStore::new(ContractConfig::new().with_base_dir(&blocker), HandlerRegistry::new());

        assert!(matches!(store.persist(&Contract::new()), Err(ContractError::Io { .. })));
    }
}
