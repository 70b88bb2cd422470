//! Route metadata derived from URIs and middleware.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::descriptor::RouteDescriptor;
use crate::config::AnalyzerConfig;
use crate::schema::{SchemaNode, SchemaType};
use crate::utils::OrderedMap;

static PLACEHOLDER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").ok());
static VERSION_SEGMENT: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^v\d+$").ok());

/// Authentication scheme a route requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    /// Public route.
    #[default]
    None,
    /// `Authorization: Bearer <token>`.
    Bearer,
    /// Cookie session.
    Session,
    /// API key header.
    ApiKey,
    /// HTTP basic.
    Basic,
}

impl AuthType {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bearer => "bearer",
            Self::Session => "session",
            Self::ApiKey => "api_key",
            Self::Basic => "basic",
        }
    }

    /// True for anything but [`AuthType::None`].
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Rate limiter applied to a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Limiter name or the raw numeric spec (`60,1`).
    pub name: String,
    /// Human-readable limit.
    pub description: String,
}

/// A header a route expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRequirement {
    /// Header name.
    pub name: String,
    /// Whether the header must be sent.
    pub required: bool,
    /// Description.
    pub description: String,
}

/// A URI placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathParameter {
    /// Value type.
    #[serde(rename = "type")]
    pub param_type: SchemaType,
    /// `false` for `{name?}` placeholders.
    pub required: bool,
}

/// Derives route metadata. All methods are pure.
#[derive(Debug, Clone, Default)]
pub struct RouteAnalyzer {
    config: AnalyzerConfig,
}

impl RouteAnalyzer {
    /// Creates an analyzer.
    #[must_use]
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Placeholder names in declaration order, first occurrence only.
    ///
    /// `{id?}` and `{id:\d+}` both yield `id`.
    #[must_use]
    pub fn extract_path_params(&self, uri: &str) -> Vec<String> {
        placeholders(uri).into_iter().map(|(name, _)| name).collect()
    }

    /// Path parameters with their types and requiredness.
    ///
    /// Types come from the request schema field of the same name when it
    /// has a known type, otherwise `string`.
    #[must_use]
    pub fn path_parameter_specs(
        &self,
        uri: &str,
        request_schema: &SchemaNode,
    ) -> OrderedMap<String, PathParameter> {
        placeholders(uri)
            .into_iter()
            .map(|(name, required)| {
                let param_type = request_schema
                    .child(&name)
                    .map(SchemaNode::schema_type)
                    .filter(|t| *t != SchemaType::Unknown)
                    .unwrap_or(SchemaType::String);
                (name, PathParameter { param_type, required })
            })
            .collect()
    }

    /// Authentication scheme, by priority bearer, session, api key, basic.
    ///
    /// Each middleware entry belongs to the class of its most specific
    /// pattern: an exact match, else the longest matching prefix. So
    /// `auth:api-key` is an API key even though the session pattern `auth`
    /// is a prefix of it.
    #[must_use]
    pub fn determine_auth(&self, route: &RouteDescriptor) -> AuthType {
        route
            .middleware()
            .iter()
            .filter_map(|m| self.classify_auth(m))
            .min_by_key(|(rank, _)| *rank)
            .map_or(AuthType::None, |(_, auth)| auth)
    }

    /// `(priority rank, class)` of one middleware entry.
    fn classify_auth(&self, middleware: &str) -> Option<(usize, AuthType)> {
        let classes = [
            (AuthType::Bearer, &self.config.bearer_middleware),
            (AuthType::Session, &self.config.session_middleware),
            (AuthType::ApiKey, &self.config.api_key_middleware),
            (AuthType::Basic, &self.config.basic_middleware),
        ];
        classes
            .into_iter()
            .enumerate()
            .flat_map(|(rank, (auth, patterns))| {
                patterns
                    .iter()
                    .filter(|p| middleware_matches(middleware, p))
                    .map(move |p| (p.len(), rank, auth))
            })
            .min_by_key(|(len, rank, _)| (std::cmp::Reverse(*len), *rank))
            .map(|(_, rank, auth)| (rank, auth))
    }

    /// Rate limit from the throttle middleware, if any.
    #[must_use]
    pub fn extract_rate_limit(&self, route: &RouteDescriptor) -> Option<RateLimit> {
        let throttle = &self.config.throttle_middleware;
        let spec = route.middleware().iter().find_map(|m| {
            if m == throttle {
                Some("")
            } else {
                m.strip_prefix(throttle.as_str())?.strip_prefix(':')
            }
        })?;

        let name = if spec.is_empty() { "default" } else { spec };
        let description = self
            .config
            .rate_limit_descriptions
            .get(name)
            .cloned()
            .unwrap_or_else(|| describe_throttle(name));
        Some(RateLimit {
            name: name.to_string(),
            description,
        })
    }

    /// `v<digits>` segment that is first or follows one prefix segment.
    #[must_use]
    pub fn extract_api_version(&self, uri: &str) -> Option<String> {
        let pattern = VERSION_SEGMENT.as_ref()?;
        uri.split('/')
            .filter(|s| !s.is_empty())
            .take(2)
            .find(|s| pattern.is_match(s))
            .map(String::from)
    }

    /// Headers implied by middleware, de-duplicated by name.
    #[must_use]
    pub fn extract_custom_headers(&self, route: &RouteDescriptor) -> Vec<HeaderRequirement> {
        let mut headers: Vec<HeaderRequirement> = Vec::new();
        for middleware in route.middleware() {
            let key = middleware.split(':').next().unwrap_or(middleware);
            let Some(rules) = self.config.header_middleware.get(key) else {
                continue;
            };
            for rule in rules {
                if headers.iter().any(|h| h.name.eq_ignore_ascii_case(&rule.name)) {
                    continue;
                }
                headers.push(HeaderRequirement {
                    name: rule.name.clone(),
                    required: rule.required,
                    description: rule.description.clone(),
                });
            }
        }
        headers
    }
}

/// `(name, required)` per placeholder, first occurrence only.
fn placeholders(uri: &str) -> Vec<(String, bool)> {
    let Some(pattern) = PLACEHOLDER.as_ref() else {
        return Vec::new();
    };
    let mut found: Vec<(String, bool)> = Vec::new();
    for capture in pattern.captures_iter(uri) {
        let raw = capture.get(1).map_or("", |m| m.as_str()).trim();
        let raw = raw.split(':').next().unwrap_or(raw);
        let (name, required) = match raw.strip_suffix('?') {
            Some(name) => (name.trim(), false),
            None => (raw.trim(), true),
        };
        if name.is_empty() || found.iter().any(|(n, _)| n == name) {
            continue;
        }
        found.push((name.to_string(), required));
    }
    found
}

/// Exact match, or `pattern` followed by `:` or `,` parameters.
fn middleware_matches(middleware: &str, pattern: &str) -> bool {
    middleware == pattern
        || middleware
            .strip_prefix(pattern)
            .is_some_and(|rest| rest.starts_with([':', ',']))
}

fn describe_throttle(spec: &str) -> String {
    if spec == "default" {
        return "Default rate limit".to_string();
    }
    let mut parts = spec.split(',').map(str::trim);
    let attempts = parts.next().and_then(|p| p.parse::<u32>().ok());
    let minutes = parts.next().map_or(Some(1), |p| p.parse::<u32>().ok());
    match (attempts, minutes) {
        (Some(attempts), Some(minutes)) => format!("{attempts} requests per {minutes} minute(s)"),
        _ => format!("Rate limited by the '{spec}' limiter"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeaderRule;
    use crate::routes::HttpMethod;
    use crate::schema::rules::schema_from_rules;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn route(middleware: &[&str]) -> RouteDescriptor {
        RouteDescriptor::new(HttpMethod::Get, "/api/v1/posts", "PostController@index")
            .with_middleware(middleware.iter().copied())
    }

    #[test]
    fn test_path_params_dedupe_and_strip() {
        let analyzer = RouteAnalyzer::default();
        assert_eq!(
            analyzer.extract_path_params("/users/{user}/posts/{post?}/{user}/{slug:[a-z]+}"),
            vec!["user", "post", "slug"]
        );
        assert!(analyzer.extract_path_params("/health").is_empty());
    }

    #[test]
    fn test_path_parameter_specs() {
        let request = schema_from_rules(&json!({"post": "integer", "note": "sometimes"})).unwrap();
        let specs = RouteAnalyzer::default().path_parameter_specs("/posts/{post}/{note}/{page?}", &request);

        assert_eq!(
            specs.get("post"),
            Some(&PathParameter { param_type: SchemaType::Integer, required: true })
        );
        assert_eq!(specs.get("note").unwrap().param_type, SchemaType::String);
        assert!(!specs.get("page").unwrap().required);
        assert_eq!(specs.keys().cloned().collect::<Vec<_>>(), vec!["post", "note", "page"]);
    }

    #[test]
    fn test_auth_priority() {
        let analyzer = RouteAnalyzer::default();
        assert_eq!(analyzer.determine_auth(&route(&[])), AuthType::None);
        assert_eq!(analyzer.determine_auth(&route(&["auth"])), AuthType::Session);
        assert_eq!(analyzer.determine_auth(&route(&["auth", "auth:sanctum"])), AuthType::Bearer);
        assert_eq!(analyzer.determine_auth(&route(&["auth:admin"])), AuthType::Session);
        assert_eq!(analyzer.determine_auth(&route(&["apikey", "auth.basic"])), AuthType::ApiKey);
        assert_eq!(analyzer.determine_auth(&route(&["auth.basic"])), AuthType::Basic);
        assert_eq!(analyzer.determine_auth(&route(&["author"])), AuthType::None);
    }

    #[test]
    fn test_auth_prefers_most_specific_pattern() {
        let analyzer = RouteAnalyzer::default();
        assert_eq!(analyzer.determine_auth(&route(&["auth:api-key"])), AuthType::ApiKey);
        assert_eq!(analyzer.determine_auth(&route(&["auth:web"])), AuthType::Session);
        assert_eq!(analyzer.determine_auth(&route(&["auth:api"])), AuthType::Bearer);
        assert_eq!(
            analyzer.determine_auth(&route(&["auth:api-key", "auth:sanctum"])),
            AuthType::Bearer
        );
        assert_eq!(
            analyzer.determine_auth(&route(&["auth:api-key", "auth.basic"])),
            AuthType::ApiKey
        );
    }

    #[test]
    fn test_throttle_parsing() {
        let analyzer = RouteAnalyzer::new(
            AnalyzerConfig::default().with_rate_limit_description("api", "API limiter: 60/minute"),
        );

        assert_eq!(analyzer.extract_rate_limit(&route(&["auth"])), None);
        assert_eq!(
            analyzer.extract_rate_limit(&route(&["throttle:60,1"])),
            Some(RateLimit {
                name: "60,1".into(),
                description: "60 requests per 1 minute(s)".into()
            })
        );
        assert_eq!(
            analyzer.extract_rate_limit(&route(&["throttle:api"])).unwrap().description,
            "API limiter: 60/minute"
        );
        assert_eq!(
            analyzer.extract_rate_limit(&route(&["throttle:uploads"])).unwrap().description,
            "Rate limited by the 'uploads' limiter"
        );
        assert_eq!(
            analyzer.extract_rate_limit(&route(&["throttle"])).unwrap().name,
            "default"
        );
        assert_eq!(analyzer.extract_rate_limit(&route(&["throttled"])), None);
    }

    #[test]
    fn test_api_version() {
        let analyzer = RouteAnalyzer::default();
        assert_eq!(analyzer.extract_api_version("/api/v1/posts").as_deref(), Some("v1"));
        assert_eq!(analyzer.extract_api_version("/v12/users").as_deref(), Some("v12"));
        assert_eq!(analyzer.extract_api_version("/api/internal/v2/posts"), None);
        assert_eq!(analyzer.extract_api_version("/api/version/posts"), None);
    }

    #[test]
    fn test_custom_headers() {
        let analyzer = RouteAnalyzer::new(AnalyzerConfig::default().with_header_middleware(
            "signed",
            vec![
                HeaderRule::new("X-Signature", true, "HMAC of the body"),
                HeaderRule::new("X-Tenant-Id", false, "duplicate"),
            ],
        ));
        let headers = analyzer.extract_custom_headers(&route(&["tenant:acme", "signed", "localization"]));

        let names: Vec<_> = headers.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["X-Tenant-Id", "X-Signature", "Accept-Language"]);
        assert!(headers[0].required);
        assert!(!headers[2].required);
    }
}
