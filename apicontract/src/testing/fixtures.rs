//! Sample handlers, routes and collaborators for contract tests.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ContractConfig;
use crate::contract::ContractStore;
use crate::handlers::{
    DeclaredField, HandlerRegistry, InstanceSynthesizer, MethodDefinition, ModelCatalog,
    ParameterDescriptor, Transformer, TransformerRegistration, TransformerRegistry,
};
use crate::routes::{HttpMethod, RouteDescriptor};
use crate::schema::SchemaType;

/// Synthesizer returning canned instances per model.
#[derive(Debug, Clone, Default)]
pub struct FixtureSynthesizer {
    instances: HashMap<String, Value>,
}

impl FixtureSynthesizer {
    /// Creates a synthesizer with no instances.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `instance` whenever `model` is requested.
    #[must_use]
    pub fn with_instance(mut self, model: impl Into<String>, instance: Value) -> Self {
        self.instances.insert(model.into(), instance);
        self
    }
}

impl InstanceSynthesizer for FixtureSynthesizer {
    fn synthesize(&self, model: &str) -> Result<Value, String> {
        self.instances
            .get(model)
            .cloned()
            .ok_or_else(|| format!("no fixture for model '{model}'"))
    }
}

/// Wraps a closure as a shared transformer.
pub fn closure_transformer<F>(f: F) -> Arc<dyn Transformer>
where
    F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Presents a post the way an API resource would.
pub fn present_post(post: &Value) -> Result<Value, String> {
    let post = post.as_object().ok_or("post must be an object")?;
    let field = |name: &str| post.get(name).cloned().unwrap_or(Value::Null);
    Ok(json!({
        "id": field("id"),
        "title": field("title"),
        "slug": field("slug"),
        "published_at": field("published_at"),
    }))
}

/// A persisted-looking post.
pub fn sample_post() -> Value {
    json!({
        "id": 42,
        "title": "Hello, world",
        "slug": "hello-world",
        "body": "First post",
        "published_at": "2024-01-15T10:30:00Z",
    })
}

/// Declared attributes of the `Post` model.
pub fn sample_models() -> ModelCatalog {
    ModelCatalog::new().with_model(
        "Post",
        [
            ("id", SchemaType::Integer),
            ("title", SchemaType::String),
            ("slug", SchemaType::String),
            ("body", SchemaType::String),
            ("published_at", SchemaType::String),
        ],
    )
}

/// Synthesizer that knows the `Post` model.
pub fn sample_synthesizer() -> FixtureSynthesizer {
    FixtureSynthesizer::new().with_instance("Post", sample_post())
}

/// `PostResource` and `PostCollection`.
pub fn sample_transformers() -> TransformerRegistry {
    let mut registry = TransformerRegistry::new();
    registry
        .register(TransformerRegistration::from_instance(
            "App\\Http\\Resources\\PostResource",
            closure_transformer(present_post),
        ))
        .register(
            TransformerRegistration::from_instance(
                "App\\Http\\Resources\\PostCollection",
                closure_transformer(present_post),
            )
            .for_model("Post"),
        )
        .register(
            TransformerRegistration::new("App\\Http\\Resources\\LegacyResource", || {
                Err("constructor requires a container".to_string())
            })
            .with_fields(vec![
                DeclaredField::new("id", SchemaType::Integer),
                DeclaredField::new("legacy_code", SchemaType::String).nullable(),
            ]),
        );
    registry
}

/// A blog API's handlers and validators.
pub fn sample_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry
        .register_method(
            "PostController",
            "index",
            MethodDefinition::new()
                .described("List posts")
                .param(ParameterDescriptor::new("page", "int").with_default())
                .returns("PostCollection"),
        )
        .register_method(
            "PostController",
            "show",
            MethodDefinition::new()
                .described("Show a post")
                .validated_by("ShowPostRequest")
                .returns("PostResource"),
        )
        .register_method(
            "PostController",
            "store",
            MethodDefinition::new()
                .described("Create a post")
                .validated_by("StorePostRequest")
                .returns("PostResource")
                .status_codes([201, 422]),
        )
        .register_method(
            "PostController",
            "destroy",
            MethodDefinition::new().status_codes([204]),
        )
        .register_method(
            "LegacyController",
            "show",
            MethodDefinition::new().returns("LegacyResource"),
        )
        .register_rules("ShowPostRequest", json!({"post": "required|integer"}))
        .register_rules(
            "StorePostRequest",
            json!({
                "title": "required|string|max:255",
                "body": ["required", "string"],
                "tags": "array",
                "tags.*": "string",
                "published_at": "nullable|date",
            }),
        );
    registry
}

/// Routes served by [`sample_registry`].
pub fn sample_routes() -> Vec<RouteDescriptor> {
    vec![
        RouteDescriptor::new(HttpMethod::Get, "/api/v1/posts", "PostController@index")
            .with_middleware(["api", "throttle:api"]),
        RouteDescriptor::new(HttpMethod::Post, "/api/v1/posts", "PostController@store")
            .with_middleware(["api", "auth:sanctum", "tenant", "throttle:60,1"]),
        RouteDescriptor::new(HttpMethod::Get, "/api/v1/posts/{post}", "PostController@show")
            .with_middleware(["api", "auth:sanctum"]),
        RouteDescriptor::new(HttpMethod::Delete, "/api/v1/posts/{post}", "PostController@destroy")
            .with_middleware(["api", "auth:sanctum"]),
    ]
}

/// A store over the sample handlers, transformers and models.
pub fn sample_store(config: ContractConfig) -> ContractStore {
    ContractStore::new(config, sample_registry())
        .with_transformers(sample_transformers())
        .with_models(sample_models())
        .with_synthesizer(sample_synthesizer())
}
