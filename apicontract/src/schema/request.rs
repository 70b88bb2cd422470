//! Request schema extraction.

use tracing::debug;

use super::node::{SchemaNode, SchemaType};
use super::rules::schema_from_rules;
use crate::contracts::codes;
use crate::errors::ExtractionError;
use crate::events::ErrorSink;
use crate::handlers::{
    HandlerDescriptor, HandlerIntrospector, HandlerRef, ParameterDescriptor, RequestSource,
};
use crate::utils::OrderedMap;

/// Derives the request body shape of a handler method.
///
/// The result is always an object node. Failures are reported once through
/// the sink and yield an empty object.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSchemaExtractor;

impl RequestSchemaExtractor {
    /// Creates an extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Describes `handler` and extracts its request schema.
    pub fn extract(
        &self,
        handler: &HandlerRef,
        introspector: &dyn HandlerIntrospector,
        sink: &dyn ErrorSink,
    ) -> SchemaNode {
        match introspector.describe(handler) {
            Ok(descriptor) => self.extract_from(&descriptor, introspector, sink),
            Err(error) => {
                sink.report(&error);
                SchemaNode::empty_object()
            }
        }
    }

    /// Extracts the request schema from an already described handler.
    pub fn extract_from(
        &self,
        descriptor: &HandlerDescriptor,
        introspector: &dyn HandlerIntrospector,
        sink: &dyn ErrorSink,
    ) -> SchemaNode {
        match &descriptor.request {
            RequestSource::Validator(name) => match from_validator(name, introspector) {
                Ok(schema) => schema,
                Err(error) => {
                    sink.report(&error);
                    SchemaNode::empty_object()
                }
            },
            RequestSource::Parameters(params) => from_parameters(params),
        }
    }
}

fn from_validator(
    name: &str,
    introspector: &dyn HandlerIntrospector,
) -> Result<SchemaNode, ExtractionError> {
    let rules = introspector.validator_rules(name)?;
    let schema = schema_from_rules(&rules).ok_or_else(|| {
        ExtractionError::new(
            codes::FORM_REQUEST_INVALID_RULES,
            format!("Validator '{name}' returned rules that are not a field map"),
        )
        .with_context("validator", name)
        .with_context("rules", rules.clone())
    })?;
    debug!(validator = %name, fields = schema.children().len(), "Request schema from validator");
    Ok(schema)
}

fn from_parameters(params: &[ParameterDescriptor]) -> SchemaNode {
    let fields: OrderedMap<String, SchemaNode> = params
        .iter()
        .filter(|p| !p.injected)
        .map(|p| {
            let type_name = p.type_name.as_deref().unwrap_or("");
            let node = SchemaNode::new(SchemaType::from_type_name(type_name))
                .required(!p.has_default)
                .nullable(p.nullable || SchemaType::is_nullable_type_name(type_name));
            (p.name.clone(), node)
        })
        .collect();
    SchemaNode::object(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingErrorSink;
    use crate::handlers::{HandlerRegistry, MethodDefinition};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn registry() -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry
            .register_method(
                "PostController",
                "store",
                MethodDefinition::new().validated_by("StorePostRequest"),
            )
            .register_method(
                "PostController",
                "search",
                MethodDefinition::new()
                    .param(ParameterDescriptor::new("request", "Request").injected())
                    .param(ParameterDescriptor::new("q", "string"))
                    .param(ParameterDescriptor::new("page", "int").with_default())
                    .param(ParameterDescriptor::new("tag", "?string"))
                    .param(ParameterDescriptor::untyped("sort").nullable()),
            )
            .register_method("PostController", "odd", MethodDefinition::new().validated_by("Odd"))
            .register_rules(
                "StorePostRequest",
                json!({
                    "title": "required|string|max:255",
                    "body": ["required", "string"],
                    "tags.*": "string"
                }),
            )
            .register_rules("Odd", json!(["required|string"]));
        registry
    }

    #[test]
    fn test_validator_rules_become_schema() {
        let sink = CollectingErrorSink::new();
        let schema = RequestSchemaExtractor::new().extract(
            &HandlerRef::new("PostController", "store"),
            &registry(),
            &sink,
        );

        assert!(sink.is_empty());
        assert_eq!(
            schema.children().keys().cloned().collect::<Vec<_>>(),
            vec!["title", "body", "tags"]
        );
        assert_eq!(schema.at_path("title").unwrap().constraint("max"), Some("255"));
        assert!(schema.at_path("body").unwrap().is_required());
        assert_eq!(schema.at_path("tags.*").unwrap().schema_type(), SchemaType::String);
    }

    #[test]
    fn test_parameter_fallback() {
        let sink = CollectingErrorSink::new();
        let schema = RequestSchemaExtractor::new().extract(
            &HandlerRef::new("PostController", "search"),
            &registry(),
            &sink,
        );

        assert!(sink.is_empty());
        assert!(schema.child("request").is_none());

        let q = schema.child("q").unwrap();
        assert_eq!(q.schema_type(), SchemaType::String);
        assert!(q.is_required());

        let page = schema.child("page").unwrap();
        assert_eq!(page.schema_type(), SchemaType::Integer);
        assert!(!page.is_required());

        let tag = schema.child("tag").unwrap();
        assert!(tag.is_nullable());
        assert_eq!(tag.schema_type(), SchemaType::String);

        let sort = schema.child("sort").unwrap();
        assert_eq!(sort.schema_type(), SchemaType::Unknown);
        assert!(sort.is_nullable());
    }

    #[test]
    fn test_graceful_degradation_reports_once() {
        let cases = [
            (HandlerRef::new("Missing", "index"), codes::ROUTE_HANDLER_NOT_FOUND),
            (HandlerRef::new("PostController", "nope"), codes::ROUTE_METHOD_NOT_FOUND),
            (HandlerRef::new("PostController", "odd"), codes::FORM_REQUEST_INVALID_RULES),
        ];
        let registry = registry();

        for (handler, code) in cases {
            let sink = CollectingErrorSink::new();
            let schema = RequestSchemaExtractor::new().extract(&handler, &registry, &sink);
            assert!(schema.is_empty_object(), "{handler}");
            assert_eq!(sink.codes(), vec![code.to_string()], "{handler}");
        }
    }

    #[test]
    fn test_closure_sink_receives_code_and_message() {
        let seen = std::cell::RefCell::new(Vec::new());
        let sink = |code: &str, message: &str| seen.borrow_mut().push((code.to_string(), message.to_string()));

        let mut registry = HandlerRegistry::new();
        registry.register_method("C", "m", MethodDefinition::new().validated_by("Unregistered"));
        RequestSchemaExtractor::new().extract(&HandlerRef::new("C", "m"), &registry, &sink);

        let seen = seen.into_inner();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, codes::FORM_REQUEST_NOT_FOUND);
        assert!(seen[0].1.contains("Unregistered"));
    }
}
