//! Handler metadata and the explicit handler registry.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::reference::HandlerRef;
use crate::contracts::codes;
use crate::errors::ExtractionError;

/// Where a handler's request shape comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestSource {
    /// A named validator declares rules for the request body.
    Validator(String),
    /// No validator; the method's declared parameters describe the input.
    Parameters(Vec<ParameterDescriptor>),
}

impl Default for RequestSource {
    fn default() -> Self {
        Self::Parameters(Vec::new())
    }
}

/// A declared handler method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    /// Parameter name.
    pub name: String,
    /// Declared type name (`int`, `?string`, `array`...), if any.
    pub type_name: Option<String>,
    /// The parameter has a default value.
    pub has_default: bool,
    /// Explicitly nullable.
    pub nullable: bool,
    /// Supplied by the framework (request objects, route-bound models).
    pub injected: bool,
}

impl ParameterDescriptor {
    /// Creates a required parameter of the given type.
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: Some(type_name.into()),
            has_default: false,
            nullable: false,
            injected: false,
        }
    }

    /// Creates a parameter with no declared type.
    #[must_use]
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
            has_default: false,
            nullable: false,
            injected: false,
        }
    }

    /// Marks the parameter as having a default.
    #[must_use]
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// Marks the parameter as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks the parameter as framework-injected.
    #[must_use]
    pub fn injected(mut self) -> Self {
        self.injected = true;
        self
    }
}

/// Everything the extractors need to know about one handler method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerDescriptor {
    /// Human-readable summary from handler documentation.
    pub description: Option<String>,
    /// Request shape source.
    pub request: RequestSource,
    /// Declared response transformer.
    pub transformer: Option<String>,
    /// Declared response status codes.
    pub status_codes: Vec<u16>,
}

/// Capability used to inspect handlers.
///
/// Implementations answer two questions: what a handler method declares,
/// and which rules a named validator produces. Both may fail with a
/// `ROUTE_*` or `FORM_REQUEST_*` error.
pub trait HandlerIntrospector {
    /// Describes the handler method `handler` points at.
    fn describe(&self, handler: &HandlerRef) -> Result<HandlerDescriptor, ExtractionError>;

    /// Instantiates the named validator and returns its rule set.
    fn validator_rules(&self, validator: &str) -> Result<Value, ExtractionError>;
}

/// A request validator.
pub trait Validator {
    /// The validation rule map, or `None` when the validator exposes none.
    fn rules(&self) -> Option<Value>;
}

/// A validator holding a fixed rule set.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticValidator {
    rules: Value,
}

impl StaticValidator {
    /// Creates a validator returning `rules`.
    #[must_use]
    pub fn new(rules: Value) -> Self {
        Self { rules }
    }
}

impl Validator for StaticValidator {
    fn rules(&self) -> Option<Value> {
        Some(self.rules.clone())
    }
}

/// Builds a validator instance; `Err` carries the construction failure.
pub type ValidatorFactory = Arc<dyn Fn() -> Result<Box<dyn Validator>, String> + Send + Sync>;

/// Declaration of one handler method.
#[derive(Debug, Clone, Default)]
pub struct MethodDefinition {
    descriptor: HandlerDescriptor,
    reflection_error: Option<String>,
}

impl MethodDefinition {
    /// Creates a method with no validator, parameters or transformer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the documentation summary.
    #[must_use]
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.descriptor.description = Some(description.into());
        self
    }

    /// Validates the request with the named validator.
    #[must_use]
    pub fn validated_by(mut self, validator: impl Into<String>) -> Self {
        self.descriptor.request = RequestSource::Validator(validator.into());
        self
    }

    /// Declares a method parameter. Ignored once a validator is set.
    #[must_use]
    pub fn param(mut self, parameter: ParameterDescriptor) -> Self {
        if let RequestSource::Parameters(params) = &mut self.descriptor.request {
            params.push(parameter);
        }
        self
    }

    /// Declares the response transformer.
    #[must_use]
    pub fn returns(mut self, transformer: impl Into<String>) -> Self {
        self.descriptor.transformer = Some(transformer.into());
        self
    }

    /// Declares response status codes.
    #[must_use]
    pub fn status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.descriptor.status_codes.extend(codes);
        self
    }

    /// Makes every inspection of this method fail with `ROUTE_REFLECTION_FAILED`.
    #[must_use]
    pub fn unreadable(mut self, reason: impl Into<String>) -> Self {
        self.reflection_error = Some(reason.into());
        self
    }
}

/// [`HandlerIntrospector`] backed by explicit registrations.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, HashMap<String, MethodDefinition>>,
    validators: HashMap<String, ValidatorFactory>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut validators: Vec<_> = self.validators.keys().collect();
        validators.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.len())
            .field("validators", &validators)
            .finish()
    }
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler with no methods yet.
    pub fn register_handler(&mut self, handler: impl Into<String>) -> &mut Self {
        self.handlers.entry(handler.into()).or_default();
        self
    }

    /// Registers one handler method, creating the handler if needed.
    pub fn register_method(
        &mut self,
        handler: impl Into<String>,
        method: impl Into<String>,
        definition: MethodDefinition,
    ) -> &mut Self {
        self.handlers
            .entry(handler.into())
            .or_default()
            .insert(method.into(), definition);
        self
    }

    /// Registers a validator factory.
    pub fn register_validator<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Box<dyn Validator>, String> + Send + Sync + 'static,
    {
        self.validators.insert(name.into(), Arc::new(factory));
        self
    }

    /// Registers a validator with a fixed rule set.
    pub fn register_rules(&mut self, name: impl Into<String>, rules: Value) -> &mut Self {
        self.register_validator(name, move || {
            Ok(Box::new(StaticValidator::new(rules.clone())) as Box<dyn Validator>)
        })
    }

    /// Whether a handler with this name is registered.
    #[must_use]
    pub fn has_handler(&self, handler: &str) -> bool {
        self.handlers.contains_key(handler)
    }
}

impl HandlerIntrospector for HandlerRegistry {
    fn describe(&self, handler: &HandlerRef) -> Result<HandlerDescriptor, ExtractionError> {
        let methods = self.handlers.get(&handler.handler).ok_or_else(|| {
            ExtractionError::new(
                codes::ROUTE_HANDLER_NOT_FOUND,
                format!("Handler '{}' is not registered", handler.handler),
            )
            .with_context("handler", handler.handler.clone())
        })?;

        let definition = methods.get(&handler.method).ok_or_else(|| {
            ExtractionError::new(
                codes::ROUTE_METHOD_NOT_FOUND,
                format!("Method '{}' not found on '{}'", handler.method, handler.handler),
            )
            .with_context("handler", handler.handler.clone())
            .with_context("method", handler.method.clone())
        })?;

        if let Some(reason) = &definition.reflection_error {
            return Err(ExtractionError::new(
                codes::ROUTE_REFLECTION_FAILED,
                format!("Could not inspect {handler}: {reason}"),
            )
            .with_context("handler", handler.to_string()));
        }

        Ok(definition.descriptor.clone())
    }

    fn validator_rules(&self, validator: &str) -> Result<Value, ExtractionError> {
        let factory = self.validators.get(validator).ok_or_else(|| {
            ExtractionError::new(
                codes::FORM_REQUEST_NOT_FOUND,
                format!("Validator '{validator}' is not registered"),
            )
            .with_context("validator", validator)
        })?;

        let instance = factory().map_err(|reason| {
            ExtractionError::new(
                codes::FORM_REQUEST_INSTANTIATION_FAILED,
                format!("Validator '{validator}' could not be created: {reason}"),
            )
            .with_context("validator", validator)
        })?;

        instance.rules().ok_or_else(|| {
            ExtractionError::new(
                codes::FORM_REQUEST_RULES_MISSING,
                format!("Validator '{validator}' does not expose rules"),
            )
            .with_context("validator", validator)
        })
    }
}
