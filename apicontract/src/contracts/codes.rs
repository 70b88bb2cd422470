//! Extraction error codes.
//!
//! Codes are grouped by prefix: `ROUTE_*` for handler resolution,
//! `FORM_REQUEST_*` for request validators and `RESOURCE_*` for response
//! transformers.

/// The route action is not of the form `Handler@method`.
pub const ROUTE_INVALID_ACTION_FORMAT: &str = "ROUTE_INVALID_ACTION_FORMAT";
/// The handler named by the route is not registered.
pub const ROUTE_HANDLER_NOT_FOUND: &str = "ROUTE_HANDLER_NOT_FOUND";
/// The handler exists but has no such method.
pub const ROUTE_METHOD_NOT_FOUND: &str = "ROUTE_METHOD_NOT_FOUND";
/// Handler metadata could not be produced.
pub const ROUTE_REFLECTION_FAILED: &str = "ROUTE_REFLECTION_FAILED";

/// The validator named by the handler is not registered.
pub const FORM_REQUEST_NOT_FOUND: &str = "FORM_REQUEST_NOT_FOUND";
/// The validator factory failed.
pub const FORM_REQUEST_INSTANTIATION_FAILED: &str = "FORM_REQUEST_INSTANTIATION_FAILED";
/// The validator exposes no rules.
pub const FORM_REQUEST_RULES_MISSING: &str = "FORM_REQUEST_RULES_MISSING";
/// The validator's rules are not a map of field name to rule string/list.
pub const FORM_REQUEST_INVALID_RULES: &str = "FORM_REQUEST_INVALID_RULES";

/// The transformer named by the handler is not registered.
pub const RESOURCE_CLASS_NOT_FOUND: &str = "RESOURCE_CLASS_NOT_FOUND";
/// No model class could be associated with the transformer.
pub const RESOURCE_MODEL_NOT_FOUND: &str = "RESOURCE_MODEL_NOT_FOUND";
/// The instance synthesizer could not produce a model instance.
pub const RESOURCE_INSTANCE_CREATION_FAILED: &str = "RESOURCE_INSTANCE_CREATION_FAILED";
/// The transformer factory failed.
pub const RESOURCE_TRANSFORMER_INSTANTIATION_FAILED: &str =
    "RESOURCE_TRANSFORMER_INSTANTIATION_FAILED";
/// Running the transformer failed.
pub const RESOURCE_TRANSFORM_FAILED: &str = "RESOURCE_TRANSFORM_FAILED";

/// All codes, in taxonomy order.
pub const ALL: &[&str] = &[
    ROUTE_INVALID_ACTION_FORMAT,
    ROUTE_HANDLER_NOT_FOUND,
    ROUTE_METHOD_NOT_FOUND,
    ROUTE_REFLECTION_FAILED,
    FORM_REQUEST_NOT_FOUND,
    FORM_REQUEST_INSTANTIATION_FAILED,
    FORM_REQUEST_RULES_MISSING,
    FORM_REQUEST_INVALID_RULES,
    RESOURCE_CLASS_NOT_FOUND,
    RESOURCE_MODEL_NOT_FOUND,
    RESOURCE_INSTANCE_CREATION_FAILED,
    RESOURCE_TRANSFORMER_INSTANTIATION_FAILED,
    RESOURCE_TRANSFORM_FAILED,
];
