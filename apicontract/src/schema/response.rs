//! Response schema extraction.
//!
//! A handler's response shape is observed by running its transformer over
//! an in-memory model instance. When that is not possible the extractor
//! steps down a ladder of cheaper sources:
//!
//! 1. a synthesized instance run through the transformer,
//! 2. a zero-valued instance built from declared model attributes,
//! 3. the transformer's statically declared fields,
//! 4. an empty object, with one `RESOURCE_*` error reported.

use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;
use tracing::{debug, warn};

use super::node::{SchemaNode, SchemaType};
use crate::config::ResponseConfig;
use crate::contracts::codes;
use crate::errors::ExtractionError;
use crate::events::ErrorSink;
use crate::handlers::{
    HandlerDescriptor, HandlerIntrospector, HandlerRef, InstanceSynthesizer, ModelCatalog,
    NoopSynthesizer, TransformerRegistration, TransformerRegistry,
};
use crate::utils::timestamps::looks_like_datetime;
use crate::utils::OrderedMap;

/// Derives the response shape of a handler method.
pub struct ResponseSchemaExtractor {
    config: ResponseConfig,
    transformers: TransformerRegistry,
    models: ModelCatalog,
    synthesizer: Box<dyn InstanceSynthesizer>,
    preloaded: OnceLock<usize>,
}

impl std::fmt::Debug for ResponseSchemaExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseSchemaExtractor")
            .field("config", &self.config)
            .field("transformers", &self.transformers)
            .field("models", &self.models)
            .field("preloaded", &self.preloaded.get())
            .finish_non_exhaustive()
    }
}

impl Default for ResponseSchemaExtractor {
    fn default() -> Self {
        Self::new(ResponseConfig::default())
    }
}

impl ResponseSchemaExtractor {
    /// Creates an extractor with no transformers and no synthesizer.
    #[must_use]
    pub fn new(config: ResponseConfig) -> Self {
        Self {
            config,
            transformers: TransformerRegistry::new(),
            models: ModelCatalog::new(),
            synthesizer: Box::new(NoopSynthesizer),
            preloaded: OnceLock::new(),
        }
    }

    /// Replaces the transformer registry.
    #[must_use]
    pub fn with_transformers(mut self, transformers: TransformerRegistry) -> Self {
        self.transformers = transformers;
        self
    }

    /// Replaces the model catalog.
    #[must_use]
    pub fn with_models(mut self, models: ModelCatalog) -> Self {
        self.models = models;
        self
    }

    /// Replaces the instance synthesizer.
    #[must_use]
    pub fn with_synthesizer(mut self, synthesizer: Box<dyn InstanceSynthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    /// Registered transformers.
    pub fn transformers(&self) -> &TransformerRegistry {
        &self.transformers
    }

    /// Preloads transformers found under the configured directory.
    ///
    /// The directory is scanned once per extractor; later calls return the
    /// first count. A missing directory is logged and skipped.
    pub fn preload(&self) -> usize {
        *self.preloaded.get_or_init(|| {
            let Some(dir) = &self.config.transformer_dir else {
                return 0;
            };
            match self.transformers.preload_directory(dir) {
                Ok(loaded) => loaded,
                Err(err) => {
                    warn!(error = %err, "Skipping transformer preload");
                    0
                }
            }
        })
    }

    /// Describes `handler` and extracts its response schema.
    pub fn extract(
        &self,
        handler: &HandlerRef,
        introspector: &dyn HandlerIntrospector,
        sink: &dyn ErrorSink,
    ) -> SchemaNode {
        match introspector.describe(handler) {
            Ok(descriptor) => self.extract_from(&descriptor, sink),
            Err(error) => {
                sink.report(&error);
                SchemaNode::empty_object()
            }
        }
    }

    /// Extracts the response schema from an already described handler.
    pub fn extract_from(&self, descriptor: &HandlerDescriptor, sink: &dyn ErrorSink) -> SchemaNode {
        let Some(name) = descriptor.transformer.as_deref() else {
            return SchemaNode::empty_object();
        };
        let Some(registration) = self.transformers.resolve(name) else {
            sink.report(
                &ExtractionError::new(
                    codes::RESOURCE_CLASS_NOT_FOUND,
                    format!("Transformer '{name}' is not registered"),
                )
                .with_context("transformer", name),
            );
            return SchemaNode::empty_object();
        };

        let mut failures = Vec::new();
        match self.observe(registration, &mut failures) {
            Some(shape) => {
                for failure in &failures {
                    debug!(code = %failure.code, message = %failure.message, "Response rung skipped");
                }
                self.finish(shape, registration)
            }
            None => {
                let attempts: Vec<Value> = failures.iter().map(|f| Value::from(f.code.clone())).collect();
                let error = failures.into_iter().next().unwrap_or_else(|| {
                    ExtractionError::new(
                        codes::RESOURCE_TRANSFORM_FAILED,
                        format!("No response shape could be observed for '{name}'"),
                    )
                });
                sink.report(&error.with_context("attempts", attempts));
                SchemaNode::empty_object()
            }
        }
    }

    /// Runs the ladder; `None` means every rung failed.
    fn observe(
        &self,
        registration: &TransformerRegistration,
        failures: &mut Vec<ExtractionError>,
    ) -> Option<SchemaNode> {
        let name = registration.name();

        match self.transformers.instance(name) {
            Ok(transformer) => {
                let model = registration.model();
                if model.is_none() {
                    failures.push(
                        ExtractionError::new(
                            codes::RESOURCE_MODEL_NOT_FOUND,
                            format!("No model could be resolved for '{name}'"),
                        )
                        .with_context("transformer", name),
                    );
                }

                if let Some(model) = &model {
                    match guarded(|| self.synthesizer.synthesize(model)) {
                        Ok(instance) => match guarded(|| transformer.transform(&instance)) {
                            Ok(output) => return Some(schema_from_value(&output)),
                            Err(reason) => failures.push(transform_failed(name, &reason)),
                        },
                        Err(reason) => failures.push(
                            ExtractionError::new(
                                codes::RESOURCE_INSTANCE_CREATION_FAILED,
                                format!("Could not create a '{model}' instance: {reason}"),
                            )
                            .with_context("model", model.as_str()),
                        ),
                    }
                }

                let zero = model
                    .as_deref()
                    .map_or_else(|| Value::Object(serde_json::Map::new()), |m| self.models.zero_instance(m));
                match guarded(|| transformer.transform(&zero)) {
                    Ok(output) => return Some(schema_from_value(&output)),
                    Err(reason) => failures.push(transform_failed(name, &reason)),
                }
            }
            Err(reason) => failures.push(
                ExtractionError::new(
                    codes::RESOURCE_TRANSFORMER_INSTANTIATION_FAILED,
                    format!("Transformer '{name}' could not be created: {reason}"),
                )
                .with_context("transformer", name),
            ),
        }

        registration.declared_fields().map(|fields| {
            SchemaNode::object(
                fields
                    .iter()
                    .map(|field| {
                        let node = SchemaNode::new(field.schema_type)
                            .required(true)
                            .nullable(field.nullable);
                        (field.name.clone(), node)
                    })
                    .collect(),
            )
        })
    }

    fn finish(&self, shape: SchemaNode, registration: &TransformerRegistration) -> SchemaNode {
        let shape = if registration.is_collection() {
            SchemaNode::array(Some(shape))
        } else {
            shape
        };
        match &self.config.wrap_key {
            Some(key) => {
                let mut fields = OrderedMap::new();
                fields.insert(key.clone(), shape.required(true));
                SchemaNode::object(fields)
            }
            None => shape,
        }
    }
}

fn transform_failed(name: &str, reason: &str) -> ExtractionError {
    ExtractionError::new(
        codes::RESOURCE_TRANSFORM_FAILED,
        format!("Transformer '{name}' failed: {reason}"),
    )
    .with_context("transformer", name)
}

/// Runs collaborator code, turning a panic into an error message.
fn guarded<T>(f: impl FnOnce() -> Result<T, String>) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(format!("panicked: {reason}"))
    })
}

/// Infers a schema from an observed JSON value.
///
/// Object keys are required; `null` is an unknown nullable value; arrays
/// take their item shape from the first element.
#[must_use]
pub fn schema_from_value(value: &Value) -> SchemaNode {
    match value {
        Value::Null => SchemaNode::new(SchemaType::Unknown).nullable(true),
        Value::Bool(_) => SchemaNode::new(SchemaType::Boolean),
        Value::Number(n) if n.is_i64() || n.is_u64() => SchemaNode::new(SchemaType::Integer),
        Value::Number(_) => SchemaNode::new(SchemaType::Number),
        Value::String(s) if looks_like_datetime(s) => {
            SchemaNode::new(SchemaType::String).with_constraint("format", "date-time")
        }
        Value::String(_) => SchemaNode::new(SchemaType::String),
        Value::Array(items) => SchemaNode::array(items.first().map(schema_from_value)),
        Value::Object(map) => SchemaNode::object(
            map.iter()
                .map(|(key, v)| (key.clone(), schema_from_value(v).required(true)))
                .collect(),
        ),
    }
}
