//! Model instance synthesis for response introspection.

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::schema::SchemaType;

/// Builds representative, in-memory model instances.
///
/// Implementations must not persist the instance or mutate shared state;
/// the returned value is dropped once the response shape is observed.
#[cfg_attr(test, mockall::automock)]
pub trait InstanceSynthesizer {
    /// Synthesizes one instance of `model`. `Err` carries the reason.
    fn synthesize(&self, model: &str) -> Result<Value, String>;
}

/// Synthesizer with no model factories.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSynthesizer;

impl InstanceSynthesizer for NoopSynthesizer {
    fn synthesize(&self, model: &str) -> Result<Value, String> {
        Err(format!("no factory available for model '{model}'"))
    }
}

/// Declared model attributes, used to build zero-valued instances.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: HashMap<String, Vec<(String, SchemaType)>>,
}

impl ModelCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a model's attributes in output order.
    #[must_use]
    pub fn with_model<I, S>(mut self, model: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = (S, SchemaType)>,
        S: Into<String>,
    {
        self.models.insert(
            model.into(),
            attributes.into_iter().map(|(n, t)| (n.into(), t)).collect(),
        );
        self
    }

    /// Whether the model is declared.
    #[must_use]
    pub fn contains(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }

    /// An instance whose attributes all hold their type's zero value.
    ///
    /// Unknown models give an empty map.
    #[must_use]
    pub fn zero_instance(&self, model: &str) -> Value {
        let attributes = self
            .models
            .get(model)
            .map(|attrs| {
                attrs
                    .iter()
                    .map(|(name, kind)| (name.clone(), zero_value(*kind)))
                    .collect::<Map<String, Value>>()
            })
            .unwrap_or_default();
        Value::Object(attributes)
    }
}

fn zero_value(kind: SchemaType) -> Value {
    match kind {
        SchemaType::String => Value::String(String::new()),
        SchemaType::Integer => Value::from(0),
        SchemaType::Number => Value::from(0.0),
        SchemaType::Boolean => Value::Bool(false),
        SchemaType::Array => Value::Array(Vec::new()),
        SchemaType::Object => Value::Object(Map::new()),
        SchemaType::Unknown => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_noop_synthesizer_fails() {
        let err = NoopSynthesizer.synthesize("Post").unwrap_err();
        assert!(err.contains("Post"));
    }

    #[test]
    fn test_zero_instance() {
        let catalog = ModelCatalog::new().with_model(
            "Post",
            [
                ("id", SchemaType::Integer),
                ("title", SchemaType::String),
                ("score", SchemaType::Number),
                ("published", SchemaType::Boolean),
                ("tags", SchemaType::Array),
                ("meta", SchemaType::Object),
                ("deleted_at", SchemaType::Unknown),
            ],
        );

        assert!(catalog.contains("Post"));
        assert_eq!(
            catalog.zero_instance("Post"),
            json!({
                "id": 0, "title": "", "score": 0.0, "published": false,
                "tags": [], "meta": {}, "deleted_at": null
            })
        );
        assert_eq!(catalog.zero_instance("User"), json!({}));
    }

    #[test]
    fn test_mock_synthesizer() {
        let mut mock = MockInstanceSynthesizer::new();
        mock.expect_synthesize()
            .withf(|model| model == "Post")
            .times(1)
            .returning(|_| Ok(json!({"id": 1})));

        assert_eq!(mock.synthesize("Post").unwrap(), json!({"id": 1}));
    }
}
