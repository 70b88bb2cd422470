//! Response transformers and their registry.
//!
//! A transformer turns a model instance into the JSON a handler returns.
//! The registry keeps factories by name and memoizes the instances it has
//! built, so repeated builds do not reconstruct them.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::reference::short_name;
use crate::errors::ContractError;
use crate::schema::SchemaType;

/// Turns a model instance into its response representation.
pub trait Transformer: Send + Sync {
    /// Transforms one instance. `Err` carries the failure message.
    fn transform(&self, instance: &Value) -> Result<Value, String>;
}

impl<F> Transformer for F
where
    F: Fn(&Value) -> Result<Value, String> + Send + Sync,
{
    fn transform(&self, instance: &Value) -> Result<Value, String> {
        self(instance)
    }
}

/// Builds a transformer instance.
pub type TransformerFactory = Arc<dyn Fn() -> Result<Arc<dyn Transformer>, String> + Send + Sync>;

/// A field a transformer is known to emit without running it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredField {
    /// Output key.
    pub name: String,
    /// Output type.
    pub schema_type: SchemaType,
    /// May be `null`.
    pub nullable: bool,
}

impl DeclaredField {
    /// Creates a non-nullable declared field.
    #[must_use]
    pub fn new(name: impl Into<String>, schema_type: SchemaType) -> Self {
        Self {
            name: name.into(),
            schema_type,
            nullable: false,
        }
    }

    /// Marks the field nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

const MODEL_SUFFIXES: &[&str] = &["Resource", "Transformer", "Collection"];

/// A registered transformer.
#[derive(Clone)]
pub struct TransformerRegistration {
    name: String,
    factory: TransformerFactory,
    model: Option<String>,
    collection: bool,
    declared_fields: Option<Vec<DeclaredField>>,
}

impl fmt::Debug for TransformerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerRegistration")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("collection", &self.collection)
            .field("declared_fields", &self.declared_fields)
            .finish_non_exhaustive()
    }
}

impl TransformerRegistration {
    /// Registers a factory under `name`.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Transformer>, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
            model: None,
            collection: false,
            declared_fields: None,
        }
    }

    /// Registers a shared instance that never fails to build.
    pub fn from_instance(name: impl Into<String>, transformer: Arc<dyn Transformer>) -> Self {
        Self::new(name, move || Ok(Arc::clone(&transformer)))
    }

    /// Maps the transformer to an explicit model name.
    #[must_use]
    pub fn for_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Marks the transformer as producing a collection.
    #[must_use]
    pub fn collection(mut self) -> Self {
        self.collection = true;
        self
    }

    /// Declares the fields the transformer emits.
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<DeclaredField>) -> Self {
        self.declared_fields = Some(fields);
        self
    }

    /// Registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the output is a list of the underlying shape.
    pub fn is_collection(&self) -> bool {
        self.collection || short_name(&self.name).ends_with("Collection")
    }

    /// Statically declared fields.
    pub fn declared_fields(&self) -> Option<&[DeclaredField]> {
        self.declared_fields.as_deref()
    }

    /// Model the transformer renders.
    ///
    /// Explicit mapping first, then the naming convention
    /// (`PostResource` → `Post`). `None` when neither applies.
    pub fn model(&self) -> Option<String> {
        if let Some(model) = &self.model {
            return Some(model.clone());
        }
        let short = short_name(&self.name);
        MODEL_SUFFIXES
            .iter()
            .find_map(|suffix| short.strip_suffix(suffix))
            .filter(|stem| !stem.is_empty())
            .map(String::from)
    }
}

/// Transformer factories plus memoized instances.
#[derive(Default)]
pub struct TransformerRegistry {
    registrations: HashMap<String, TransformerRegistration>,
    short_names: HashMap<String, String>,
    instances: RwLock<HashMap<String, Arc<dyn Transformer>>>,
}

impl fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.registrations.keys().collect();
        names.sort();
        f.debug_struct("TransformerRegistry")
            .field("registrations", &names)
            .field("instances", &self.instances.read().len())
            .finish()
    }
}

impl TransformerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a registration, replacing any with the same name.
    pub fn register(&mut self, registration: TransformerRegistration) -> &mut Self {
        let name = registration.name.clone();
        self.short_names
            .entry(short_name(&name).to_string())
            .or_insert_with(|| name.clone());
        self.instances.get_mut().remove(&name);
        self.registrations.insert(name, registration);
        self
    }

    /// Looks a transformer up by exact name, then by short name.
    pub fn resolve(&self, name: &str) -> Option<&TransformerRegistration> {
        self.registrations.get(name).or_else(|| {
            self.short_names
                .get(short_name(name))
                .and_then(|full| self.registrations.get(full))
        })
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Returns the memoized instance, building it on first use.
    pub fn instance(&self, name: &str) -> Result<Arc<dyn Transformer>, String> {
        let registration = self
            .resolve(name)
            .ok_or_else(|| format!("transformer '{name}' is not registered"))?;

        if let Some(instance) = self.instances.read().get(&registration.name) {
            return Ok(Arc::clone(instance));
        }

        let instance = (registration.factory)()?;
        self.instances
            .write()
            .insert(registration.name.clone(), Arc::clone(&instance));
        Ok(instance)
    }

    /// Whether an instance is already memoized.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.resolve(name)
            .is_some_and(|r| self.instances.read().contains_key(&r.name))
    }

    /// Instantiates the named transformers ahead of time.
    ///
    /// Returns how many are now loaded. Failures are left for extraction
    /// to report.
    pub fn preload<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> usize {
        names
            .into_iter()
            .filter(|name| match self.instance(name) {
                Ok(_) => true,
                Err(reason) => {
                    debug!(transformer = %name, %reason, "Transformer preload failed");
                    false
                }
            })
            .count()
    }

    /// Preloads every registered transformer whose short name matches a
    /// file stem under `dir` (recursively).
    pub fn preload_directory(&self, dir: &Path) -> Result<usize, ContractError> {
        let mut stems = Vec::new();
        collect_stems(dir, &mut stems)?;

        let names: Vec<&str> = self
            .registrations
            .keys()
            .filter(|name| stems.iter().any(|stem| stem == short_name(name)))
            .map(String::as_str)
            .collect();
        let loaded = self.preload(names);
        debug!(dir = %dir.display(), loaded, "Preloaded transformers");
        Ok(loaded)
    }
}

fn collect_stems(dir: &Path, stems: &mut Vec<String>) -> Result<(), ContractError> {
    let entries = std::fs::read_dir(dir).map_err(|err| ContractError::io(dir, err))?;
    for entry in entries {
        let path = entry.map_err(|err| ContractError::io(dir, err))?.path();
        if path.is_dir() {
            collect_stems(&path, stems)?;
        } else if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            stems.push(stem.to_string());
        }
    }
    Ok(())
}
