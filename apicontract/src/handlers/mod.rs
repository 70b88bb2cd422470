//! Handler introspection capabilities.
//!
//! Route actions point at handler methods. Extraction needs to know what a
//! method validates, which parameters it takes and which transformer shapes
//! its response. Those facts come from the [`HandlerIntrospector`]
//! capability; [`HandlerRegistry`] is the explicit, registration-based
//! implementation.

mod introspector;
mod reference;
mod synthesizer;
mod transformer;

pub use introspector::{
    HandlerDescriptor, HandlerIntrospector, HandlerRegistry, MethodDefinition, ParameterDescriptor,
    RequestSource, StaticValidator, Validator, ValidatorFactory,
};
pub use reference::{short_name, HandlerRef};
#[cfg(test)]
pub use synthesizer::MockInstanceSynthesizer;
pub use synthesizer::{InstanceSynthesizer, ModelCatalog, NoopSynthesizer};
pub use transformer::{
    DeclaredField, Transformer, TransformerFactory, TransformerRegistration, TransformerRegistry,
};
