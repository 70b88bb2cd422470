//! Schema model and extraction.
//!
//! - [`SchemaNode`]: the immutable shape tree stored in contracts
//! - [`rules`]: the validation rule grammar
//! - [`RequestSchemaExtractor`] / [`ResponseSchemaExtractor`]: per-handler
//!   extraction with error reporting

mod node;
mod request;
mod response;
pub mod rules;

pub use node::{SchemaNode, SchemaType};
pub use request::RequestSchemaExtractor;
pub use response::{schema_from_value, ResponseSchemaExtractor};
