//! Contract comparison and compatibility reporting.

mod engine;
mod result;

pub use engine::ContractDiffEngine;
pub use result::{CompatibilityReport, DiffResult, FieldChange, MethodSetChange, ModifiedEntry};
