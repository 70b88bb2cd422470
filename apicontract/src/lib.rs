//! # Apicontract
//!
//! Builds a machine-readable contract for an HTTP API from its route table,
//! then persists, caches, versions and diffs it.
//!
//! A contract maps every `(path, method)` pair to:
//!
//! - **Metadata**: description, authentication, rate limit, API version and
//!   middleware-implied headers
//! - **Request schema**: derived from the handler's validator rules or its
//!   declared parameters
//! - **Response schema**: observed by running the handler's transformer
//!   over a representative model instance
//!
//! Extraction never fails a whole build. Problems scoped to one route are
//! reported to an [`ErrorSink`](events::ErrorSink) and leave a degraded
//! entry behind.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use apicontract::prelude::*;
//!
//! let store = ContractStore::new(ContractConfig::new().with_base_dir("storage/api"), registry)
//!     .with_transformers(transformers);
//!
//! let contract = store.build(&routes, &LoggingErrorSink::default());
//! store.persist(&contract)?;
//!
//! // Later, in CI
//! let stored = store.load(&ContractCache::new()).unwrap_or_default();
//! let diff = ContractDiffEngine::new().validate(&routes, &stored, &store, &NoOpErrorSink);
//! assert!(diff.compatibility().is_compatible());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod contract;
pub mod contracts;
pub mod diff;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod observability;
pub mod routes;
pub mod schema;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{AnalyzerConfig, ContractConfig, ResponseConfig, StoreConfig};
    pub use crate::contract::{
        Contract, ContractCache, ContractEntry, ContractStore, RouteKey, VersionInfo,
    };
    pub use crate::diff::{CompatibilityReport, ContractDiffEngine, DiffResult, FieldChange};
    pub use crate::errors::{ContractError, ExtractionError};
    pub use crate::events::{CollectingErrorSink, ErrorSink, LoggingErrorSink, NoOpErrorSink};
    pub use crate::handlers::{
        HandlerIntrospector, HandlerRef, HandlerRegistry, InstanceSynthesizer, MethodDefinition,
        TransformerRegistration, TransformerRegistry,
    };
    pub use crate::routes::{AuthType, HttpMethod, RouteAnalyzer, RouteDescriptor};
    pub use crate::schema::{SchemaNode, SchemaType};
}
