//! Contracts: the model, the store that builds and persists them, and the
//! mtime-keyed cache that serves them back.

mod cache;
mod model;
mod store;


pub use cache::{CacheStats, ContractCache};
pub use model::{AuthInfo, Contract, ContractEntry, RouteKey};
pub use store::{ContractStore, VersionInfo, VersionSnapshot};
