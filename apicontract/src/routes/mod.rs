//! Routes and the metadata derived from them.

mod analyzer;
mod descriptor;

pub use analyzer::{AuthType, HeaderRequirement, PathParameter, RateLimit, RouteAnalyzer};
pub use descriptor::{HttpMethod, RouteDescriptor};
