//! Utility helpers: ordered maps, version timestamps and atomic file writes.

pub mod fs;
mod ordered_map;
pub mod timestamps;

pub use fs::write_atomic;
pub use ordered_map::OrderedMap;
pub use timestamps::{now_utc, version_timestamp, Timestamp};
