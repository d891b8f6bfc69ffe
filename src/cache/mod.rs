//! Artifact cache.
//!
//! - [`CacheStore`]: maps original paths to WebP artifacts on disk
//! - [`SingleFlight`]: at most one in-flight computation per key

mod flight;
mod store;

pub use flight::SingleFlight;
pub use store::{CacheStore, ARTIFACT_EXTENSION};
