//! Configuration and persistence

pub mod config;
pub mod persistence;

pub use config::GeocodingConfig;
pub use persistence::{CodingDescriptor, restore_inverse};
