//! keyshelf core - shared paths and configuration for keyshelf tools

pub mod config;
pub mod paths;

pub use config::Config;
pub use paths::Paths;
