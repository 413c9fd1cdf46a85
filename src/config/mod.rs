//! Public API for configuration

pub mod loader;
pub mod model;

// Re-export the main entrypoints:
pub use loader::load;
pub use model::{CollectorsConfig, Config, ConfigError, DatabaseConfig, LoggingConfig, SourceConfig};
