//! Configuration
//!
//! Layered settings: built-in defaults, an optional TOML file, environment
//! variables, then command line values.

mod loader;
mod types;

pub use loader::{ConfigLoader, ConfigOverrides, ENV_PREFIX};
pub use types::{
    LogFormat, LogRotation, LoggingConfig, ModelConfig, ScorerConfig, ScoringConfig, ServerConfig,
};
