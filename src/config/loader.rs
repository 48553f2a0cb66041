use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use tracing::debug;

use super::types::ScorerConfig;
use crate::error::ConfigError;
use crate::scoring::ScoringMode;

/// Prefix for environment overrides, e.g. `AUDIT_SCORER_SCORING__MODE=single`
pub const ENV_PREFIX: &str = "AUDIT_SCORER";

/// Values supplied on the command line, applied last
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_addr: Option<String>,
    pub bundle_path: Option<PathBuf>,
    pub mode: Option<ScoringMode>,
    pub log_level: Option<String>,
}

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    config_file: Option<PathBuf>,
    load_env: bool,
    overrides: ConfigOverrides,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            config_file: None,
            load_env: false,
            overrides: ConfigOverrides::default(),
        }
    }

    /// Load configuration from file
    ///
    /// An explicit path must exist; without one the standard locations are
    /// tried and silently skipped when absent.
    pub fn load_from_file(mut self, path: Option<&Path>) -> Self {
        self.config_file = path.map(Path::to_path_buf);
        self
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Apply command line values on top of every other source
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Build and validate the final configuration
    pub fn build(self) -> Result<ScorerConfig, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&ScorerConfig::default())?);

        if let Some(config_path) = &self.config_file {
            debug!("Reading configuration from {}", config_path.display());
            builder = builder.add_source(File::from(config_path.as_path()).required(true));
        } else {
            builder = builder
                .add_source(File::with_name("audit-scorer").required(false))
                .add_source(File::with_name("config/audit-scorer").required(false));
        }

        if self.load_env {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let overrides = self.overrides;
        builder = builder
            .set_override_option("server.bind_addr", overrides.bind_addr)?
            .set_override_option(
                "model.bundle_path",
                overrides
                    .bundle_path
                    .map(|p| p.to_string_lossy().into_owned()),
            )?
            .set_override_option("scoring.mode", overrides.mode.map(|m| m.as_str()))?
            .set_override_option("logging.level", overrides.log_level)?;

        let config: ScorerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
