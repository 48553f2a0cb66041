use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::scoring::{ScoringMode, DEFAULT_EPSILON};

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Model bundle location
    pub model: ModelConfig,

    /// Ensemble scoring behaviour
    pub scoring: ScoringConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener
    pub bind_addr: String,

    /// Allow cross-origin requests
    pub cors_enabled: bool,

    /// Maximum request body size in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            cors_enabled: true,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Model bundle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the JSON model bundle
    pub bundle_path: PathBuf,

    /// Abort startup when the bundle cannot be loaded
    pub require_on_startup: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            bundle_path: PathBuf::from("models/model_bundle.json"),
            require_on_startup: true,
        }
    }
}

/// Scoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Behaviour of `POST /predict`
    pub mode: ScoringMode,

    /// Added to min-max ranges in batch mode
    pub epsilon: f64,

    /// Largest batch accepted in one request
    pub max_batch_rows: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            mode: ScoringMode::Batch,
            epsilon: DEFAULT_EPSILON,
            max_batch_rows: 10_000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,

    /// Console output format
    pub format: LogFormat,

    /// Directory for rolling log files; console only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// File rotation policy
    pub rotation: LogRotation,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            log_dir: None,
            rotation: LogRotation::Daily,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Daily,
    Hourly,
    /// Single file, never rotated
    Never,
}

impl ScorerConfig {
    /// Check value ranges the type system cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "server.max_body_bytes",
                reason: "must be positive".to_string(),
            });
        }
        if !self.scoring.epsilon.is_finite() || self.scoring.epsilon <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "scoring.epsilon",
                reason: format!("must be a positive number, got {}", self.scoring.epsilon),
            });
        }
        if self.scoring.max_batch_rows == 0 {
            return Err(ConfigError::Invalid {
                key: "scoring.max_batch_rows",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind_addr
            .parse()
            .map_err(|e| ConfigError::Invalid {
                key: "server.bind_addr",
                reason: format!("{}: {}", self.server.bind_addr, e),
            })
    }

    /// Render a commented sample configuration file
    pub fn sample_toml() -> Result<String, ConfigError> {
        let body = toml::to_string_pretty(&ScorerConfig::default())?;
        Ok(format!(
            r#"# audit-scorer configuration
#
# Save as audit-scorer.toml. Every key can be overridden from the
# environment, e.g. AUDIT_SCORER_SERVER__BIND_ADDR=0.0.0.0:8000
#
# [server]
# bind_addr      = listen address of the HTTP API
# cors_enabled   = allow cross-origin requests
# max_body_bytes = request body limit
#
# [model]
# bundle_path        = JSON bundle holding the fitted sub-models
# require_on_startup = false starts the API without a model; scoring then
#                      answers 503 until the bundle is fixed
#
# [scoring]
# mode           = "batch" (min-max normalized) or "single" (raw score + label)
# epsilon        = added to every min-max range
# max_batch_rows = largest batch accepted per request
#
# [logging]
# level    = trace, debug, info, warn, error (or an EnvFilter directive)
# format   = "pretty" or "json"
# log_dir  = directory for rolling log files (omit for console only)
# rotation = "daily", "hourly" or "never"

{}"#,
            body
        ))
    }
}
