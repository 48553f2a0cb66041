//! Error types for the audit scoring service.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for top-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Model bundle could not be loaded
    #[error("Model bundle error: {0}")]
    Bundle(#[from] BundleError),

    /// Scoring request failed
    #[error(transparent)]
    Scoring(#[from] ScoringError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised inside a fitted sub-model
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// Input width does not match what the model was fitted on
    #[error("{model}: expected {expected} features, got {actual}")]
    DimensionMismatch {
        model: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Stored parameters are inconsistent
    #[error("{model}: invalid parameters - {reason}")]
    InvalidParameters { model: &'static str, reason: String },

    /// Computation produced NaN or infinity
    #[error("{model}: non-finite value in output")]
    NonFinite { model: &'static str },
}

impl ModelError {
    pub(crate) fn invalid(model: &'static str, reason: impl Into<String>) -> Self {
        ModelError::InvalidParameters {
            model,
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading a persisted model bundle
#[derive(Debug, Error)]
pub enum BundleError {
    /// Bundle file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bundle file is not valid JSON for the expected layout
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Unknown bundle layout version
    #[error("unsupported bundle format version {0}")]
    UnsupportedVersion(u32),

    /// Bundle was fitted on a different feature order
    #[error("feature names do not match the scoring schema: {0:?}")]
    FeatureNames(Vec<String>),

    /// A sub-model failed validation
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Layered configuration could not be built or deserialized
    #[error(transparent)]
    Source(#[from] config::ConfigError),

    /// A value is out of its allowed range
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    /// Sample file rendering failed
    #[error("failed to render TOML: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Field-level detail for rejected input
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    /// Zero-based row index inside the batch
    pub row: Option<usize>,
    /// Offending field name
    pub field: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            row: None,
            field: None,
            message: message.into(),
        }
    }

    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(row) = self.row {
            write!(f, "row {}: ", row)?;
        }
        if let Some(field) = &self.field {
            write!(f, "field `{}`: ", field)?;
        }
        f.write_str(&self.message)
    }
}

/// Errors surfaced by the ensemble scorer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    /// Model bundle is absent or failed to load
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Caller-supplied feature data is malformed
    #[error("Validation error: {0}")]
    Validation(ValidationIssue),

    /// A sub-model computation failed
    #[error("Computation error: {0}")]
    Computation(String),
}

impl ScoringError {
    pub(crate) fn validation(issue: ValidationIssue) -> Self {
        ScoringError::Validation(issue)
    }

    /// Stable machine-readable category
    pub fn kind(&self) -> &'static str {
        match self {
            ScoringError::ModelUnavailable(_) => "model_unavailable",
            ScoringError::Validation(_) => "validation_error",
            ScoringError::Computation(_) => "computation_error",
        }
    }
}

impl From<ModelError> for ScoringError {
    fn from(err: ModelError) -> Self {
        ScoringError::Computation(err.to_string())
    }
}
