//! Standardization transform

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::{ensure_finite, ensure_width, Transform};
use crate::error::ModelError;

const MODEL: &str = "scaler";

/// Persisted scaler parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScalerParams {
    /// Per-feature mean
    pub mean: Vec<f64>,
    /// Per-feature standard deviation
    pub scale: Vec<f64>,
}

/// Fitted standardization `(x - mean) / scale`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "StandardScalerParams", into = "StandardScalerParams")]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ModelError> {
        Self::try_from(StandardScalerParams { mean, scale })
    }

    /// Scaler that leaves its input unchanged
    pub fn identity(n_features: usize) -> Self {
        Self {
            mean: Array1::zeros(n_features),
            scale: Array1::ones(n_features),
        }
    }
}

impl TryFrom<StandardScalerParams> for StandardScaler {
    type Error = ModelError;

    fn try_from(params: StandardScalerParams) -> Result<Self, Self::Error> {
        if params.mean.is_empty() {
            return Err(ModelError::invalid(MODEL, "mean is empty"));
        }
        if params.mean.len() != params.scale.len() {
            return Err(ModelError::invalid(
                MODEL,
                format!(
                    "mean has {} entries but scale has {}",
                    params.mean.len(),
                    params.scale.len()
                ),
            ));
        }
        ensure_finite(MODEL, &params.mean)?;
        if params.scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(ModelError::invalid(
                MODEL,
                "scale entries must be finite and non-zero",
            ));
        }

        Ok(Self {
            mean: Array1::from(params.mean),
            scale: Array1::from(params.scale),
        })
    }
}

impl From<StandardScaler> for StandardScalerParams {
    fn from(scaler: StandardScaler) -> Self {
        Self {
            mean: scaler.mean.to_vec(),
            scale: scaler.scale.to_vec(),
        }
    }
}

impl Transform for StandardScaler {
    fn n_features_in(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        ensure_width(MODEL, self.mean.len(), x)?;
        let scaled = (x - &self.mean) / &self.scale;
        ensure_finite(MODEL, &scaled)?;
        Ok(scaled)
    }
}
