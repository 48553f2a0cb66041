//! Elliptic Envelope (robust covariance) decision function

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::{ensure_finite, ensure_width, matrix_from_rows, matrix_to_rows, DecisionFunction};
use crate::error::ModelError;

const MODEL: &str = "elliptic";

/// Persisted envelope parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EllipticEnvelopeParams {
    /// Robust location estimate
    pub location: Vec<f64>,
    /// Inverse of the robust covariance estimate
    pub precision: Vec<Vec<f64>>,
    /// Threshold subtracted from the negated Mahalanobis distance
    pub offset: f64,
}

/// Fitted elliptic envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "EllipticEnvelopeParams", into = "EllipticEnvelopeParams")]
pub struct EllipticEnvelope {
    location: Array1<f64>,
    precision: Array2<f64>,
    offset: f64,
}

impl EllipticEnvelope {
    /// Squared Mahalanobis distance of every row
    pub fn mahalanobis(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        ensure_width(MODEL, self.location.len(), x)?;
        let centered = x - &self.location;
        let weighted = centered.dot(&self.precision);
        Ok((&weighted * &centered).sum_axis(ndarray::Axis(1)))
    }
}

impl TryFrom<EllipticEnvelopeParams> for EllipticEnvelope {
    type Error = ModelError;

    fn try_from(params: EllipticEnvelopeParams) -> Result<Self, Self::Error> {
        let d = params.location.len();
        if d == 0 {
            return Err(ModelError::invalid(MODEL, "location is empty"));
        }
        ensure_finite(MODEL, &params.location)?;
        let precision = matrix_from_rows(MODEL, "precision", &params.precision)?;
        if precision.dim() != (d, d) {
            return Err(ModelError::invalid(
                MODEL,
                format!("precision must be {}x{}, got {:?}", d, d, precision.dim()),
            ));
        }
        if !params.offset.is_finite() {
            return Err(ModelError::invalid(MODEL, "offset must be finite"));
        }

        Ok(Self {
            location: Array1::from(params.location),
            precision,
            offset: params.offset,
        })
    }
}

impl From<EllipticEnvelope> for EllipticEnvelopeParams {
    fn from(envelope: EllipticEnvelope) -> Self {
        Self {
            location: envelope.location.to_vec(),
            precision: matrix_to_rows(&envelope.precision),
            offset: envelope.offset,
        }
    }
}

impl DecisionFunction for EllipticEnvelope {
    fn n_features_in(&self) -> usize {
        self.location.len()
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let decision = -self.mahalanobis(x)? - self.offset;
        ensure_finite(MODEL, &decision)?;
        Ok(decision)
    }
}
