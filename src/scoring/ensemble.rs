//! Ensemble Scorer
//!
//! Standardizes the input, collects five anomaly signals from the fitted
//! sub-models and averages them into a single score per row.

use std::sync::Arc;

use ndarray::{Array1, Array2};
use tracing::debug;

use super::types::{Signal, SignalMatrix, SingleScore, SIGNAL_COUNT};
use crate::error::{ModelError, ScoringError};
use crate::features::{FeatureMatrix, FeatureVector};
use crate::models::ModelBundle;

/// Added to every min-max range so constant columns do not divide by zero
pub const DEFAULT_EPSILON: f64 = 1e-8;

/// Availability of the process-wide model bundle
#[derive(Debug, Clone)]
pub enum BundleState {
    Ready(Arc<ModelBundle>),
    /// Loading failed; every request is refused with this reason
    Unavailable(String),
}

/// Stateless scorer over an immutable bundle
#[derive(Debug, Clone)]
pub struct EnsembleScorer {
    state: BundleState,
    epsilon: f64,
}

impl EnsembleScorer {
    pub fn new(bundle: Arc<ModelBundle>) -> Self {
        Self {
            state: BundleState::Ready(bundle),
            epsilon: DEFAULT_EPSILON,
        }
    }

    /// Scorer that refuses to operate
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: BundleState::Unavailable(reason.into()),
            epsilon: DEFAULT_EPSILON,
        }
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, BundleState::Ready(_))
    }

    pub fn bundle(&self) -> Result<&Arc<ModelBundle>, ScoringError> {
        match &self.state {
            BundleState::Ready(bundle) => Ok(bundle),
            BundleState::Unavailable(reason) => {
                Err(ScoringError::ModelUnavailable(reason.clone()))
            }
        }
    }

    /// Raw per-row signals, before any normalization
    pub fn signals(&self, features: &FeatureMatrix) -> Result<SignalMatrix, ScoringError> {
        let bundle = self.bundle()?;
        let x = features.as_array();
        let n = x.nrows();

        let standardized = bundle.scaler().transform(x)?;
        if standardized.dim() != x.dim() {
            return Err(ScoringError::Computation(format!(
                "scaler returned shape {:?} for input {:?}",
                standardized.dim(),
                x.dim()
            )));
        }

        let mut values = Array2::zeros((n, SIGNAL_COUNT));
        let detectors = [
            (Signal::IsolationForest, bundle.iforest()),
            (Signal::LocalOutlierFactor, bundle.lof()),
            (Signal::OneClassSvm, bundle.ocsvm()),
            (Signal::EllipticEnvelope, bundle.elliptic()),
        ];
        for (signal, detector) in detectors {
            let decision = detector.decision_function(&standardized)?;
            if decision.len() != n {
                return Err(ScoringError::Computation(format!(
                    "{} returned {} values for {} rows",
                    signal.name(),
                    decision.len(),
                    n
                )));
            }
            // detectors rate normal rows higher; flip so every signal grows with anomaly
            values
                .column_mut(signal.index())
                .assign(&decision.mapv(|v| -v));
        }

        let projected = bundle.pca().transform(&standardized)?;
        let restored = bundle.pca().inverse_transform(&projected)?;
        let error = reconstruction_error(&standardized, &restored)?;
        values
            .column_mut(Signal::Reconstruction.index())
            .assign(&error);

        if values.iter().any(|v| !v.is_finite()) {
            return Err(ScoringError::Computation(
                "anomaly signals contain non-finite values".to_string(),
            ));
        }

        debug!(rows = n, "Computed ensemble signals");
        SignalMatrix::new(values)
            .ok_or_else(|| ScoringError::Computation("signal matrix has wrong width".to_string()))
    }

    /// Normalized batch mode: one 0-100 score per row, in input order
    pub fn score_batch(&self, features: &FeatureMatrix) -> Result<Vec<f64>, ScoringError> {
        let signals = self.signals(features)?;
        let scores = signals.normalized(self.epsilon).row_means();
        ensure_finite_scores(&scores)?;
        debug!(rows = scores.len(), "Scored batch");
        Ok(scores.to_vec())
    }

    /// Raw single-row mode: mean of the five signals plus its label
    pub fn score_one(&self, vector: &FeatureVector) -> Result<SingleScore, ScoringError> {
        let features = FeatureMatrix::from_vectors(std::slice::from_ref(vector))?;
        let scores = self.signals(&features)?.row_means();
        ensure_finite_scores(&scores)?;
        Ok(SingleScore::new(scores[0]))
    }
}

/// Signals can each be finite while their sum or spread is not
fn ensure_finite_scores(scores: &Array1<f64>) -> Result<(), ScoringError> {
    if scores.iter().all(|s| s.is_finite()) {
        Ok(())
    } else {
        Err(ScoringError::Computation(
            "ensemble score is not a finite number".to_string(),
        ))
    }
}

/// Mean squared difference between each row and its reconstruction
pub fn reconstruction_error(
    original: &Array2<f64>,
    reconstructed: &Array2<f64>,
) -> Result<Array1<f64>, ModelError> {
    if original.dim() != reconstructed.dim() {
        return Err(ModelError::DimensionMismatch {
            model: "pca",
            expected: original.ncols(),
            actual: reconstructed.ncols(),
        });
    }
    let width = original.ncols() as f64;
    let squared = (original - reconstructed).mapv(|d| d * d);
    Ok(squared.sum_axis(ndarray::Axis(1)) / width)
}
