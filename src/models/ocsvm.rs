//! One-Class SVM decision function

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::{ensure_finite, ensure_width, matrix_from_rows, matrix_to_rows, DecisionFunction};
use crate::error::ModelError;

const MODEL: &str = "ocsvm";

/// Kernel the support vectors were fitted with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kernel {
    Linear,
    Rbf { gamma: f64 },
    Poly { gamma: f64, coef0: f64, degree: u32 },
    Sigmoid { gamma: f64, coef0: f64 },
}

impl Kernel {
    fn apply(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        match self {
            Kernel::Linear => a.dot(&b),
            Kernel::Rbf { gamma } => (-gamma * super::squared_distance(a, b)).exp(),
            Kernel::Poly {
                gamma,
                coef0,
                degree,
            } => (gamma * a.dot(&b) + coef0).powf(f64::from(*degree)),
            Kernel::Sigmoid { gamma, coef0 } => (gamma * a.dot(&b) + coef0).tanh(),
        }
    }

    fn validate(&self) -> Result<(), ModelError> {
        let (gamma, coef0) = match self {
            Kernel::Linear => return Ok(()),
            Kernel::Rbf { gamma } => (*gamma, 0.0),
            Kernel::Poly { gamma, coef0, .. } | Kernel::Sigmoid { gamma, coef0 } => {
                (*gamma, *coef0)
            }
        };
        if !gamma.is_finite() || gamma <= 0.0 || !coef0.is_finite() {
            return Err(ModelError::invalid(
                MODEL,
                "kernel gamma must be positive and coef0 finite",
            ));
        }
        Ok(())
    }
}

/// Persisted One-Class SVM parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneClassSvmParams {
    pub kernel: Kernel,
    pub support_vectors: Vec<Vec<f64>>,
    /// Dual coefficient per support vector
    pub dual_coef: Vec<f64>,
    pub intercept: f64,
}

/// Fitted One-Class SVM
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "OneClassSvmParams", into = "OneClassSvmParams")]
pub struct OneClassSvm {
    kernel: Kernel,
    support_vectors: Array2<f64>,
    dual_coef: Array1<f64>,
    intercept: f64,
}

impl OneClassSvm {
    pub fn n_support(&self) -> usize {
        self.support_vectors.nrows()
    }
}

impl TryFrom<OneClassSvmParams> for OneClassSvm {
    type Error = ModelError;

    fn try_from(params: OneClassSvmParams) -> Result<Self, Self::Error> {
        params.kernel.validate()?;
        let support_vectors = matrix_from_rows(MODEL, "support_vectors", &params.support_vectors)?;
        if support_vectors.nrows() == 0 || support_vectors.ncols() == 0 {
            return Err(ModelError::invalid(MODEL, "no support vectors"));
        }
        if params.dual_coef.len() != support_vectors.nrows() {
            return Err(ModelError::invalid(
                MODEL,
                format!(
                    "{} dual coefficients for {} support vectors",
                    params.dual_coef.len(),
                    support_vectors.nrows()
                ),
            ));
        }
        ensure_finite(MODEL, &params.dual_coef)?;
        if !params.intercept.is_finite() {
            return Err(ModelError::invalid(MODEL, "intercept must be finite"));
        }

        Ok(Self {
            kernel: params.kernel,
            support_vectors,
            dual_coef: Array1::from(params.dual_coef),
            intercept: params.intercept,
        })
    }
}

impl From<OneClassSvm> for OneClassSvmParams {
    fn from(svm: OneClassSvm) -> Self {
        Self {
            kernel: svm.kernel,
            support_vectors: matrix_to_rows(&svm.support_vectors),
            dual_coef: svm.dual_coef.to_vec(),
            intercept: svm.intercept,
        }
    }
}

impl DecisionFunction for OneClassSvm {
    fn n_features_in(&self) -> usize {
        self.support_vectors.ncols()
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        ensure_width(MODEL, self.support_vectors.ncols(), x)?;
        let decision = Array1::from_iter(x.outer_iter().map(|row| {
            self.support_vectors
                .outer_iter()
                .zip(self.dual_coef.iter())
                .map(|(sv, coef)| coef * self.kernel.apply(sv, row))
                .sum::<f64>()
                + self.intercept
        }));
        ensure_finite(MODEL, &decision)?;
        Ok(decision)
    }
}
