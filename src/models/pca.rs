//! Principal component projection

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::{
    ensure_finite, ensure_width, matrix_from_rows, matrix_to_rows, InverseTransform, Transform,
};
use crate::error::ModelError;

const MODEL: &str = "pca";

/// Persisted PCA parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcaParams {
    /// Per-feature mean removed before projection
    pub mean: Vec<f64>,
    /// Principal axes, one row per component
    pub components: Vec<Vec<f64>>,
    /// Variance explained by each component
    #[serde(default)]
    pub explained_variance: Option<Vec<f64>>,
    /// Components were scaled to unit variance at fit time
    #[serde(default)]
    pub whiten: bool,
}

/// Fitted linear projection with its inverse
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "PcaParams", into = "PcaParams")]
pub struct Pca {
    mean: Array1<f64>,
    components: Array2<f64>,
    explained_variance: Option<Array1<f64>>,
    whiten: bool,
}

impl Pca {
    pub fn new(mean: Vec<f64>, components: Vec<Vec<f64>>) -> Result<Self, ModelError> {
        Self::try_from(PcaParams {
            mean,
            components,
            explained_variance: None,
            whiten: false,
        })
    }

    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    fn whitening_scale(&self) -> Option<Array1<f64>> {
        match (&self.explained_variance, self.whiten) {
            (Some(variance), true) => Some(variance.mapv(f64::sqrt)),
            _ => None,
        }
    }
}

impl TryFrom<PcaParams> for Pca {
    type Error = ModelError;

    fn try_from(params: PcaParams) -> Result<Self, Self::Error> {
        if params.mean.is_empty() {
            return Err(ModelError::invalid(MODEL, "mean is empty"));
        }
        ensure_finite(MODEL, &params.mean)?;

        let components = matrix_from_rows(MODEL, "components", &params.components)?;
        if components.nrows() == 0 {
            return Err(ModelError::invalid(MODEL, "no components"));
        }
        if components.ncols() != params.mean.len() {
            return Err(ModelError::invalid(
                MODEL,
                format!(
                    "components have {} columns but mean has {} entries",
                    components.ncols(),
                    params.mean.len()
                ),
            ));
        }

        let explained_variance = match params.explained_variance {
            Some(variance) => {
                if variance.len() != components.nrows() {
                    return Err(ModelError::invalid(
                        MODEL,
                        "explained_variance length differs from component count",
                    ));
                }
                if variance.iter().any(|v| !v.is_finite() || *v <= 0.0) {
                    return Err(ModelError::invalid(
                        MODEL,
                        "explained_variance entries must be positive",
                    ));
                }
                Some(Array1::from(variance))
            }
            None if params.whiten => {
                return Err(ModelError::invalid(
                    MODEL,
                    "whiten requires explained_variance",
                ));
            }
            None => None,
        };

        Ok(Self {
            mean: Array1::from(params.mean),
            components,
            explained_variance,
            whiten: params.whiten,
        })
    }
}

impl From<Pca> for PcaParams {
    fn from(pca: Pca) -> Self {
        Self {
            mean: pca.mean.to_vec(),
            components: matrix_to_rows(&pca.components),
            explained_variance: pca.explained_variance.map(|v| v.to_vec()),
            whiten: pca.whiten,
        }
    }
}

impl Transform for Pca {
    fn n_features_in(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        ensure_width(MODEL, self.mean.len(), x)?;
        let centered = x - &self.mean;
        let mut projected = centered.dot(&self.components.t());
        if let Some(scale) = self.whitening_scale() {
            projected /= &scale;
        }
        ensure_finite(MODEL, &projected)?;
        Ok(projected)
    }
}

impl InverseTransform for Pca {
    fn inverse_transform(&self, z: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        if z.ncols() != self.n_components() {
            return Err(ModelError::DimensionMismatch {
                model: MODEL,
                expected: self.n_components(),
                actual: z.ncols(),
            });
        }
        let restored = match self.whitening_scale() {
            Some(scale) => (z * &scale).dot(&self.components),
            None => z.dot(&self.components),
        } + &self.mean;
        ensure_finite(MODEL, &restored)?;
        Ok(restored)
    }
}
