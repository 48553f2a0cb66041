//! Local Outlier Factor (novelty mode)

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::{
    ensure_finite, ensure_width, matrix_from_rows, matrix_to_rows, squared_distance,
    DecisionFunction,
};
use crate::error::ModelError;

const MODEL: &str = "lof";

/// Guards against division by zero for duplicated points
const DENSITY_EPSILON: f64 = 1e-10;

/// Persisted LOF parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalOutlierFactorParams {
    /// Neighbours considered per query
    pub n_neighbors: usize,
    /// Standardized training rows
    pub fit_data: Vec<Vec<f64>>,
    /// Distance from each training row to its k-th neighbour
    pub k_distances: Vec<f64>,
    /// Local reachability density of each training row
    pub lrd: Vec<f64>,
    /// Threshold subtracted from the raw score
    pub offset: f64,
}

/// Fitted Local Outlier Factor used for novelty detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "LocalOutlierFactorParams", into = "LocalOutlierFactorParams")]
pub struct LocalOutlierFactor {
    n_neighbors: usize,
    fit_data: Array2<f64>,
    k_distances: Array1<f64>,
    lrd: Array1<f64>,
    offset: f64,
}

impl LocalOutlierFactor {
    pub fn n_fit_samples(&self) -> usize {
        self.fit_data.nrows()
    }

    /// Indices and distances of the `n_neighbors` closest training rows
    fn neighbors(&self, row: ArrayView1<'_, f64>) -> Vec<(usize, f64)> {
        let mut distances: Vec<(usize, f64)> = self
            .fit_data
            .outer_iter()
            .enumerate()
            .map(|(i, fit_row)| (i, squared_distance(row, fit_row).sqrt()))
            .collect();
        distances.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        distances.truncate(self.n_neighbors);
        distances
    }

    /// Negated local outlier factor; around -1 for inliers
    pub fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        ensure_width(MODEL, self.fit_data.ncols(), x)?;
        let k = self.n_neighbors as f64;
        let scores = x.outer_iter().map(|row| {
            let neighbors = self.neighbors(row);
            let reach_sum: f64 = neighbors
                .iter()
                .map(|&(i, dist)| dist.max(self.k_distances[i]))
                .sum();
            let lrd = 1.0 / (reach_sum / k + DENSITY_EPSILON);
            let ratio_sum: f64 = neighbors.iter().map(|&(i, _)| self.lrd[i] / lrd).sum();
            -(ratio_sum / k)
        });
        Ok(Array1::from_iter(scores))
    }
}

impl TryFrom<LocalOutlierFactorParams> for LocalOutlierFactor {
    type Error = ModelError;

    fn try_from(params: LocalOutlierFactorParams) -> Result<Self, Self::Error> {
        let fit_data = matrix_from_rows(MODEL, "fit_data", &params.fit_data)?;
        let n = fit_data.nrows();
        if n == 0 || fit_data.ncols() == 0 {
            return Err(ModelError::invalid(MODEL, "fit_data is empty"));
        }
        if params.n_neighbors == 0 || params.n_neighbors > n {
            return Err(ModelError::invalid(
                MODEL,
                format!(
                    "n_neighbors must be in 1..={}, got {}",
                    n, params.n_neighbors
                ),
            ));
        }
        if params.k_distances.len() != n || params.lrd.len() != n {
            return Err(ModelError::invalid(
                MODEL,
                "k_distances and lrd must have one entry per fit row",
            ));
        }
        if params.k_distances.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return Err(ModelError::invalid(MODEL, "k_distances must be non-negative"));
        }
        if params.lrd.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return Err(ModelError::invalid(MODEL, "lrd entries must be positive"));
        }
        if !params.offset.is_finite() {
            return Err(ModelError::invalid(MODEL, "offset must be finite"));
        }

        Ok(Self {
            n_neighbors: params.n_neighbors,
            fit_data,
            k_distances: Array1::from(params.k_distances),
            lrd: Array1::from(params.lrd),
            offset: params.offset,
        })
    }
}

impl From<LocalOutlierFactor> for LocalOutlierFactorParams {
    fn from(lof: LocalOutlierFactor) -> Self {
        Self {
            n_neighbors: lof.n_neighbors,
            fit_data: matrix_to_rows(&lof.fit_data),
            k_distances: lof.k_distances.to_vec(),
            lrd: lof.lrd.to_vec(),
            offset: lof.offset,
        }
    }
}

impl DecisionFunction for LocalOutlierFactor {
    fn n_features_in(&self) -> usize {
        self.fit_data.ncols()
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let decision = self.score_samples(x)? - self.offset;
        ensure_finite(MODEL, &decision)?;
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Four points on the unit square, k = 2
    fn unit_square() -> LocalOutlierFactor {
        LocalOutlierFactor::try_from(LocalOutlierFactorParams {
            n_neighbors: 2,
            fit_data: vec![
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![1.0, 1.0],
            ],
            k_distances: vec![1.0; 4],
            lrd: vec![1.0; 4],
            offset: -1.5,
        })
        .unwrap()
    }

    #[test]
    fn test_inlier_scores_near_minus_one() {
        let lof = unit_square();
        // nearest two points are both at distance 1, equal to their k-distance
        let scores = lof.score_samples(&array![[0.0, 0.0]]).unwrap();
        assert!((scores[0] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_far_point_has_lower_decision() {
        let lof = unit_square();
        let decision = lof
            .decision_function(&array![[0.5, 0.5], [10.0, 10.0]])
            .unwrap();
        assert!(decision[1] < decision[0]);
        assert!(decision[0] > 0.0);
        assert!(decision[1] < 0.0);
    }

    #[test]
    fn test_reachability_uses_k_distance_floor() {
        let lof = unit_square();
        // centre point sits closer than k-distance to every neighbour
        let scores = lof.score_samples(&array![[0.5, 0.5]]).unwrap();
        let lrd = 1.0 / (1.0 + DENSITY_EPSILON);
        assert!((scores[0] + 1.0 / lrd).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_too_many_neighbors() {
        let result = LocalOutlierFactor::try_from(LocalOutlierFactorParams {
            n_neighbors: 3,
            fit_data: vec![vec![0.0], vec![1.0]],
            k_distances: vec![1.0, 1.0],
            lrd: vec![1.0, 1.0],
            offset: -1.5,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_width_checked() {
        let lof = unit_square();
        assert!(lof.decision_function(&Array2::zeros((1, 3))).is_err());
    }
}
