//! Scoring Types

use std::fmt;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Single-row scores strictly above this value are labelled anomalous
pub const ANOMALY_THRESHOLD: f64 = 0.0;

/// How per-signal values are combined into the ensemble score
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Min-max normalize each signal over the batch, then average
    #[default]
    Batch,
    /// Average the raw signals and label the row
    Single,
}

impl ScoringMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMode::Batch => "batch",
            ScoringMode::Single => "single",
        }
    }
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification attached to a single-row score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyStatus {
    #[serde(rename = "Anómala")]
    Anomalous,
    #[serde(rename = "Normal")]
    Normal,
}

impl AnomalyStatus {
    pub fn from_score(score: f64) -> Self {
        if score > ANOMALY_THRESHOLD {
            AnomalyStatus::Anomalous
        } else {
            AnomalyStatus::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyStatus::Anomalous => "Anómala",
            AnomalyStatus::Normal => "Normal",
        }
    }
}

impl fmt::Display for AnomalyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of raw single-row scoring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SingleScore {
    pub anomaly_score: f64,
    pub status: AnomalyStatus,
}

impl SingleScore {
    pub fn new(anomaly_score: f64) -> Self {
        Self {
            anomaly_score,
            status: AnomalyStatus::from_score(anomaly_score),
        }
    }
}

/// The five anomaly signals, in column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    IsolationForest,
    LocalOutlierFactor,
    OneClassSvm,
    EllipticEnvelope,
    Reconstruction,
}

impl Signal {
    pub const ALL: [Signal; 5] = [
        Signal::IsolationForest,
        Signal::LocalOutlierFactor,
        Signal::OneClassSvm,
        Signal::EllipticEnvelope,
        Signal::Reconstruction,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            Signal::IsolationForest => "iforest",
            Signal::LocalOutlierFactor => "lof",
            Signal::OneClassSvm => "ocsvm",
            Signal::EllipticEnvelope => "elliptic",
            Signal::Reconstruction => "reconstruction",
        }
    }
}

pub const SIGNAL_COUNT: usize = Signal::ALL.len();

/// Per-row signal values, `n x 5`, higher meaning more anomalous
#[derive(Debug, Clone, PartialEq)]
pub struct SignalMatrix {
    values: Array2<f64>,
}

impl SignalMatrix {
    /// Wrap an `n x 5` matrix laid out in `Signal::ALL` order
    pub fn new(values: Array2<f64>) -> Option<Self> {
        (values.ncols() == SIGNAL_COUNT).then_some(Self { values })
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn column(&self, signal: Signal) -> ArrayView1<'_, f64> {
        self.values.column(signal.index())
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Rescale every column to 0-100 over the rows of this matrix
    pub fn normalized(&self, epsilon: f64) -> SignalMatrix {
        SignalMatrix {
            values: min_max_normalize(&self.values, epsilon),
        }
    }

    /// Ensemble score per row
    pub fn row_means(&self) -> Array1<f64> {
        row_means(&self.values)
    }
}

/// `100 * (x - min) / (max - min + epsilon)` applied column by column
///
/// Operands are halved before subtracting so a column spanning more than
/// `f64::MAX` still yields values in `[0, 100]`.
pub fn min_max_normalize(values: &Array2<f64>, epsilon: f64) -> Array2<f64> {
    let mut normalized = values.clone();
    for mut column in normalized.axis_iter_mut(Axis(1)) {
        let min = column.iter().copied().fold(f64::INFINITY, f64::min) / 2.0;
        let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max) / 2.0;
        let half_range = max - min + epsilon / 2.0;
        column.mapv_inplace(|v| 100.0 * ((v / 2.0 - min) / half_range));
    }
    normalized
}

/// Arithmetic mean of every row
pub fn row_means(values: &Array2<f64>) -> Array1<f64> {
    let width = values.ncols() as f64;
    values.sum_axis(Axis(1)) / width
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_normalize_survives_range_overflow() {
        let values = array![[-1e308, 0.0], [1e308, 1.0], [0.0, 2.0]];
        let normalized = min_max_normalize(&values, 1e-8);
        assert!(normalized.iter().all(|v| v.is_finite()));
        assert_eq!(normalized[[0, 0]], 0.0);
        assert!((normalized[[1, 0]] - 100.0).abs() < 1e-9);
        assert!((normalized[[2, 0]] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_status_boundary_is_strict() {
        assert_eq!(AnomalyStatus::from_score(0.0), AnomalyStatus::Normal);
        assert_eq!(AnomalyStatus::from_score(-0.0), AnomalyStatus::Normal);
        assert_eq!(AnomalyStatus::from_score(-3.2), AnomalyStatus::Normal);
        assert_eq!(
            AnomalyStatus::from_score(f64::EPSILON),
            AnomalyStatus::Anomalous
        );
        assert_eq!(
            AnomalyStatus::from_score(f64::MIN_POSITIVE),
            AnomalyStatus::Anomalous
        );
    }

    #[test]
    fn test_status_serializes_with_accent() {
        let json = serde_json::to_string(&SingleScore::new(1.5)).unwrap();
        assert_eq!(json, r#"{"anomaly_score":1.5,"status":"Anómala"}"#);
        let json = serde_json::to_string(&SingleScore::new(0.0)).unwrap();
        assert_eq!(json, r#"{"anomaly_score":0.0,"status":"Normal"}"#);
    }

    #[test]
    fn test_constant_column_normalizes_to_zero() {
        let values = array![[5.0, 1.0], [5.0, 3.0], [5.0, 2.0]];
        let normalized = min_max_normalize(&values, 1e-8);
        assert_eq!(normalized.column(0).to_vec(), vec![0.0, 0.0, 0.0]);
        assert_eq!(normalized[[0, 1]], 0.0);
        assert!((normalized[[1, 1]] - 100.0).abs() < 1e-6);
        assert!((normalized[[2, 1]] - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_single_row_collapses_to_zero() {
        let values = array![[0.3, -2.0, 7.0, 1.0, 0.01]];
        let normalized = min_max_normalize(&values, 1e-8);
        assert!(normalized.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_row_means() {
        let values = array![[1.0, 2.0, 3.0, 4.0, 5.0], [0.0, 0.0, 0.0, 0.0, 10.0]];
        assert_eq!(row_means(&values), array![3.0, 2.0]);
    }

    #[test]
    fn test_signal_matrix_requires_five_columns() {
        assert!(SignalMatrix::new(Array2::zeros((2, 4))).is_none());
        let matrix = SignalMatrix::new(Array2::zeros((2, 5))).unwrap();
        assert_eq!(matrix.column(Signal::Reconstruction).len(), 2);
    }

    #[test]
    fn test_signal_order() {
        let names: Vec<&str> = Signal::ALL.iter().map(Signal::name).collect();
        assert_eq!(names, ["iforest", "lof", "ocsvm", "elliptic", "reconstruction"]);
        assert_eq!(Signal::Reconstruction.index(), 4);
    }

    #[test]
    fn test_mode_config_values() {
        let mode: ScoringMode = serde_json::from_str(r#""single""#).unwrap();
        assert_eq!(mode, ScoringMode::Single);
        assert_eq!(ScoringMode::default().as_str(), "batch");
    }
}
