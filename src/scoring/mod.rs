//! Anomaly Scoring
//!
//! Five-signal ensemble scores over the fitted bundle.

mod ensemble;
mod types;

pub use ensemble::{reconstruction_error, BundleState, EnsembleScorer, DEFAULT_EPSILON};
pub use types::{
    min_max_normalize, row_means, AnomalyStatus, ScoringMode, Signal, SignalMatrix, SingleScore,
    ANOMALY_THRESHOLD, SIGNAL_COUNT,
};
