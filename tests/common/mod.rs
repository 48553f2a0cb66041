//! Shared helpers for integration tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use audit_scorer::error::ModelError;
use audit_scorer::models::{DecisionFunction, InverseTransform, StandardScaler, Transform};
use audit_scorer::{EnsembleScorer, FeatureVector, ModelBundle, FEATURE_COUNT};
use ndarray::{Array1, Array2};
use serde_json::{json, Value};

pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("model_bundle.json")
}

pub fn fixture_bundle() -> ModelBundle {
    ModelBundle::load(fixture_path()).expect("fixture bundle must load")
}

pub fn fixture_scorer() -> EnsembleScorer {
    EnsembleScorer::new(Arc::new(fixture_bundle()))
}

/// Detector returning fixed decision values, at most one per row
pub struct FixedDecision(pub Vec<f64>);

impl DecisionFunction for FixedDecision {
    fn n_features_in(&self) -> usize {
        FEATURE_COUNT
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        Ok(self.0.iter().copied().take(x.nrows()).collect())
    }
}

/// Detector that panics whenever it is asked to score
pub struct PanickingDecision;

impl DecisionFunction for PanickingDecision {
    fn n_features_in(&self) -> usize {
        FEATURE_COUNT
    }

    fn decision_function(&self, _x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        panic!("detector blew up")
    }
}

/// Projection whose reconstruction is off by `shift` in every column,
/// giving a reconstruction error of `shift²`
pub struct ShiftedReconstruction(pub f64);

impl Transform for ShiftedReconstruction {
    fn n_features_in(&self) -> usize {
        FEATURE_COUNT
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        Ok(x.clone())
    }
}

impl InverseTransform for ShiftedReconstruction {
    fn inverse_transform(&self, z: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        Ok(z + self.0)
    }
}

/// Scorer with an identity scaler whose raw signals are exactly
/// `-decisions[i]` for the four detectors and `shift²` for reconstruction
pub fn stub_scorer(decisions: [Vec<f64>; 4], shift: f64) -> EnsembleScorer {
    let [iforest, lof, ocsvm, elliptic] = decisions;
    let bundle = ModelBundle::new(
        Box::new(StandardScaler::identity(FEATURE_COUNT)),
        Box::new(FixedDecision(iforest)),
        Box::new(FixedDecision(lof)),
        Box::new(FixedDecision(ocsvm)),
        Box::new(FixedDecision(elliptic)),
        Box::new(ShiftedReconstruction(shift)),
    )
    .expect("stub bundle must be valid");
    EnsembleScorer::new(Arc::new(bundle))
}

/// Scorer whose isolation forest panics on every call
pub fn panicking_scorer() -> EnsembleScorer {
    let bundle = ModelBundle::new(
        Box::new(StandardScaler::identity(FEATURE_COUNT)),
        Box::new(PanickingDecision),
        Box::new(FixedDecision(vec![0.0; 8])),
        Box::new(FixedDecision(vec![0.0; 8])),
        Box::new(FixedDecision(vec![0.0; 8])),
        Box::new(ShiftedReconstruction(0.0)),
    )
    .expect("stub bundle must be valid");
    EnsembleScorer::new(Arc::new(bundle))
}

/// A typical weekday cash transaction
pub fn sample_vector() -> FeatureVector {
    FeatureVector {
        total_transaction: 1180.0,
        cash_amount: 350.0,
        cash_ratio: 0.3,
        hour: 14.0,
        day_of_week: 2.0,
        user_monthly_transactions: 40.0,
        client_monthly_transactions: 16.0,
        rule_score: 1.0,
    }
}

/// An extreme late-night, all-cash transaction
pub fn outlier_vector() -> FeatureVector {
    FeatureVector {
        total_transaction: 48_000.0,
        cash_amount: 48_000.0,
        cash_ratio: 1.0,
        hour: 3.0,
        day_of_week: 6.0,
        user_monthly_transactions: 2.0,
        client_monthly_transactions: 1.0,
        rule_score: 4.0,
    }
}

pub fn record(vector: &FeatureVector) -> Value {
    serde_json::to_value(vector).expect("feature vector serializes")
}

/// Record with the `rule_score` field missing
pub fn seven_field_record() -> Value {
    json!({
        "total_transaction": 1180.0,
        "cash_amount": 350.0,
        "cash_ratio": 0.3,
        "hour": 14.0,
        "day_of_week": 2.0,
        "user_monthly_transactions": 40.0,
        "client_monthly_transactions": 16.0
    })
}
