//! # audit-scorer
//!
//! Ensemble anomaly scoring for audit transactions.
//!
//! Five unsupervised detectors (isolation forest, local outlier factor,
//! one-class SVM, elliptic envelope and PCA reconstruction error) are fitted
//! offline and persisted as a JSON bundle. This crate restores the bundle,
//! combines the detectors into a single score per transaction and exposes
//! the scorer over HTTP and on the command line.

pub mod cli;
pub mod config;
pub mod error;
pub mod features;
pub mod logging;
pub mod models;
pub mod scoring;
pub mod server;

pub use error::{Error, Result, ScoringError, ValidationIssue};
pub use features::{FeatureMatrix, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use models::ModelBundle;
pub use scoring::{AnomalyStatus, EnsembleScorer, ScoringMode, SingleScore};
pub use server::{create_router, AppState};
