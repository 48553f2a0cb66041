//! Isolation Forest
//!
//! Scores rows by how quickly random axis-aligned splits isolate them.
//! Trees are restored from a fitted forest; nothing is grown here.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::{ensure_finite, ensure_width, DecisionFunction};
use crate::error::ModelError;

const MODEL: &str = "iforest";
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Node of a fitted isolation tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// `x[feature] <= threshold` continues at `left`, otherwise at `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Terminal node holding `samples` training rows
    Leaf { samples: usize },
}

/// One fitted tree; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationTree {
    pub nodes: Vec<TreeNode>,
}

impl IsolationTree {
    fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::invalid(MODEL, "tree has no nodes"));
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } = node
            {
                if *feature >= n_features {
                    return Err(ModelError::invalid(
                        MODEL,
                        format!("node {} splits on feature {}", index, feature),
                    ));
                }
                if threshold.is_nan() {
                    return Err(ModelError::invalid(
                        MODEL,
                        format!("node {} has a NaN threshold", index),
                    ));
                }
                // children always follow their parent, so traversal terminates
                for child in [*left, *right] {
                    if child <= index || child >= self.nodes.len() {
                        return Err(ModelError::invalid(
                            MODEL,
                            format!("node {} has invalid child {}", index, child),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn path_length(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut index = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                    depth += 1.0;
                }
                TreeNode::Leaf { samples } => return depth + average_path_length(*samples),
            }
        }
    }
}

/// Persisted forest parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForestParams {
    /// Width of the rows the forest was fitted on
    pub n_features: usize,
    /// Sub-sample size used to grow each tree
    pub max_samples: usize,
    /// Threshold subtracted from the raw score
    pub offset: f64,
    pub trees: Vec<IsolationTree>,
}

/// Fitted isolation forest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "IsolationForestParams", into = "IsolationForestParams")]
pub struct IsolationForest {
    params: IsolationForestParams,
    normalizer: f64,
}

impl IsolationForest {
    pub fn n_trees(&self) -> usize {
        self.params.trees.len()
    }

    /// Raw score in `[-1, 0)`; lower means easier to isolate
    pub fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        ensure_width(MODEL, self.params.n_features, x)?;
        let n_trees = self.params.trees.len() as f64;
        let scores = x.outer_iter().map(|row| {
            let total: f64 = self.params.trees.iter().map(|t| t.path_length(row)).sum();
            -(2f64.powf(-(total / n_trees) / self.normalizer))
        });
        Ok(Array1::from_iter(scores))
    }
}

impl TryFrom<IsolationForestParams> for IsolationForest {
    type Error = ModelError;

    fn try_from(params: IsolationForestParams) -> Result<Self, Self::Error> {
        if params.n_features == 0 {
            return Err(ModelError::invalid(MODEL, "n_features must be positive"));
        }
        if params.trees.is_empty() {
            return Err(ModelError::invalid(MODEL, "forest has no trees"));
        }
        if params.max_samples < 2 {
            return Err(ModelError::invalid(MODEL, "max_samples must be at least 2"));
        }
        if !params.offset.is_finite() {
            return Err(ModelError::invalid(MODEL, "offset must be finite"));
        }
        for tree in &params.trees {
            tree.validate(params.n_features)?;
        }

        let normalizer = average_path_length(params.max_samples);
        Ok(Self { params, normalizer })
    }
}

impl From<IsolationForest> for IsolationForestParams {
    fn from(forest: IsolationForest) -> Self {
        forest.params
    }
}

impl DecisionFunction for IsolationForest {
    fn n_features_in(&self) -> usize {
        self.params.n_features
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let decision = self.score_samples(x)? - self.params.offset;
        ensure_finite(MODEL, &decision)?;
        Ok(decision)
    }
}

/// Expected path length of an unsuccessful search in a binary tree of `n` nodes
pub(crate) fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}
