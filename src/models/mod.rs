//! Fitted Models
//!
//! Capability traits for the pre-trained sub-models and the concrete
//! implementations restored from a persisted bundle.

mod bundle;
mod elliptic;
mod isolation_forest;
mod lof;
mod ocsvm;
mod pca;
mod scaler;

pub use bundle::{BundleSummary, ModelBundle, ModelBundleFile, BUNDLE_FORMAT_VERSION};
pub use elliptic::{EllipticEnvelope, EllipticEnvelopeParams};
pub use isolation_forest::{IsolationForest, IsolationForestParams, IsolationTree, TreeNode};
pub use lof::{LocalOutlierFactor, LocalOutlierFactorParams};
pub use ocsvm::{Kernel, OneClassSvm, OneClassSvmParams};
pub use pca::{Pca, PcaParams};
pub use scaler::{StandardScaler, StandardScalerParams};

use ndarray::{Array1, Array2, ArrayView1};

use crate::error::ModelError;

/// Forward transform of a feature matrix (scaler, PCA projection)
pub trait Transform: Send + Sync {
    /// Width of the matrices accepted by `transform`
    fn n_features_in(&self) -> usize;

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, ModelError>;
}

/// Transform that can map its output back into input space
pub trait InverseTransform: Transform {
    fn inverse_transform(&self, z: &Array2<f64>) -> Result<Array2<f64>, ModelError>;
}

/// Outlier detector decision function
///
/// Higher values mean more normal, one value per input row.
pub trait DecisionFunction: Send + Sync {
    /// Width of the matrices accepted by `decision_function`
    fn n_features_in(&self) -> usize;

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError>;
}

pub(crate) fn ensure_width(
    model: &'static str,
    expected: usize,
    x: &Array2<f64>,
) -> Result<(), ModelError> {
    if x.ncols() != expected {
        return Err(ModelError::DimensionMismatch {
            model,
            expected,
            actual: x.ncols(),
        });
    }
    Ok(())
}

pub(crate) fn ensure_finite<'a, I>(model: &'static str, values: I) -> Result<(), ModelError>
where
    I: IntoIterator<Item = &'a f64>,
{
    if values.into_iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ModelError::NonFinite { model })
    }
}

/// Convert nested vectors into a dense matrix, requiring equal row lengths
pub(crate) fn matrix_from_rows(
    model: &'static str,
    name: &str,
    rows: &[Vec<f64>],
) -> Result<Array2<f64>, ModelError> {
    let ncols = rows.first().map(Vec::len).unwrap_or(0);
    if rows.iter().any(|r| r.len() != ncols) {
        return Err(ModelError::invalid(
            model,
            format!("{} rows have unequal lengths", name),
        ));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    ensure_finite(model, &flat)?;
    Array2::from_shape_vec((rows.len(), ncols), flat)
        .map_err(|e| ModelError::invalid(model, format!("{}: {}", name, e)))
}

pub(crate) fn matrix_to_rows(matrix: &Array2<f64>) -> Vec<Vec<f64>> {
    matrix.outer_iter().map(|row| row.to_vec()).collect()
}

pub(crate) fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}
