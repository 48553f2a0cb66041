//! Model Bundle
//!
//! The six fitted sub-models the scorer depends on, restored once at
//! process start and shared read-only afterwards.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    DecisionFunction, EllipticEnvelope, InverseTransform, IsolationForest, LocalOutlierFactor,
    OneClassSvm, Pca, StandardScaler, Transform,
};
use crate::error::{BundleError, ModelError};
use crate::features::{FEATURE_COUNT, FEATURE_NAMES};

/// Bundle file layout understood by this build
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// On-disk bundle layout (JSON)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundleFile {
    pub format_version: u32,
    /// Column order the models were fitted on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub scaler: StandardScaler,
    pub iforest: IsolationForest,
    pub lof: LocalOutlierFactor,
    pub ocsvm: OneClassSvm,
    pub elliptic: EllipticEnvelope,
    pub pca: Pca,
}

/// Descriptive information about a loaded bundle
#[derive(Debug, Clone, Serialize)]
pub struct BundleSummary {
    pub n_features: usize,
    pub pca_components: Option<usize>,
    pub iforest_trees: Option<usize>,
    pub lof_fit_samples: Option<usize>,
    pub ocsvm_support_vectors: Option<usize>,
    pub source: Option<PathBuf>,
    pub loaded_at: DateTime<Utc>,
}

/// Immutable set of fitted sub-models
pub struct ModelBundle {
    scaler: Box<dyn Transform>,
    iforest: Box<dyn DecisionFunction>,
    lof: Box<dyn DecisionFunction>,
    ocsvm: Box<dyn DecisionFunction>,
    elliptic: Box<dyn DecisionFunction>,
    pca: Box<dyn InverseTransform>,
    summary: BundleSummary,
}

impl ModelBundle {
    /// Assemble a bundle from already-fitted sub-models
    ///
    /// Every sub-model must accept rows of `FEATURE_COUNT` columns.
    pub fn new(
        scaler: Box<dyn Transform>,
        iforest: Box<dyn DecisionFunction>,
        lof: Box<dyn DecisionFunction>,
        ocsvm: Box<dyn DecisionFunction>,
        elliptic: Box<dyn DecisionFunction>,
        pca: Box<dyn InverseTransform>,
    ) -> Result<Self, ModelError> {
        let widths = [
            ("scaler", scaler.n_features_in()),
            ("iforest", iforest.n_features_in()),
            ("lof", lof.n_features_in()),
            ("ocsvm", ocsvm.n_features_in()),
            ("elliptic", elliptic.n_features_in()),
            ("pca", pca.n_features_in()),
        ];
        for (model, width) in widths {
            if width != FEATURE_COUNT {
                return Err(ModelError::invalid(
                    model,
                    format!("fitted on {} features, expected {}", width, FEATURE_COUNT),
                ));
            }
        }

        Ok(Self {
            scaler,
            iforest,
            lof,
            ocsvm,
            elliptic,
            pca,
            summary: BundleSummary {
                n_features: FEATURE_COUNT,
                pca_components: None,
                iforest_trees: None,
                lof_fit_samples: None,
                ocsvm_support_vectors: None,
                source: None,
                loaded_at: Utc::now(),
            },
        })
    }

    /// Read and validate a bundle file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BundleError> {
        let path = path.as_ref();
        info!("Loading model bundle from {}", path.display());

        let contents = std::fs::read_to_string(path).map_err(|source| BundleError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ModelBundleFile =
            serde_json::from_str(&contents).map_err(|source| BundleError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut bundle = Self::try_from(file)?;
        bundle.summary.source = Some(path.to_path_buf());

        info!(
            "Model bundle loaded: {} trees, {} LOF rows, {} support vectors, {} PCA components",
            bundle.summary.iforest_trees.unwrap_or_default(),
            bundle.summary.lof_fit_samples.unwrap_or_default(),
            bundle.summary.ocsvm_support_vectors.unwrap_or_default(),
            bundle.summary.pca_components.unwrap_or_default(),
        );
        Ok(bundle)
    }

    pub fn summary(&self) -> &BundleSummary {
        &self.summary
    }

    pub fn scaler(&self) -> &dyn Transform {
        self.scaler.as_ref()
    }

    pub fn iforest(&self) -> &dyn DecisionFunction {
        self.iforest.as_ref()
    }

    pub fn lof(&self) -> &dyn DecisionFunction {
        self.lof.as_ref()
    }

    pub fn ocsvm(&self) -> &dyn DecisionFunction {
        self.ocsvm.as_ref()
    }

    pub fn elliptic(&self) -> &dyn DecisionFunction {
        self.elliptic.as_ref()
    }

    pub fn pca(&self) -> &dyn InverseTransform {
        self.pca.as_ref()
    }
}

impl TryFrom<ModelBundleFile> for ModelBundle {
    type Error = BundleError;

    fn try_from(file: ModelBundleFile) -> Result<Self, Self::Error> {
        if file.format_version != BUNDLE_FORMAT_VERSION {
            return Err(BundleError::UnsupportedVersion(file.format_version));
        }
        if let Some(names) = file.feature_names {
            if names.iter().map(String::as_str).ne(FEATURE_NAMES) {
                return Err(BundleError::FeatureNames(names));
            }
        }

        let pca_components = file.pca.n_components();
        let iforest_trees = file.iforest.n_trees();
        let lof_fit_samples = file.lof.n_fit_samples();
        let ocsvm_support_vectors = file.ocsvm.n_support();
        debug!(
            pca_components,
            iforest_trees, lof_fit_samples, ocsvm_support_vectors, "Validating bundle widths"
        );

        let mut bundle = Self::new(
            Box::new(file.scaler),
            Box::new(file.iforest),
            Box::new(file.lof),
            Box::new(file.ocsvm),
            Box::new(file.elliptic),
            Box::new(file.pca),
        )?;
        bundle.summary.pca_components = Some(pca_components);
        bundle.summary.iforest_trees = Some(iforest_trees);
        bundle.summary.lof_fit_samples = Some(lof_fit_samples);
        bundle.summary.ocsvm_support_vectors = Some(ocsvm_support_vectors);
        Ok(bundle)
    }
}

impl fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBundle")
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}
