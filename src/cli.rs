//! Command line interface

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::config::{ConfigLoader, ConfigOverrides, ScorerConfig};
use crate::error::ScoringError;
use crate::features::{FeatureMatrix, FeatureVector};
use crate::models::ModelBundle;
use crate::scoring::{EnsembleScorer, ScoringMode};
use crate::server::handlers::BatchRequest;

#[derive(Debug, Parser)]
#[command(name = "audit-scorer")]
#[command(author, version, about = "Ensemble anomaly scoring for audit transactions")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "AUDIT_SCORER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level or filter directive
    #[arg(long, global = true, env = "AUDIT_SCORER_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP scoring API (default)
    Serve {
        /// Listen address, e.g. 0.0.0.0:8000
        #[arg(short, long)]
        bind: Option<String>,

        /// Model bundle path
        #[arg(long)]
        bundle: Option<PathBuf>,

        /// Behaviour of POST /predict
        #[arg(short, long, value_enum)]
        mode: Option<ScoringMode>,
    },

    /// Score a JSON file and print the result
    Score {
        /// JSON file: a record list, `{"records": [...]}` or one record
        #[arg(short, long)]
        input: PathBuf,

        /// Model bundle path
        #[arg(long)]
        bundle: Option<PathBuf>,

        /// Scoring mode
        #[arg(short, long, value_enum)]
        mode: Option<ScoringMode>,
    },

    /// Validate a model bundle and print its summary
    InspectBundle {
        /// Model bundle path
        #[arg(long)]
        bundle: Option<PathBuf>,
    },

    /// Write a sample configuration file
    InitConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    /// Command line values that take precedence over file and environment
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides {
            log_level: self.log_level.clone(),
            ..Default::default()
        };
        match &self.command {
            Some(Commands::Serve { bind, bundle, mode }) => {
                overrides.bind_addr = bind.clone();
                overrides.bundle_path = bundle.clone();
                overrides.mode = *mode;
            }
            Some(Commands::Score { bundle, mode, .. }) => {
                overrides.bundle_path = bundle.clone();
                overrides.mode = *mode;
            }
            Some(Commands::InspectBundle { bundle }) => {
                overrides.bundle_path = bundle.clone();
            }
            Some(Commands::InitConfig { .. }) | None => {}
        }
        overrides
    }

    /// Resolve the layered configuration
    pub fn load_config(&self) -> Result<ScorerConfig> {
        let config = ConfigLoader::new()
            .load_from_file(self.config.as_deref())
            .load_from_env()
            .with_overrides(self.overrides())
            .build()
            .context("Failed to load configuration")?;
        Ok(config)
    }
}

/// Score an input file and render the JSON that the matching endpoint returns
pub fn score_file(scorer: &EnsembleScorer, mode: ScoringMode, input: &Path) -> Result<String> {
    let raw = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let body: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", input.display()))?;

    let rendered = match mode {
        ScoringMode::Batch => {
            // a lone record object is scored as a batch of one
            let records = if body.is_object() && body.get("records").is_none() {
                vec![body]
            } else {
                serde_json::from_value::<BatchRequest>(body)
                    .context("Expected a record list or {\"records\": [...]}")?
                    .into_records()
            };
            let features = FeatureMatrix::from_records(&records)?;
            serde_json::to_string_pretty(&scorer.score_batch(&features)?)?
        }
        ScoringMode::Single => {
            let vector = FeatureVector::from_value(&body)
                .map_err(ScoringError::Validation)
                .context("Expected a single feature record")?;
            serde_json::to_string_pretty(&scorer.score_one(&vector)?)?
        }
    };
    Ok(rendered)
}

/// Load a bundle and render its summary as JSON
pub fn inspect_bundle(path: &Path) -> Result<String> {
    let bundle = ModelBundle::load(path)?;
    Ok(serde_json::to_string_pretty(bundle.summary())?)
}

/// Write the sample configuration to a file, or return it for stdout
pub fn init_config(output: Option<&Path>) -> Result<Option<String>> {
    let sample = ScorerConfig::sample_toml()?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(path, sample)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(None)
        }
        None => Ok(Some(sample)),
    }
}
