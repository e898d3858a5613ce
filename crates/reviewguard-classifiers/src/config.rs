//! Detector configuration

use crate::duplicates::DEFAULT_THRESHOLD as DEFAULT_DUPLICATE_THRESHOLD;
use crate::ensemble::EnsembleWeights;
use crate::explainer::ExplainerThresholds;
use crate::features::DEFAULT_SPAM_PHRASES;
use reviewguard_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the review classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Decision threshold on the fake probability
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Weights of the ensemble members; a bundle that carries its own
    /// weights overrides these
    #[serde(default)]
    pub ensemble_weights: EnsembleWeights,

    /// Append dense embedding dimensions to the feature vector
    #[serde(default)]
    pub use_dense_embedding: bool,

    /// Cosine similarity at which two reviews count as near-duplicates
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_similarity_threshold: f64,

    /// Maximum number of reasons in a verdict
    #[serde(default = "default_max_reasons")]
    pub max_reasons: usize,

    /// Spam phrase lexicon (case-insensitive)
    #[serde(default = "default_spam_phrases")]
    pub spam_phrases: Vec<String>,

    /// Explanation rule thresholds
    #[serde(default)]
    pub explainer: ExplainerThresholds,

    /// Dense embedding model, used when `use_dense_embedding` is set
    #[serde(default)]
    pub embedding: Option<EmbeddingSpec>,
}

/// Where to load the dense embedding model from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSpec {
    /// Local directory with config.json, tokenizer.json and model.safetensors
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// HuggingFace repository id
    #[serde(default)]
    pub repo_id: Option<String>,

    #[serde(default = "default_revision")]
    pub revision: String,

    /// Longer inputs are truncated to this many tokens
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

fn default_threshold() -> f64 {
    0.5
}

fn default_duplicate_threshold() -> f64 {
    DEFAULT_DUPLICATE_THRESHOLD
}

fn default_max_reasons() -> usize {
    5
}

fn default_spam_phrases() -> Vec<String> {
    DEFAULT_SPAM_PHRASES.iter().map(|p| p.to_string()).collect()
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_max_length() -> usize {
    256
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            ensemble_weights: EnsembleWeights::default(),
            use_dense_embedding: false,
            duplicate_similarity_threshold: default_duplicate_threshold(),
            max_reasons: default_max_reasons(),
            spam_phrases: default_spam_phrases(),
            explainer: ExplainerThresholds::default(),
            embedding: None,
        }
    }
}

impl DetectorConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid detector config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| Error::config(format!("failed to serialize detector config: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::config(format!(
                "threshold must be in [0, 1], got {}",
                self.threshold
            )));
        }

        self.ensemble_weights.validate()?;

        let d = self.duplicate_similarity_threshold;
        if !(d > 0.0 && d <= 1.0) {
            return Err(Error::config(format!(
                "duplicate_similarity_threshold must be in (0, 1], got {}",
                d
            )));
        }

        if self.max_reasons == 0 {
            return Err(Error::config("max_reasons must be at least 1"));
        }

        if let Some(spec) = &self.embedding {
            if spec.path.is_none() && spec.repo_id.is_none() {
                return Err(Error::config("embedding needs either a path or a repo_id"));
            }
            if spec.max_length == 0 {
                return Err(Error::config("embedding max_length must be positive"));
            }
        }

        Ok(())
    }
}
