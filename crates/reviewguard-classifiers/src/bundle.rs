//! Fitted model bundle
//!
//! A bundle is the unit of (re)loading: three fitted members, the vectorizer
//! they were trained against and the ensemble weights. It is validated once
//! on construction and immutable afterwards, so every prediction against it
//! sees an internally consistent set.

use crate::ensemble::{EnsembleClassifier, EnsembleWeights};
use crate::features::FEATURE_NAMES;
use crate::models::{FakeReviewModel, GradientBoostedModel, MarginModel, RandomForestModel};
use crate::vector::FeatureLayout;
use crate::vectorizer::TfidfVectorizer;
use reviewguard_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// On-disk form of a bundle (JSON)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundleArtifact {
    pub version: String,
    pub tree_ensemble: RandomForestModel,
    pub boosted_trees: GradientBoostedModel,
    pub margin: MarginModel,
    pub vectorizer: TfidfVectorizer,
    /// Weights the members were tuned with, if recorded at training time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<EnsembleWeights>,
    /// Width of the dense embedding the members were fit with, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_dim: Option<usize>,
}

impl ModelBundleArtifact {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let artifact = Self::from_json(&content)?;
        info!(
            path = %path.display(),
            version = %artifact.version,
            "Read model bundle artifact"
        );
        Ok(artifact)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Validate and build a bundle; the artifact's own weights take
    /// precedence over `fallback_weights`.
    pub fn into_bundle(self, fallback_weights: EnsembleWeights) -> Result<ModelBundle> {
        self.tree_ensemble.validate()?;
        self.boosted_trees.validate()?;
        self.margin.validate()?;
        self.vectorizer.validate()?;

        ModelBundle::new(
            self.version,
            self.vectorizer,
            Arc::new(self.tree_ensemble),
            Arc::new(self.boosted_trees),
            Arc::new(self.margin),
            self.weights.unwrap_or(fallback_weights),
            self.embedding_dim,
        )
    }
}

/// A loaded, validated model set
pub struct ModelBundle {
    version: String,
    vectorizer: TfidfVectorizer,
    ensemble: EnsembleClassifier,
    embedding_dim: Option<usize>,
}

impl ModelBundle {
    /// Assemble a bundle and check that every member expects
    /// `STATISTICAL_DIM + vocabulary + embedding` features.
    pub fn new(
        version: impl Into<String>,
        vectorizer: TfidfVectorizer,
        tree_ensemble: Arc<dyn FakeReviewModel>,
        boosted_trees: Arc<dyn FakeReviewModel>,
        margin: Arc<dyn FakeReviewModel>,
        weights: EnsembleWeights,
        embedding_dim: Option<usize>,
    ) -> Result<Self> {
        let version = version.into();
        let layout = FeatureLayout::new(vectorizer.num_features(), embedding_dim.unwrap_or(0));
        let expected = layout.total();

        for member in [&tree_ensemble, &boosted_trees, &margin] {
            if member.input_dim() != expected {
                warn!(
                    version = %version,
                    model = member.name(),
                    expected,
                    actual = member.input_dim(),
                    "Rejected model bundle: feature width drift"
                );
                return Err(Error::dimension_mismatch(expected, member.input_dim()));
            }
        }

        let ensemble = EnsembleClassifier::new(tree_ensemble, boosted_trees, margin, weights)?;

        Ok(Self {
            version,
            vectorizer,
            ensemble,
            embedding_dim,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn ensemble(&self) -> &EnsembleClassifier {
        &self.ensemble
    }

    pub fn weights(&self) -> &EnsembleWeights {
        self.ensemble.weights()
    }

    pub fn embedding_dim(&self) -> Option<usize> {
        self.embedding_dim
    }

    pub fn layout(&self) -> FeatureLayout {
        FeatureLayout::new(self.vectorizer.num_features(), self.embedding_dim.unwrap_or(0))
    }

    pub fn input_dim(&self) -> usize {
        self.ensemble.input_dim()
    }

    /// Name of every feature position, statistical block first
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = FEATURE_NAMES.iter().map(|n| n.to_string()).collect();
        names.extend(
            self.vectorizer
                .feature_names()
                .into_iter()
                .map(|term| format!("tfidf:{}", term)),
        );
        names.extend((0..self.embedding_dim.unwrap_or(0)).map(|i| format!("embedding:{}", i)));
        names
    }
}

impl std::fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBundle")
            .field("version", &self.version)
            .field("input_dim", &self.input_dim())
            .field("embedding_dim", &self.embedding_dim)
            .field("weights", self.weights())
            .finish()
    }
}
