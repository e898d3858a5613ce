//! ReviewGuard Classifiers
//!
//! Fake e-commerce review detection on CPU.
//!
//! A review flows through a fixed pipeline:
//! - Normalization (markup stripped, stopwords removed, lemmatized)
//! - 21 statistical features plus TF-IDF n-grams (and an optional dense
//!   embedding) assembled into one fixed-order vector
//! - A weighted ensemble of a random forest, gradient boosted trees and a
//!   Platt-scaled margin model
//! - A declarative rule table that explains the verdict
//!
//! Fitted models, the vectorizer and the ensemble weights travel together in
//! a [`ModelBundle`] that [`ReviewClassifier`] swaps atomically on reload.

pub mod bundle;
pub mod config;
pub mod detector;
pub mod duplicates;
pub mod embedding;
pub mod ensemble;
pub mod evaluation;
pub mod explainer;
pub mod features;
pub mod lemma;
pub mod models;
pub mod normalizer;
pub mod sentiment;
pub mod vector;
pub mod vectorizer;

pub use bundle::{ModelBundle, ModelBundleArtifact};
pub use config::{DetectorConfig, EmbeddingSpec};
pub use detector::ReviewClassifier;
pub use duplicates::{duplicate_ids, find_near_duplicates, DuplicateDetector, NearDuplicate};
pub use embedding::EmbeddingProvider;
pub use ensemble::{EnsembleClassifier, EnsemblePrediction, EnsembleWeights, MemberScore};
pub use evaluation::{BinaryMetrics, ConfusionMatrix, EvaluationReport};
pub use explainer::{Explainer, ExplainerThresholds};
pub use features::{FeatureExtractor, StatisticalFeatures, FEATURE_NAMES, STATISTICAL_DIM};
pub use models::FakeReviewModel;
pub use normalizer::{NormalizedText, TextNormalizer};
pub use vector::{FeatureLayout, FeatureVector, SparseVector};
pub use vectorizer::{TfidfVectorizer, VectorizerParams};

#[cfg(feature = "bert-embeddings")]
pub use embedding::BertEmbedder;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::DetectorConfig;
    pub use crate::detector::ReviewClassifier;
    pub use crate::models::FakeReviewModel;
    pub use reviewguard_core::{ClassificationResult, Error, ModelKind, RawReview, Result};
}
