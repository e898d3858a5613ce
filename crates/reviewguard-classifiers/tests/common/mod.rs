//! Shared fixtures for integration tests
//!
//! Provides mock ensemble members (fixed score, always failing) and a small
//! fitted bundle whose hand-built trees key on the spam phrase and
//! exclamation features.

#![allow(dead_code)]

use reviewguard_classifiers::features::index;
use reviewguard_classifiers::models::{
    DecisionTree, FakeReviewModel, GradientBoostedModel, MarginModel, PlattScaling,
    RandomForestModel, TreeNode,
};
use reviewguard_classifiers::{
    EnsembleWeights, ModelBundle, ModelBundleArtifact, TextNormalizer, TfidfVectorizer,
    VectorizerParams, STATISTICAL_DIM,
};
use reviewguard_core::{Error, ModelKind, Result};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub const CORPUS: &[&str] = &[
    "Great phone, fast shipping and a bright screen.",
    "Battery died after two days, very disappointed.",
    "Amazing product! Highly recommend! Buy now!!!",
    "Shipping was a bit slow but the product works as described.",
];

/// An ensemble member that always returns the same probability
pub struct MockModel {
    kind: ModelKind,
    input_dim: usize,
    score: f64,
    call_count: AtomicU32,
}

impl MockModel {
    pub fn new(kind: ModelKind, input_dim: usize, score: f64) -> Self {
        Self {
            kind,
            input_dim,
            score,
            call_count: AtomicU32::new(0),
        }
    }

    /// Number of times predict_proba was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl FakeReviewModel for MockModel {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn predict_proba(&self, _features: &[f64]) -> Result<f64> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        Ok(self.score)
    }
}

/// An ensemble member that always fails
pub struct FailingModel {
    kind: ModelKind,
    input_dim: usize,
}

impl FailingModel {
    pub fn new(kind: ModelKind, input_dim: usize) -> Self {
        Self { kind, input_dim }
    }
}

impl FakeReviewModel for FailingModel {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn predict_proba(&self, _features: &[f64]) -> Result<f64> {
        Err(Error::internal("simulated scoring failure"))
    }
}

pub fn vectorizer() -> TfidfVectorizer {
    let normalizer = TextNormalizer::new().unwrap();
    TfidfVectorizer::fit(&normalizer, CORPUS, VectorizerParams::unigrams()).unwrap()
}

/// Width of the fixture bundle's feature vector
pub fn input_dim(vectorizer: &TfidfVectorizer) -> usize {
    STATISTICAL_DIM + vectorizer.num_features()
}

fn stump(feature: usize, threshold: f64, low: f64, high: f64) -> DecisionTree {
    DecisionTree::new(vec![
        TreeNode::Split {
            feature,
            threshold,
            left: 1,
            right: 2,
            default_left: true,
        },
        TreeNode::Leaf { value: low },
        TreeNode::Leaf { value: high },
    ])
}

/// Bundle artifact whose members score spam phrases and exclamation marks
///
/// - forest: mean of a spam stump (0.1 / 0.9) and an exclamation stump (0.2 / 0.8)
/// - boosted: one spam stump with leaves -2 / +2
/// - margin: `spam + 0.5 * exclamations - 1`, logistic
pub fn artifact(version: &str) -> ModelBundleArtifact {
    let vectorizer = vectorizer();
    let dim = input_dim(&vectorizer);

    let forest = RandomForestModel::new(
        dim,
        vec![
            stump(index::SPAM_PHRASE_COUNT, 0.5, 0.1, 0.9),
            stump(index::EXCLAMATION_COUNT, 2.5, 0.2, 0.8),
        ],
    )
    .unwrap();

    let boosted = GradientBoostedModel::new(
        dim,
        0.0,
        vec![stump(index::SPAM_PHRASE_COUNT, 0.5, -2.0, 2.0)],
    )
    .unwrap();

    let mut weights = vec![0.0; dim];
    weights[index::SPAM_PHRASE_COUNT] = 1.0;
    weights[index::EXCLAMATION_COUNT] = 0.5;
    let margin = MarginModel::linear(weights, -1.0, PlattScaling::default()).unwrap();

    ModelBundleArtifact {
        version: version.to_string(),
        tree_ensemble: forest,
        boosted_trees: boosted,
        margin,
        vectorizer,
        weights: None,
        embedding_dim: None,
    }
}

pub fn bundle(version: &str) -> ModelBundle {
    artifact(version)
        .into_bundle(EnsembleWeights::default())
        .unwrap()
}

/// Bundle whose three members all return `score`
pub fn constant_bundle(version: &str, score: f64) -> ModelBundle {
    let vectorizer = vectorizer();
    let dim = input_dim(&vectorizer);
    ModelBundle::new(
        version,
        vectorizer,
        Arc::new(MockModel::new(ModelKind::TreeEnsemble, dim, score)),
        Arc::new(MockModel::new(ModelKind::BoostedTrees, dim, score)),
        Arc::new(MockModel::new(ModelKind::Margin, dim, score)),
        EnsembleWeights::default(),
        None,
    )
    .unwrap()
}

/// Bundle with one always-failing member
pub fn bundle_with_failing(failing: ModelKind) -> ModelBundle {
    let vectorizer = vectorizer();
    let dim = input_dim(&vectorizer);
    let member = |kind: ModelKind| -> Arc<dyn FakeReviewModel> {
        if kind == failing {
            Arc::new(FailingModel::new(kind, dim))
        } else {
            Arc::new(MockModel::new(kind, dim, 0.5))
        }
    };

    ModelBundle::new(
        "failing",
        vectorizer,
        member(ModelKind::TreeEnsemble),
        member(ModelKind::BoostedTrees),
        member(ModelKind::Margin),
        EnsembleWeights::default(),
        None,
    )
    .unwrap()
}
