//! Ensemble member models
//!
//! Each member is a fitted estimator deserialized from a bundle artifact and
//! never mutated afterwards. Scoring is synchronous and allocation-free apart
//! from error paths.

pub mod boosted;
pub mod forest;
pub mod margin;
pub mod tree;

pub use boosted::GradientBoostedModel;
pub use forest::RandomForestModel;
pub use margin::{MarginKernel, MarginModel, PlattScaling, StandardScaler};
pub use tree::{DecisionTree, SplitComparison, TreeNode};

use reviewguard_core::{Error, ModelKind, Result};

/// Trait for all ensemble members
pub trait FakeReviewModel: Send + Sync {
    /// Model name, used as the key in per-model probabilities
    fn name(&self) -> &str;

    /// Which ensemble slot this model fills
    fn kind(&self) -> ModelKind;

    /// Width of the feature vector the model was fit on
    fn input_dim(&self) -> usize;

    /// Probability that the review is fake, in [0, 1]
    fn predict_proba(&self, features: &[f64]) -> Result<f64>;
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Reject inputs whose width differs from the fitted width
pub(crate) fn check_input(input_dim: usize, features: &[f64]) -> Result<()> {
    if features.len() != input_dim {
        return Err(Error::dimension_mismatch(input_dim, features.len()));
    }
    Ok(())
}

/// Reject non-finite or out-of-range model output
pub(crate) fn check_probability(model: &str, p: f64) -> Result<f64> {
    if !p.is_finite() || !(0.0..=1.0).contains(&p) {
        return Err(Error::model_scoring(
            model,
            format!("produced invalid probability {}", p),
        ));
    }
    Ok(p)
}
