//! Gradient boosted trees member
//!
//! Leaves hold additive log-odds contributions; the raw margin is
//! `base_score + sum(leaf)` and the probability is its logistic transform.

use super::tree::DecisionTree;
use super::{check_input, check_probability, sigmoid, FakeReviewModel};
use reviewguard_core::{Error, ModelKind, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedModel {
    input_dim: usize,
    /// Initial log-odds before any tree is added
    #[serde(default)]
    base_score: f64,
    trees: Vec<DecisionTree>,
}

impl GradientBoostedModel {
    pub fn new(input_dim: usize, base_score: f64, trees: Vec<DecisionTree>) -> Result<Self> {
        let model = Self {
            input_dim,
            base_score,
            trees,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.base_score.is_finite() {
            return Err(Error::config("boosted model has a non-finite base score"));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.input_dim)
                .map_err(|e| Error::config(format!("boosted tree {}: {}", i, e)))?;
        }
        Ok(())
    }

    /// Raw log-odds before the logistic transform
    pub fn margin(&self, features: &[f64]) -> Result<f64> {
        check_input(self.input_dim, features)?;

        let mut margin = self.base_score;
        for tree in &self.trees {
            margin += tree.evaluate(features)?;
        }
        Ok(margin)
    }
}

impl FakeReviewModel for GradientBoostedModel {
    fn name(&self) -> &str {
        ModelKind::BoostedTrees.as_str()
    }

    fn kind(&self) -> ModelKind {
        ModelKind::BoostedTrees
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        let margin = self.margin(features)?;
        check_probability(self.name(), sigmoid(margin))
    }
}
