//! Random forest member
//!
//! Every tree's leaves hold the fraction of fake training reviews that ended
//! in that leaf; the forest averages them.

use super::tree::DecisionTree;
use super::{check_input, check_probability, FakeReviewModel};
use reviewguard_core::{Error, ModelKind, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestModel {
    input_dim: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForestModel {
    /// Create a validated forest
    pub fn new(input_dim: usize, trees: Vec<DecisionTree>) -> Result<Self> {
        let model = Self { input_dim, trees };
        model.validate()?;
        Ok(model)
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(Error::config("random forest has no trees"));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.input_dim)
                .map_err(|e| Error::config(format!("random forest tree {}: {}", i, e)))?;
            if tree.leaves().any(|v| !(0.0..=1.0).contains(&v)) {
                return Err(Error::config(format!(
                    "random forest tree {} has a leaf outside [0, 1]",
                    i
                )));
            }
        }
        Ok(())
    }
}

impl FakeReviewModel for RandomForestModel {
    fn name(&self) -> &str {
        ModelKind::TreeEnsemble.as_str()
    }

    fn kind(&self) -> ModelKind {
        ModelKind::TreeEnsemble
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        check_input(self.input_dim, features)?;

        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.evaluate(features)?;
        }
        check_probability(self.name(), sum / self.trees.len() as f64)
    }
}
