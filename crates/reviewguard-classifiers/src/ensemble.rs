//! Weighted ensemble of the three member models
//!
//! The fake probability is a fixed-weight convex combination of the member
//! probabilities. A member that fails fails the whole prediction: dropping it
//! would silently change the effective weighting.

use crate::models::FakeReviewModel;
use crate::vector::FeatureVector;
use reviewguard_core::{Error, ModelKind, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tolerance on the sum of the ensemble weights
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Per-member weights; each in (0, 1], summing to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleWeights {
    pub tree_ensemble: f64,
    pub boosted_trees: f64,
    pub margin: f64,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            tree_ensemble: 0.40,
            boosted_trees: 0.35,
            margin: 0.25,
        }
    }
}

impl EnsembleWeights {
    pub fn new(tree_ensemble: f64, boosted_trees: f64, margin: f64) -> Result<Self> {
        let weights = Self {
            tree_ensemble,
            boosted_trees,
            margin,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn get(&self, kind: ModelKind) -> f64 {
        match kind {
            ModelKind::TreeEnsemble => self.tree_ensemble,
            ModelKind::BoostedTrees => self.boosted_trees,
            ModelKind::Margin => self.margin,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for kind in ModelKind::ALL {
            let w = self.get(kind);
            if !(w > 0.0 && w <= 1.0) {
                return Err(Error::config(format!(
                    "ensemble weight for {} must be in (0, 1], got {}",
                    kind, w
                )));
            }
        }

        let sum: f64 = ModelKind::ALL.iter().map(|k| self.get(*k)).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::config(format!(
                "ensemble weights must sum to 1.0, got {}",
                sum
            )));
        }

        Ok(())
    }
}

/// One member's contribution to a prediction
#[derive(Debug, Clone, PartialEq)]
pub struct MemberScore {
    pub kind: ModelKind,
    pub name: String,
    pub probability: f64,
}

/// Ensemble output before explanation
#[derive(Debug, Clone, PartialEq)]
pub struct EnsemblePrediction {
    pub fake_probability: f64,
    pub is_fake: bool,
    pub confidence: f64,
    pub per_model: Vec<MemberScore>,
}

impl EnsemblePrediction {
    /// Member probabilities keyed by model name
    pub fn per_model_map(&self) -> BTreeMap<String, f64> {
        self.per_model
            .iter()
            .map(|score| (score.name.clone(), score.probability))
            .collect()
    }
}

/// Distance from the decision boundary, rescaled to [0, 1]
pub fn confidence(fake_probability: f64) -> f64 {
    2.0 * (fake_probability - 0.5).abs()
}

/// Weighted combination of a tree ensemble, a boosted model and a margin model
pub struct EnsembleClassifier {
    members: [Arc<dyn FakeReviewModel>; 3],
    weights: EnsembleWeights,
    input_dim: usize,
}

impl EnsembleClassifier {
    /// Combine three members; all must expect the same input width
    pub fn new(
        tree_ensemble: Arc<dyn FakeReviewModel>,
        boosted_trees: Arc<dyn FakeReviewModel>,
        margin: Arc<dyn FakeReviewModel>,
        weights: EnsembleWeights,
    ) -> Result<Self> {
        weights.validate()?;

        let input_dim = tree_ensemble.input_dim();
        for member in [&boosted_trees, &margin] {
            if member.input_dim() != input_dim {
                return Err(Error::config(format!(
                    "model '{}' expects {} features but '{}' expects {}",
                    member.name(),
                    member.input_dim(),
                    tree_ensemble.name(),
                    input_dim
                )));
            }
        }

        Ok(Self {
            members: [tree_ensemble, boosted_trees, margin],
            weights,
            input_dim,
        })
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn weights(&self) -> &EnsembleWeights {
        &self.weights
    }

    pub fn members(&self) -> &[Arc<dyn FakeReviewModel>] {
        &self.members
    }

    /// Score a feature vector
    ///
    /// The width is checked before any member runs. A member error is
    /// reported as [`Error::ModelScoring`] naming that member.
    pub fn predict(&self, features: &FeatureVector, threshold: f64) -> Result<EnsemblePrediction> {
        self.predict_slice(features.as_slice(), threshold)
    }

    pub fn predict_slice(&self, features: &[f64], threshold: f64) -> Result<EnsemblePrediction> {
        if features.len() != self.input_dim {
            return Err(Error::dimension_mismatch(self.input_dim, features.len()));
        }

        let mut per_model = Vec::with_capacity(self.members.len());
        let mut weighted = 0.0;
        let mut lowest = f64::INFINITY;
        let mut highest = f64::NEG_INFINITY;

        for (slot, member) in ModelKind::ALL.into_iter().zip(&self.members) {
            let probability = score_member(member.as_ref(), features)?;

            weighted += self.weights.get(slot) * probability;
            lowest = lowest.min(probability);
            highest = highest.max(probability);

            per_model.push(MemberScore {
                kind: slot,
                name: member.name().to_string(),
                probability,
            });
        }

        // rounding in the weighted sum must not leave the members' range
        let fake_probability = weighted.clamp(lowest, highest);

        Ok(EnsemblePrediction {
            fake_probability,
            is_fake: fake_probability >= threshold,
            confidence: confidence(fake_probability),
            per_model,
        })
    }
}

fn score_member(member: &dyn FakeReviewModel, features: &[f64]) -> Result<f64> {
    let probability = member.predict_proba(features).map_err(|e| match e {
        Error::ModelScoring { .. } => e,
        other => Error::model_scoring(member.name(), other.to_string()),
    })?;

    if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
        return Err(Error::model_scoring(
            member.name(),
            format!("produced invalid probability {}", probability),
        ));
    }

    Ok(probability)
}
