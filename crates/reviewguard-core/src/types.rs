//! Core types for ReviewGuard

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A review as supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReview {
    /// The review body
    pub text: String,

    /// Star rating on a 0-5 scale (if available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,

    /// Free-form metadata from the caller (source site, reviewer id, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
}

impl RawReview {
    /// Create a review with text only
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rating: None,
            metadata: None,
        }
    }

    /// Attach a star rating
    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value);
        self
    }
}

/// The three ensemble members
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Bagged decision trees (random forest)
    TreeEnsemble,
    /// Gradient boosted regression trees
    BoostedTrees,
    /// Margin classifier (SVM) with Platt-scaled output
    Margin,
}

impl ModelKind {
    /// All members in canonical scoring order
    pub const ALL: [ModelKind; 3] = [Self::TreeEnsemble, Self::BoostedTrees, Self::Margin];

    /// Stable name used in results and configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TreeEnsemble => "tree_ensemble",
            Self::BoostedTrees => "boosted_trees",
            Self::Margin => "margin",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for a single review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Weighted ensemble estimate that the review is fake (0.0-1.0)
    pub fake_probability: f64,

    /// Whether `fake_probability` reached the decision threshold
    pub is_fake: bool,

    /// Distance from the decision boundary, rescaled to 0.0-1.0
    pub confidence: f64,

    /// Score of each ensemble member, keyed by model name
    pub per_model_probabilities: BTreeMap<String, f64>,

    /// Human-readable reasons, most significant first
    pub reasons: Vec<String>,
}

impl ClassificationResult {
    /// Human label for the verdict
    pub fn label(&self) -> &'static str {
        if self.is_fake {
            "fake"
        } else {
            "genuine"
        }
    }
}

/// Aggregate view over a batch of verdicts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub fake: usize,
    pub genuine: usize,
    pub fake_rate: f64,
    pub mean_confidence: Option<f64>,
    pub min_confidence: Option<f64>,
    pub max_confidence: Option<f64>,
}

impl BatchSummary {
    /// Summarize a batch of results
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ClassificationResult>) -> Self {
        let mut total = 0usize;
        let mut fake = 0usize;
        let mut confidence_sum = 0.0;
        let mut min_confidence: Option<f64> = None;
        let mut max_confidence: Option<f64> = None;

        for result in results {
            total += 1;
            if result.is_fake {
                fake += 1;
            }
            confidence_sum += result.confidence;
            let confidence = result.confidence;
            min_confidence = Some(min_confidence.map_or(confidence, |m| m.min(confidence)));
            max_confidence = Some(max_confidence.map_or(confidence, |m| m.max(confidence)));
        }

        let (fake_rate, mean_confidence) = if total == 0 {
            (0.0, None)
        } else {
            (fake as f64 / total as f64, Some(confidence_sum / total as f64))
        };

        Self {
            total,
            fake,
            genuine: total - fake,
            fake_rate,
            mean_confidence,
            min_confidence,
            max_confidence,
        }
    }
}
