//! Binary classification metrics for labeled review sets

use reviewguard_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Confusion counts with "fake" as the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(labels: &[bool], predictions: &[bool]) -> Self {
        let mut cm = Self::default();
        for (&actual, &predicted) in labels.iter().zip(predictions) {
            match (actual, predicted) {
                (true, true) => cm.tp += 1,
                (false, false) => cm.tn += 1,
                (false, true) => cm.fp += 1,
                (true, false) => cm.fn_ += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryMetrics {
    pub confusion_matrix: ConfusionMatrix,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Undefined when only one class is present
    pub roc_auc: Option<f64>,
    pub support: usize,
}

impl BinaryMetrics {
    /// Metrics for probabilities thresholded at `threshold` (inclusive)
    pub fn compute(labels: &[bool], probabilities: &[f64], threshold: f64) -> Result<Self> {
        if labels.len() != probabilities.len() {
            return Err(Error::dimension_mismatch(labels.len(), probabilities.len()));
        }
        if let Some(p) = probabilities.iter().find(|p| !p.is_finite()) {
            return Err(Error::internal(format!("non-finite probability {}", p)));
        }

        let predictions: Vec<bool> = probabilities.iter().map(|p| *p >= threshold).collect();
        let cm = ConfusionMatrix::from_predictions(labels, &predictions);

        let accuracy = ratio(cm.tp + cm.tn, cm.total());
        let precision = ratio(cm.tp, cm.tp + cm.fp);
        let recall = ratio(cm.tp, cm.tp + cm.fn_);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        Ok(Self {
            confusion_matrix: cm,
            accuracy,
            precision,
            recall,
            f1,
            roc_auc: roc_auc(labels, probabilities),
            support: labels.len(),
        })
    }
}

/// Metrics for each member and for the ensemble over one labeled set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub per_model: BTreeMap<String, BinaryMetrics>,
    pub ensemble: BinaryMetrics,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Area under the ROC curve via the rank-sum (Mann-Whitney U) statistic,
/// with tied scores sharing their average rank.
pub fn roc_auc(labels: &[bool], scores: &[f64]) -> Option<f64> {
    let positives = labels.iter().filter(|l| **l).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 || labels.len() != scores.len() {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based; the tie group spans ranks start+1 ..= end
        let average_rank = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            if labels[i] {
                positive_rank_sum += average_rank;
            }
        }
        start = end;
    }

    let p = positives as f64;
    let u = positive_rank_sum - p * (p + 1.0) / 2.0;
    Some(u / (p * negatives as f64))
}
