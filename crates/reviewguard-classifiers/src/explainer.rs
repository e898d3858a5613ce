//! Rule-based explanations
//!
//! Reasons come from a declarative table of rules. Each rule reads the named
//! statistical features (and the member scores) through a [`RuleContext`];
//! rules that fire are reported in descending priority, capped at
//! `max_reasons`.

use crate::features::StatisticalFeatures;
use crate::vector::FeatureVector;
use reviewguard_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const GENUINE_REASON: &str = "Review appears genuine";

/// Tunable rule thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainerThresholds {
    /// Minimum number of spam phrase hits
    pub spam_phrases: f64,
    pub rating_mismatch: f64,
    pub uppercase_ratio: f64,
    /// Below this many letters the uppercase ratio is ignored
    pub uppercase_min_letters: f64,
    pub exclamation_count: f64,
    pub all_caps_words: f64,
    pub low_unique_word_ratio: f64,
    pub low_diversity_min_words: f64,
    pub repeated_run: f64,
    pub short_review_words: f64,
    pub model_disagreement: f64,
}

impl Default for ExplainerThresholds {
    fn default() -> Self {
        Self {
            spam_phrases: 1.0,
            rating_mismatch: 0.5,
            uppercase_ratio: 0.3,
            uppercase_min_letters: 8.0,
            exclamation_count: 3.0,
            all_caps_words: 3.0,
            low_unique_word_ratio: 0.5,
            low_diversity_min_words: 10.0,
            repeated_run: 4.0,
            short_review_words: 5.0,
            model_disagreement: 0.5,
        }
    }
}

/// Everything a rule may look at
pub struct RuleContext<'a> {
    pub features: &'a StatisticalFeatures,
    pub per_model: &'a BTreeMap<String, f64>,
    pub thresholds: &'a ExplainerThresholds,
}

impl RuleContext<'_> {
    /// Approximate number of letters, from word count and mean word length
    fn letters(&self) -> f64 {
        self.features.word_count * self.features.avg_word_length
    }

    fn model_spread(&self) -> f64 {
        let mut values = self.per_model.values().copied();
        let Some(first) = values.next() else {
            return 0.0;
        };
        let (low, high) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        high - low
    }
}

/// One row of the rule table
pub struct ExplanationRule {
    pub id: &'static str,
    pub priority: u8,
    pub message: &'static str,
    pub fires: fn(&RuleContext<'_>) -> bool,
}

fn spam_phrases(ctx: &RuleContext<'_>) -> bool {
    ctx.features.spam_phrase_count >= ctx.thresholds.spam_phrases
}

fn rating_mismatch(ctx: &RuleContext<'_>) -> bool {
    ctx.features.has_rating > 0.0
        && ctx.features.sentiment_rating_mismatch > ctx.thresholds.rating_mismatch
}

fn uppercase(ctx: &RuleContext<'_>) -> bool {
    ctx.letters() >= ctx.thresholds.uppercase_min_letters
        && ctx.features.uppercase_ratio > ctx.thresholds.uppercase_ratio
}

fn exclamation(ctx: &RuleContext<'_>) -> bool {
    ctx.features.exclamation_count > ctx.thresholds.exclamation_count
}

fn contains_url(ctx: &RuleContext<'_>) -> bool {
    ctx.features.has_url > 0.0
}

fn all_caps_words(ctx: &RuleContext<'_>) -> bool {
    ctx.features.all_caps_words > ctx.thresholds.all_caps_words
}

fn low_diversity(ctx: &RuleContext<'_>) -> bool {
    ctx.features.word_count >= ctx.thresholds.low_diversity_min_words
        && ctx.features.unique_word_ratio < ctx.thresholds.low_unique_word_ratio
}

fn repeated_chars(ctx: &RuleContext<'_>) -> bool {
    ctx.features.longest_repeated_run >= ctx.thresholds.repeated_run
}

fn short_review(ctx: &RuleContext<'_>) -> bool {
    ctx.features.word_count > 0.0 && ctx.features.word_count < ctx.thresholds.short_review_words
}

fn model_disagreement(ctx: &RuleContext<'_>) -> bool {
    ctx.model_spread() > ctx.thresholds.model_disagreement
}

/// The rule table, highest priority first
pub static RULES: &[ExplanationRule] = &[
    ExplanationRule {
        id: "spam_phrases",
        priority: 100,
        message: "Contains common spam phrases",
        fires: spam_phrases,
    },
    ExplanationRule {
        id: "rating_mismatch",
        priority: 90,
        message: "Review sentiment does not match given rating",
        fires: rating_mismatch,
    },
    ExplanationRule {
        id: "uppercase",
        priority: 80,
        message: "Excessive use of capital letters",
        fires: uppercase,
    },
    ExplanationRule {
        id: "exclamation",
        priority: 70,
        message: "Excessive exclamation marks",
        fires: exclamation,
    },
    ExplanationRule {
        id: "contains_url",
        priority: 60,
        message: "Contains URLs",
        fires: contains_url,
    },
    ExplanationRule {
        id: "all_caps_words",
        priority: 50,
        message: "Multiple words in ALL CAPS",
        fires: all_caps_words,
    },
    ExplanationRule {
        id: "low_diversity",
        priority: 40,
        message: "Low vocabulary diversity (repetitive text)",
        fires: low_diversity,
    },
    ExplanationRule {
        id: "repeated_chars",
        priority: 30,
        message: "Repeated characters used for emphasis",
        fires: repeated_chars,
    },
    ExplanationRule {
        id: "short_review",
        priority: 20,
        message: "Review is suspiciously short",
        fires: short_review,
    },
    ExplanationRule {
        id: "model_disagreement",
        priority: 10,
        message: "Ensemble models disagree on this review",
        fires: model_disagreement,
    },
];

/// Produces the ordered reason list for a verdict
#[derive(Debug, Clone)]
pub struct Explainer {
    thresholds: ExplainerThresholds,
    max_reasons: usize,
}

impl Explainer {
    pub fn new(thresholds: ExplainerThresholds, max_reasons: usize) -> Self {
        Self {
            thresholds,
            max_reasons,
        }
    }

    pub fn thresholds(&self) -> &ExplainerThresholds {
        &self.thresholds
    }

    /// Rules that fire, highest priority first
    pub fn fired_rules(
        &self,
        features: &StatisticalFeatures,
        per_model: &BTreeMap<String, f64>,
    ) -> Vec<&'static ExplanationRule> {
        let ctx = RuleContext {
            features,
            per_model,
            thresholds: &self.thresholds,
        };

        let mut fired: Vec<&'static ExplanationRule> =
            RULES.iter().filter(|rule| (rule.fires)(&ctx)).collect();
        fired.sort_by(|a, b| b.priority.cmp(&a.priority));
        fired
    }

    /// Explain a verdict
    ///
    /// When no rule fires the single reason depends on which side of the
    /// threshold the probability fell.
    pub fn explain(
        &self,
        features: &FeatureVector,
        per_model: &BTreeMap<String, f64>,
        fake_probability: f64,
        threshold: f64,
    ) -> Result<Vec<String>> {
        let stats = StatisticalFeatures::from_slice(features.statistical())?;
        Ok(self.explain_features(&stats, per_model, fake_probability, threshold))
    }

    pub fn explain_features(
        &self,
        features: &StatisticalFeatures,
        per_model: &BTreeMap<String, f64>,
        fake_probability: f64,
        threshold: f64,
    ) -> Vec<String> {
        let mut reasons: Vec<String> = self
            .fired_rules(features, per_model)
            .into_iter()
            .take(self.max_reasons)
            .map(|rule| rule.message.to_string())
            .collect();

        if reasons.is_empty() {
            reasons.push(if fake_probability < threshold {
                GENUINE_REASON.to_string()
            } else {
                format!(
                    "Statistical pattern matches fake reviews (confidence: {:.0}%)",
                    fake_probability * 100.0
                )
            });
        }

        reasons
    }
}

impl Default for Explainer {
    fn default() -> Self {
        Self::new(ExplainerThresholds::default(), 5)
    }
}
