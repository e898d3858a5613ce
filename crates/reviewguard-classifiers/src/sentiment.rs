//! Lexicon-based sentiment scoring
//!
//! Produces a polarity in [-1, 1] and a subjectivity in [0, 1] for a piece of
//! cleaned (lower-cased) review text. Intensifiers scale the next sentiment
//! word, and a negator within the three preceding tokens flips and dampens it.

use crate::normalizer::word_tokens;
use std::collections::{HashMap, HashSet};

/// (word, polarity, subjectivity)
const LEXICON: &[(&str, f64, f64)] = &[
    // positive
    ("good", 0.7, 0.6),
    ("great", 0.8, 0.75),
    ("excellent", 1.0, 1.0),
    ("amazing", 0.6, 0.9),
    ("awesome", 1.0, 1.0),
    ("fantastic", 0.4, 0.9),
    ("wonderful", 1.0, 1.0),
    ("perfect", 1.0, 1.0),
    ("love", 0.5, 0.6),
    ("loved", 0.7, 0.8),
    ("like", 0.2, 0.4),
    ("best", 1.0, 0.3),
    ("nice", 0.6, 1.0),
    ("happy", 0.8, 1.0),
    ("recommend", 0.4, 0.5),
    ("recommended", 0.4, 0.5),
    ("satisfied", 0.5, 0.7),
    ("pleased", 0.5, 0.7),
    ("sturdy", 0.4, 0.5),
    ("comfortable", 0.4, 0.7),
    ("reliable", 0.5, 0.6),
    ("fast", 0.2, 0.6),
    ("quick", 0.33, 0.5),
    ("easy", 0.43, 0.83),
    ("beautiful", 0.85, 1.0),
    ("solid", 0.3, 0.5),
    ("worth", 0.3, 0.1),
    ("incredible", 0.9, 0.9),
    ("outstanding", 0.5, 0.75),
    ("superb", 1.0, 1.0),
    ("fine", 0.42, 0.5),
    ("decent", 0.17, 0.67),
    ("well", 0.2, 0.3),
    // negative
    ("bad", -0.7, 0.67),
    ("terrible", -1.0, 1.0),
    ("awful", -1.0, 1.0),
    ("horrible", -1.0, 1.0),
    ("worst", -1.0, 1.0),
    ("poor", -0.4, 0.6),
    ("hate", -0.8, 0.9),
    ("hated", -0.9, 0.7),
    ("disappointed", -0.75, 0.75),
    ("disappointing", -0.6, 0.7),
    ("broken", -0.4, 0.4),
    ("broke", -0.4, 0.4),
    ("cheap", 0.4, 0.7),
    ("slow", -0.3, 0.39),
    ("useless", -0.5, 0.2),
    ("waste", -0.2, 0.1),
    ("defective", -0.5, 0.5),
    ("flimsy", -0.4, 0.6),
    ("sad", -0.5, 1.0),
    ("angry", -0.5, 1.0),
    ("dislike", -0.5, 0.6),
    ("annoying", -0.8, 0.9),
    ("returned", -0.1, 0.2),
    ("fake", -0.5, 1.0),
    ("wrong", -0.5, 0.9),
    ("mediocre", -0.3, 0.6),
    ("overpriced", -0.4, 0.6),
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("really", 1.3),
    ("extremely", 1.5),
    ("highly", 1.3),
    ("absolutely", 1.4),
    ("totally", 1.3),
    ("super", 1.3),
    ("so", 1.2),
    ("incredibly", 1.5),
    ("slightly", 0.5),
    ("somewhat", 0.6),
    ("bit", 0.6),
    ("little", 0.7),
];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "without", "hardly", "nothing", "cannot", "neither", "nor",
];

/// How many preceding tokens are searched for a negator
const NEGATION_WINDOW: usize = 3;
const NEGATION_SCALE: f64 = -0.5;

/// Polarity and subjectivity of a text
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sentiment {
    pub polarity: f64,
    pub subjectivity: f64,
}

pub struct SentimentAnalyzer {
    lexicon: HashMap<&'static str, (f64, f64)>,
    intensifiers: HashMap<&'static str, f64>,
    negators: HashSet<&'static str>,
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self {
            lexicon: LEXICON.iter().map(|&(w, p, s)| (w, (p, s))).collect(),
            intensifiers: INTENSIFIERS.iter().copied().collect(),
            negators: NEGATORS.iter().copied().collect(),
        }
    }

    /// Score lower-cased text
    pub fn analyze(&self, cleaned: &str) -> Sentiment {
        let tokens: Vec<&str> = word_tokens(cleaned).collect();

        let mut polarity_sum = 0.0;
        let mut subjectivity_sum = 0.0;
        let mut matched = 0usize;

        for (i, &token) in tokens.iter().enumerate() {
            let Some(&(mut polarity, subjectivity)) = self.lexicon.get(token) else {
                continue;
            };

            if i > 0 {
                if let Some(factor) = self.intensifiers.get(tokens[i - 1]) {
                    polarity *= factor;
                }
            }

            let window_start = i.saturating_sub(NEGATION_WINDOW);
            if tokens[window_start..i].iter().any(|t| self.is_negator(t)) {
                polarity *= NEGATION_SCALE;
            }

            polarity_sum += polarity.clamp(-1.0, 1.0);
            subjectivity_sum += subjectivity;
            matched += 1;
        }

        if matched == 0 {
            return Sentiment::default();
        }

        Sentiment {
            polarity: (polarity_sum / matched as f64).clamp(-1.0, 1.0),
            subjectivity: (subjectivity_sum / matched as f64).clamp(0.0, 1.0),
        }
    }

    fn is_negator(&self, token: &str) -> bool {
        self.negators.contains(token) || token.ends_with("n't")
    }
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
