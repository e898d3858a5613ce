//! Statistical feature extraction
//!
//! Derives a fixed-order block of numeric signals from a review. The order is
//! part of the model contract: every trained model addresses these values by
//! position, so new signals may only ever be appended together with a new
//! bundle.

use crate::normalizer::{word_tokens, NormalizedText, EMAIL_PATTERN, URL_PATTERN};
use crate::sentiment::SentimentAnalyzer;
use aho_corasick::{AhoCorasick, MatchKind};
use regex::Regex;
use reviewguard_core::{Error, Result};
use std::collections::HashSet;

/// Number of statistical features at the head of every feature vector
pub const STATISTICAL_DIM: usize = 21;

/// Name of each statistical feature, by position
pub const FEATURE_NAMES: [&str; STATISTICAL_DIM] = [
    "char_length",
    "word_count",
    "avg_word_length",
    "sentence_count",
    "punctuation_density",
    "exclamation_count",
    "question_count",
    "uppercase_ratio",
    "digit_count",
    "special_char_count",
    "unique_word_ratio",
    "has_url",
    "has_email",
    "longest_repeated_run",
    "all_caps_words",
    "spam_phrase_count",
    "polarity",
    "subjectivity",
    "rating",
    "has_rating",
    "sentiment_rating_mismatch",
];

/// Positions of the statistical features
pub mod index {
    pub const CHAR_LENGTH: usize = 0;
    pub const WORD_COUNT: usize = 1;
    pub const AVG_WORD_LENGTH: usize = 2;
    pub const SENTENCE_COUNT: usize = 3;
    pub const PUNCTUATION_DENSITY: usize = 4;
    pub const EXCLAMATION_COUNT: usize = 5;
    pub const QUESTION_COUNT: usize = 6;
    pub const UPPERCASE_RATIO: usize = 7;
    pub const DIGIT_COUNT: usize = 8;
    pub const SPECIAL_CHAR_COUNT: usize = 9;
    pub const UNIQUE_WORD_RATIO: usize = 10;
    pub const HAS_URL: usize = 11;
    pub const HAS_EMAIL: usize = 12;
    pub const LONGEST_REPEATED_RUN: usize = 13;
    pub const ALL_CAPS_WORDS: usize = 14;
    pub const SPAM_PHRASE_COUNT: usize = 15;
    pub const POLARITY: usize = 16;
    pub const SUBJECTIVITY: usize = 17;
    pub const RATING: usize = 18;
    pub const HAS_RATING: usize = 19;
    pub const SENTIMENT_RATING_MISMATCH: usize = 20;
}

/// Built-in spam phrase lexicon
pub const DEFAULT_SPAM_PHRASES: &[&str] = &[
    "best ever",
    "best product",
    "amazing product",
    "highly recommend",
    "must buy",
    "buy now",
    "click here",
    "limited time",
    "free shipping",
    "five stars",
    "5 stars",
    "worth every penny",
    "money back",
    "act now",
    "life changing",
    "changed my life",
];

/// Runs shorter than this are not counted as repeated characters
const MIN_REPEATED_RUN: usize = 3;
pub const MAX_RATING: f64 = 5.0;

/// Statistical features of one review
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatisticalFeatures {
    pub char_length: f64,
    pub word_count: f64,
    pub avg_word_length: f64,
    pub sentence_count: f64,
    pub punctuation_density: f64,
    pub exclamation_count: f64,
    pub question_count: f64,
    pub uppercase_ratio: f64,
    pub digit_count: f64,
    pub special_char_count: f64,
    pub unique_word_ratio: f64,
    pub has_url: f64,
    pub has_email: f64,
    pub longest_repeated_run: f64,
    pub all_caps_words: f64,
    pub spam_phrase_count: f64,
    pub polarity: f64,
    pub subjectivity: f64,
    pub rating: f64,
    pub has_rating: f64,
    pub sentiment_rating_mismatch: f64,
}

impl StatisticalFeatures {
    /// Features in model order
    pub fn to_array(&self) -> [f64; STATISTICAL_DIM] {
        [
            self.char_length,
            self.word_count,
            self.avg_word_length,
            self.sentence_count,
            self.punctuation_density,
            self.exclamation_count,
            self.question_count,
            self.uppercase_ratio,
            self.digit_count,
            self.special_char_count,
            self.unique_word_ratio,
            self.has_url,
            self.has_email,
            self.longest_repeated_run,
            self.all_caps_words,
            self.spam_phrase_count,
            self.polarity,
            self.subjectivity,
            self.rating,
            self.has_rating,
            self.sentiment_rating_mismatch,
        ]
    }

    /// Rebuild from the statistical block of a feature vector
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        if values.len() < STATISTICAL_DIM {
            return Err(Error::dimension_mismatch(STATISTICAL_DIM, values.len()));
        }
        let v = values;
        Ok(Self {
            char_length: v[index::CHAR_LENGTH],
            word_count: v[index::WORD_COUNT],
            avg_word_length: v[index::AVG_WORD_LENGTH],
            sentence_count: v[index::SENTENCE_COUNT],
            punctuation_density: v[index::PUNCTUATION_DENSITY],
            exclamation_count: v[index::EXCLAMATION_COUNT],
            question_count: v[index::QUESTION_COUNT],
            uppercase_ratio: v[index::UPPERCASE_RATIO],
            digit_count: v[index::DIGIT_COUNT],
            special_char_count: v[index::SPECIAL_CHAR_COUNT],
            unique_word_ratio: v[index::UNIQUE_WORD_RATIO],
            has_url: v[index::HAS_URL],
            has_email: v[index::HAS_EMAIL],
            longest_repeated_run: v[index::LONGEST_REPEATED_RUN],
            all_caps_words: v[index::ALL_CAPS_WORDS],
            spam_phrase_count: v[index::SPAM_PHRASE_COUNT],
            polarity: v[index::POLARITY],
            subjectivity: v[index::SUBJECTIVITY],
            rating: v[index::RATING],
            has_rating: v[index::HAS_RATING],
            sentiment_rating_mismatch: v[index::SENTIMENT_RATING_MISMATCH],
        })
    }
}

/// Extracts [`StatisticalFeatures`] from raw and normalized review text
pub struct FeatureExtractor {
    spam_matcher: AhoCorasick,
    sentiment: SentimentAnalyzer,
    url_regex: Regex,
    email_regex: Regex,
}

impl FeatureExtractor {
    /// Create an extractor with the built-in spam lexicon
    pub fn new() -> Result<Self> {
        Self::with_spam_phrases(DEFAULT_SPAM_PHRASES)
    }

    /// Create an extractor with a custom spam lexicon
    pub fn with_spam_phrases<P: AsRef<str>>(phrases: &[P]) -> Result<Self> {
        let phrases: Vec<String> = phrases
            .iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        let spam_matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::Standard)
            .build(&phrases)
            .map_err(|e| Error::config(format!("Failed to build spam phrase matcher: {e}")))?;

        Ok(Self {
            spam_matcher,
            sentiment: SentimentAnalyzer::new(),
            url_regex: Regex::new(URL_PATTERN)
                .map_err(|e| Error::internal(format!("Failed to compile URL regex: {}", e)))?,
            email_regex: Regex::new(EMAIL_PATTERN)
                .map_err(|e| Error::internal(format!("Failed to compile email regex: {}", e)))?,
        })
    }

    /// Extract all statistical features
    ///
    /// Character-level signals come from `raw`; word-level signals come from
    /// the word tokens of `normalized.cleaned`, stopwords included.
    pub fn extract(
        &self,
        raw: &str,
        normalized: &NormalizedText,
        rating: Option<f32>,
    ) -> StatisticalFeatures {
        let mut features = StatisticalFeatures::default();

        let mut char_length = 0usize;
        let mut punctuation = 0usize;
        let mut uppercase = 0usize;
        let mut alphabetic = 0usize;

        for c in raw.chars() {
            char_length += 1;
            if c.is_ascii_punctuation() {
                punctuation += 1;
            }
            match c {
                '!' => features.exclamation_count += 1.0,
                '?' => features.question_count += 1.0,
                _ => {}
            }
            if c.is_alphabetic() {
                alphabetic += 1;
                if c.is_uppercase() {
                    uppercase += 1;
                }
            }
            if c.is_numeric() {
                features.digit_count += 1.0;
            }
            if !c.is_alphanumeric() && !c.is_whitespace() && !c.is_ascii_punctuation() {
                features.special_char_count += 1.0;
            }
        }

        features.char_length = char_length as f64;
        features.punctuation_density = ratio(punctuation, char_length);
        features.uppercase_ratio = ratio(uppercase, alphabetic);
        features.sentence_count = sentence_count(raw) as f64;
        features.longest_repeated_run = longest_repeated_run(raw) as f64;
        features.all_caps_words = all_caps_words(raw) as f64;
        features.has_url = flag(self.url_regex.is_match(raw));
        features.has_email = flag(self.email_regex.is_match(raw));

        let words: Vec<&str> = word_tokens(&normalized.cleaned).collect();
        let word_count = words.len();
        let letters: usize = words.iter().map(|w| w.chars().count()).sum();
        let unique: HashSet<&str> = words.iter().copied().collect();

        features.word_count = word_count as f64;
        features.avg_word_length = ratio(letters, word_count);
        features.unique_word_ratio = ratio(unique.len(), word_count);
        features.spam_phrase_count = self.count_spam_phrases(&normalized.cleaned) as f64;

        let sentiment = self.sentiment.analyze(&normalized.cleaned);
        features.polarity = sentiment.polarity;
        features.subjectivity = sentiment.subjectivity;

        if let Some(rating) = rating.filter(|r| r.is_finite()) {
            let rating = (rating as f64).clamp(0.0, MAX_RATING);
            features.rating = rating;
            features.has_rating = 1.0;
            if word_count > 0 {
                features.sentiment_rating_mismatch =
                    sentiment_rating_mismatch(sentiment.polarity, rating);
            }
        }

        features
    }

    /// Count whole-phrase spam lexicon hits
    ///
    /// Hits that overlap are counted once, preferring the leftmost and then
    /// the longest phrase among those that sit on word boundaries.
    pub fn count_spam_phrases(&self, text: &str) -> usize {
        let mut hits: Vec<(usize, usize)> = self
            .spam_matcher
            .find_overlapping_iter(text)
            .filter(|m| is_word_boundary(text, m.start(), m.end()))
            .map(|m| (m.start(), m.end()))
            .collect();
        hits.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut count = 0;
        let mut covered = 0;
        for (start, end) in hits {
            if start >= covered {
                count += 1;
                covered = end;
            }
        }
        count
    }
}

/// Disagreement between text polarity and star rating, in [0, 1]
pub fn sentiment_rating_mismatch(polarity: f64, rating: f64) -> f64 {
    let expected = rating / MAX_RATING * 2.0 - 1.0;
    ((polarity - expected).abs() / 2.0).clamp(0.0, 1.0)
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// Number of `.`/`!`/`?`-terminated segments that contain a word
fn sentence_count(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|segment| segment.chars().any(char::is_alphanumeric))
        .count()
}

fn longest_repeated_run(text: &str) -> usize {
    let mut longest = 0usize;
    let mut current = 0usize;
    let mut previous: Option<char> = None;

    for c in text.chars() {
        if c.is_whitespace() {
            previous = None;
            current = 0;
            continue;
        }
        if previous == Some(c) {
            current += 1;
        } else {
            current = 1;
            previous = Some(c);
        }
        longest = longest.max(current);
    }

    if longest >= MIN_REPEATED_RUN {
        longest
    } else {
        0
    }
}

/// Words of at least two letters written entirely in capitals
fn all_caps_words(text: &str) -> usize {
    text.split_whitespace()
        .filter(|word| {
            let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
            letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase())
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::TextNormalizer;

    fn extract(text: &str, rating: Option<f32>) -> StatisticalFeatures {
        let normalizer = TextNormalizer::new().unwrap();
        let extractor = FeatureExtractor::new().unwrap();
        extractor.extract(text, &normalizer.normalize(text), rating)
    }

    #[test]
    fn test_feature_names_match_indices() {
        assert_eq!(FEATURE_NAMES[index::CHAR_LENGTH], "char_length");
        assert_eq!(FEATURE_NAMES[index::SPAM_PHRASE_COUNT], "spam_phrase_count");
        assert_eq!(
            FEATURE_NAMES[index::SENTIMENT_RATING_MISMATCH],
            "sentiment_rating_mismatch"
        );
    }

    #[test]
    fn test_spammy_review() {
        let features = extract("Amazing product! Highly recommend! Buy now!!!", Some(5.0));

        assert!(features.spam_phrase_count >= 2.0);
        assert_eq!(features.exclamation_count, 5.0);
        assert_eq!(features.sentence_count, 3.0);
        assert_eq!(features.longest_repeated_run, 3.0);
        assert_eq!(features.word_count, 6.0);
        assert!(features.polarity > 0.0);
        assert_eq!(features.has_rating, 1.0);
        assert_eq!(features.rating, 5.0);
    }

    #[test]
    fn test_balanced_review() {
        let features = extract(
            "Shipping was a bit slow but the product works as described.",
            Some(3.0),
        );

        assert_eq!(features.spam_phrase_count, 0.0);
        assert_eq!(features.exclamation_count, 0.0);
        assert!(features.sentiment_rating_mismatch < 0.3);
        assert_eq!(features.sentence_count, 1.0);
        assert_eq!(features.unique_word_ratio, 1.0);
    }

    #[test]
    fn test_empty_text_defaults() {
        let features = extract("", None);
        assert_eq!(features, StatisticalFeatures::default());
        assert!(features.to_array().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_empty_text_with_rating() {
        let features = extract("", Some(1.0));
        assert_eq!(features.has_rating, 1.0);
        assert_eq!(features.sentiment_rating_mismatch, 0.0);
    }

    #[test]
    fn test_rating_is_clamped() {
        assert_eq!(extract("ok", Some(9.0)).rating, 5.0);
        assert_eq!(extract("ok", Some(-2.0)).rating, 0.0);
        assert_eq!(extract("ok", Some(f32::NAN)).has_rating, 0.0);
    }

    #[test]
    fn test_sentiment_rating_mismatch() {
        assert_eq!(sentiment_rating_mismatch(1.0, 0.0), 1.0);
        assert_eq!(sentiment_rating_mismatch(1.0, 5.0), 0.0);
        assert!((sentiment_rating_mismatch(0.0, 5.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_capitals_and_links() {
        let features = extract(
            "BEST DEAL EVER GET IT NOW at https://spam.example.com or mail me@spam.biz",
            None,
        );

        assert_eq!(features.has_url, 1.0);
        assert_eq!(features.has_email, 1.0);
        assert_eq!(features.all_caps_words, 6.0);
        assert!(features.uppercase_ratio > 0.3);
    }

    #[test]
    fn test_spam_phrases_need_word_boundaries() {
        let extractor = FeatureExtractor::new().unwrap();
        assert_eq!(extractor.count_spam_phrases("the best everything"), 0);
        assert_eq!(extractor.count_spam_phrases("best ever, must buy"), 2);
    }

    #[test]
    fn test_custom_spam_lexicon() {
        let extractor = FeatureExtractor::with_spam_phrases(&["Ten Out Of Ten", " "]).unwrap();
        assert_eq!(extractor.count_spam_phrases("honestly ten out of ten"), 1);
        assert_eq!(extractor.count_spam_phrases("best ever"), 0);
    }

    #[test]
    fn test_rejected_hit_does_not_hide_overlapping_phrase() {
        let extractor =
            FeatureExtractor::with_spam_phrases(&["best ever", "everything you need"]).unwrap();
        assert_eq!(extractor.count_spam_phrases("best everything you need"), 1);

        let nested =
            FeatureExtractor::with_spam_phrases(&["highly recommend", "recommend"]).unwrap();
        assert_eq!(nested.count_spam_phrases("I highly recommend it"), 1);
        assert_eq!(nested.count_spam_phrases("recommend, highly recommend"), 2);
    }

    #[test]
    fn test_round_trip_through_slice() {
        let features = extract("Great value, works well!", Some(4.0));
        let rebuilt = StatisticalFeatures::from_slice(&features.to_array()).unwrap();
        assert_eq!(rebuilt, features);
        assert!(StatisticalFeatures::from_slice(&[0.0; 3]).is_err());
    }
}
