//! Review text normalization
//!
//! Turns raw review text into the lower-cased, markup-free form used by the
//! lexical path, plus its stopword-filtered tokens and their lemmas.
//!
//! Character-level signals (capitalization, `!`, `?`) are read from the raw
//! text by the statistical extractor, so normalization only has to keep the
//! punctuation in `cleaned` and may freely fold case.

use crate::lemma::Lemmatizer;
use regex::Regex;
use reviewguard_core::{Error, Result};
use std::collections::HashSet;

pub(crate) const URL_PATTERN: &str = r"(?i)\b(?:https?|ftp)://\S+|\bwww\.\S+";
pub(crate) const EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b";
const HTML_PATTERN: &str = r"<[^>]*>";

/// Emoji that carry sentiment are spelled out before other symbols are dropped
const EMOJI_WORDS: &[(&str, &str)] = &[
    ("\u{2764}\u{fe0f}", " love "),
    ("\u{2764}", " love "),
    ("\u{1f44d}", " like "),
    ("\u{1f44e}", " dislike "),
    ("\u{1f60a}", " happy "),
    ("\u{1f622}", " sad "),
];

/// English stopwords, minus the sentiment-bearing words
/// (not, no, very, too, most, best, worst) and negated contractions.
const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his",
    "himself", "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself",
    "they", "them", "their", "theirs", "themselves", "what", "which", "who", "whom", "this",
    "that", "that'll", "these", "those", "am", "is", "are", "was", "were", "be", "been",
    "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an", "the",
    "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by", "for",
    "with", "about", "against", "between", "into", "through", "during", "before", "after",
    "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over", "under",
    "again", "further", "then", "once", "here", "there", "when", "where", "why", "how", "all",
    "any", "both", "each", "few", "more", "other", "some", "such", "nor", "only", "own",
    "same", "so", "than", "s", "t", "can", "will", "just", "don", "should", "should've",
    "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "couldn", "didn", "doesn",
    "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn", "needn", "shan", "shouldn",
    "wasn", "weren", "won", "wouldn",
];

/// Normalized view of one review's text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedText {
    /// Lower-cased text with URLs, emails, HTML and decorative symbols removed
    pub cleaned: String,

    /// Word tokens of `cleaned` with stopwords removed
    pub tokens: Vec<String>,

    /// Lemmas of `tokens`, position for position
    pub lemmas: Vec<String>,
}

impl NormalizedText {
    pub fn is_empty(&self) -> bool {
        self.cleaned.is_empty()
    }
}

/// Splits text into word tokens: runs of alphanumerics, keeping inner apostrophes.
pub fn word_tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|token| token.trim_matches('\''))
        .filter(|token| !token.is_empty())
}

/// Text normalizer shared by feature extraction and vectorization
pub struct TextNormalizer {
    url_regex: Regex,
    email_regex: Regex,
    html_regex: Regex,
    stopwords: HashSet<&'static str>,
    lemmatizer: Lemmatizer,
}

impl TextNormalizer {
    /// Create a new normalizer
    pub fn new() -> Result<Self> {
        Ok(Self {
            url_regex: Regex::new(URL_PATTERN)
                .map_err(|e| Error::internal(format!("Failed to compile URL regex: {}", e)))?,
            email_regex: Regex::new(EMAIL_PATTERN)
                .map_err(|e| Error::internal(format!("Failed to compile email regex: {}", e)))?,
            html_regex: Regex::new(HTML_PATTERN)
                .map_err(|e| Error::internal(format!("Failed to compile HTML regex: {}", e)))?,
            stopwords: STOPWORDS.iter().copied().collect(),
            lemmatizer: Lemmatizer::new(),
        })
    }

    /// Normalize raw review text
    pub fn normalize(&self, raw: &str) -> NormalizedText {
        let cleaned = self.clean(raw);

        let tokens: Vec<String> = word_tokens(&cleaned)
            .filter(|token| !self.is_stopword(token))
            .map(str::to_string)
            .collect();

        let lemmas = tokens
            .iter()
            .map(|token| self.lemmatizer.lemmatize(token))
            .collect();

        NormalizedText {
            cleaned,
            tokens,
            lemmas,
        }
    }

    /// Normalize review text supplied as bytes
    ///
    /// Fails with [`Error::Encoding`] when the bytes are not valid UTF-8.
    pub fn normalize_bytes(&self, raw: &[u8]) -> Result<NormalizedText> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| Error::encoding(e.valid_up_to(), e.to_string()))?;
        Ok(self.normalize(text))
    }

    /// Strip markup and decorative symbols, fold case and collapse whitespace
    pub fn clean(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }

        let text = self.html_regex.replace_all(raw, " ");
        let text = self.url_regex.replace_all(&text, " ");
        let text = self.email_regex.replace_all(&text, " ");

        let mut text = text.into_owned();
        for (emoji, word) in EMOJI_WORDS {
            if text.contains(emoji) {
                text = text.replace(emoji, word);
            }
        }

        let text: String = text
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || (c.is_ascii() && !c.is_ascii_control()) {
                    c
                } else {
                    ' '
                }
            })
            .collect();

        text.to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let normalizer = TextNormalizer::new().unwrap();
        let normalized = normalizer.normalize("");

        assert!(normalized.is_empty());
        assert!(normalized.tokens.is_empty());
        assert!(normalized.lemmas.is_empty());
    }

    #[test]
    fn test_strips_urls_emails_and_html() {
        let normalizer = TextNormalizer::new().unwrap();
        let normalized = normalizer.normalize(
            "<b>Great</b> deal at https://shop.example.com/x?id=1 or www.deals.biz, mail bob@example.com!",
        );

        assert_eq!(normalized.cleaned, "great deal at or , mail !");
        assert!(!normalized.tokens.iter().any(|t| t.contains("example")));
    }

    #[test]
    fn test_keeps_punctuation_in_cleaned_text() {
        let normalizer = TextNormalizer::new().unwrap();
        let normalized = normalizer.normalize("WOW!!! Is it real?");

        assert_eq!(normalized.cleaned, "wow!!! is it real?");
        assert_eq!(normalized.tokens, vec!["wow", "real"]);
    }

    #[test]
    fn test_emoji_handling() {
        let normalizer = TextNormalizer::new().unwrap();
        let normalized = normalizer.normalize("Works \u{1f44d} \u{2728}\u{2728} caf\u{e9}");

        assert_eq!(normalized.cleaned, "works like caf\u{e9}");
        assert_eq!(normalized.lemmas, vec!["work", "like", "caf\u{e9}"]);
    }

    #[test]
    fn test_stopwords_keep_sentiment_words() {
        let normalizer = TextNormalizer::new().unwrap();
        let normalized = normalizer.normalize("This is not the best of the products");

        assert_eq!(normalized.tokens, vec!["not", "best", "products"]);
        assert_eq!(normalized.lemmas, vec!["not", "best", "product"]);
    }

    #[test]
    fn test_invalid_utf8_is_an_encoding_error() {
        let normalizer = TextNormalizer::new().unwrap();
        let bytes = [b'o', b'k', 0xff, 0xfe];

        match normalizer.normalize_bytes(&bytes) {
            Err(Error::Encoding { offset, .. }) => assert_eq!(offset, 2),
            other => panic!("expected encoding error, got {:?}", other),
        }

        assert!(normalizer.normalize_bytes("fine".as_bytes()).is_ok());
    }

    #[test]
    fn test_word_tokens_apostrophes() {
        let tokens: Vec<_> = word_tokens("it's 'quoted' don't-stop").collect();
        assert_eq!(tokens, vec!["it's", "quoted", "don't", "stop"]);
    }
}
