//! TF-IDF lexical vectorizer
//!
//! Builds a bounded n-gram vocabulary over lemmatized review text and maps
//! each review to an L2-normalized TF-IDF vector. IDF is smoothed as
//! `ln((n + 1) / (df + 1)) + 1`, so terms present in every document keep a
//! weight of one.

use crate::normalizer::TextNormalizer;
use crate::vector::SparseVector;
use reviewguard_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Vocabulary construction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizerParams {
    /// Inclusive (min, max) n-gram lengths
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),

    /// Keep only the most frequent terms across the corpus
    #[serde(default = "default_max_features")]
    pub max_features: Option<usize>,

    /// Drop terms that appear in fewer documents than this
    #[serde(default = "default_min_df")]
    pub min_df: usize,

    /// Use `1 + ln(tf)` instead of raw counts
    #[serde(default)]
    pub sublinear_tf: bool,
}

fn default_ngram_range() -> (usize, usize) {
    (1, 3)
}

fn default_max_features() -> Option<usize> {
    Some(5000)
}

fn default_min_df() -> usize {
    1
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            ngram_range: default_ngram_range(),
            max_features: default_max_features(),
            min_df: default_min_df(),
            sublinear_tf: false,
        }
    }
}

impl VectorizerParams {
    /// Unigrams only, no vocabulary cap
    pub fn unigrams() -> Self {
        Self {
            ngram_range: (1, 1),
            max_features: None,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(Error::config(format!(
                "invalid ngram_range ({}, {})",
                min_n, max_n
            )));
        }
        if self.max_features == Some(0) {
            return Err(Error::config("max_features must be positive"));
        }
        Ok(())
    }
}

/// A fitted TF-IDF vectorizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    params: VectorizerParams,
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
    n_documents: usize,
}

impl TfidfVectorizer {
    /// Fit on raw review texts
    pub fn fit<T: AsRef<str>>(
        normalizer: &TextNormalizer,
        texts: &[T],
        params: VectorizerParams,
    ) -> Result<Self> {
        let documents: Vec<Vec<String>> = texts
            .iter()
            .map(|text| normalizer.normalize(text.as_ref()).lemmas)
            .collect();
        Self::fit_lemmas(&documents, params)
    }

    /// Fit on pre-normalized documents
    pub fn fit_lemmas(documents: &[Vec<String>], params: VectorizerParams) -> Result<Self> {
        params.validate()?;
        debug!(num_texts = documents.len(), "Fitting TfidfVectorizer");

        let mut term_counts: HashMap<String, usize> = HashMap::new();
        let mut document_frequency: HashMap<String, usize> = HashMap::new();

        for lemmas in documents {
            let mut seen = HashSet::new();
            for term in ngrams(lemmas, params.ngram_range) {
                *term_counts.entry(term.clone()).or_insert(0) += 1;
                if seen.insert(term.clone()) {
                    *document_frequency.entry(term).or_insert(0) += 1;
                }
            }
        }

        let mut candidates: Vec<(String, usize)> = term_counts
            .into_iter()
            .filter(|(term, _)| document_frequency.get(term).copied().unwrap_or(0) >= params.min_df)
            .collect();

        if let Some(max_features) = params.max_features {
            if candidates.len() > max_features {
                candidates.sort_by(|(a_term, a_count), (b_term, b_count)| {
                    b_count.cmp(a_count).then_with(|| a_term.cmp(b_term))
                });
                candidates.truncate(max_features);
            }
        }

        let vocabulary: BTreeMap<String, usize> = candidates
            .into_iter()
            .map(|(term, _)| term)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .enumerate()
            .map(|(i, term)| (term, i))
            .collect();

        let n_docs = documents.len() as f64;
        let mut idf = vec![0.0; vocabulary.len()];
        for (term, &i) in &vocabulary {
            let df = document_frequency.get(term).copied().unwrap_or(0) as f64;
            idf[i] = ((n_docs + 1.0) / (df + 1.0)).ln() + 1.0;
        }

        debug!(num_features = vocabulary.len(), "TfidfVectorizer fitted");

        Ok(Self {
            params,
            vocabulary,
            idf,
            n_documents: documents.len(),
        })
    }

    /// Vectorize raw review text; out-of-vocabulary terms are ignored
    pub fn transform(&self, normalizer: &TextNormalizer, text: &str) -> SparseVector {
        self.transform_lemmas(&normalizer.normalize(text).lemmas)
    }

    /// Vectorize a pre-normalized document
    pub fn transform_lemmas(&self, lemmas: &[String]) -> SparseVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in ngrams(lemmas, self.params.ngram_range) {
            if let Some(&i) = self.vocabulary.get(&term) {
                *counts.entry(i).or_insert(0.0) += 1.0;
            }
        }

        let entries = counts
            .into_iter()
            .map(|(i, tf)| {
                let tf = if self.params.sublinear_tf { 1.0 + tf.ln() } else { tf };
                (i, tf * self.idf[i])
            })
            .collect();

        // indices come from the vocabulary, which `validate` keeps in range
        let mut vector = SparseVector::new(self.num_features(), entries)
            .unwrap_or_else(|_| SparseVector::zeros(self.num_features()));
        vector.normalize();
        vector
    }

    pub fn num_features(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn n_documents(&self) -> usize {
        self.n_documents
    }

    pub fn params(&self) -> &VectorizerParams {
        &self.params
    }

    pub fn vocabulary(&self) -> &BTreeMap<String, usize> {
        &self.vocabulary
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&i| self.idf[i])
    }

    /// Terms ordered by feature index
    pub fn feature_names(&self) -> Vec<&str> {
        let mut names = vec![""; self.vocabulary.len()];
        for (term, &i) in &self.vocabulary {
            if let Some(slot) = names.get_mut(i) {
                *slot = term.as_str();
            }
        }
        names
    }

    /// The `n` most distinctive terms (highest IDF), ties broken alphabetically
    pub fn top_features(&self, n: usize) -> Vec<(&str, f64)> {
        let mut terms: Vec<(&str, f64)> = self
            .vocabulary
            .iter()
            .map(|(term, &i)| (term.as_str(), self.idf[i]))
            .collect();
        terms.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        terms.truncate(n);
        terms
    }

    /// Check the internal consistency of a deserialized vectorizer
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;

        let n = self.vocabulary.len();
        if self.idf.len() != n {
            return Err(Error::config(format!(
                "vectorizer has {} idf weights for {} terms",
                self.idf.len(),
                n
            )));
        }

        let mut seen = vec![false; n];
        for (term, &i) in &self.vocabulary {
            if i >= n || std::mem::replace(&mut seen[i], true) {
                return Err(Error::config(format!(
                    "vectorizer term '{}' has invalid index {}",
                    term, i
                )));
            }
        }

        if let Some(weight) = self.idf.iter().find(|w| !w.is_finite() || **w <= 0.0) {
            return Err(Error::config(format!("invalid idf weight {}", weight)));
        }

        Ok(())
    }
}

fn ngrams(lemmas: &[String], (min_n, max_n): (usize, usize)) -> impl Iterator<Item = String> + '_ {
    (min_n..=max_n).flat_map(move |n| lemmas.windows(n).map(|window| window.join(" ")))
}
