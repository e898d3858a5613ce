//! Near-duplicate detection over lexical vectors
//!
//! Templated or copy-pasted reviews from the same spam ring end up with almost
//! identical TF-IDF vectors. Detection is a plain pairwise cosine scan, which
//! is fine for per-product batches of tens to a few hundred reviews.

use crate::normalizer::TextNormalizer;
use crate::vector::SparseVector;
use crate::vectorizer::{TfidfVectorizer, VectorizerParams};
use reviewguard_core::{Error, Result};
use std::collections::{BTreeSet, HashSet};
use std::hash::Hash;
use tracing::debug;

pub const DEFAULT_THRESHOLD: f64 = 0.85;

/// Absorbs rounding so identical vectors still reach a threshold of 1.0
const SIMILARITY_EPSILON: f64 = 1e-9;

/// One flagged pair
#[derive(Debug, Clone, PartialEq)]
pub struct NearDuplicate<I> {
    pub first: I,
    pub second: I,
    pub similarity: f64,
}

/// Pairwise cosine near-duplicate detector
#[derive(Debug, Clone, Copy)]
pub struct DuplicateDetector {
    threshold: f64,
}

impl DuplicateDetector {
    pub fn new(threshold: f64) -> Result<Self> {
        validate_threshold(threshold)?;
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Every pair at or above the threshold, with its similarity, in input order
    pub fn scored_pairs<I: Clone>(&self, vectors: &[(I, SparseVector)]) -> Vec<NearDuplicate<I>> {
        let mut pairs = Vec::new();
        for (a, (first, va)) in vectors.iter().enumerate() {
            for (second, vb) in &vectors[a + 1..] {
                let similarity = va.cosine_similarity(vb);
                if similarity + SIMILARITY_EPSILON >= self.threshold {
                    pairs.push(NearDuplicate {
                        first: first.clone(),
                        second: second.clone(),
                        similarity,
                    });
                }
            }
        }

        if !pairs.is_empty() {
            metrics::counter!("reviewguard_near_duplicates_total").increment(pairs.len() as u64);
        }
        debug!(
            batch_size = vectors.len(),
            pairs = pairs.len(),
            "Near-duplicate scan complete"
        );

        pairs
    }

    /// Flagged pairs as an unordered set: each pair is stored as `(min, max)`
    /// so `(a, b)` and `(b, a)` collapse into one entry.
    pub fn find_near_duplicates<I: Clone + Ord>(
        &self,
        vectors: &[(I, SparseVector)],
    ) -> BTreeSet<(I, I)> {
        self.scored_pairs(vectors)
            .into_iter()
            .filter(|pair| pair.first != pair.second)
            .map(|pair| {
                if pair.first <= pair.second {
                    (pair.first, pair.second)
                } else {
                    (pair.second, pair.first)
                }
            })
            .collect()
    }

    /// Fit a batch-local unigram vectorizer and scan raw texts
    pub fn scan_texts<I: Clone + Ord>(
        &self,
        normalizer: &TextNormalizer,
        texts: &[(I, &str)],
    ) -> Result<BTreeSet<(I, I)>> {
        let documents: Vec<Vec<String>> = texts
            .iter()
            .map(|(_, text)| normalizer.normalize(text).lemmas)
            .collect();
        let vectorizer = TfidfVectorizer::fit_lemmas(&documents, VectorizerParams::unigrams())?;

        let vectors: Vec<(I, SparseVector)> = texts
            .iter()
            .zip(&documents)
            .map(|((id, _), lemmas)| (id.clone(), vectorizer.transform_lemmas(lemmas)))
            .collect();

        Ok(self.find_near_duplicates(&vectors))
    }
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Pairwise scan with an explicit threshold
pub fn find_near_duplicates<I: Clone + Ord>(
    vectors: &[(I, SparseVector)],
    threshold: f64,
) -> Result<BTreeSet<(I, I)>> {
    Ok(DuplicateDetector::new(threshold)?.find_near_duplicates(vectors))
}

/// Ids to drop so that one review of every duplicate group survives
///
/// `order` is the original review order; within each flagged pair the review
/// that appears first is kept.
pub fn duplicate_ids<I: Clone + Ord + Hash>(order: &[I], pairs: &BTreeSet<(I, I)>) -> HashSet<I> {
    let position = |id: &I| order.iter().position(|o| o == id).unwrap_or(usize::MAX);

    pairs
        .iter()
        .map(|(a, b)| if position(a) <= position(b) { b.clone() } else { a.clone() })
        .collect()
}

fn validate_threshold(threshold: f64) -> Result<()> {
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(Error::config(format!(
            "duplicate similarity threshold must be in (0, 1], got {}",
            threshold
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_texts_are_flagged() {
        let normalizer = TextNormalizer::new().unwrap();
        let detector = DuplicateDetector::default();
        let texts = [
            (1u32, "Best purchase ever, fast delivery and great quality"),
            (2, "The strap broke after a week of light use"),
            (3, "Best purchase ever, fast delivery and great quality"),
        ];

        let pairs = detector.scan_texts(&normalizer, &texts).unwrap();
        assert_eq!(pairs.into_iter().collect::<Vec<_>>(), vec![(1, 3)]);
    }

    #[test]
    fn test_disjoint_vocabulary_yields_nothing() {
        let normalizer = TextNormalizer::new().unwrap();
        let detector = DuplicateDetector::default();
        let texts = [
            ("a", "Sturdy zipper, roomy pockets"),
            ("b", "Battery drains overnight"),
            ("c", "Colour faded quickly"),
        ];

        assert!(detector.scan_texts(&normalizer, &texts).unwrap().is_empty());
    }

    #[test]
    fn test_pairs_are_symmetric() {
        let v = SparseVector::new(3, vec![(0, 1.0), (1, 1.0)]).unwrap();
        let vectors = vec![("z", v.clone()), ("a", v)];

        let pairs = find_near_duplicates(&vectors, 0.85).unwrap();
        assert_eq!(pairs.len(), 1);
        assert!(pairs.contains(&("a", "z")));
    }

    #[test]
    fn test_threshold_of_one_accepts_exact_copies() {
        let v = SparseVector::new(4, vec![(0, 0.3), (1, 0.7), (3, 0.1)]).unwrap();
        let vectors = vec![(1, v.clone()), (2, v)];
        assert_eq!(find_near_duplicates(&vectors, 1.0).unwrap().len(), 1);
    }

    #[test]
    fn test_scored_pairs_report_similarity() {
        let a = SparseVector::new(2, vec![(0, 1.0)]).unwrap();
        let b = SparseVector::new(2, vec![(0, 1.0), (1, 0.2)]).unwrap();
        let detector = DuplicateDetector::new(0.9).unwrap();

        let pairs = detector.scored_pairs(&[(0, a), (1, b)]);
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].similarity > 0.97 && pairs[0].similarity < 1.0);
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(DuplicateDetector::new(0.0).is_err());
        assert!(DuplicateDetector::new(1.5).is_err());
        assert!(DuplicateDetector::new(f64::NAN).is_err());
    }

    #[test]
    fn test_duplicate_ids_keep_first_occurrence() {
        let order = vec![10, 20, 30, 40];
        let pairs: BTreeSet<(i32, i32)> = [(10, 30), (20, 40), (30, 40)].into_iter().collect();

        let drop = duplicate_ids(&order, &pairs);
        assert_eq!(drop, [30, 40].into_iter().collect());
    }
}
