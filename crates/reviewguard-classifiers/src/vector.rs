//! Sparse and assembled feature vectors

use crate::features::{StatisticalFeatures, STATISTICAL_DIM};
use reviewguard_core::{Error, Result};

/// Sparse vector with sorted, unique indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    dim: usize,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseVector {
    /// Build from (index, value) entries
    ///
    /// Entries are sorted, duplicate indices are summed and zeros dropped.
    pub fn new(dim: usize, mut entries: Vec<(usize, f64)>) -> Result<Self> {
        entries.sort_by_key(|(i, _)| *i);

        let mut indices = Vec::with_capacity(entries.len());
        let mut values: Vec<f64> = Vec::with_capacity(entries.len());

        for (i, v) in entries {
            if i >= dim {
                return Err(Error::internal(format!(
                    "sparse index {} out of range for dimension {}",
                    i, dim
                )));
            }
            if indices.last() == Some(&i) {
                if let Some(last) = values.last_mut() {
                    *last += v;
                }
            } else {
                indices.push(i);
                values.push(v);
            }
        }

        let (indices, values) = indices
            .into_iter()
            .zip(values)
            .filter(|(_, v)| *v != 0.0)
            .unzip();

        Ok(Self {
            dim,
            indices,
            values,
        })
    }

    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored non-zero entries
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Scale in place to unit L2 norm; zero vectors are left alone
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for v in &mut self.values {
                *v /= norm;
            }
        }
    }

    /// Dot product by merging the sorted index lists
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut a, mut b) = (0, 0);
        let mut sum = 0.0;
        while a < self.indices.len() && b < other.indices.len() {
            match self.indices[a].cmp(&other.indices[b]) {
                std::cmp::Ordering::Less => a += 1,
                std::cmp::Ordering::Greater => b += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[a] * other.values[b];
                    a += 1;
                    b += 1;
                }
            }
        }
        sum
    }

    /// Cosine similarity in [0, 1] for non-negative vectors; 0 when either is empty
    pub fn cosine_similarity(&self, other: &SparseVector) -> f64 {
        let denominator = self.norm() * other.norm();
        if denominator == 0.0 {
            return 0.0;
        }
        (self.dot(other) / denominator).min(1.0)
    }

    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.dim];
        self.write_dense(&mut dense);
        dense
    }

    /// Scatter into a zeroed dense slice of length `dim`
    pub fn write_dense(&self, out: &mut [f64]) {
        for (i, v) in self.iter() {
            if let Some(slot) = out.get_mut(i) {
                *slot = v;
            }
        }
    }
}

/// Widths of the three blocks of a feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureLayout {
    pub statistical: usize,
    pub lexical: usize,
    pub embedding: usize,
}

impl FeatureLayout {
    pub fn new(lexical: usize, embedding: usize) -> Self {
        Self {
            statistical: STATISTICAL_DIM,
            lexical,
            embedding,
        }
    }

    pub fn total(&self) -> usize {
        self.statistical + self.lexical + self.embedding
    }
}

/// Dense model input: statistical ++ TF-IDF ++ optional embedding
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
    layout: FeatureLayout,
}

impl FeatureVector {
    /// Concatenate the blocks in model order
    pub fn assemble(
        statistical: &StatisticalFeatures,
        lexical: &SparseVector,
        embedding: Option<&[f32]>,
    ) -> Self {
        let layout = FeatureLayout::new(lexical.dim(), embedding.map_or(0, <[f32]>::len));
        let mut values = vec![0.0; layout.total()];

        values[..STATISTICAL_DIM].copy_from_slice(&statistical.to_array());
        lexical.write_dense(&mut values[STATISTICAL_DIM..STATISTICAL_DIM + layout.lexical]);
        if let Some(embedding) = embedding {
            for (slot, v) in values[STATISTICAL_DIM + layout.lexical..]
                .iter_mut()
                .zip(embedding)
            {
                *slot = f64::from(*v);
            }
        }

        Self { values, layout }
    }

    /// Wrap precomputed values; everything after the statistical block is
    /// treated as lexical.
    pub fn from_values(values: Vec<f64>) -> Result<Self> {
        if values.len() < STATISTICAL_DIM {
            return Err(Error::dimension_mismatch(STATISTICAL_DIM, values.len()));
        }
        let layout = FeatureLayout::new(values.len() - STATISTICAL_DIM, 0);
        Ok(Self { values, layout })
    }

    pub fn layout(&self) -> FeatureLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn statistical(&self) -> &[f64] {
        &self.values[..self.layout.statistical]
    }

    pub fn lexical(&self) -> &[f64] {
        let start = self.layout.statistical;
        &self.values[start..start + self.layout.lexical]
    }
}
