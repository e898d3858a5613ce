//! Flat-array decision trees shared by the forest and boosted models

use reviewguard_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// A node in a flattened tree; children are addressed by index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// Branch taken when the feature value is NaN
        #[serde(default = "default_left")]
        default_left: bool,
    },
    Leaf {
        value: f64,
    },
}

fn default_left() -> bool {
    true
}

/// How a split compares a feature against its threshold to go left
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitComparison {
    /// `x <= threshold` goes left
    #[default]
    LessOrEqual,
    /// `x < threshold` goes left
    Less,
}

/// Decision tree stored as a node array rooted at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
    #[serde(default)]
    comparison: SplitComparison,
}

impl DecisionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self {
            nodes,
            comparison: SplitComparison::default(),
        }
    }

    pub fn with_comparison(mut self, comparison: SplitComparison) -> Self {
        self.comparison = comparison;
        self
    }

    /// A tree consisting of a single leaf
    pub fn constant(value: f64) -> Self {
        Self::new(vec![TreeNode::Leaf { value }])
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Leaf values, in node order
    pub fn leaves(&self) -> impl Iterator<Item = f64> + '_ {
        self.nodes.iter().filter_map(|node| match node {
            TreeNode::Leaf { value } => Some(*value),
            TreeNode::Split { .. } => None,
        })
    }

    pub fn depth(&self) -> usize {
        fn depth_of(nodes: &[TreeNode], index: usize) -> usize {
            match nodes.get(index) {
                Some(TreeNode::Split { left, right, .. }) => {
                    1 + depth_of(nodes, *left).max(depth_of(nodes, *right))
                }
                _ => 0,
            }
        }
        depth_of(&self.nodes, 0)
    }

    /// Check structure against the model's input width
    ///
    /// Children must point strictly forward, which also rules out cycles.
    pub fn validate(&self, input_dim: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::config("decision tree has no nodes"));
        }

        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= input_dim {
                        return Err(Error::config(format!(
                            "node {} splits on feature {} but input has {} features",
                            i, feature, input_dim
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(Error::config(format!("node {} has a NaN threshold", i)));
                    }
                    for child in [*left, *right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(Error::config(format!(
                                "node {} has invalid child index {}",
                                i, child
                            )));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(Error::config(format!("leaf {} has non-finite value", i)));
                    }
                }
            }
        }

        Ok(())
    }

    /// Walk from the root to a leaf and return its value
    pub fn evaluate(&self, features: &[f64]) -> Result<f64> {
        let mut index = 0;
        // each step moves strictly forward, so at most `nodes.len()` steps
        for _ in 0..self.nodes.len() {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                }) => {
                    let x = features.get(*feature).copied().ok_or_else(|| {
                        Error::internal(format!("split feature {} out of range", feature))
                    })?;
                    let go_left = if x.is_nan() {
                        *default_left
                    } else {
                        match self.comparison {
                            SplitComparison::LessOrEqual => x <= *threshold,
                            SplitComparison::Less => x < *threshold,
                        }
                    };
                    index = if go_left { *left } else { *right };
                }
                None => break,
            }
        }
        Err(Error::internal(format!(
            "tree walk did not reach a leaf (stopped at node {})",
            index
        )))
    }
}
