//! Margin classifier member (support vector machine)
//!
//! The decision function is computed on optionally standardized features and
//! mapped to a probability with Platt scaling: `1 / (1 + exp(a * f + b))`.

use super::{check_input, check_probability, sigmoid, FakeReviewModel};
use reviewguard_core::{Error, ModelKind, Result};
use serde::{Deserialize, Serialize};

/// Per-feature standardization fitted on the training set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn transform(&self, i: usize, x: f64) -> f64 {
        let scale = self.scale[i];
        if scale == 0.0 {
            x - self.mean[i]
        } else {
            (x - self.mean[i]) / scale
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarginKernel {
    /// `f(x) = w . x + intercept`
    Linear { weights: Vec<f64> },
    /// `f(x) = sum_i dual_coef[i] * exp(-gamma * |x - sv_i|^2) + intercept`
    Rbf {
        gamma: f64,
        support_vectors: Vec<Vec<f64>>,
        dual_coef: Vec<f64>,
    },
}

/// Platt sigmoid parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattScaling {
    pub a: f64,
    pub b: f64,
}

impl Default for PlattScaling {
    /// Plain logistic of the decision value
    fn default() -> Self {
        Self { a: -1.0, b: 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginModel {
    input_dim: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scaler: Option<StandardScaler>,
    kernel: MarginKernel,
    #[serde(default)]
    intercept: f64,
    #[serde(default)]
    platt: PlattScaling,
}

impl MarginModel {
    pub fn new(
        input_dim: usize,
        scaler: Option<StandardScaler>,
        kernel: MarginKernel,
        intercept: f64,
        platt: PlattScaling,
    ) -> Result<Self> {
        let model = Self {
            input_dim,
            scaler,
            kernel,
            intercept,
            platt,
        };
        model.validate()?;
        Ok(model)
    }

    /// Linear model without scaling
    pub fn linear(weights: Vec<f64>, intercept: f64, platt: PlattScaling) -> Result<Self> {
        Self::new(
            weights.len(),
            None,
            MarginKernel::Linear { weights },
            intercept,
            platt,
        )
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.input_dim;
        let all_finite = |values: &[f64]| values.iter().all(|v| v.is_finite());

        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != n || scaler.scale.len() != n {
                return Err(Error::config(format!(
                    "margin scaler has {} means and {} scales for {} features",
                    scaler.mean.len(),
                    scaler.scale.len(),
                    n
                )));
            }
            if !all_finite(&scaler.mean) || !all_finite(&scaler.scale) {
                return Err(Error::config("margin scaler has non-finite values"));
            }
        }

        match &self.kernel {
            MarginKernel::Linear { weights } => {
                if weights.len() != n {
                    return Err(Error::config(format!(
                        "margin model has {} weights for {} features",
                        weights.len(),
                        n
                    )));
                }
                if !all_finite(weights) {
                    return Err(Error::config("margin model has non-finite weights"));
                }
            }
            MarginKernel::Rbf {
                gamma,
                support_vectors,
                dual_coef,
            } => {
                if !gamma.is_finite() || *gamma <= 0.0 {
                    return Err(Error::config(format!("invalid RBF gamma {}", gamma)));
                }
                if support_vectors.is_empty() || support_vectors.len() != dual_coef.len() {
                    return Err(Error::config(format!(
                        "margin model has {} support vectors and {} dual coefficients",
                        support_vectors.len(),
                        dual_coef.len()
                    )));
                }
                if let Some(sv) = support_vectors.iter().find(|sv| sv.len() != n) {
                    return Err(Error::config(format!(
                        "support vector has {} features, expected {}",
                        sv.len(),
                        n
                    )));
                }
                if !all_finite(dual_coef) || !support_vectors.iter().all(|sv| all_finite(sv)) {
                    return Err(Error::config("margin model has non-finite support vectors"));
                }
            }
        }

        if !self.intercept.is_finite() || !self.platt.a.is_finite() || !self.platt.b.is_finite() {
            return Err(Error::config("margin model has non-finite calibration"));
        }

        Ok(())
    }

    /// Signed distance from the separating surface
    pub fn decision_function(&self, features: &[f64]) -> Result<f64> {
        check_input(self.input_dim, features)?;

        let x = |i: usize| match &self.scaler {
            Some(scaler) => scaler.transform(i, features[i]),
            None => features[i],
        };

        let value = match &self.kernel {
            MarginKernel::Linear { weights } => weights
                .iter()
                .enumerate()
                .filter(|(_, w)| **w != 0.0)
                .map(|(i, w)| w * x(i))
                .sum::<f64>(),
            MarginKernel::Rbf {
                gamma,
                support_vectors,
                dual_coef,
            } => support_vectors
                .iter()
                .zip(dual_coef)
                .map(|(sv, coef)| {
                    let distance: f64 = sv
                        .iter()
                        .enumerate()
                        .map(|(i, s)| {
                            let d = x(i) - s;
                            d * d
                        })
                        .sum();
                    coef * (-gamma * distance).exp()
                })
                .sum::<f64>(),
        };

        Ok(value + self.intercept)
    }
}

impl FakeReviewModel for MarginModel {
    fn name(&self) -> &str {
        ModelKind::Margin.as_str()
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Margin
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        let f = self.decision_function(features)?;
        // 1 / (1 + exp(a*f + b)) == sigmoid(-(a*f + b))
        check_probability(self.name(), sigmoid(-(self.platt.a * f + self.platt.b)))
    }
}
