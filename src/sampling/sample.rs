//! Sample points and the append-only sets that collect them.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{check_dimension, MultifitError, Result};

/// One evaluated point of a sampling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    /// Nonlinear parameters of the point
    pub parameters: Array1<f64>,

    /// Objective value at the point
    pub joint: f64,

    /// Log density of the proposal the point was drawn from
    pub proposal: f64,
}

impl SamplePoint {
    pub fn new(parameters: Array1<f64>, joint: f64, proposal: f64) -> Self {
        Self {
            parameters,
            joint,
            proposal,
        }
    }
}

/// Ordered collection of [`SamplePoint`]s sharing one parameterisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    nonlinear_dim: usize,
    linear_dim: usize,
    ellipse_type: String,
    samples: Vec<SamplePoint>,
}

impl SampleSet {
    /// An empty set for points with `nonlinear_dim` parameters.
    pub fn new(nonlinear_dim: usize, linear_dim: usize, ellipse_type: impl Into<String>) -> Self {
        Self {
            nonlinear_dim,
            linear_dim,
            ellipse_type: ellipse_type.into(),
            samples: Vec::new(),
        }
    }

    pub fn nonlinear_dim(&self) -> usize {
        self.nonlinear_dim
    }

    pub fn linear_dim(&self) -> usize {
        self.linear_dim
    }

    /// Name of the ellipse parameterisation the points use.
    pub fn ellipse_type(&self) -> &str {
        &self.ellipse_type
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SamplePoint> {
        self.samples.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SamplePoint> {
        self.samples.iter()
    }

    pub fn as_slice(&self) -> &[SamplePoint] {
        &self.samples
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        self.samples.reserve(additional);
    }

    /// Append a point; its parameter vector must have `nonlinear_dim`
    /// entries.
    ///
    /// Meant for assembling a set by hand. Sets returned by a sampler are
    /// complete and should be treated as read-only.
    pub fn add(&mut self, point: SamplePoint) -> Result<()> {
        check_dimension(
            "sample parameter vector",
            self.nonlinear_dim,
            point.parameters.len(),
        )?;
        self.samples.push(point);
        Ok(())
    }

    /// Importance log-weights, `-joint - proposal` per point.
    pub fn log_weights(&self) -> Array1<f64> {
        self.samples.iter().map(|p| -p.joint - p.proposal).collect()
    }

    /// Importance weights normalised to sum to one.
    ///
    /// Fails when no point has a finite log-weight, which is the case for
    /// an empty set or a degenerate (zero volume) proposal.
    pub fn weights(&self) -> Result<Array1<f64>> {
        let log_weights = self.log_weights();
        let max = log_weights
            .iter()
            .copied()
            .filter(|w| w.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return Err(MultifitError::InvalidParameter(
                "sample set has no finite importance weights".to_string(),
            ));
        }
        let unnormalised = log_weights.mapv(|w| if w.is_finite() { (w - max).exp() } else { 0.0 });
        let total = unnormalised.sum();
        Ok(unnormalised / total)
    }

    /// Importance-weighted mean of the nonlinear parameters.
    pub fn mean(&self) -> Result<Array1<f64>> {
        let weights = self.weights()?;
        let mut mean = Array1::zeros(self.nonlinear_dim);
        for (point, &w) in self.samples.iter().zip(weights.iter()) {
            mean.scaled_add(w, &point.parameters);
        }
        Ok(mean)
    }

    /// Importance-weighted covariance of the nonlinear parameters.
    pub fn covariance(&self) -> Result<Array2<f64>> {
        let weights = self.weights()?;
        let mean = self.mean()?;
        let n = self.nonlinear_dim;
        let mut cov = Array2::zeros((n, n));
        for (point, &w) in self.samples.iter().zip(weights.iter()) {
            let d = &point.parameters - &mean;
            for i in 0..n {
                for j in 0..n {
                    cov[[i, j]] += w * d[i] * d[j];
                }
            }
        }
        Ok(cov)
    }

    /// Kish effective sample size, `1 / Σ w²` for normalised weights.
    pub fn effective_sample_size(&self) -> Result<f64> {
        let weights = self.weights()?;
        Ok(1.0 / weights.iter().map(|w| w * w).sum::<f64>())
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a SamplePoint;
    type IntoIter = std::slice::Iter<'a, SamplePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
