//! Read-only interpretation of a fitted parameter distribution.
//!
//! A [`SimpleInterpreter`] pairs a model layout with a Gaussian summary of
//! its parameters (mean `mu`, covariance `sigma`) and exposes the linear and
//! nonlinear blocks separately.

use ndarray::{s, Array1, Array2};

use crate::error::{MultifitError, Result};
use crate::evaluator::ModelDefinition;

/// Mean and covariance of a fitted parameter vector, split by block.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleInterpreter {
    model: ModelDefinition,
    mu: Array1<f64>,
    sigma: Array2<f64>,
}

impl SimpleInterpreter {
    /// Wrap a distribution, checking it matches the model's parameter count.
    pub fn new(model: ModelDefinition, mu: Array1<f64>, sigma: Array2<f64>) -> Result<Self> {
        let expected = model.parameter_size();
        if mu.len() != expected {
            return Err(size_mismatch(expected, mu.len()));
        }
        if sigma.nrows() != expected || sigma.ncols() != expected {
            return Err(size_mismatch(expected, sigma.nrows().max(sigma.ncols())));
        }
        Ok(Self { model, mu, sigma })
    }

    pub fn model(&self) -> &ModelDefinition {
        &self.model
    }

    pub fn mu(&self) -> &Array1<f64> {
        &self.mu
    }

    pub fn sigma(&self) -> &Array2<f64> {
        &self.sigma
    }

    /// Mean of the linear block.
    pub fn linear_mu(&self) -> Array1<f64> {
        self.mu.slice(s![..self.n_linear()]).to_owned()
    }

    /// Mean of the nonlinear block.
    pub fn nonlinear_mu(&self) -> Array1<f64> {
        self.mu.slice(s![self.n_linear()..]).to_owned()
    }

    /// Covariance of the linear block.
    pub fn linear_sigma(&self) -> Array2<f64> {
        let n = self.n_linear();
        self.sigma.slice(s![..n, ..n]).to_owned()
    }

    /// Covariance of the nonlinear block.
    pub fn nonlinear_sigma(&self) -> Array2<f64> {
        let n = self.n_linear();
        self.sigma.slice(s![n.., n..]).to_owned()
    }

    /// Total flux: the linear parameters weighted by `integration`, the
    /// integral of each linear basis component.
    pub fn flux(&self, integration: &Array1<f64>) -> Result<f64> {
        self.check_integration(integration)?;
        Ok(integration.dot(&self.linear_mu()))
    }

    /// Variance of [`flux`](Self::flux).
    pub fn flux_variance(&self, integration: &Array1<f64>) -> Result<f64> {
        self.check_integration(integration)?;
        Ok(integration.dot(&self.linear_sigma().dot(integration)))
    }

    fn n_linear(&self) -> usize {
        self.model.linear_parameter_size
    }

    fn check_integration(&self, integration: &Array1<f64>) -> Result<()> {
        if integration.len() != self.n_linear() {
            return Err(MultifitError::DimensionMismatch(format!(
                "integration vector has {} entries but the model has {} linear parameters",
                integration.len(),
                self.n_linear()
            )));
        }
        Ok(())
    }
}

fn size_mismatch(expected: usize, actual: usize) -> MultifitError {
    MultifitError::InvalidParameter(format!(
        "Grid parameter size ({}) does not match distribution size ({}).",
        expected, actual
    ))
}
