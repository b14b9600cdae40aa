//! Problem definition trait for the Levenberg-Marquardt solver.
//!
//! A [`Problem`] maps a flat parameter vector onto a model prediction
//! `hx = f(p)`. The solver fits that prediction to a fixed target vector
//! `x`, minimising `||x - f(p)||²`.

use ndarray::{Array1, Array2};

use crate::error::Result;

/// A nonlinear least squares problem expressed as a model prediction.
///
/// Methods take `&mut self` because implementations are usually thin
/// adapters that push candidate parameters into a stateful model before
/// evaluating it.
pub trait Problem {
    /// Evaluate the model prediction at the given parameters.
    ///
    /// # Arguments
    ///
    /// * `params` - The parameter values at which to evaluate the model
    ///
    /// # Returns
    ///
    /// * A vector with one entry per observation, or an error if evaluation fails
    fn eval(&mut self, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Get the number of parameters in the problem.
    fn parameter_count(&self) -> usize;

    /// Get the number of observations (rows of the Jacobian).
    fn residual_count(&self) -> usize;

    /// Evaluate the Jacobian of the model prediction at the given parameters.
    ///
    /// Row `i`, column `j` holds `∂f_i/∂p_j`. The default implementation uses
    /// forward finite differences.
    fn jacobian(&mut self, params: &Array1<f64>) -> Result<Array2<f64>>
    where
        Self: Sized,
    {
        crate::utils::finite_difference::jacobian(self, params, None)
    }

    /// Check if this problem provides an analytic Jacobian.
    fn has_custom_jacobian(&self) -> bool {
        false
    }

    /// Evaluate the sum of squared residuals against `target`.
    fn eval_cost(&mut self, params: &Array1<f64>, target: &Array1<f64>) -> Result<f64> {
        let model = self.eval(params)?;
        Ok(target
            .iter()
            .zip(model.iter())
            .map(|(x, hx)| (x - hx).powi(2))
            .sum())
    }
}
