//! Bridge from a [`ModelEvaluator`] to the solver's [`Problem`] interface.
//!
//! The solver works on one flat parameter vector, linear parameters first.
//! The adapter splits candidate vectors back into the evaluator's two blocks
//! and only pushes them into the evaluator when they differ from what it
//! already holds, so probing the same point for the model and then the
//! Jacobian costs a single parameter update.

use ndarray::{concatenate, s, Array1, Array2, Axis};

use crate::error::{check_dimension, MultifitError, Result};
use crate::evaluator::ModelEvaluator;
use crate::problem::Problem;

/// Concatenate an evaluator's current parameters, linear block first.
pub fn concatenated_parameters<E: ModelEvaluator + ?Sized>(evaluator: &E) -> Result<Array1<f64>> {
    let linear = evaluator.linear_parameters();
    let nonlinear = evaluator.nonlinear_parameters();
    check_dimension(
        "linear parameter vector",
        evaluator.linear_parameter_size(),
        linear.len(),
    )?;
    check_dimension(
        "nonlinear parameter vector",
        evaluator.nonlinear_parameter_size(),
        nonlinear.len(),
    )?;
    concatenate(Axis(0), &[linear.view(), nonlinear.view()])
        .map_err(|e| MultifitError::DimensionMismatch(e.to_string()))
}

/// Adapts a [`ModelEvaluator`] to [`Problem`], memoising parameter updates.
pub struct EvaluatorProblem<'a, E: ModelEvaluator + ?Sized> {
    evaluator: &'a mut E,
    n_linear: usize,
    n_nonlinear: usize,
    n_pixels: usize,
    parameter_updates: usize,
}

impl<'a, E: ModelEvaluator + ?Sized> EvaluatorProblem<'a, E> {
    /// Wrap an evaluator.
    pub fn new(evaluator: &'a mut E) -> Self {
        let n_linear = evaluator.linear_parameter_size();
        let n_nonlinear = evaluator.nonlinear_parameter_size();
        let n_pixels = evaluator.n_pixels();
        Self {
            evaluator,
            n_linear,
            n_nonlinear,
            n_pixels,
            parameter_updates: 0,
        }
    }

    /// How many times candidate parameters were actually pushed into the
    /// evaluator.
    pub fn parameter_updates(&self) -> usize {
        self.parameter_updates
    }

    /// The wrapped evaluator.
    pub fn evaluator(&self) -> &E {
        self.evaluator
    }

    /// Returns true when `params` differs from the evaluator's current
    /// parameters in any element.
    fn is_dirty(&self, params: &Array1<f64>) -> bool {
        let linear = self.evaluator.linear_parameters();
        let nonlinear = self.evaluator.nonlinear_parameters();
        if linear.len() + nonlinear.len() != params.len() {
            return true;
        }
        params
            .iter()
            .zip(linear.iter().chain(nonlinear.iter()))
            .any(|(new, old)| new != old)
    }

    /// Make the evaluator hold `params`, updating it only when necessary.
    pub fn sync(&mut self, params: &Array1<f64>) -> Result<()> {
        check_dimension("parameter vector", self.n_linear + self.n_nonlinear, params.len())?;
        if !self.is_dirty(params) {
            return Ok(());
        }
        self.evaluator
            .set_linear_parameters(&params.slice(s![..self.n_linear]).to_owned())?;
        self.evaluator
            .set_nonlinear_parameters(&params.slice(s![self.n_linear..]).to_owned())?;
        self.parameter_updates += 1;
        Ok(())
    }
}

impl<'a, E: ModelEvaluator + ?Sized> Problem for EvaluatorProblem<'a, E> {
    fn eval(&mut self, params: &Array1<f64>) -> Result<Array1<f64>> {
        self.sync(params)?;
        let model = self.evaluator.compute_model_image()?;
        check_dimension("model image length", self.n_pixels, model.len())?;
        Ok(model)
    }

    fn parameter_count(&self) -> usize {
        self.n_linear + self.n_nonlinear
    }

    fn residual_count(&self) -> usize {
        self.n_pixels
    }

    fn jacobian(&mut self, params: &Array1<f64>) -> Result<Array2<f64>> {
        self.sync(params)?;
        let linear = self.evaluator.compute_linear_parameter_derivative()?;
        let nonlinear = self.evaluator.compute_nonlinear_parameter_derivative()?;
        check_dimension("linear derivative columns", self.n_linear, linear.ncols())?;
        check_dimension("nonlinear derivative columns", self.n_nonlinear, nonlinear.ncols())?;
        check_dimension("linear derivative rows", self.n_pixels, linear.nrows())?;
        check_dimension("nonlinear derivative rows", self.n_pixels, nonlinear.nrows())?;
        concatenate(Axis(1), &[linear.view(), nonlinear.view()])
            .map_err(|e| MultifitError::DimensionMismatch(e.to_string()))
    }

    fn has_custom_jacobian(&self) -> bool {
        true
    }
}
