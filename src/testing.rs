//! Synthetic evaluators shared by unit tests.

use std::cell::Cell;

use ndarray::{Array1, Array2};

use crate::error::Result;
use crate::evaluator::{ModelDefinition, ModelEvaluator};

/// Circular Gaussian source plus flat background on a square pixel grid.
///
/// Model image and derivatives are multiplied by per-pixel `weights`
/// (all ones unless a test masks pixels).
///
/// Linear parameters: `[flux, background]`.
/// Nonlinear parameters: `[x0, y0, sigma]`.
pub struct GaussianEvaluator {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    pub data: Array1<f64>,
    pub weights: Array1<f64>,
    pub linear: Array1<f64>,
    pub nonlinear: Array1<f64>,
    pub set_calls: usize,
    pub model_calls: Cell<usize>,
    pub corrupt_derivatives: bool,
}

impl GaussianEvaluator {
    /// Pixels on a `size × size` grid, data rendered from `truth`
    /// (`[flux, background, x0, y0, sigma]`), starting from `start`.
    pub fn new(size: usize, truth: [f64; 5], start: [f64; 5]) -> Self {
        let n = size * size;
        let x = Array1::from_shape_fn(n, |i| (i % size) as f64);
        let y = Array1::from_shape_fn(n, |i| (i / size) as f64);
        let mut evaluator = Self {
            x,
            y,
            data: Array1::zeros(n),
            weights: Array1::ones(n),
            linear: Array1::from(vec![truth[0], truth[1]]),
            nonlinear: Array1::from(vec![truth[2], truth[3], truth[4]]),
            set_calls: 0,
            model_calls: Cell::new(0),
            corrupt_derivatives: false,
        };
        evaluator.data = evaluator.render();
        evaluator.linear = Array1::from(vec![start[0], start[1]]);
        evaluator.nonlinear = Array1::from(vec![start[2], start[3], start[4]]);
        evaluator
    }

    fn profile(&self) -> Array1<f64> {
        let (x0, y0, sigma) = (self.nonlinear[0], self.nonlinear[1], self.nonlinear[2]);
        Array1::from_shape_fn(self.x.len(), |i| {
            let r2 = (self.x[i] - x0).powi(2) + (self.y[i] - y0).powi(2);
            (-r2 / (2.0 * sigma * sigma)).exp()
        })
    }

    fn render(&self) -> Array1<f64> {
        self.profile().mapv(|g| self.linear[0] * g + self.linear[1]) * &self.weights
    }

    fn weight_rows(&self, d: &mut Array2<f64>) {
        for (mut row, &w) in d.rows_mut().into_iter().zip(self.weights.iter()) {
            row *= w;
        }
    }
}

impl ModelEvaluator for GaussianEvaluator {
    fn model(&self) -> ModelDefinition {
        ModelDefinition::new("GaussianPlusBackground", 2, 3)
    }

    fn linear_parameter_size(&self) -> usize {
        2
    }

    fn nonlinear_parameter_size(&self) -> usize {
        3
    }

    fn linear_parameters(&self) -> Array1<f64> {
        self.linear.clone()
    }

    fn nonlinear_parameters(&self) -> Array1<f64> {
        self.nonlinear.clone()
    }

    fn set_linear_parameters(&mut self, params: &Array1<f64>) -> Result<()> {
        self.set_calls += 1;
        self.linear.assign(params);
        Ok(())
    }

    fn set_nonlinear_parameters(&mut self, params: &Array1<f64>) -> Result<()> {
        self.set_calls += 1;
        self.nonlinear.assign(params);
        Ok(())
    }

    fn weighted_data(&self) -> Array1<f64> {
        self.data.clone()
    }

    fn n_pixels(&self) -> usize {
        self.x.len()
    }

    fn compute_model_image(&self) -> Result<Array1<f64>> {
        self.model_calls.set(self.model_calls.get() + 1);
        Ok(self.render())
    }

    fn compute_linear_parameter_derivative(&self) -> Result<Array2<f64>> {
        let g = self.profile();
        let mut d = Array2::zeros((g.len(), 2));
        for (i, &gi) in g.iter().enumerate() {
            d[[i, 0]] = gi;
            d[[i, 1]] = 1.0;
        }
        self.weight_rows(&mut d);
        Ok(d)
    }

    fn compute_nonlinear_parameter_derivative(&self) -> Result<Array2<f64>> {
        let (x0, y0, sigma) = (self.nonlinear[0], self.nonlinear[1], self.nonlinear[2]);
        let flux = self.linear[0];
        let g = self.profile();
        let s2 = sigma * sigma;
        let mut d = Array2::zeros((g.len(), 3));
        for (i, &gi) in g.iter().enumerate() {
            let dx = self.x[i] - x0;
            let dy = self.y[i] - y0;
            d[[i, 0]] = flux * gi * dx / s2;
            d[[i, 1]] = flux * gi * dy / s2;
            d[[i, 2]] = flux * gi * (dx * dx + dy * dy) / (s2 * sigma);
        }
        if self.corrupt_derivatives {
            d.column_mut(2).mapv_inplace(|v| 3.0 * v + 1.0);
        }
        self.weight_rows(&mut d);
        Ok(d)
    }
}
