//! Shared evaluators for the integration tests.

#![allow(dead_code)]

use multifit_rs::{ModelDefinition, ModelEvaluator, Result};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Point source with a fixed-width Gaussian PSF on a flat background.
///
/// Linear parameters: `[flux, background]`.
/// Nonlinear parameters: `[x0, y0]`.
/// Every pixel carries an inverse-noise weight; all images are weighted.
pub struct PointSourceEvaluator {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    pub weights: Array1<f64>,
    pub data: Array1<f64>,
    pub psf_sigma: f64,
    pub linear: Array1<f64>,
    pub nonlinear: Array1<f64>,
    pub wrong_derivatives: bool,
}

impl PointSourceEvaluator {
    /// `truth` and `start` are `[flux, background, x0, y0]`.
    pub fn new(size: usize, psf_sigma: f64, truth: [f64; 4], start: [f64; 4]) -> Self {
        let n = size * size;
        let mut evaluator = Self {
            x: Array1::from_shape_fn(n, |i| (i % size) as f64),
            y: Array1::from_shape_fn(n, |i| (i / size) as f64),
            weights: Array1::from_shape_fn(n, |i| 1.0 + 0.5 * ((i % 3) as f64)),
            data: Array1::zeros(n),
            psf_sigma,
            linear: Array1::from(vec![truth[0], truth[1]]),
            nonlinear: Array1::from(vec![truth[2], truth[3]]),
            wrong_derivatives: false,
        };
        evaluator.data = evaluator.unweighted_model();
        evaluator.linear = Array1::from(vec![start[0], start[1]]);
        evaluator.nonlinear = Array1::from(vec![start[2], start[3]]);
        evaluator
    }

    /// Add uniform noise in `[-amplitude, amplitude)` from a seeded generator.
    pub fn with_noise(mut self, amplitude: f64, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.data
            .mapv_inplace(|v| v + rng.gen_range(-amplitude..amplitude));
        self
    }

    fn psf(&self) -> Array1<f64> {
        let s2 = self.psf_sigma * self.psf_sigma;
        Array1::from_shape_fn(self.x.len(), |i| {
            let dx = self.x[i] - self.nonlinear[0];
            let dy = self.y[i] - self.nonlinear[1];
            (-(dx * dx + dy * dy) / (2.0 * s2)).exp()
        })
    }

    fn unweighted_model(&self) -> Array1<f64> {
        self.psf().mapv(|g| self.linear[0] * g + self.linear[1])
    }
}

impl ModelEvaluator for PointSourceEvaluator {
    fn model(&self) -> ModelDefinition {
        ModelDefinition::new("PointSource", 2, 2)
    }

    fn linear_parameter_size(&self) -> usize {
        2
    }

    fn nonlinear_parameter_size(&self) -> usize {
        2
    }

    fn linear_parameters(&self) -> Array1<f64> {
        self.linear.clone()
    }

    fn nonlinear_parameters(&self) -> Array1<f64> {
        self.nonlinear.clone()
    }

    fn set_linear_parameters(&mut self, params: &Array1<f64>) -> Result<()> {
        self.linear.assign(params);
        Ok(())
    }

    fn set_nonlinear_parameters(&mut self, params: &Array1<f64>) -> Result<()> {
        self.nonlinear.assign(params);
        Ok(())
    }

    fn weighted_data(&self) -> Array1<f64> {
        &self.data * &self.weights
    }

    fn n_pixels(&self) -> usize {
        self.x.len()
    }

    fn compute_model_image(&self) -> Result<Array1<f64>> {
        Ok(self.unweighted_model() * &self.weights)
    }

    fn compute_linear_parameter_derivative(&self) -> Result<Array2<f64>> {
        let g = self.psf();
        let mut d = Array2::zeros((g.len(), 2));
        for i in 0..g.len() {
            d[[i, 0]] = g[i] * self.weights[i];
            d[[i, 1]] = self.weights[i];
        }
        Ok(d)
    }

    fn compute_nonlinear_parameter_derivative(&self) -> Result<Array2<f64>> {
        let g = self.psf();
        let s2 = self.psf_sigma * self.psf_sigma;
        let flux = self.linear[0];
        let mut d = Array2::zeros((g.len(), 2));
        for i in 0..g.len() {
            let dx = self.x[i] - self.nonlinear[0];
            let dy = self.y[i] - self.nonlinear[1];
            let sign = if self.wrong_derivatives { -1.0 } else { 1.0 };
            d[[i, 0]] = sign * flux * g[i] * dx / s2 * self.weights[i];
            d[[i, 1]] = flux * g[i] * dy / s2 * self.weights[i];
        }
        Ok(d)
    }
}
