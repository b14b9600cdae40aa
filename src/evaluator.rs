//! Model evaluator capability.
//!
//! A [`ModelEvaluator`] owns a source model projected onto a set of pixels.
//! It exposes the model's parameters split into a linear block (fluxes and
//! amplitudes) and a nonlinear block (position and shape), the weighted
//! pixel data it is fit to, and analytic derivatives of the model image.
//! Rendering, PSF convolution and footprint handling all live behind this
//! trait.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Identity and parameter layout of the model an evaluator projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// Human-readable model name, e.g. "PointSource" or "ExponentialGalaxy"
    pub name: String,

    /// Number of linear parameters (amplitudes/fluxes)
    pub linear_parameter_size: usize,

    /// Number of nonlinear parameters (position/shape)
    pub nonlinear_parameter_size: usize,
}

impl ModelDefinition {
    /// Create a new model definition.
    pub fn new(
        name: impl Into<String>,
        linear_parameter_size: usize,
        nonlinear_parameter_size: usize,
    ) -> Self {
        Self {
            name: name.into(),
            linear_parameter_size,
            nonlinear_parameter_size,
        }
    }

    /// Total number of parameters, linear first then nonlinear.
    pub fn parameter_size(&self) -> usize {
        self.linear_parameter_size + self.nonlinear_parameter_size
    }
}

/// Evaluates a parametric source model over a fixed set of pixels.
///
/// All images and derivative matrices are weighted the same way as
/// [`weighted_data`](ModelEvaluator::weighted_data), and have one row per
/// pixel.
pub trait ModelEvaluator {
    /// The model this evaluator projects.
    fn model(&self) -> ModelDefinition;

    /// Number of linear parameters.
    fn linear_parameter_size(&self) -> usize;

    /// Number of nonlinear parameters.
    fn nonlinear_parameter_size(&self) -> usize;

    /// Current linear parameters.
    fn linear_parameters(&self) -> Array1<f64>;

    /// Current nonlinear parameters.
    fn nonlinear_parameters(&self) -> Array1<f64>;

    /// Replace the linear parameters.
    fn set_linear_parameters(&mut self, params: &Array1<f64>) -> Result<()>;

    /// Replace the nonlinear parameters.
    fn set_nonlinear_parameters(&mut self, params: &Array1<f64>) -> Result<()>;

    /// Weighted pixel values the model is fit to.
    fn weighted_data(&self) -> Array1<f64>;

    /// Number of pixels in the footprint.
    fn n_pixels(&self) -> usize;

    /// Weighted model image at the current parameters.
    fn compute_model_image(&self) -> Result<Array1<f64>>;

    /// Derivative of the model image with respect to the linear parameters
    /// (`n_pixels × linear_parameter_size`).
    fn compute_linear_parameter_derivative(&self) -> Result<Array2<f64>>;

    /// Derivative of the model image with respect to the nonlinear parameters
    /// (`n_pixels × nonlinear_parameter_size`).
    fn compute_nonlinear_parameter_derivative(&self) -> Result<Array2<f64>>;
}
