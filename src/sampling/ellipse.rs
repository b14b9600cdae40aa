//! Ellipse geometry used by the grid sampler.
//!
//! The shape is parameterised as `(radius, e1, e2)`: a trace radius
//! `sqrt((a² + b²) / 2)` and the two components of the conformal shear
//! `η = ln(a/b)·(cos 2θ, sin 2θ)`. The two ellipticity components are
//! unbounded and separable from the size, which is what makes a flat
//! rectangular grid over them meaningful.

use std::f64::consts::SQRT_2;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{check_dimension, Result};

/// A position in pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Center-free ellipse shape: trace radius plus conformal shear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EllipseCore {
    radius: f64,
    e1: f64,
    e2: f64,
}

impl EllipseCore {
    /// Slot of the radius in [`parameter_vector`](Self::parameter_vector).
    pub const RADIUS: usize = 0;
    /// Slot of the first ellipticity component.
    pub const E1: usize = 1;
    /// Slot of the second ellipticity component.
    pub const E2: usize = 2;
    /// Number of shape parameters.
    pub const PARAMETER_SIZE: usize = 3;
    /// Parameterisation name recorded in sample sets.
    pub const NAME: &'static str = "SeparableConformalShearTraceRadius";

    pub fn new(radius: f64, e1: f64, e2: f64) -> Self {
        Self { radius, e1, e2 }
    }

    /// Build a core from `[radius, e1, e2]`.
    pub fn from_parameter_vector(params: &Array1<f64>) -> Result<Self> {
        check_dimension("ellipse parameter vector", Self::PARAMETER_SIZE, params.len())?;
        Ok(Self::new(
            params[Self::RADIUS],
            params[Self::E1],
            params[Self::E2],
        ))
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn e1(&self) -> f64 {
        self.e1
    }

    pub fn e2(&self) -> f64 {
        self.e2
    }

    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
    }

    pub fn set_e1(&mut self, e1: f64) {
        self.e1 = e1;
    }

    pub fn set_e2(&mut self, e2: f64) {
        self.e2 = e2;
    }

    /// `[radius, e1, e2]`
    pub fn parameter_vector(&self) -> Array1<f64> {
        Array1::from(vec![self.radius, self.e1, self.e2])
    }

    /// Multiply the size by `factor`, leaving the shape untouched.
    pub fn scale(&mut self, factor: f64) {
        self.radius *= factor;
    }

    /// Magnitude of the conformal shear, `ln(a/b)`.
    pub fn ellipticity(&self) -> f64 {
        self.e1.hypot(self.e2)
    }

    /// Minor over major axis, in `(0, 1]`.
    pub fn axis_ratio(&self) -> f64 {
        (-self.ellipticity()).exp()
    }

    /// Semi-major axis, semi-minor axis and position angle in radians.
    pub fn axes(&self) -> (f64, f64, f64) {
        let q = self.axis_ratio();
        let a = self.radius * SQRT_2 / (1.0 + q * q).sqrt();
        let theta = 0.5 * self.e2.atan2(self.e1);
        (a, q * a, theta)
    }
}

/// An [`EllipseCore`] placed at a center.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    core: EllipseCore,
    center: Point2D,
}

impl Ellipse {
    pub fn new(core: EllipseCore, center: Point2D) -> Self {
        Self { core, center }
    }

    pub fn core(&self) -> &EllipseCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut EllipseCore {
        &mut self.core
    }

    pub fn center(&self) -> Point2D {
        self.center
    }

    pub fn set_center(&mut self, center: Point2D) {
        self.center = center;
    }
}
