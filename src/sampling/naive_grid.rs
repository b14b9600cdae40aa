//! Deterministic grid sampler over ellipse size and shape.
//!
//! [`NaiveGridSampler`] walks a radius ladder from 0 to `max_radius` and, at
//! every rung, the full ellipticity grid of [`EllipticityGrid`]. All points
//! share one constant proposal density: the log volume of the sampled
//! region, `ln(max_radius · max_ellipticity² · π)`.
//!
//! At zero radius every ellipticity describes the same (point-like) shape, so
//! the objective is evaluated once there and that value is recorded for each
//! grid point. The sample set stays rectangular, `n_radius_steps` rows of
//! [`count_samples`] points each.

use std::f64::consts::PI;

use ndarray::Array1;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{MultifitError, Result};

use super::ellipse::{Ellipse, EllipseCore, Point2D};
use super::grid::{count_samples, EllipticityGrid};
use super::objective::Objective;
use super::sample::{SamplePoint, SampleSet};

/// Grid sampler over `(radius, e1, e2)` at a fixed center.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NaiveGridSampler {
    center: Point2D,
    n_radius_steps: usize,
    ellipticity_step_size: f64,
    max_radius: f64,
    max_ellipticity: f64,
}

impl NaiveGridSampler {
    /// Number of nonlinear parameters of every sample.
    pub const NONLINEAR_DIM: usize = EllipseCore::PARAMETER_SIZE;

    /// Validate and store the grid geometry.
    ///
    /// # Errors
    ///
    /// [`MultifitError::InvalidParameter`] when `n_radius_steps < 2` or any
    /// magnitude is negative or NaN, and when `max_ellipticity` is infinite.
    pub fn new(
        center: Point2D,
        n_radius_steps: usize,
        ellipticity_step_size: f64,
        max_radius: f64,
        max_ellipticity: f64,
    ) -> Result<Self> {
        if n_radius_steps < 2 {
            return Err(invalid("nRadiusSteps must be >= 2"));
        }
        if !(max_ellipticity >= 0.0) {
            return Err(invalid("maxEllipticity must be >= 0.0"));
        }
        if max_ellipticity.is_infinite() {
            return Err(invalid("maxEllipticity must be finite"));
        }
        if !(ellipticity_step_size >= 0.0) {
            return Err(invalid("ellipticityStepSize must be >= 0.0"));
        }
        if !(max_radius >= 0.0) {
            return Err(invalid("maxRadius must be >= 0.0"));
        }
        Ok(Self {
            center,
            n_radius_steps,
            ellipticity_step_size,
            max_radius,
            max_ellipticity,
        })
    }

    /// Size of the sample set a run with this geometry produces.
    pub fn compute_sample_set_size(
        n_radius_steps: usize,
        ellipticity_step_size: f64,
        max_ellipticity: f64,
    ) -> usize {
        count_samples(max_ellipticity, ellipticity_step_size) * n_radius_steps
    }

    pub fn center(&self) -> Point2D {
        self.center
    }

    pub fn n_radius_steps(&self) -> usize {
        self.n_radius_steps
    }

    pub fn ellipticity_step_size(&self) -> f64 {
        self.ellipticity_step_size
    }

    pub fn max_radius(&self) -> f64 {
        self.max_radius
    }

    pub fn max_ellipticity(&self) -> f64 {
        self.max_ellipticity
    }

    /// Size of the sample set [`run`](Self::run) produces.
    pub fn sample_set_size(&self) -> usize {
        Self::compute_sample_set_size(
            self.n_radius_steps,
            self.ellipticity_step_size,
            self.max_ellipticity,
        )
    }

    /// Log proposal density shared by every sample; `-inf` when the sampled
    /// region has no volume.
    pub fn proposal_density(&self) -> f64 {
        (self.max_radius * self.max_ellipticity * self.max_ellipticity * PI).ln()
    }

    /// Radius of each rung, starting at 0 and ending at `max_radius`.
    pub fn radii(&self) -> Vec<f64> {
        let step = self.radius_step_size();
        (0..self.n_radius_steps).map(|i| step * i as f64).collect()
    }

    fn radius_step_size(&self) -> f64 {
        self.max_radius / (self.n_radius_steps - 1) as f64
    }

    fn ellipticities(&self) -> EllipticityGrid {
        EllipticityGrid::new(self.max_ellipticity, self.ellipticity_step_size)
    }

    /// Evaluate `objective` over the grid, radius-major.
    pub fn run<O: Objective + ?Sized>(&self, objective: &O) -> Result<SampleSet> {
        let density = self.proposal_density();
        let mut samples = self.empty_set(objective);
        let mut ellipse = Ellipse::new(EllipseCore::default(), self.center);

        ellipse.core_mut().scale(0.0);
        let zero_joint = objective.evaluate(&ellipse);
        for (e1, e2) in self.ellipticities() {
            samples.add(SamplePoint::new(point(0.0, e1, e2), zero_joint, density))?;
        }

        let radius_step = self.radius_step_size();
        for i in 1..self.n_radius_steps {
            let radius = radius_step * i as f64;
            ellipse.core_mut().set_radius(radius);
            for (e1, e2) in self.ellipticities() {
                let core = ellipse.core_mut();
                core.set_e1(e1);
                core.set_e2(e2);
                let joint = objective.evaluate(&ellipse);
                samples.add(SamplePoint::new(point(radius, e1, e2), joint, density))?;
            }
            debug!(rung = i, radius, "grid rung evaluated");
        }

        self.log_finished(&samples);
        Ok(samples)
    }

    /// Same as [`run`](Self::run), evaluating grid points on the rayon
    /// thread pool. The result is identical, in the same order.
    pub fn run_parallel<O: Objective + Sync + ?Sized>(&self, objective: &O) -> Result<SampleSet> {
        let density = self.proposal_density();
        let mut samples = self.empty_set(objective);
        let grid: Vec<(f64, f64)> = self.ellipticities().collect();

        let zero = Ellipse::new(EllipseCore::default(), self.center);
        let zero_joint = objective.evaluate(&zero);

        let radius_step = self.radius_step_size();
        let rungs: Vec<Vec<SamplePoint>> = (1..self.n_radius_steps)
            .into_par_iter()
            .map(|i| {
                let radius = radius_step * i as f64;
                grid.par_iter()
                    .map(|&(e1, e2)| {
                        let ellipse = Ellipse::new(EllipseCore::new(radius, e1, e2), self.center);
                        SamplePoint::new(point(radius, e1, e2), objective.evaluate(&ellipse), density)
                    })
                    .collect::<Vec<SamplePoint>>()
            })
            .collect();

        for &(e1, e2) in &grid {
            samples.add(SamplePoint::new(point(0.0, e1, e2), zero_joint, density))?;
        }
        for sample in rungs.into_iter().flatten() {
            samples.add(sample)?;
        }

        self.log_finished(&samples);
        Ok(samples)
    }

    fn empty_set<O: Objective + ?Sized>(&self, objective: &O) -> SampleSet {
        let mut samples = SampleSet::new(
            Self::NONLINEAR_DIM,
            objective.linear_dim(),
            EllipseCore::NAME,
        );
        samples.reserve(self.sample_set_size());
        samples
    }

    fn log_finished(&self, samples: &SampleSet) {
        info!(
            samples = samples.len(),
            n_radius_steps = self.n_radius_steps,
            max_radius = self.max_radius,
            max_ellipticity = self.max_ellipticity,
            "grid sampling finished"
        );
    }
}

fn point(radius: f64, e1: f64, e2: f64) -> Array1<f64> {
    let mut params = Array1::zeros(EllipseCore::PARAMETER_SIZE);
    params[EllipseCore::RADIUS] = radius;
    params[EllipseCore::E1] = e1;
    params[EllipseCore::E2] = e2;
    params
}

fn invalid(message: &str) -> MultifitError {
    MultifitError::InvalidParameter(message.to_string())
}
