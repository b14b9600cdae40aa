//! # multifit-rs
//!
//! `multifit-rs` fits parametric source models (point sources, elliptical
//! galaxy profiles) to pixel data and explores their posterior on a grid.
//!
//! The library provides:
//! - A Levenberg-Marquardt solver and a fitter that drives it against any
//!   [`ModelEvaluator`], with a derivative checker for analytic Jacobians
//! - A deterministic grid sampler over ellipse radius and ellipticity that
//!   produces importance-weighted sample sets
//! - An interpreter splitting fitted distributions into linear and
//!   nonlinear blocks
//!
//! ## Basic Usage
//!
//! ```
//! use multifit_rs::sampling::{objective_fn, Ellipse, NaiveGridSampler, Point2D};
//!
//! let sampler = NaiveGridSampler::new(Point2D::new(10.0, 12.0), 5, 0.1, 3.0, 0.6)?;
//! let objective = objective_fn(1, |e: &Ellipse| (e.core().radius() - 1.5).powi(2));
//!
//! let samples = sampler.run(&objective)?;
//! assert_eq!(samples.len(), sampler.sample_set_size());
//! # Ok::<(), multifit_rs::MultifitError>(())
//! ```

// Public modules
pub mod error;
pub mod evaluator;
pub mod interpreter;
pub mod sampling;

// Conditional modules
#[cfg(feature = "lm")]
mod utils;

#[cfg(feature = "lm")]
pub mod problem;

#[cfg(feature = "lm")]
pub mod lm;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use error::{MultifitError, Result};
pub use evaluator::{ModelDefinition, ModelEvaluator};
pub use interpreter::SimpleInterpreter;
pub use sampling::{NaiveGridSampler, Objective, SamplePoint, SampleSet};

#[cfg(feature = "lm")]
pub use lm::{FitResult, LevMarFitter, LevenbergMarquardt, LmConfig, LmPolicy, Termination};

#[cfg(feature = "lm")]
pub use problem::Problem;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
