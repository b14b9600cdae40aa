//! Levenberg-Marquardt fitting.
//!
//! [`LevenbergMarquardt`] is the damped Gauss-Newton solver working on any
//! [`Problem`](crate::problem::Problem). [`LevMarFitter`] drives it against a
//! [`ModelEvaluator`](crate::evaluator::ModelEvaluator) and reports a
//! [`FitResult`].

pub mod adapter;
pub mod algorithm;
pub mod config;
pub mod derivatives;
pub mod fitter;
pub mod step;
pub mod termination;

// Re-export key types
pub use adapter::EvaluatorProblem;
pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::{DiffMethod, LmConfig, LmPolicy, DEFAULT_POLICY};
pub use derivatives::check_jacobian;
pub use fitter::{FitResult, LevMarFitter};
pub use termination::Termination;
