//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! The solver follows the damping strategy of the levmar library: the
//! damping `μ` starts at `tau * max(diag(JᵀJ))`, is reduced with Nielsen's
//! rule after an accepted step and multiplied by a doubling factor `ν`
//! after a rejected one. It reports the same statistics levmar does.

use std::fmt;

use nalgebra::DMatrix;
use ndarray::{Array1, Array2};
use tracing::{debug, warn};

use crate::error::{check_dimension, MultifitError, Result};
use crate::problem::Problem;
use crate::utils::finite_difference::levmar_jacobian;
use crate::utils::matrix_convert::{nalgebra_to_ndarray, ndarray_to_nalgebra};

use super::config::{DiffMethod, LmConfig, DEFAULT_DELTA};
use super::step::NormalEquations;
use super::termination::Termination;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Best parameter values found
    pub params: Array1<f64>,

    /// Why the solver stopped
    pub termination: Termination,

    /// `||e||²` at the initial parameters
    pub chisq_initial: f64,

    /// `||e||²` at the final parameters
    pub chisq_final: f64,

    /// `||Jᵀe||∞` at the last Jacobian evaluation
    pub max_gradient: f64,

    /// Euclidean norm of the last proposed step
    pub last_step_norm: f64,

    /// `μ / max(diag(JᵀJ))` when the solver stopped
    pub damping_ratio: f64,

    /// Number of iterations performed
    pub iterations: usize,

    /// Number of model evaluations
    pub func_evals: usize,

    /// Number of Jacobian evaluations
    pub jacobian_evals: usize,

    /// Number of damped linear systems solved
    pub linear_solves: usize,

    /// Parameter covariance at the solution
    pub covariance: Array2<f64>,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Termination: {} ({})", self.termination, self.termination.code())?;
        writeln!(f, "  Chi-square: {:.6e} -> {:.6e}", self.chisq_initial, self.chisq_final)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Jacobian evaluations: {}", self.jacobian_evals)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// Sum of squared differences between the target and a model prediction.
fn chi_square(target: &Array1<f64>, model: &Array1<f64>) -> f64 {
    target
        .iter()
        .zip(model.iter())
        .map(|(x, hx)| (x - hx).powi(2))
        .sum()
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    /// Configuration options
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    /// The configuration this optimizer runs with.
    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    fn jacobian<P: Problem>(
        &self,
        problem: &mut P,
        params: &Array1<f64>,
        model: &Array1<f64>,
    ) -> Result<(Array2<f64>, usize)> {
        let (jacobian, evaluations) = match self.config.diff_method {
            DiffMethod::Analytical if problem.has_custom_jacobian() => (problem.jacobian(params)?, 0),
            DiffMethod::Analytical => levmar_jacobian(problem, params, model, DEFAULT_DELTA)?,
            DiffMethod::FiniteDifference { delta } => {
                levmar_jacobian(problem, params, model, delta)?
            }
        };
        check_dimension("Jacobian rows", model.len(), jacobian.nrows())?;
        check_dimension("Jacobian columns", params.len(), jacobian.ncols())?;
        Ok((jacobian, evaluations))
    }

    /// Fit the problem's model prediction to `target`.
    ///
    /// Minimises `||target - f(p)||²` starting from `initial_params`.
    /// Numerical difficulties are reported through
    /// [`LmResult::termination`]; only dimension mismatches and errors
    /// raised by the problem itself are returned as `Err`.
    pub fn minimize<P: Problem>(
        &self,
        problem: &mut P,
        target: &Array1<f64>,
        initial_params: Array1<f64>,
    ) -> Result<LmResult> {
        let n_params = problem.parameter_count();
        let n_obs = problem.residual_count();
        check_dimension("initial parameter count", n_params, initial_params.len())?;
        check_dimension("target length", n_obs, target.len())?;
        if n_params == 0 || n_obs == 0 {
            return Err(MultifitError::InvalidParameter(format!(
                "problem must have parameters and observations, got {} and {}",
                n_params, n_obs
            )));
        }

        let config = &self.config;
        let eps2_sq = config.parameter_epsilon * config.parameter_epsilon;

        let mut params = initial_params;
        let mut model = problem.eval(&params)?;
        check_dimension("model prediction length", n_obs, model.len())?;
        let mut func_evals = 1;
        let mut jacobian_evals = 0;
        let mut linear_solves = 0;

        let mut chisq = chi_square(target, &model);
        let chisq_initial = chisq;
        let mut max_gradient = 0.0;
        let mut step_norm_sq = 0.0;
        let mut mu = 0.0;
        let mut max_diagonal = 0.0;
        let mut nu = 2.0_f64;
        let mut termination = None;
        let mut iterations = 0;

        if !chisq.is_finite() {
            termination = Some(Termination::InvalidValues);
        }

        while termination.is_none() && iterations < config.max_iterations {
            if chisq <= config.residual_epsilon {
                termination = Some(Termination::SmallResidual);
                break;
            }

            let (jacobian, fd_evals) = self.jacobian(problem, &params, &model)?;
            jacobian_evals += 1;
            func_evals += fd_evals;

            let residuals = target - &model;
            let normal = NormalEquations::new(&jacobian, &residuals);
            let params_norm_sq = params.dot(&params);

            max_gradient = normal.gradient_inf_norm();
            if max_gradient <= config.gradient_epsilon {
                step_norm_sq = 0.0;
                termination = Some(Termination::SmallGradient);
                break;
            }

            max_diagonal = normal.max_diagonal();
            if iterations == 0 {
                mu = config.tau * max_diagonal;
            }

            loop {
                let mut accepted = false;

                if let Some(step) = normal.solve_damped(mu) {
                    linear_solves += 1;
                    step_norm_sq = step.dot(&step);

                    if step_norm_sq <= eps2_sq * params_norm_sq {
                        termination = Some(Termination::SmallStep);
                        break;
                    }
                    if step_norm_sq
                        >= (params_norm_sq + config.parameter_epsilon)
                            / (f64::EPSILON * f64::EPSILON)
                    {
                        termination = Some(Termination::SingularMatrix);
                        break;
                    }

                    let candidate = &params + &step;
                    let candidate_model = problem.eval(&candidate)?;
                    func_evals += 1;
                    check_dimension("model prediction length", n_obs, candidate_model.len())?;
                    let candidate_chisq = chi_square(target, &candidate_model);

                    if !candidate_chisq.is_finite() {
                        termination = Some(Termination::InvalidValues);
                        break;
                    }

                    let predicted = normal.predicted_reduction(&step, mu);
                    let actual = chisq - candidate_chisq;

                    if predicted > 0.0 && actual > 0.0 {
                        let gain = 2.0 * actual / predicted - 1.0;
                        mu *= (1.0 - gain * gain * gain).max(1.0 / 3.0);
                        nu = 2.0;
                        params = candidate;
                        model = candidate_model;
                        chisq = candidate_chisq;
                        accepted = true;
                    }
                } else {
                    linear_solves += 1;
                }

                debug!(
                    iteration = iterations,
                    chisq,
                    mu,
                    step_norm = step_norm_sq.sqrt(),
                    accepted,
                    "levenberg-marquardt step"
                );

                if accepted {
                    break;
                }

                // Rejected or unsolvable: raise the damping and retry.
                mu *= nu;
                let nu_next = 2.0 * nu;
                if !nu_next.is_finite() {
                    termination = Some(Termination::NoReduction);
                    break;
                }
                nu = nu_next;
            }

            iterations += 1;
        }

        let termination = termination.unwrap_or(Termination::MaxIterations);
        if termination.is_numerical_failure() {
            warn!(%termination, iterations, chisq, "fit stopped on a numerical failure");
        }

        let covariance = if termination == Termination::InvalidValues {
            Array2::from_elem((n_params, n_params), f64::NAN)
        } else {
            let (jacobian, fd_evals) = self.jacobian(problem, &params, &model)?;
            func_evals += fd_evals;
            covariance_from_jacobian(&jacobian, chisq)
        };

        Ok(LmResult {
            params,
            termination,
            chisq_initial,
            chisq_final: chisq,
            max_gradient,
            last_step_norm: step_norm_sq.sqrt(),
            damping_ratio: if max_diagonal > 0.0 { mu / max_diagonal } else { 0.0 },
            iterations,
            func_evals,
            jacobian_evals,
            linear_solves,
            covariance,
        })
    }
}

/// Estimate the parameter covariance from the Jacobian at the solution.
///
/// Uses the pseudo-inverse of `JᵀJ` scaled by `chisq / (n - rank)`, with
/// the divisor clamped to at least one. A Jacobian with non-finite entries
/// yields a NaN covariance.
pub fn covariance_from_jacobian(jacobian: &Array2<f64>, chisq: f64) -> Array2<f64> {
    let n_obs = jacobian.nrows();
    let n_params = jacobian.ncols();
    if jacobian.iter().any(|v| !v.is_finite()) {
        return Array2::from_elem((n_params, n_params), f64::NAN);
    }
    let jtj: DMatrix<f64> = ndarray_to_nalgebra(&jacobian.t().dot(jacobian));

    let svd = jtj.svd(true, true);
    let tolerance = f64::EPSILON
        * n_params.max(1) as f64
        * svd.singular_values.iter().fold(0.0_f64, |acc, &s| acc.max(s));
    let rank = svd.rank(tolerance);

    match svd.pseudo_inverse(tolerance) {
        Ok(pinv) if rank > 0 => {
            let dof = n_obs.saturating_sub(rank).max(1) as f64;
            nalgebra_to_ndarray(&(pinv * (chisq / dof)))
        }
        _ => Array2::zeros((n_params, n_params)),
    }
}
