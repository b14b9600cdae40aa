//! Finite difference methods for numerical differentiation.
//!
//! This module provides functions for approximating the Jacobian of a
//! [`Problem`]'s model prediction with forward or central differences.

use crate::error::{check_dimension, Result};
use crate::problem::Problem;
use ndarray::{Array1, Array2};

/// Default step size for finite differences.
const DEFAULT_EPSILON: f64 = 1e-8;

/// Relative part of the levmar-style step: `d_j = max(1e-4 * |p_j|, |delta|)`.
const RELATIVE_STEP: f64 = 1e-4;

/// Compute the Jacobian matrix using forward finite differences.
///
/// The Jacobian is the matrix of partial derivatives of the model prediction
/// with respect to the parameters: J[i,j] = ∂f[i]/∂param[j].
///
/// # Arguments
///
/// * `problem` - The problem to evaluate
/// * `params` - The parameter values at which to evaluate the Jacobian
/// * `epsilon` - The step size for finite differences (optional)
///
/// # Returns
///
/// * `Result<Array2<f64>>` - The Jacobian matrix
pub fn jacobian(
    problem: &mut dyn Problem,
    params: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    let n_params = params.len();
    let n_residuals = problem.residual_count();

    let model = problem.eval(params)?;
    check_dimension("model prediction length", n_residuals, model.len())?;

    let mut jac = Array2::zeros((n_residuals, n_params));

    for j in 0..n_params {
        let mut params_perturbed = params.clone();

        // Adapt epsilon to parameter scale
        let param_j = params[j];
        let eps_j = if param_j.abs() > eps {
            param_j.abs() * eps
        } else {
            eps
        };

        params_perturbed[j] += eps_j;
        let model_perturbed = problem.eval(&params_perturbed)?;
        check_dimension("model prediction length", n_residuals, model_perturbed.len())?;

        for i in 0..n_residuals {
            jac[[i, j]] = (model_perturbed[i] - model[i]) / eps_j;
        }
    }

    Ok(jac)
}

/// Approximate the Jacobian with the step convention of the levmar library.
///
/// A positive `delta` selects forward differences around the already known
/// prediction `model`; a negative `delta` selects central differences with
/// step `|delta|`. The per-parameter step is `max(1e-4 * |p_j|, |delta|)`.
///
/// # Returns
///
/// * The Jacobian and the number of model evaluations spent computing it
pub fn levmar_jacobian(
    problem: &mut dyn Problem,
    params: &Array1<f64>,
    model: &Array1<f64>,
    delta: f64,
) -> Result<(Array2<f64>, usize)> {
    let n_params = params.len();
    let n_residuals = model.len();
    let central = delta < 0.0;
    let delta = delta.abs();

    let mut jac = Array2::zeros((n_residuals, n_params));
    let mut evaluations = 0;
    let mut shifted = params.clone();

    for j in 0..n_params {
        let d = (RELATIVE_STEP * params[j]).abs().max(delta);

        shifted[j] = params[j] + d;
        let forward = problem.eval(&shifted)?;
        evaluations += 1;
        check_dimension("model prediction length", n_residuals, forward.len())?;

        if central {
            shifted[j] = params[j] - d;
            let backward = problem.eval(&shifted)?;
            evaluations += 1;
            check_dimension("model prediction length", n_residuals, backward.len())?;
            for i in 0..n_residuals {
                jac[[i, j]] = (forward[i] - backward[i]) / (2.0 * d);
            }
        } else {
            for i in 0..n_residuals {
                jac[[i, j]] = (forward[i] - model[i]) / d;
            }
        }

        shifted[j] = params[j];
    }

    Ok((jac, evaluations))
}
