//! Consistency check between an analytic Jacobian and finite differences.
//!
//! This is the MINPACK `chkder` test as shipped with levmar's `chkjac`:
//! every parameter is perturbed at once by `sqrt(ε)·|p_j|`, and the change
//! in each model value is compared with the analytic Jacobian applied to
//! the same perturbation. Agreement is scored on a log scale between 0
//! (wrong) and 1 (correct to machine precision).

use ndarray::Array1;

use crate::error::{check_dimension, Result};
use crate::problem::Problem;

/// Per-observation agreement scores in `[0, 1]`; 1 means the analytic
/// derivative matches.
pub fn jacobian_agreement<P: Problem>(problem: &mut P, params: &Array1<f64>) -> Result<Array1<f64>> {
    let epsmch = f64::EPSILON;
    let eps = epsmch.sqrt();
    let epsf = 100.0 * epsmch;
    let epslog = eps.log10();

    let model = problem.eval(params)?;
    let jacobian = problem.jacobian(params)?;
    check_dimension("Jacobian rows", model.len(), jacobian.nrows())?;
    check_dimension("Jacobian columns", params.len(), jacobian.ncols())?;

    let scale = params.mapv(|p| if p == 0.0 { 1.0 } else { p.abs() });
    let perturbed = params + &(&scale * eps);
    let model_perturbed = problem.eval(&perturbed)?;
    check_dimension("model prediction length", model.len(), model_perturbed.len())?;

    let directional = jacobian.dot(&scale);

    let agreement = model
        .iter()
        .zip(model_perturbed.iter())
        .zip(directional.iter())
        .map(|((&f, &fp), &d)| {
            let mut temp = 1.0;
            if f != 0.0 && fp != 0.0 && (fp - f).abs() >= epsf * f.abs() {
                temp = eps * ((fp - f) / eps - d).abs() / (f.abs() + fp.abs());
            }
            if temp >= eps {
                0.0
            } else if temp > epsmch {
                (temp.log10() - epslog) / epslog
            } else {
                1.0
            }
        })
        .collect();

    Ok(agreement)
}

/// Per-observation discrepancy, `1 - agreement`; 0 means the analytic
/// derivative matches.
pub fn check_jacobian<P: Problem>(problem: &mut P, params: &Array1<f64>) -> Result<Array1<f64>> {
    Ok(jacobian_agreement(problem, params)?.mapv(|a| 1.0 - a))
}
