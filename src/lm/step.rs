//! Step calculation for the Levenberg-Marquardt algorithm.
//!
//! The damped Gauss-Newton step solves `(JᵀJ + μI) Δp = Jᵀe`.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};

use crate::utils::matrix_convert::{
    nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra,
};

/// Normal equations of the linearised problem at one parameter vector.
pub struct NormalEquations {
    /// `JᵀJ`
    pub jtj: DMatrix<f64>,

    /// `Jᵀe`, with `e = x - f(p)`
    pub jte: DVector<f64>,
}

impl NormalEquations {
    /// Assemble `JᵀJ` and `Jᵀe` from a Jacobian and a residual vector.
    pub fn new(jacobian: &Array2<f64>, residuals: &Array1<f64>) -> Self {
        let jtj = jacobian.t().dot(jacobian);
        let jte = jacobian.t().dot(residuals);
        Self {
            jtj: ndarray_to_nalgebra(&jtj),
            jte: ndarray_vec_to_nalgebra(&jte),
        }
    }

    /// `||Jᵀe||∞`
    pub fn gradient_inf_norm(&self) -> f64 {
        self.jte.iter().fold(0.0_f64, |acc, g| acc.max(g.abs()))
    }

    /// Largest diagonal entry of `JᵀJ`.
    pub fn max_diagonal(&self) -> f64 {
        self.jtj.diagonal().iter().fold(f64::MIN, |acc, &d| acc.max(d))
    }

    /// Solve the damped system for the step `Δp`.
    ///
    /// Tries Cholesky first and falls back to LU. Returns `None` when neither
    /// factorization yields a finite solution.
    pub fn solve_damped(&self, mu: f64) -> Option<Array1<f64>> {
        let n = self.jtj.nrows();
        let augmented = &self.jtj + DMatrix::<f64>::identity(n, n) * mu;

        let solution = match augmented.clone().cholesky() {
            Some(cholesky) => Some(cholesky.solve(&self.jte)),
            None => augmented.lu().solve(&self.jte),
        }?;

        if solution.iter().all(|x| x.is_finite()) {
            Some(nalgebra_vec_to_ndarray(&solution))
        } else {
            None
        }
    }

    /// Predicted reduction of `||e||²` for a step: `Δpᵀ(μΔp + Jᵀe)`.
    pub fn predicted_reduction(&self, step: &Array1<f64>, mu: f64) -> f64 {
        step.iter()
            .zip(self.jte.iter())
            .map(|(dp, g)| dp * (mu * dp + g))
            .sum()
    }
}
