//! Levenberg-Marquardt fitting of a [`ModelEvaluator`].
//!
//! [`LevMarFitter`] concatenates an evaluator's linear and nonlinear
//! parameters, runs the solver against the evaluator's weighted data and
//! packages the outcome as an immutable [`FitResult`].

use std::fmt;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MultifitError, Result};
use crate::evaluator::{ModelDefinition, ModelEvaluator};
use crate::interpreter::SimpleInterpreter;

use super::adapter::{concatenated_parameters, EvaluatorProblem};
use super::algorithm::LevenbergMarquardt;
use super::config::{LmConfig, LmPolicy};
use super::derivatives;
use super::termination::Termination;

/// Outcome of one [`LevMarFitter::apply`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Why the solver stopped
    pub termination: Termination,

    /// Weighted chi-square at the starting parameters
    pub chisq_initial: f64,

    /// Weighted chi-square at the final parameters
    pub chisq_final: f64,

    /// `||Jᵀe||∞` at the last Jacobian evaluation
    pub max_gradient: f64,

    /// Norm of the last proposed step
    pub last_step_norm: f64,

    /// Number of iterations performed
    pub n_iterations: usize,

    /// Number of model image evaluations
    pub n_function_evaluations: usize,

    /// Number of Jacobian evaluations
    pub n_jacobian_evaluations: usize,

    /// Number of matrix factorizations (damped linear solves)
    pub n_matrix_factorizations: usize,

    /// The model that was fit
    pub model: ModelDefinition,

    /// Final parameters, linear block first
    pub parameters: Array1<f64>,

    /// Covariance of `parameters`
    pub covariance: Array2<f64>,
}

impl FitResult {
    /// Linear block of the final parameters.
    pub fn linear_parameters(&self) -> Array1<f64> {
        self.parameters
            .iter()
            .take(self.model.linear_parameter_size)
            .copied()
            .collect()
    }

    /// Nonlinear block of the final parameters.
    pub fn nonlinear_parameters(&self) -> Array1<f64> {
        self.parameters
            .iter()
            .skip(self.model.linear_parameter_size)
            .copied()
            .collect()
    }

    /// View the parameters and covariance through a [`SimpleInterpreter`].
    pub fn interpret(&self) -> Result<SimpleInterpreter> {
        SimpleInterpreter::new(
            self.model.clone(),
            self.parameters.clone(),
            self.covariance.clone(),
        )
    }
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fit of {}:", self.model.name)?;
        writeln!(f, "  Termination: {} ({})", self.termination, self.termination.code())?;
        writeln!(f, "  Chi-square: {:.6e} -> {:.6e}", self.chisq_initial, self.chisq_final)?;
        writeln!(f, "  Iterations: {}", self.n_iterations)?;
        writeln!(f, "  Parameters: {:?}", self.parameters)?;
        Ok(())
    }
}

/// Fits model evaluators with the Levenberg-Marquardt algorithm.
///
/// Holds only its configuration; every `apply` call is independent.
#[derive(Debug, Clone)]
pub struct LevMarFitter {
    config: LmConfig,
}

impl LevMarFitter {
    /// Create a fitter from an optional policy merged over the built-in
    /// defaults.
    pub fn new(policy: Option<LmPolicy>) -> Result<Self> {
        Ok(Self {
            config: LmConfig::from_policy(policy)?,
        })
    }

    /// Create a fitter from an already concrete configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    /// The effective configuration.
    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// The effective configuration as a fully populated policy.
    pub fn policy(&self) -> LmPolicy {
        self.config.to_policy()
    }

    /// Fit the evaluator's model to its weighted data.
    ///
    /// The evaluator is left holding the best parameters found. Numerical
    /// trouble is reported through [`FitResult::termination`].
    pub fn apply<E: ModelEvaluator + ?Sized>(&self, evaluator: &mut E) -> Result<FitResult> {
        let model = evaluator.model();
        let initial = validated_parameters(evaluator)?;
        let target = evaluator.weighted_data();
        if target.len() != evaluator.n_pixels() {
            return Err(MultifitError::DimensionMismatch(format!(
                "weighted data has {} entries but the evaluator covers {} pixels",
                target.len(),
                evaluator.n_pixels()
            )));
        }

        let mut problem = EvaluatorProblem::new(evaluator);
        let solver = LevenbergMarquardt::with_config(self.config.clone());
        let result = solver.minimize(&mut problem, &target, initial)?;
        problem.sync(&result.params)?;

        info!(
            model = %model.name,
            termination = %result.termination,
            chisq_initial = result.chisq_initial,
            chisq_final = result.chisq_final,
            iterations = result.iterations,
            "levenberg-marquardt fit finished"
        );

        Ok(FitResult {
            termination: result.termination,
            chisq_initial: result.chisq_initial,
            chisq_final: result.chisq_final,
            max_gradient: result.max_gradient,
            last_step_norm: result.last_step_norm,
            n_iterations: result.iterations,
            n_function_evaluations: result.func_evals,
            n_jacobian_evaluations: result.jacobian_evals,
            n_matrix_factorizations: result.linear_solves,
            model,
            parameters: result.params,
            covariance: result.covariance,
        })
    }

    /// Compare the evaluator's analytic derivatives against finite
    /// differences at its current parameters.
    ///
    /// Returns one discrepancy per pixel in `[0, 1]`: near 0 where the
    /// analytic Jacobian agrees, near 1 where it does not. A pixel whose
    /// model value is exactly zero, such as a zero-weight (masked) pixel,
    /// cannot be scored and always reports 1.
    pub fn check_derivatives<E: ModelEvaluator + ?Sized>(
        &self,
        evaluator: &mut E,
    ) -> Result<Array1<f64>> {
        let params = validated_parameters(evaluator)?;
        let mut problem = EvaluatorProblem::new(evaluator);
        let discrepancy = derivatives::check_jacobian(&mut problem, &params);
        problem.sync(&params)?;
        discrepancy
    }
}

fn validated_parameters<E: ModelEvaluator + ?Sized>(evaluator: &E) -> Result<Array1<f64>> {
    let params = concatenated_parameters(evaluator)?;
    if params.is_empty() || evaluator.n_pixels() == 0 {
        return Err(MultifitError::InvalidParameter(format!(
            "evaluator must have parameters and pixels, got {} and {}",
            params.len(),
            evaluator.n_pixels()
        )));
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lm::config::DiffMethod;
    use crate::testing::GaussianEvaluator;
    use approx::assert_relative_eq;
    use ndarray::array;

    const TRUTH: [f64; 5] = [25.0, 2.0, 4.2, 3.8, 1.3];

    #[test]
    fn test_fit_recovers_truth() {
        let mut evaluator = GaussianEvaluator::new(9, TRUTH, [20.0, 1.0, 4.0, 4.0, 1.6]);
        let fitter = LevMarFitter::new(None).unwrap();

        let result = fitter.apply(&mut evaluator).unwrap();

        assert!(result.termination.is_converged(), "{}", result.termination);
        for (fitted, truth) in result.parameters.iter().zip(TRUTH.iter()) {
            assert_relative_eq!(*fitted, *truth, epsilon = 1e-6);
        }
        assert!(result.chisq_final < 1e-10);
        assert_eq!(result.covariance.shape(), &[5, 5]);
        assert_eq!(result.model.name, "GaussianPlusBackground");

        // evaluator left at the best-fit values
        assert_eq!(evaluator.linear_parameters(), result.linear_parameters());
        assert_eq!(evaluator.nonlinear_parameters(), result.nonlinear_parameters());
    }

    #[test]
    fn test_fit_with_finite_differences() {
        let mut evaluator = GaussianEvaluator::new(9, TRUTH, [20.0, 1.0, 4.0, 4.0, 1.6]);
        let fitter = LevMarFitter::with_config(
            LmConfig::default().with_differentiation_method(DiffMethod::FiniteDifference {
                delta: 1e-6,
            }),
        );

        let result = fitter.apply(&mut evaluator).unwrap();
        for (fitted, truth) in result.parameters.iter().zip(TRUTH.iter()) {
            assert_relative_eq!(*fitted, *truth, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_exact_start_is_small_residual() {
        let mut evaluator = GaussianEvaluator::new(7, TRUTH, TRUTH);
        let result = LevMarFitter::new(None).unwrap().apply(&mut evaluator).unwrap();

        assert_eq!(result.termination, Termination::SmallResidual);
        assert_relative_eq!(result.chisq_final, 0.0, epsilon = 1e-20);
        assert_eq!(result.n_iterations, 0);
        assert_eq!(evaluator.set_calls, 0);
    }

    #[test]
    fn test_unchanged_candidate_is_not_reapplied() {
        let mut evaluator = GaussianEvaluator::new(7, TRUTH, [20.0, 1.0, 4.0, 4.0, 1.6]);
        let result = LevMarFitter::new(None).unwrap().apply(&mut evaluator).unwrap();

        // two setter calls per real update; the Jacobian at an accepted point
        // reuses the parameters pushed for its model image
        assert!(evaluator.set_calls / 2 <= result.n_function_evaluations + 1);
    }

    #[test]
    fn test_iteration_limit_from_policy() {
        let policy = LmPolicy {
            iteration_max: Some(2),
            ..Default::default()
        };
        let mut evaluator = GaussianEvaluator::new(7, TRUTH, [5.0, 0.0, 3.0, 5.0, 2.5]);
        let result = LevMarFitter::new(Some(policy)).unwrap().apply(&mut evaluator).unwrap();

        assert_eq!(result.termination, Termination::MaxIterations);
        assert_eq!(result.n_iterations, 2);
    }

    #[test]
    fn test_default_policy_is_fully_populated() {
        let policy = LevMarFitter::new(None).unwrap().policy();
        assert!(policy.iteration_max.is_some());
        assert!(policy.tau.is_some());
        assert!(policy.gradient_epsilon.is_some());
        assert!(policy.parameter_epsilon.is_some());
        assert!(policy.residual_epsilon.is_some());
        assert!(policy.do_analytic_jacobian.is_some());
    }

    #[test]
    fn test_check_derivatives_restores_parameters() {
        let mut evaluator = GaussianEvaluator::new(7, TRUTH, [20.0, 1.0, 4.0, 4.0, 1.6]);
        let fitter = LevMarFitter::new(None).unwrap();

        let discrepancy = fitter.check_derivatives(&mut evaluator).unwrap();
        assert_eq!(discrepancy.len(), 49);
        assert!(discrepancy.iter().all(|&d| d < 0.5));
        assert_eq!(evaluator.linear_parameters(), array![20.0, 1.0]);
        assert_eq!(evaluator.nonlinear_parameters(), array![4.0, 4.0, 1.6]);
    }

    #[test]
    fn test_check_derivatives_flags_wrong_jacobian() {
        let mut evaluator = GaussianEvaluator::new(7, TRUTH, [20.0, 1.0, 4.0, 4.0, 1.6]);
        evaluator.corrupt_derivatives = true;

        let discrepancy = LevMarFitter::new(None)
            .unwrap()
            .check_derivatives(&mut evaluator)
            .unwrap();
        assert!(discrepancy.iter().any(|&d| d > 0.5));
    }

    #[test]
    fn test_check_derivatives_masked_pixel_scores_one() {
        let mut evaluator = GaussianEvaluator::new(7, TRUTH, [20.0, 1.0, 4.0, 4.0, 1.6]);
        evaluator.weights[0] = 0.0;

        let discrepancy = LevMarFitter::new(None)
            .unwrap()
            .check_derivatives(&mut evaluator)
            .unwrap();
        assert_eq!(discrepancy[0], 1.0);
        assert!(discrepancy.iter().skip(1).all(|&d| d < 0.5));
    }

    #[test]
    fn test_fit_result_interpretation() {
        let mut evaluator = GaussianEvaluator::new(9, TRUTH, [20.0, 1.0, 4.0, 4.0, 1.6]);
        let result = LevMarFitter::new(None).unwrap().apply(&mut evaluator).unwrap();

        let interpreter = result.interpret().unwrap();
        assert_eq!(interpreter.linear_mu(), result.linear_parameters());
        assert_eq!(interpreter.nonlinear_mu().len(), 3);
    }
}
