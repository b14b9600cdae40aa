//! Configuration options for the Levenberg-Marquardt fitter.
//!
//! Configuration is layered. An [`LmPolicy`] holds any subset of the
//! recognised options; the built-in [`DEFAULT_POLICY`] document fills the
//! gaps through [`LmPolicy::merge_defaults`], and the merged policy is then
//! validated into a concrete [`LmConfig`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MultifitError, Result};

/// Built-in defaults, matching the stock constants of the levmar library.
pub const DEFAULT_POLICY: &str = r#"{
    "iterationMax": 100,
    "tau": 1e-3,
    "gradientEpsilon": 1e-17,
    "parameterEpsilon": 1e-17,
    "residualEpsilon": 1e-17,
    "delta": 1e-6,
    "doAnalyticJacobian": true
}"#;

/// Finite-difference step used when an analytic Jacobian is requested but
/// the problem does not provide one.
pub const DEFAULT_DELTA: f64 = 1e-6;

/// Method for calculating the Jacobian matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DiffMethod {
    /// Use the analytic derivatives provided by the evaluator
    Analytical,

    /// Approximate the Jacobian with finite differences.
    ///
    /// A positive `delta` selects forward differences, a negative one central
    /// differences with step `|delta|`.
    FiniteDifference { delta: f64 },
}

impl Default for DiffMethod {
    fn default() -> Self {
        DiffMethod::Analytical
    }
}

/// A partial set of fitter options.
///
/// Field names follow the camelCase keys used in policy documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LmPolicy {
    /// Maximum number of iterations
    pub iteration_max: Option<usize>,

    /// Scale factor for the initial damping, `mu = tau * max(diag(JᵀJ))`
    pub tau: Option<f64>,

    /// Stop when `||Jᵀe||∞` falls to or below this value
    pub gradient_epsilon: Option<f64>,

    /// Stop when `||Δp||` falls to or below this fraction of `||p||`
    pub parameter_epsilon: Option<f64>,

    /// Stop when `||e||²` falls to or below this value
    pub residual_epsilon: Option<f64>,

    /// Finite-difference step, only consulted without an analytic Jacobian
    pub delta: Option<f64>,

    /// Whether to use the evaluator's analytic derivatives
    pub do_analytic_jacobian: Option<bool>,
}

impl LmPolicy {
    /// Parse a policy from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a policy from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// The built-in default policy.
    pub fn defaults() -> Result<Self> {
        Self::from_json_str(DEFAULT_POLICY)
    }

    /// Fill every unset option from `defaults`; options already set win.
    pub fn merge_defaults(&mut self, defaults: &LmPolicy) {
        self.iteration_max = self.iteration_max.or(defaults.iteration_max);
        self.tau = self.tau.or(defaults.tau);
        self.gradient_epsilon = self.gradient_epsilon.or(defaults.gradient_epsilon);
        self.parameter_epsilon = self.parameter_epsilon.or(defaults.parameter_epsilon);
        self.residual_epsilon = self.residual_epsilon.or(defaults.residual_epsilon);
        self.delta = self.delta.or(defaults.delta);
        self.do_analytic_jacobian = self.do_analytic_jacobian.or(defaults.do_analytic_jacobian);
    }
}

fn required<T>(value: Option<T>, key: &str) -> Result<T> {
    value.ok_or_else(|| {
        MultifitError::InvalidConfiguration(format!("option '{}' is not set", key))
    })
}

fn non_negative(value: f64, key: &str) -> Result<f64> {
    if !(value >= 0.0) {
        return Err(MultifitError::InvalidConfiguration(format!(
            "option '{}' must be >= 0, got {}",
            key, value
        )));
    }
    Ok(value)
}

/// Concrete configuration for the Levenberg-Marquardt solver.
#[derive(Debug, Clone, PartialEq)]
pub struct LmConfig {
    /// Maximum number of iterations. Default: 100
    pub max_iterations: usize,

    /// Initial damping scale. Default: 1e-3
    pub tau: f64,

    /// Tolerance for `||Jᵀe||∞`. Default: 1e-17
    pub gradient_epsilon: f64,

    /// Relative tolerance for the step size. Default: 1e-17
    pub parameter_epsilon: f64,

    /// Tolerance for `||e||²`. Default: 1e-17
    pub residual_epsilon: f64,

    /// Method to use for calculating the Jacobian. Default: Analytical
    pub diff_method: DiffMethod,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tau: 1e-3,
            gradient_epsilon: 1e-17,
            parameter_epsilon: 1e-17,
            residual_epsilon: 1e-17,
            diff_method: DiffMethod::default(),
        }
    }
}

impl LmConfig {
    /// Build a configuration from an optional user policy merged over the
    /// built-in defaults.
    pub fn from_policy(policy: Option<LmPolicy>) -> Result<Self> {
        let mut policy = policy.unwrap_or_default();
        policy.merge_defaults(&LmPolicy::defaults()?);
        Self::try_from(policy)
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the initial damping scale.
    pub fn with_tau(mut self, tau: f64) -> Self {
        self.tau = tau;
        self
    }

    /// Set the gradient tolerance.
    pub fn with_gradient_epsilon(mut self, epsilon: f64) -> Self {
        self.gradient_epsilon = epsilon;
        self
    }

    /// Set the relative step tolerance.
    pub fn with_parameter_epsilon(mut self, epsilon: f64) -> Self {
        self.parameter_epsilon = epsilon;
        self
    }

    /// Set the residual tolerance.
    pub fn with_residual_epsilon(mut self, epsilon: f64) -> Self {
        self.residual_epsilon = epsilon;
        self
    }

    /// Set the method used for calculating the Jacobian.
    pub fn with_differentiation_method(mut self, method: DiffMethod) -> Self {
        self.diff_method = method;
        self
    }

    /// Express this configuration as a fully populated policy.
    pub fn to_policy(&self) -> LmPolicy {
        let (do_analytic_jacobian, delta) = match self.diff_method {
            DiffMethod::Analytical => (true, None),
            DiffMethod::FiniteDifference { delta } => (false, Some(delta)),
        };
        LmPolicy {
            iteration_max: Some(self.max_iterations),
            tau: Some(self.tau),
            gradient_epsilon: Some(self.gradient_epsilon),
            parameter_epsilon: Some(self.parameter_epsilon),
            residual_epsilon: Some(self.residual_epsilon),
            delta,
            do_analytic_jacobian: Some(do_analytic_jacobian),
        }
    }
}

impl TryFrom<LmPolicy> for LmConfig {
    type Error = MultifitError;

    fn try_from(policy: LmPolicy) -> Result<Self> {
        let tau = required(policy.tau, "tau")?;
        if !(tau > 0.0) {
            return Err(MultifitError::InvalidConfiguration(format!(
                "option 'tau' must be > 0, got {}",
                tau
            )));
        }

        let diff_method = if required(policy.do_analytic_jacobian, "doAnalyticJacobian")? {
            DiffMethod::Analytical
        } else {
            let delta = required(policy.delta, "delta")?;
            if delta == 0.0 || !delta.is_finite() {
                return Err(MultifitError::InvalidConfiguration(format!(
                    "option 'delta' must be finite and nonzero, got {}",
                    delta
                )));
            }
            DiffMethod::FiniteDifference { delta }
        };

        Ok(Self {
            max_iterations: required(policy.iteration_max, "iterationMax")?,
            tau,
            gradient_epsilon: non_negative(
                required(policy.gradient_epsilon, "gradientEpsilon")?,
                "gradientEpsilon",
            )?,
            parameter_epsilon: non_negative(
                required(policy.parameter_epsilon, "parameterEpsilon")?,
                "parameterEpsilon",
            )?,
            residual_epsilon: non_negative(
                required(policy.residual_epsilon, "residualEpsilon")?,
                "residualEpsilon",
            )?,
            diff_method,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_sets_every_option() {
        let defaults = LmPolicy::defaults().unwrap();
        assert_eq!(defaults.iteration_max, Some(100));
        assert_eq!(defaults.tau, Some(1e-3));
        assert!(defaults.gradient_epsilon.is_some());
        assert!(defaults.parameter_epsilon.is_some());
        assert!(defaults.residual_epsilon.is_some());
        assert_eq!(defaults.delta, Some(DEFAULT_DELTA));
        assert_eq!(defaults.do_analytic_jacobian, Some(true));
    }

    #[test]
    fn test_from_policy_without_overrides_matches_default() {
        assert_eq!(LmConfig::from_policy(None).unwrap(), LmConfig::default());
    }

    #[test]
    fn test_merge_keeps_explicit_values() {
        let policy = LmPolicy {
            iteration_max: Some(7),
            do_analytic_jacobian: Some(false),
            ..Default::default()
        };
        let config = LmConfig::from_policy(Some(policy)).unwrap();

        assert_eq!(config.max_iterations, 7);
        assert_eq!(config.tau, 1e-3);
        assert_eq!(config.diff_method, DiffMethod::FiniteDifference { delta: 1e-6 });
    }

    #[test]
    fn test_policy_json_keys() {
        let policy = LmPolicy::from_json_str(r#"{"iterationMax": 12, "delta": -1e-5}"#).unwrap();
        assert_eq!(policy.iteration_max, Some(12));
        assert_eq!(policy.delta, Some(-1e-5));
        assert_eq!(policy.tau, None);

        assert!(LmPolicy::from_json_str(r#"{"maxIter": 12}"#).is_err());
    }

    #[test]
    fn test_missing_option_is_reported() {
        let err = LmConfig::try_from(LmPolicy::default()).unwrap_err();
        assert!(matches!(err, MultifitError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_out_of_range_options() {
        let bad_tau = LmPolicy {
            tau: Some(0.0),
            ..Default::default()
        };
        assert!(LmConfig::from_policy(Some(bad_tau)).is_err());

        let bad_epsilon = LmPolicy {
            residual_epsilon: Some(-1.0),
            ..Default::default()
        };
        assert!(LmConfig::from_policy(Some(bad_epsilon)).is_err());

        let bad_delta = LmPolicy {
            do_analytic_jacobian: Some(false),
            delta: Some(0.0),
            ..Default::default()
        };
        assert!(LmConfig::from_policy(Some(bad_delta)).is_err());
    }

    #[test]
    fn test_to_policy_roundtrip() {
        let config = LmConfig::default()
            .with_max_iterations(42)
            .with_differentiation_method(DiffMethod::FiniteDifference { delta: 1e-4 });
        let rebuilt = LmConfig::try_from(config.to_policy()).unwrap();
        assert_eq!(rebuilt, config);
    }
}
