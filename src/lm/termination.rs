//! Reasons the Levenberg-Marquardt solver stops.
//!
//! The numeric codes are the levmar library's `info[6]` values, so results
//! can be compared directly against fits produced by that library.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why an iterative fit terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Termination {
    /// `||Jᵀe||∞` fell below the gradient tolerance.
    SmallGradient,

    /// The proposed step was small relative to the parameters.
    SmallStep,

    /// The iteration cap was reached.
    MaxIterations,

    /// The augmented normal matrix was numerically singular.
    SingularMatrix,

    /// No step could reduce the residual any further.
    NoReduction,

    /// `||e||²` fell below the residual tolerance.
    SmallResidual,

    /// The model produced NaN or infinite values.
    InvalidValues,
}

impl Termination {
    /// All termination reasons, in code order.
    pub const ALL: [Termination; 7] = [
        Termination::SmallGradient,
        Termination::SmallStep,
        Termination::MaxIterations,
        Termination::SingularMatrix,
        Termination::NoReduction,
        Termination::SmallResidual,
        Termination::InvalidValues,
    ];

    /// Map a raw solver status code (1..=7) to a termination reason.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Termination::SmallGradient),
            2 => Some(Termination::SmallStep),
            3 => Some(Termination::MaxIterations),
            4 => Some(Termination::SingularMatrix),
            5 => Some(Termination::NoReduction),
            6 => Some(Termination::SmallResidual),
            7 => Some(Termination::InvalidValues),
            _ => None,
        }
    }

    /// The raw solver status code.
    pub fn code(self) -> i32 {
        match self {
            Termination::SmallGradient => 1,
            Termination::SmallStep => 2,
            Termination::MaxIterations => 3,
            Termination::SingularMatrix => 4,
            Termination::NoReduction => 5,
            Termination::SmallResidual => 6,
            Termination::InvalidValues => 7,
        }
    }

    /// Returns true if the fit met one of its tolerances.
    pub fn is_converged(self) -> bool {
        matches!(
            self,
            Termination::SmallGradient | Termination::SmallStep | Termination::SmallResidual
        )
    }

    /// Returns true if the fit stopped on a numerical difficulty.
    pub fn is_numerical_failure(self) -> bool {
        matches!(
            self,
            Termination::SingularMatrix | Termination::NoReduction | Termination::InvalidValues
        )
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Termination::SmallGradient => "stopped by small gradient J^T e",
            Termination::SmallStep => "stopped by small step",
            Termination::MaxIterations => "stopped by maximum iterations",
            Termination::SingularMatrix => "singular matrix",
            Termination::NoReduction => "no further error reduction is possible",
            Termination::SmallResidual => "stopped by small residual",
            Termination::InvalidValues => "stopped by invalid (NaN or Inf) model values",
        };
        f.write_str(text)
    }
}
