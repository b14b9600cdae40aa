//! The quantity a sampler evaluates at each grid point.

use super::ellipse::Ellipse;

/// A scalar objective of an ellipse.
///
/// `evaluate` returns the joint value for the ellipse, conventionally the
/// negative log of the unnormalised posterior with the linear parameters
/// marginalised out. Implementations must be pure: the sampler may call
/// them in any order and from several threads.
pub trait Objective {
    /// Number of linear parameters marginalised inside `evaluate`.
    fn linear_dim(&self) -> usize;

    /// Joint value at `ellipse`.
    fn evaluate(&self, ellipse: &Ellipse) -> f64;
}

impl<O: Objective + ?Sized> Objective for &O {
    fn linear_dim(&self) -> usize {
        (**self).linear_dim()
    }

    fn evaluate(&self, ellipse: &Ellipse) -> f64 {
        (**self).evaluate(ellipse)
    }
}

/// An [`Objective`] backed by a closure.
#[derive(Debug, Clone)]
pub struct FnObjective<F> {
    linear_dim: usize,
    func: F,
}

impl<F> FnObjective<F>
where
    F: Fn(&Ellipse) -> f64,
{
    pub fn new(linear_dim: usize, func: F) -> Self {
        Self { linear_dim, func }
    }
}

impl<F> Objective for FnObjective<F>
where
    F: Fn(&Ellipse) -> f64,
{
    fn linear_dim(&self) -> usize {
        self.linear_dim
    }

    fn evaluate(&self, ellipse: &Ellipse) -> f64 {
        (self.func)(ellipse)
    }
}

/// Wrap a closure as an [`Objective`] with the given linear dimension.
pub fn objective_fn<F>(linear_dim: usize, func: F) -> FnObjective<F>
where
    F: Fn(&Ellipse) -> f64,
{
    FnObjective::new(linear_dim, func)
}
