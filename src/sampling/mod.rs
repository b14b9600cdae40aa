//! Grid sampling of ellipse shape parameters.
//!
//! The pieces, leaves first: [`ellipse`] geometry, the [`grid`] of
//! ellipticities, the caller-supplied [`objective`], the [`sample`]
//! containers and the [`naive_grid`] sampler that ties them together.

pub mod ellipse;
pub mod grid;
pub mod naive_grid;
pub mod objective;
pub mod sample;

pub use ellipse::{Ellipse, EllipseCore, Point2D};
pub use grid::{count_samples, EllipticityGrid};
pub use naive_grid::NaiveGridSampler;
pub use objective::{objective_fn, FnObjective, Objective};
pub use sample::{SamplePoint, SampleSet};
