//! Utility functions and helpers for the multifit-rs library.

pub mod finite_difference;
pub mod matrix_convert;
