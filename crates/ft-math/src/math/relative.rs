//! Relative difference between a candidate and a reference aggregate.
//!
//! `|candidate - reference| / reference`, with a fixed policy for a zero
//! reference:
//! - both zero: `0.0`
//! - reference zero, candidate non-zero: [`MAX_DIFFERENCE`]

use serde::{Deserialize, Serialize};

/// Lower bound of an acceptable tolerance.
pub const MIN_TOLERANCE: f64 = 0.0;

/// Upper bound of an acceptable tolerance.
pub const MAX_TOLERANCE: f64 = 1.0;

/// Difference assigned to a non-zero candidate against a zero reference.
///
/// Only a tolerance of exactly [`MAX_TOLERANCE`] accepts it.
pub const MAX_DIFFERENCE: f64 = 1.0;

/// Relative difference of two aggregates.
pub fn relative_difference(candidate: f64, reference: f64) -> f64 {
    if candidate.is_nan() || reference.is_nan() {
        return f64::NAN;
    }
    if reference == 0.0 {
        return if candidate == 0.0 { 0.0 } else { MAX_DIFFERENCE };
    }
    (candidate - reference).abs() / reference.abs()
}

/// Relative difference of two counters.
pub fn relative_difference_u64(candidate: u64, reference: u64) -> f64 {
    if reference == 0 {
        return if candidate == 0 { 0.0 } else { MAX_DIFFERENCE };
    }
    candidate.abs_diff(reference) as f64 / reference as f64
}

/// Whether `tolerance` lies in the closed interval [0.0, 1.0].
///
/// NaN is never valid.
pub fn is_valid_tolerance(tolerance: f64) -> bool {
    (MIN_TOLERANCE..=MAX_TOLERANCE).contains(&tolerance)
}

/// Pass test: `difference <= tolerance`. NaN never passes.
pub fn within_tolerance(difference: f64, tolerance: f64) -> bool {
    difference <= tolerance
}

/// A candidate/reference pair and its relative difference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub candidate: u64,
    pub reference: u64,
    pub difference: f64,
}

impl Comparison {
    pub fn new(candidate: u64, reference: u64) -> Self {
        Comparison {
            candidate,
            reference,
            difference: relative_difference_u64(candidate, reference),
        }
    }

    pub fn passes(&self, tolerance: f64) -> bool {
        within_tolerance(self.difference, tolerance)
    }
}
