//! Gauss coefficient tables and their evaluation in time.
//!
//! Coefficients of degree `n` and order `m` are stored in flat arrays at
//! [`term_index`]`(n, m)`. The same layout is used by the Legendre evaluator, so
//! coefficients and Legendre functions line up term by term.
pub mod interpolation;
pub mod reader;
pub mod table;

pub use interpolation::InterpolatedCoefficients;
pub use table::{CoefficientTable, TableSelector};

/// Position of the term of degree `n` and order `m` (`m <= n`) in a flat array.
#[inline]
pub const fn term_index(n: usize, m: usize) -> usize {
    n * (n + 1) / 2 + m
}

/// Length of a flat array holding every term up to degree `n_max`, including the
/// unused degree-zero slot.
#[inline]
pub const fn num_terms(n_max: usize) -> usize {
    (n_max + 1) * (n_max + 2) / 2
}
