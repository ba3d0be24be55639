use crate::coefficients::table::CoefficientTable;
use crate::coefficients::{num_terms, term_index};
use crate::error::{IgrfError, Result};
use crate::utils::dates::ModelDate;
use ndarray::{s, Array1};
use tracing::warn;

/// Gauss coefficients evaluated at a single date.
///
/// These depend only on the date, so one set serves every position of a batched query.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedCoefficients {
    year: f64,
    max_degree: usize,
    pub(crate) g: Array1<f64>,
    pub(crate) h: Array1<f64>,
}

impl InterpolatedCoefficients {
    /// The fractional year the coefficients were evaluated at.
    pub fn year(&self) -> f64 {
        self.year
    }

    pub fn max_degree(&self) -> usize {
        self.max_degree
    }

    /// The (g, h) pair of degree `n` and order `m`.
    pub fn get(&self, n: usize, m: usize) -> Option<(f64, f64)> {
        if n == 0 || n > self.max_degree || m > n {
            return None;
        }
        let i = term_index(n, m);
        Some((self.g[i], self.h[i]))
    }

    /// Drops every term above degree `max_degree`.
    ///
    /// # Errors
    /// Returns `IgrfError::DegreeOutOfRange` if `max_degree` is 0 or larger than the
    /// degree of the table the coefficients came from.
    pub fn truncate(&self, max_degree: usize) -> Result<Self> {
        if max_degree == 0 || max_degree > self.max_degree {
            Err(IgrfError::DegreeOutOfRange {
                requested: max_degree,
                available: self.max_degree,
            })?
        }
        let terms = num_terms(max_degree);
        Ok(InterpolatedCoefficients {
            year: self.year,
            max_degree,
            g: self.g.slice(s![..terms]).to_owned(),
            h: self.h.slice(s![..terms]).to_owned(),
        })
    }
}

impl CoefficientTable {
    /// Evaluates the coefficients at a fractional year.
    ///
    /// Between two epochs the coefficients are interpolated linearly. At or after the last
    /// epoch they are extrapolated with the secular variation; dates past the window the
    /// secular variation was published for are still extrapolated, with a warning.
    ///
    /// # Errors
    /// Returns `IgrfError::DateBeforeFirstEpoch` for dates before the first epoch. The
    /// model is undefined there and dates are never clamped.
    pub fn coefficients_at(&self, year: f64) -> Result<InterpolatedCoefficients> {
        if !year.is_finite() {
            Err(IgrfError::InvalidDate(format!("{year}")))?
        }
        let first = self.first_epoch();
        let last = self.last_epoch();
        if year < first {
            Err(IgrfError::DateBeforeFirstEpoch {
                year,
                first_epoch: first,
            })?
        }

        let last_index = self.epochs.len() - 1;
        let (g, h) = if year >= last {
            let elapsed = year - last;
            if elapsed > self.sv_window {
                warn!(
                    year,
                    last_epoch = last,
                    window = self.sv_window,
                    "extrapolating secular variation past its validity window"
                );
            }
            (
                &self.epoch_g(last_index) + &(&self.sv_g * elapsed),
                &self.epoch_h(last_index) + &(&self.sv_h * elapsed),
            )
        } else {
            let i = self.epochs.partition_point(|&epoch| epoch <= year) - 1;
            let factor = (year - self.epochs[i]) / (self.epochs[i + 1] - self.epochs[i]);
            let interpolate = |start: ndarray::ArrayView1<f64>, end: ndarray::ArrayView1<f64>| {
                &start + &((&end - &start) * factor)
            };
            (
                interpolate(self.epoch_g(i), self.epoch_g(i + 1)),
                interpolate(self.epoch_h(i), self.epoch_h(i + 1)),
            )
        };

        Ok(InterpolatedCoefficients {
            year,
            max_degree: self.max_degree,
            g,
            h,
        })
    }

    /// Evaluates the coefficients at a calendar date or fractional year.
    pub fn coefficients_at_date(&self, date: impl Into<ModelDate>) -> Result<InterpolatedCoefficients> {
        self.coefficients_at(date.into().year_fraction()?)
    }
}
