//! Schmidt semi-normalised associated Legendre functions.
//!
//! Values are built bottom-up on a flat `(n, m)` grid with the standard recurrences:
//!
//! * diagonal: `P(1,1) = sinθ`, `P(n,n) = sqrt((2n-1)/2n) sinθ P(n-1,n-1)`
//! * below the diagonal:
//!   `P(n,m) = ((2n-1) cosθ P(n-1,m) - sqrt((n-1)²-m²) P(n-2,m)) / sqrt(n²-m²)`
//!
//! Each row of the tables holds one `(n, m)` term for every colatitude, so a whole batch
//! of positions advances through the recurrence together.
use crate::coefficients::{num_terms, term_index};
use crate::error::{IgrfError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use std::f64::consts::PI;

#[derive(Debug, Clone)]
pub struct LegendreTable {
    max_degree: usize,
    /// P(n,m)(cosθ)
    pub p: Array2<f64>,
    /// dP(n,m)/dθ
    pub dp: Array2<f64>,
    /// P(n,m)(cosθ) / sinθ for m >= 1, zero for m = 0. Finite at the poles.
    pub p_over_sin: Array2<f64>,
}

impl LegendreTable {
    /// Evaluates every function up to degree `max_degree` at each colatitude (radians).
    ///
    /// # Errors
    /// Returns `IgrfError::Domain` naming the first colatitude outside [0, pi].
    pub fn new(max_degree: usize, colatitudes: ArrayView1<f64>) -> Result<Self> {
        if let Some((index, &value)) = colatitudes
            .iter()
            .enumerate()
            .find(|(_, theta)| !(0.0..=PI).contains(*theta))
        {
            Err(IgrfError::Domain {
                index,
                coordinate: "colatitude",
                value,
                reason: "must lie within [0, pi] radians",
            })?
        }

        let points = colatitudes.len();
        let cos = colatitudes.mapv(f64::cos);
        let sin = colatitudes.mapv(f64::sin);
        let shape = (num_terms(max_degree), points);
        let mut p = Array2::<f64>::zeros(shape);
        let mut dp = Array2::<f64>::zeros(shape);
        let mut p_over_sin = Array2::<f64>::zeros(shape);
        p.row_mut(0).fill(1.0);

        for n in 1..=max_degree {
            let nf = n as f64;

            // Diagonal term from the previous diagonal
            let (scale, previous) = if n == 1 {
                (1.0, term_index(0, 0))
            } else {
                (((2.0 * nf - 1.0) / (2.0 * nf)).sqrt(), term_index(n - 1, n - 1))
            };
            let diag = term_index(n, n);
            let p_prev = p.row(previous).to_owned();
            let dp_prev = dp.row(previous).to_owned();
            p.row_mut(diag).assign(&(&sin * &p_prev * scale));
            dp.row_mut(diag)
                .assign(&((&cos * &p_prev + &sin * &dp_prev) * scale));
            let q_diag = if n == 1 {
                Array1::ones(points)
            } else {
                &sin * &p_over_sin.row(previous) * scale
            };
            p_over_sin.row_mut(diag).assign(&q_diag);

            // Remaining orders climb in degree from the diagonal
            for m in 0..n {
                let mf = m as f64;
                let i = term_index(n, m);
                let i1 = term_index(n - 1, m);
                let a = (2.0 * nf - 1.0) / (nf * nf - mf * mf).sqrt();
                let b = if n >= m + 2 {
                    ((nf - 1.0).powi(2) - mf * mf).sqrt() / (nf * nf - mf * mf).sqrt()
                } else {
                    0.0
                };
                let recur = |table: &Array2<f64>, current: Array1<f64>| -> Array1<f64> {
                    if b == 0.0 {
                        current * a
                    } else {
                        current * a - &table.row(term_index(n - 2, m)) * b
                    }
                };

                let p_next = recur(&p, &cos * &p.row(i1));
                let dp_next = recur(&dp, &cos * &dp.row(i1) - &sin * &p.row(i1));
                p.row_mut(i).assign(&p_next);
                dp.row_mut(i).assign(&dp_next);
                if m > 0 {
                    let q_next = recur(&p_over_sin, &cos * &p_over_sin.row(i1));
                    p_over_sin.row_mut(i).assign(&q_next);
                }
            }
        }

        Ok(LegendreTable {
            max_degree,
            p,
            dp,
            p_over_sin,
        })
    }

    pub fn max_degree(&self) -> usize {
        self.max_degree
    }
}
