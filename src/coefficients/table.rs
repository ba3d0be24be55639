use crate::coefficients::{num_terms, reader, term_index};
use crate::config::Config;
use crate::error::{IgrfError, Result};
use itertools::Itertools;
use ndarray::{Array1, Array2, ArrayView1};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// The released coefficient table generations this crate knows how to locate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TableSelector {
    Igrf13,
    #[default]
    Igrf14,
}

impl TableSelector {
    pub fn generation(&self) -> u32 {
        match self {
            TableSelector::Igrf13 => 13,
            TableSelector::Igrf14 => 14,
        }
    }

    /// Name of the coefficient file as distributed by IAGA.
    pub fn file_name(&self) -> &'static str {
        match self {
            TableSelector::Igrf13 => "igrf13coeffs.txt",
            TableSelector::Igrf14 => "igrf14coeffs.txt",
        }
    }
}

impl fmt::Display for TableSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "igrf{}", self.generation())
    }
}

impl FromStr for TableSelector {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "igrf13" | "igrf-13" | "13" => Ok(TableSelector::Igrf13),
            "igrf14" | "igrf-14" | "14" => Ok(TableSelector::Igrf14),
            other => Err(format!("unknown coefficient table '{other}'")),
        }
    }
}

/// Gauss coefficients tabulated at a series of epochs, plus the secular variation
/// used to extrapolate past the last epoch.
///
/// Tables are immutable once built and can be shared between threads freely.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientTable {
    pub(crate) generation: Option<u32>,
    pub(crate) epochs: Vec<f64>,
    pub(crate) max_degree: usize,
    /// g coefficients, one row per epoch, one column per term
    pub(crate) g: Array2<f64>,
    /// h coefficients, one row per epoch, one column per term
    pub(crate) h: Array2<f64>,
    pub(crate) sv_g: Array1<f64>,
    pub(crate) sv_h: Array1<f64>,
    /// Number of years after the last epoch for which the secular variation is valid
    pub(crate) sv_window: f64,
}

impl CoefficientTable {
    /// Builds a table from coefficient arrays laid out by [`term_index`].
    ///
    /// # Errors
    /// Returns `IgrfError::Format` (reported at line 0, the table as a whole) if the
    /// epochs are not strictly increasing or the array shapes disagree.
    pub fn new(
        generation: Option<u32>,
        epochs: Vec<f64>,
        max_degree: usize,
        g: Array2<f64>,
        h: Array2<f64>,
        sv_g: Array1<f64>,
        sv_h: Array1<f64>,
        sv_window: f64,
    ) -> Result<Self> {
        if epochs.is_empty() {
            Err(IgrfError::format(0, "table has no epochs"))?
        }
        if max_degree == 0 {
            Err(IgrfError::format(0, "table has no coefficients of degree 1 or above"))?
        }
        if let Some((a, b)) = epochs
            .iter()
            .tuple_windows()
            .find(|(a, b)| !(a < b))
        {
            Err(IgrfError::format(
                0,
                format!("epochs are not strictly increasing ({a} is followed by {b})"),
            ))?
        }
        let shape = [epochs.len(), num_terms(max_degree)];
        if g.shape() != shape || h.shape() != shape {
            Err(IgrfError::format(
                0,
                format!("coefficient arrays must have shape {shape:?}"),
            ))?
        }
        if sv_g.len() != shape[1] || sv_h.len() != shape[1] {
            Err(IgrfError::format(
                0,
                format!("secular variation arrays must have length {}", shape[1]),
            ))?
        }
        if !(sv_window.is_finite() && sv_window >= 0.0) {
            Err(IgrfError::format(0, "secular variation window must be finite"))?
        }
        Ok(CoefficientTable {
            generation,
            epochs,
            max_degree,
            g,
            h,
            sv_g,
            sv_h,
            sv_window,
        })
    }

    /// Reads a coefficient table from a file in either the IAGA coefficient format or the
    /// SHC format.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| IgrfError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = reader::parse_table(&contents)?;
        debug!(
            path = %path.display(),
            generation = ?table.generation,
            epochs = table.epochs.len(),
            max_degree = table.max_degree,
            "loaded coefficient table"
        );
        Ok(table)
    }

    /// Loads the table of the selected generation from the configured coefficient directory.
    ///
    /// # Errors
    /// Fails with `IgrfError::Format` if the file names a different generation than the
    /// one selected.
    pub fn load(selector: TableSelector, config: &Config) -> Result<Self> {
        let table = Self::from_path(config.table_path(selector))?;
        match table.generation {
            Some(generation) if generation != selector.generation() => Err(IgrfError::format(
                1,
                format!("expected a {selector} table, found generation {generation}"),
            )),
            _ => Ok(table),
        }
    }

    pub fn generation(&self) -> Option<u32> {
        self.generation
    }

    pub fn epochs(&self) -> &[f64] {
        &self.epochs
    }

    pub fn first_epoch(&self) -> f64 {
        self.epochs[0]
    }

    pub fn last_epoch(&self) -> f64 {
        self.epochs[self.epochs.len() - 1]
    }

    pub fn max_degree(&self) -> usize {
        self.max_degree
    }

    pub fn secular_variation_window(&self) -> f64 {
        self.sv_window
    }

    /// The (g, h) pair of degree `n` and order `m` tabulated at epoch `epoch_index`.
    pub fn coefficient(&self, epoch_index: usize, n: usize, m: usize) -> Option<(f64, f64)> {
        if epoch_index >= self.epochs.len() || n == 0 || n > self.max_degree || m > n {
            return None;
        }
        let i = term_index(n, m);
        Some((self.g[[epoch_index, i]], self.h[[epoch_index, i]]))
    }

    /// The yearly rate of change of (g, h) for degree `n` and order `m`.
    pub fn secular_variation(&self, n: usize, m: usize) -> Option<(f64, f64)> {
        if n == 0 || n > self.max_degree || m > n {
            return None;
        }
        let i = term_index(n, m);
        Some((self.sv_g[i], self.sv_h[i]))
    }

    pub(crate) fn epoch_g(&self, epoch_index: usize) -> ArrayView1<f64> {
        self.g.row(epoch_index)
    }

    pub(crate) fn epoch_h(&self, epoch_index: usize) -> ArrayView1<f64> {
        self.h.row(epoch_index)
    }
}

impl FromStr for CoefficientTable {
    type Err = IgrfError;

    fn from_str(s: &str) -> Result<Self> {
        reader::parse_table(s)
    }
}
