use crate::coefficients::TableSelector;
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable naming the directory that holds the coefficient files.
pub const COEFF_DIR_ENV: &str = "IGRF_COEFF_DIR";

/// Directory searched when `IGRF_COEFF_DIR` is not set.
pub const DEFAULT_COEFF_DIR: &str = "coefficients";

/// Where coefficient tables are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub coefficient_dir: PathBuf,
}

impl Config {
    pub fn new(coefficient_dir: impl AsRef<Path>) -> Self {
        Config {
            coefficient_dir: coefficient_dir.as_ref().to_path_buf(),
        }
    }

    /// Reads the coefficient directory from `IGRF_COEFF_DIR`, falling back to
    /// `./coefficients`.
    pub fn from_env() -> Self {
        match env::var_os(COEFF_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Config::new(dir),
            _ => Config::new(DEFAULT_COEFF_DIR),
        }
    }

    /// Path of the file holding the selected table.
    pub fn table_path(&self, selector: TableSelector) -> PathBuf {
        self.coefficient_dir.join(selector.file_name())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(DEFAULT_COEFF_DIR)
    }
}
