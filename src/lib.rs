//! Evaluation of the International Geomagnetic Reference Field.
//!
//! Load a [`CoefficientTable`] once, then evaluate the field at any number of positions:
//!
//! ```no_run
//! use igrfield::{igrf, CoefficientTable, Config, TableSelector};
//!
//! let table = CoefficientTable::load(TableSelector::Igrf14, &Config::from_env())?;
//! let field = igrf(&[10.0], &[60.0], &[0.5], 2022.75, &table)?;
//! println!("{} {} {}", field.east[0], field.north[0], field.up[0]);
//! # Ok::<(), igrfield::error::IgrfError>(())
//! ```
pub mod coefficients;
pub mod config;
pub mod error;
pub mod igrf;
pub mod synthesis;
pub mod utils;

pub use coefficients::{CoefficientTable, InterpolatedCoefficients, TableSelector};
pub use config::Config;
pub use igrf::{igrf, igrf_gc, igrf_point, igrf_to_degree, igrf_with_selector, FieldVector, MagneticField};
pub use synthesis::SphericalField;
pub use utils::dates::{datetime_to_year_fraction, year_fraction_to_datetime, ModelDate};

#[cfg(feature = "python")]
mod python {
    use crate::coefficients::{CoefficientTable, TableSelector};
    use crate::config::Config;
    use crate::error::IgrfError;
    use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;
    use std::path::PathBuf;

    type FieldArrays<'py> = (
        Bound<'py, PyArray1<f64>>,
        Bound<'py, PyArray1<f64>>,
        Bound<'py, PyArray1<f64>>,
    );

    fn load_table(table: &str, coeff_file: Option<PathBuf>) -> PyResult<CoefficientTable> {
        let table = match coeff_file {
            Some(path) => CoefficientTable::from_path(path),
            None => {
                let selector: TableSelector = table.parse().map_err(PyValueError::new_err)?;
                CoefficientTable::load(selector, &Config::from_env())
            }
        };
        Ok(table?)
    }

    /// Evaluates the IGRF at geodetic positions, returning the east, north and up
    /// components in nT.
    #[pyfunction]
    #[pyo3(name = "igrf")]
    #[pyo3(signature = (longitude, latitude, altitude, year, table = "igrf14", coeff_file = None))]
    fn igrf_py<'py>(
        py: Python<'py>,
        longitude: PyReadonlyArray1<'py, f64>,
        latitude: PyReadonlyArray1<'py, f64>,
        altitude: PyReadonlyArray1<'py, f64>,
        year: f64,
        table: &str,
        coeff_file: Option<PathBuf>,
    ) -> PyResult<FieldArrays<'py>> {
        let table = load_table(table, coeff_file)?;
        let field = crate::igrf::igrf(
            longitude.as_slice()?,
            latitude.as_slice()?,
            altitude.as_slice()?,
            year,
            &table,
        )
        .map_err(PyErr::from)?;
        Ok((
            field.east.into_pyarray_bound(py),
            field.north.into_pyarray_bound(py),
            field.up.into_pyarray_bound(py),
        ))
    }

    /// Converts a fractional year to its position in time as an ISO 8601 string.
    #[pyfunction]
    #[pyo3(name = "year_fraction_to_isoformat")]
    fn year_fraction_to_isoformat_py(year: f64) -> PyResult<String> {
        let datetime = crate::utils::dates::year_fraction_to_datetime(year)
            .map_err(|e: IgrfError| PyErr::from(e))?;
        Ok(datetime.format("%Y-%m-%dT%H:%M:%S").to_string())
    }

    /// Geomagnetic field evaluation with the IGRF.
    #[pymodule]
    fn igrfield(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(igrf_py, m)?)?;
        m.add_function(wrap_pyfunction!(year_fraction_to_isoformat_py, m)?)?;
        Ok(())
    }
}
