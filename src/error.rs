use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = IgrfError> = std::result::Result<T, E>;

/// Errors raised while loading coefficient tables or evaluating the field.
#[derive(Error, Debug)]
pub enum IgrfError {
    /// Represents a malformed coefficient table
    #[error("malformed coefficient table at line {line}: {reason}")]
    Format { line: usize, reason: String },

    /// The query date precedes the first tabulated epoch
    #[error("date {year:.4} precedes the first model epoch {first_epoch:.1}")]
    DateBeforeFirstEpoch { year: f64, first_epoch: f64 },

    /// The date cannot be represented as a calendar date or a fractional year
    #[error("invalid date {0}")]
    InvalidDate(String),

    /// Requested truncation degree is not available in the table
    #[error("truncation degree {requested} is outside the table's range 1..={available}")]
    DegreeOutOfRange { requested: usize, available: usize },

    /// A coordinate lies outside its physically valid range
    #[error("invalid {coordinate} at index {index}: {value} ({reason})")]
    Domain {
        index: usize,
        coordinate: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// Coordinate arrays of a batched query have different lengths
    #[error("coordinate arrays differ in length: {0}")]
    LengthMismatch(String),

    /// Unable to read a coefficient file
    #[error("unable to read coefficient file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IgrfError {
    pub(crate) fn format(line: usize, reason: impl Into<String>) -> Self {
        IgrfError::Format {
            line,
            reason: reason.into(),
        }
    }

    /// True for the errors that belong to the "range" family: the model is
    /// undefined for the requested date or degree.
    pub fn is_range_error(&self) -> bool {
        matches!(
            self,
            IgrfError::DateBeforeFirstEpoch { .. }
                | IgrfError::DegreeOutOfRange { .. }
                | IgrfError::InvalidDate(_)
        )
    }
}

#[cfg(feature = "python")]
impl From<IgrfError> for pyo3::PyErr {
    fn from(value: IgrfError) -> Self {
        let msg = value.to_string();
        pyo3::exceptions::PyValueError::new_err(msg)
    }
}
