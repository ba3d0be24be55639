//! Conversions between calendar dates and fractional years.
//!
//! A fractional year is `year + elapsed / length`, where `elapsed` is the time since
//! January 1st 00:00 of `year` and `length` is the length of that calendar year
//! (365 or 366 days). Both are measured in seconds, so leap years are handled
//! consistently and the conversion is invertible to the second.
use crate::error::{IgrfError, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

fn start_of_year(year: i32) -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| IgrfError::InvalidDate(format!("year {year} is not representable")))
}

fn seconds_in_year(year: i32) -> Result<i64> {
    Ok((start_of_year(year + 1)? - start_of_year(year)?).num_seconds())
}

/// Converts a date-time into a fractional year.
pub fn datetime_to_year_fraction(datetime: NaiveDateTime) -> Result<f64> {
    let year = datetime.year();
    let elapsed = datetime - start_of_year(year)?;
    let elapsed_seconds =
        elapsed.num_seconds() as f64 + elapsed.subsec_nanos() as f64 * 1e-9;
    Ok(year as f64 + elapsed_seconds / seconds_in_year(year)? as f64)
}

/// Converts a fractional year back into a date-time, rounded to the nearest second.
pub fn year_fraction_to_datetime(year_fraction: f64) -> Result<NaiveDateTime> {
    if !year_fraction.is_finite() {
        Err(IgrfError::InvalidDate(format!("{year_fraction}")))?
    }
    let year = year_fraction.floor();
    if year < i32::MIN as f64 || year > (i32::MAX - 1) as f64 {
        Err(IgrfError::InvalidDate(format!("{year_fraction}")))?
    }
    let year = year as i32;
    let offset =
        ((year_fraction - year as f64) * seconds_in_year(year)? as f64).round() as i64;
    start_of_year(year)?
        .checked_add_signed(Duration::seconds(offset))
        .ok_or_else(|| IgrfError::InvalidDate(format!("{year_fraction}")))
}

/// A date at which the field is evaluated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelDate {
    Calendar(NaiveDateTime),
    YearFraction(f64),
}

impl ModelDate {
    /// The date as a fractional year.
    pub fn year_fraction(&self) -> Result<f64> {
        match self {
            ModelDate::Calendar(datetime) => datetime_to_year_fraction(*datetime),
            ModelDate::YearFraction(year) if year.is_finite() => Ok(*year),
            ModelDate::YearFraction(year) => Err(IgrfError::InvalidDate(format!("{year}"))),
        }
    }
}

impl From<NaiveDateTime> for ModelDate {
    fn from(value: NaiveDateTime) -> Self {
        ModelDate::Calendar(value)
    }
}

impl From<NaiveDate> for ModelDate {
    fn from(value: NaiveDate) -> Self {
        ModelDate::Calendar(value.and_time(NaiveTime::default()))
    }
}

impl From<f64> for ModelDate {
    fn from(value: f64) -> Self {
        ModelDate::YearFraction(value)
    }
}
