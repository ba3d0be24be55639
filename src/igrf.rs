//! Evaluation of the geomagnetic field at geodetic or geocentric positions.
//!
//! Batches are validated as a whole before anything is computed: if any position is
//! invalid the call fails, naming the first offending index, and no partial result is
//! returned.
use crate::coefficients::{CoefficientTable, InterpolatedCoefficients, TableSelector};
use crate::config::Config;
use crate::error::{IgrfError, Result};
use crate::synthesis::{synthesize, LegendreTable, SphericalField};
use crate::utils::constants::{CHUNK_SIZE, REFERENCE_RADIUS_KM, WGS84_B_KM};
use crate::utils::dates::ModelDate;
use crate::utils::geodesy::{geodetic_to_geocentric, spherical_to_enu, GeocentricPosition};
use ndarray::{Array1, Zip};
use rayon::prelude::*;
use std::f64::consts::PI;
use tracing::debug;

/// One field vector in the local geodetic frame, nT.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldVector {
    pub east: f64,
    pub north: f64,
    pub up: f64,
}

impl FieldVector {
    /// Total field intensity.
    pub fn intensity(&self) -> f64 {
        (self.east * self.east + self.north * self.north + self.up * self.up).sqrt()
    }

    /// Declination, degrees east of geodetic north.
    pub fn declination(&self) -> f64 {
        self.east.atan2(self.north).to_degrees()
    }

    /// Inclination, degrees below the horizontal.
    pub fn inclination(&self) -> f64 {
        (-self.up).atan2(self.east.hypot(self.north)).to_degrees()
    }
}

/// Field components at a batch of positions, in input order, nT.
#[derive(Debug, Clone, PartialEq)]
pub struct MagneticField {
    pub east: Array1<f64>,
    pub north: Array1<f64>,
    pub up: Array1<f64>,
}

impl MagneticField {
    pub fn len(&self) -> usize {
        self.east.len()
    }

    pub fn is_empty(&self) -> bool {
        self.east.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<FieldVector> {
        Some(FieldVector {
            east: *self.east.get(index)?,
            north: *self.north.get(index)?,
            up: *self.up.get(index)?,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = FieldVector> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }
}

fn check_lengths(lengths: [(&str, usize); 3]) -> Result<usize> {
    let n = lengths[0].1;
    if lengths.iter().any(|&(_, len)| len != n) {
        Err(IgrfError::LengthMismatch(
            lengths
                .iter()
                .map(|(name, len)| format!("{len} {name}"))
                .collect::<Vec<_>>()
                .join(", "),
        ))?
    }
    Ok(n)
}

fn coefficients(
    table: &CoefficientTable,
    date: ModelDate,
    max_degree: Option<usize>,
) -> Result<InterpolatedCoefficients> {
    let coeffs = table.coefficients_at_date(date)?;
    match max_degree {
        Some(n) => coeffs.truncate(n),
        None => Ok(coeffs),
    }
}

fn domain_error(index: usize, coordinate: &'static str, value: f64, reason: &'static str) -> IgrfError {
    IgrfError::Domain {
        index,
        coordinate,
        value,
        reason,
    }
}

/// Checks one geodetic position and converts it to geocentric coordinates.
fn geocentric_position(
    index: usize,
    longitude: f64,
    latitude: f64,
    altitude: f64,
) -> Result<GeocentricPosition> {
    if !longitude.is_finite() {
        Err(domain_error(index, "longitude", longitude, "must be finite"))?
    }
    if !(-90.0..=90.0).contains(&latitude) {
        Err(domain_error(index, "latitude", latitude, "must lie within [-90, 90] degrees"))?
    }
    if !(altitude.is_finite() && altitude > -WGS84_B_KM) {
        Err(domain_error(
            index,
            "altitude",
            altitude,
            "must be finite and above the centre of the Earth",
        ))?
    }
    Ok(geodetic_to_geocentric(latitude, altitude))
}

/// Evaluates one chunk of positions with whole-array operations.
fn synthesize_chunk(
    coeffs: &InterpolatedCoefficients,
    colatitudes: Array1<f64>,
    longitudes: Array1<f64>,
    radii: Array1<f64>,
) -> Result<SphericalField> {
    let legendre = LegendreTable::new(coeffs.max_degree(), colatitudes.view())?;
    let ratios = radii.mapv(|r| REFERENCE_RADIUS_KM / r);
    synthesize(coeffs, &legendre, longitudes.view(), ratios.view())
}

/// Calculates the east, north and up components of the field at geodetic positions.
///
/// Longitude and latitude are in degrees, altitude is in km above the WGS84 ellipsoid.
///
/// # Errors
/// * `IgrfError::LengthMismatch` if the coordinate slices differ in length
/// * `IgrfError::Domain` for the first position with an invalid coordinate
/// * `IgrfError::DateBeforeFirstEpoch` if `date` precedes the table
pub fn igrf(
    longitude: &[f64],
    latitude: &[f64],
    altitude: &[f64],
    date: impl Into<ModelDate>,
    table: &CoefficientTable,
) -> Result<MagneticField> {
    igrf_to_degree(longitude, latitude, altitude, date, table, None)
}

/// Same as [`igrf`], optionally truncating the expansion at `max_degree`.
///
/// # Errors
/// Additionally returns `IgrfError::DegreeOutOfRange` if `max_degree` exceeds the
/// degree of the table.
pub fn igrf_to_degree(
    longitude: &[f64],
    latitude: &[f64],
    altitude: &[f64],
    date: impl Into<ModelDate>,
    table: &CoefficientTable,
    max_degree: Option<usize>,
) -> Result<MagneticField> {
    let points = check_lengths([
        ("longitudes", longitude.len()),
        ("latitudes", latitude.len()),
        ("altitudes", altitude.len()),
    ])?;
    let coeffs = coefficients(table, date.into(), max_degree)?;
    let positions = (0..points)
        .map(|i| geocentric_position(i, longitude[i], latitude[i], altitude[i]))
        .collect::<Result<Vec<_>>>()?;
    debug!(
        points,
        year = coeffs.year(),
        max_degree = coeffs.max_degree(),
        "evaluating field at geodetic positions"
    );

    let chunks = positions
        .par_chunks(CHUNK_SIZE)
        .zip(longitude.par_chunks(CHUNK_SIZE))
        .map(|(positions, longitudes)| -> Result<MagneticField> {
            let spherical = synthesize_chunk(
                &coeffs,
                positions.iter().map(|p| p.colatitude).collect(),
                longitudes.iter().map(|lon| lon.to_radians()).collect(),
                positions.iter().map(|p| p.radius).collect(),
            )?;
            let psi: Array1<f64> = positions.iter().map(|p| p.psi).collect();
            let mut north = Array1::<f64>::zeros(positions.len());
            let mut up = Array1::<f64>::zeros(positions.len());
            Zip::from(&mut north)
                .and(&mut up)
                .and(&spherical.b_r)
                .and(&spherical.b_theta)
                .and(&psi)
                .for_each(|n, u, &b_r, &b_theta, &psi| {
                    let (_, north, up) = spherical_to_enu(b_r, b_theta, 0.0, psi);
                    *n = north;
                    *u = up;
                });
            Ok(MagneticField {
                east: spherical.b_phi,
                north,
                up,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(MagneticField {
        east: chunks.iter().flat_map(|c| c.east.iter().copied()).collect(),
        north: chunks.iter().flat_map(|c| c.north.iter().copied()).collect(),
        up: chunks.iter().flat_map(|c| c.up.iter().copied()).collect(),
    })
}

/// Calculates the field at a single geodetic position.
pub fn igrf_point(
    longitude: f64,
    latitude: f64,
    altitude: f64,
    date: impl Into<ModelDate>,
    table: &CoefficientTable,
) -> Result<FieldVector> {
    let field = igrf(&[longitude], &[latitude], &[altitude], date, table)?;
    Ok(FieldVector {
        east: field.east[0],
        north: field.north[0],
        up: field.up[0],
    })
}

/// Loads the selected table (IGRF-14 by default) from the directory named by
/// `IGRF_COEFF_DIR` and evaluates the field with it.
///
/// Callers evaluating repeatedly should load the table once and use [`igrf`].
pub fn igrf_with_selector(
    longitude: &[f64],
    latitude: &[f64],
    altitude: &[f64],
    date: impl Into<ModelDate>,
    selector: Option<TableSelector>,
) -> Result<MagneticField> {
    let table = CoefficientTable::load(selector.unwrap_or_default(), &Config::from_env())?;
    igrf(longitude, latitude, altitude, date, &table)
}

/// Calculates the radial, colatitude and longitude components of the field at
/// geocentric positions.
///
/// `radius` is in km, `colatitude` and `longitude` in degrees.
pub fn igrf_gc(
    radius: &[f64],
    colatitude: &[f64],
    longitude: &[f64],
    date: impl Into<ModelDate>,
    table: &CoefficientTable,
) -> Result<SphericalField> {
    let points = check_lengths([
        ("radii", radius.len()),
        ("colatitudes", colatitude.len()),
        ("longitudes", longitude.len()),
    ])?;
    let coeffs = coefficients(table, date.into(), None)?;
    for i in 0..points {
        if !(radius[i].is_finite() && radius[i] > 0.0) {
            Err(domain_error(i, "radius", radius[i], "must be positive and finite"))?
        }
        if !(0.0..=180.0).contains(&colatitude[i]) {
            Err(domain_error(i, "colatitude", colatitude[i], "must lie within [0, 180] degrees"))?
        }
        if !longitude[i].is_finite() {
            Err(domain_error(i, "longitude", longitude[i], "must be finite"))?
        }
    }
    debug!(points, year = coeffs.year(), "evaluating field at geocentric positions");

    let chunks = radius
        .par_chunks(CHUNK_SIZE)
        .zip(colatitude.par_chunks(CHUNK_SIZE))
        .zip(longitude.par_chunks(CHUNK_SIZE))
        .map(|((r, theta), phi)| {
            synthesize_chunk(
                &coeffs,
                theta.iter().map(|t| t.to_radians().min(PI)).collect(),
                phi.iter().map(|p| p.to_radians()).collect(),
                Array1::from(r.to_vec()),
            )
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SphericalField {
        b_r: chunks.iter().flat_map(|c| c.b_r.iter().copied()).collect(),
        b_theta: chunks.iter().flat_map(|c| c.b_theta.iter().copied()).collect(),
        b_phi: chunks.iter().flat_map(|c| c.b_phi.iter().copied()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn field_vector_angles() {
        let v = FieldVector {
            east: 1000.0,
            north: 1000.0,
            up: -2.0_f64.sqrt() * 1000.0,
        };
        assert_relative_eq!(v.declination(), 45.0, epsilon = 1e-12);
        assert_relative_eq!(v.inclination(), 45.0, epsilon = 1e-12);
        assert_relative_eq!(v.intensity(), 2000.0, epsilon = 1e-9);
    }

    #[test]
    fn field_iteration() {
        let field = MagneticField {
            east: Array1::from(vec![1.0, 2.0]),
            north: Array1::from(vec![3.0, 4.0]),
            up: Array1::from(vec![5.0, 6.0]),
        };
        let vectors: Vec<_> = field.iter().collect();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[1], FieldVector { east: 2.0, north: 4.0, up: 6.0 });
        assert_eq!(field.get(2), None);
    }

    #[test]
    fn length_mismatch_names_the_arrays() {
        let err = check_lengths([("longitudes", 2), ("latitudes", 1), ("altitudes", 2)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "coordinate arrays differ in length: 2 longitudes, 1 latitudes, 2 altitudes"
        );
    }
}
