//! Geodetic and geocentric coordinates on the WGS84 ellipsoid, and the rotation of
//! field components between the geocentric spherical frame and the local geodetic
//! east/north/up frame.
use crate::utils::constants::{WGS84_A_KM, WGS84_B_KM};
use is_close::is_close;
use std::f64::consts::{FRAC_PI_2, PI};

/// Location of a point in geocentric spherical coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeocentricPosition {
    /// Geocentric colatitude, radians in [0, pi]
    pub colatitude: f64,
    /// Distance from the centre of the Earth, km
    pub radius: f64,
    /// Geodetic latitude minus geocentric latitude, radians
    pub psi: f64,
}

/// Converts a geodetic latitude (degrees) and height above the ellipsoid (km) to
/// geocentric colatitude and radius.
pub fn geodetic_to_geocentric(latitude: f64, height: f64) -> GeocentricPosition {
    let (a2, b2) = (WGS84_A_KM * WGS84_A_KM, WGS84_B_KM * WGS84_B_KM);
    let lat = latitude.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin2, cos2) = (sin_lat * sin_lat, cos_lat * cos_lat);

    let rho = (a2 * cos2 + b2 * sin2).sqrt();
    let tmp = height * rho;
    let colatitude = if latitude >= 90.0 {
        0.0
    } else if latitude <= -90.0 {
        PI
    } else {
        FRAC_PI_2 - ((tmp + b2) * sin_lat).atan2((tmp + a2) * cos_lat)
    };
    let radius = (height * height + 2.0 * tmp + (a2 * a2 * cos2 + b2 * b2 * sin2) / (rho * rho))
        .sqrt();

    GeocentricPosition {
        colatitude: colatitude.clamp(0.0, PI),
        radius,
        psi: lat - (FRAC_PI_2 - colatitude),
    }
}

/// Converts a geocentric colatitude (radians) and radius (km) back to geodetic latitude
/// (degrees) and height above the ellipsoid (km).
pub fn geocentric_to_geodetic(colatitude: f64, radius: f64) -> (f64, f64) {
    let e2 = 1.0 - (WGS84_B_KM / WGS84_A_KM).powi(2);
    let z = radius * colatitude.cos();
    let p = radius * colatitude.sin();
    if p < 1e-9 {
        let height = z.abs() - WGS84_B_KM;
        return (90.0_f64.copysign(z), height);
    }

    let mut lat = z.atan2(p * (1.0 - e2));
    let mut height = 0.0;
    for _ in 0..10 {
        let sin_lat = lat.sin();
        let n = WGS84_A_KM / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        height = p / lat.cos() - n;
        let next = z.atan2(p * (1.0 - e2 * n / (n + height)));
        if is_close!(next, lat, rel_tol = 1e-14, abs_tol = 1e-14) {
            lat = next;
            break;
        }
        lat = next;
    }
    (lat.to_degrees(), height)
}

/// Rotates a field vector given in geocentric spherical components (radial, colatitude,
/// longitude) into local geodetic east, north and up components.
///
/// `psi` is the angle between the geodetic and the geocentric vertical. The longitude
/// direction is shared by both frames, the colatitude direction points south.
#[inline]
pub fn spherical_to_enu(b_r: f64, b_theta: f64, b_phi: f64, psi: f64) -> (f64, f64, f64) {
    let (sin_psi, cos_psi) = psi.sin_cos();
    let east = b_phi;
    let north = -cos_psi * b_theta - sin_psi * b_r;
    let up = -sin_psi * b_theta + cos_psi * b_r;
    (east, north, up)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn equator_lies_on_semi_major_axis() {
        let pos = geodetic_to_geocentric(0.0, 0.0);
        assert_relative_eq!(pos.colatitude, FRAC_PI_2, epsilon = 1e-15);
        assert_relative_eq!(pos.radius, WGS84_A_KM, epsilon = 1e-9);
        assert_relative_eq!(pos.psi, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn poles_lie_on_semi_minor_axis() {
        let north = geodetic_to_geocentric(90.0, 100.0);
        assert_eq!(north.colatitude, 0.0);
        assert_relative_eq!(north.radius, WGS84_B_KM + 100.0, epsilon = 1e-9);
        assert_relative_eq!(north.psi, 0.0, epsilon = 1e-15);

        let south = geodetic_to_geocentric(-90.0, 0.0);
        assert_eq!(south.colatitude, PI);
        assert_relative_eq!(south.radius, WGS84_B_KM, epsilon = 1e-9);
    }

    #[test]
    fn geocentric_latitude_is_smaller_at_mid_latitudes() {
        let pos = geodetic_to_geocentric(45.0, 0.0);
        let geocentric_lat = 90.0 - pos.colatitude.to_degrees();
        // The maximum separation of about 0.19 degrees occurs near 45 degrees
        assert!(geocentric_lat < 45.0);
        assert_relative_eq!(45.0 - geocentric_lat, 0.1924, epsilon = 1e-3);
        assert!(pos.psi > 0.0);
    }

    #[test]
    fn round_trip() {
        for (lat, height) in [(-89.5, 10.0), (-30.0, 0.0), (12.3, 450.0), (60.0, -1.0), (90.0, 5.0)]
        {
            let pos = geodetic_to_geocentric(lat, height);
            let (lat_back, height_back) = geocentric_to_geodetic(pos.colatitude, pos.radius);
            assert_relative_eq!(lat_back, lat, epsilon = 1e-8);
            assert_relative_eq!(height_back, height, epsilon = 1e-6);
        }
    }

    #[test]
    fn rotation_without_tilt() {
        let (e, n, u) = spherical_to_enu(-100.0, 200.0, 300.0, 0.0);
        assert_eq!(e, 300.0);
        assert_eq!(n, -200.0);
        assert_eq!(u, -100.0);
    }

    #[test]
    fn rotation_tilts_towards_the_geodetic_vertical() {
        // In the northern hemisphere the geodetic vertical is steeper than the radial
        // direction, so an outward radial field leans towards the equator
        let psi = geodetic_to_geocentric(45.0, 0.0).psi;
        let (sin_psi, cos_psi) = psi.sin_cos();

        let (e, n, u) = spherical_to_enu(1000.0, 0.0, 0.0, psi);
        assert_eq!(e, 0.0);
        assert!(n < 0.0);
        assert_relative_eq!(n, -1000.0 * sin_psi, max_relative = 1e-12);
        assert_relative_eq!(u, 1000.0 * cos_psi, max_relative = 1e-12);

        // The colatitude direction points south and slightly down
        let (_, n, u) = spherical_to_enu(0.0, 1000.0, 0.0, psi);
        assert_relative_eq!(n, -1000.0 * cos_psi, max_relative = 1e-12);
        assert!(u < 0.0);
        assert_relative_eq!(u, -1000.0 * sin_psi, max_relative = 1e-12);

        let (e, _, _) = spherical_to_enu(0.0, 0.0, 1000.0, psi);
        assert_eq!(e, 1000.0);
    }

    #[test]
    fn radial_direction_matches_the_ellipsoid_normal() {
        // The unit radial vector at a geodetic position, built from its Cartesian
        // coordinates and projected on the local geodetic axes
        let (lat, height) = (52.0_f64, 3.0);
        let e2 = 1.0 - (WGS84_B_KM / WGS84_A_KM).powi(2);
        let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
        let n = WGS84_A_KM / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let (x, z) = ((n + height) * cos_lat, (n * (1.0 - e2) + height) * sin_lat);
        let r = x.hypot(z);
        let north = (-sin_lat * x + cos_lat * z) / r;
        let up = (cos_lat * x + sin_lat * z) / r;

        let pos = geodetic_to_geocentric(lat, height);
        assert_relative_eq!(pos.radius, r, max_relative = 1e-12);
        let (_, n_rot, u_rot) = spherical_to_enu(1.0, 0.0, 0.0, pos.psi);
        assert_relative_eq!(n_rot, north, epsilon = 1e-12);
        assert_relative_eq!(u_rot, up, epsilon = 1e-12);
    }

    #[test]
    fn rotation_preserves_magnitude() {
        let (b_r, b_theta, b_phi) = (-40000.0, -15000.0, 2500.0);
        let (e, n, u) = spherical_to_enu(b_r, b_theta, b_phi, 0.003);
        assert_relative_eq!(
            (e * e + n * n + u * u).sqrt(),
            (b_r * b_r + b_theta * b_theta + b_phi * b_phi).sqrt(),
            max_relative = 1e-12
        );
    }
}
