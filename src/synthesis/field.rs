use crate::coefficients::{term_index, InterpolatedCoefficients};
use crate::error::{IgrfError, Result};
use crate::synthesis::legendre::LegendreTable;
use ndarray::{Array1, ArrayView1, Zip};

/// Field components in geocentric spherical coordinates, nT.
#[derive(Debug, Clone, PartialEq)]
pub struct SphericalField {
    /// Radial component, positive outwards
    pub b_r: Array1<f64>,
    /// Colatitude component, positive southwards
    pub b_theta: Array1<f64>,
    /// Longitude component, positive eastwards
    pub b_phi: Array1<f64>,
}

/// Sums the spherical harmonic expansion at a batch of points.
///
/// `longitudes` are in radians and `radius_ratios` are `a / r` with `a` the reference
/// radius of the model. The longitude component uses the `P(n,m) / sinθ` table of
/// `legendre`, so points on the poles take the limiting value rather than dividing by
/// zero.
pub fn synthesize(
    coeffs: &InterpolatedCoefficients,
    legendre: &LegendreTable,
    longitudes: ArrayView1<f64>,
    radius_ratios: ArrayView1<f64>,
) -> Result<SphericalField> {
    let points = longitudes.len();
    if radius_ratios.len() != points || legendre.p.ncols() != points {
        Err(IgrfError::LengthMismatch(format!(
            "{points} longitudes, {} radius ratios, {} colatitudes",
            radius_ratios.len(),
            legendre.p.ncols()
        )))?
    }
    let max_degree = coeffs.max_degree();
    if legendre.max_degree() < max_degree {
        Err(IgrfError::DegreeOutOfRange {
            requested: max_degree,
            available: legendre.max_degree(),
        })?
    }

    let cos_m: Vec<Array1<f64>> = (0..=max_degree)
        .map(|m| longitudes.mapv(|phi| (m as f64 * phi).cos()))
        .collect();
    let sin_m: Vec<Array1<f64>> = (0..=max_degree)
        .map(|m| longitudes.mapv(|phi| (m as f64 * phi).sin()))
        .collect();

    let mut b_r = Array1::<f64>::zeros(points);
    let mut b_theta = Array1::<f64>::zeros(points);
    let mut b_phi = Array1::<f64>::zeros(points);
    let mut in_phase = Array1::<f64>::zeros(points);
    let mut quadrature = Array1::<f64>::zeros(points);
    // (a/r)^(n+2), starting from n = 1
    let mut ratio_power = radius_ratios.mapv(|ratio| ratio.powi(3));

    for n in 1..=max_degree {
        if n > 1 {
            ratio_power *= &radius_ratios;
        }
        let degree_factor = (n + 1) as f64;
        for m in 0..=n {
            let i = term_index(n, m);
            let (g, h) = (coeffs.g[i], coeffs.h[i]);
            let order = m as f64;

            Zip::from(&mut in_phase)
                .and(&mut quadrature)
                .and(&ratio_power)
                .and(&cos_m[m])
                .and(&sin_m[m])
                .for_each(|ip, qu, &rp, &cos, &sin| {
                    *ip = rp * (g * cos + h * sin);
                    *qu = rp * (g * sin - h * cos);
                });
            Zip::from(&mut b_r)
                .and(&in_phase)
                .and(legendre.p.row(i))
                .for_each(|b, &ip, &p| *b += degree_factor * ip * p);
            Zip::from(&mut b_theta)
                .and(&in_phase)
                .and(legendre.dp.row(i))
                .for_each(|b, &ip, &dp| *b -= ip * dp);
            if m > 0 {
                Zip::from(&mut b_phi)
                    .and(&quadrature)
                    .and(legendre.p_over_sin.row(i))
                    .for_each(|b, &qu, &q| *b += order * qu * q);
            }
        }
    }

    Ok(SphericalField { b_r, b_theta, b_phi })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficients::CoefficientTable;
    use crate::utils::constants::REFERENCE_RADIUS_KM as A;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};
    use std::f64::consts::PI;

    const TABLE: &str = "\
c/s deg ord IGRF SV
g/h n m 2020.0 2020-25
g 1 0 -29404.8 5.7
g 1 1 -1450.9 7.4
h 1 1 4652.5 -25.9
g 2 0 -2499.6 -11.0
g 2 1 2982.0 -7.0
h 2 1 -2991.6 -30.2
g 2 2 1677.0 -2.1
h 2 2 -734.6 -22.4
g 3 0 1363.2 2.2
g 3 1 -2381.2 -5.9
h 3 1 -82.1 6.0
g 3 2 1236.2 3.1
h 3 2 241.9 -1.1
g 3 3 525.7 -12.0
h 3 3 -543.4 0.5
";

    fn schmidt(n: usize, m: usize, theta: f64) -> f64 {
        let (s, c) = theta.sin_cos();
        match (n, m) {
            (1, 0) => c,
            (1, 1) => s,
            (2, 0) => 1.5 * c * c - 0.5,
            (2, 1) => 3f64.sqrt() * c * s,
            (2, 2) => 3f64.sqrt() / 2.0 * s * s,
            (3, 0) => 0.5 * c * (5.0 * c * c - 3.0),
            (3, 1) => (3.0f64 / 8.0).sqrt() * s * (5.0 * c * c - 1.0),
            (3, 2) => 15f64.sqrt() / 2.0 * c * s * s,
            (3, 3) => (5.0f64 / 8.0).sqrt() * s * s * s,
            _ => unreachable!(),
        }
    }

    /// The scalar potential written out term by term.
    fn potential(coeffs: &InterpolatedCoefficients, r: f64, theta: f64, phi: f64) -> f64 {
        let mut v = 0.0;
        for n in 1..=3 {
            for m in 0..=n {
                let (g, h) = coeffs.get(n, m).unwrap();
                let mf = m as f64;
                v += A
                    * (A / r).powi(n as i32 + 1)
                    * (g * (mf * phi).cos() + h * (mf * phi).sin())
                    * schmidt(n, m, theta);
            }
        }
        v
    }

    fn evaluate(
        coeffs: &InterpolatedCoefficients,
        r: &Array1<f64>,
        theta: &Array1<f64>,
        phi: &Array1<f64>,
    ) -> SphericalField {
        let legendre = LegendreTable::new(coeffs.max_degree(), theta.view()).unwrap();
        let ratios = r.mapv(|r| A / r);
        synthesize(coeffs, &legendre, phi.view(), ratios.view()).unwrap()
    }

    #[test]
    fn field_is_the_negative_gradient_of_the_potential() {
        let coeffs: CoefficientTable = TABLE.parse().unwrap();
        let coeffs = coeffs.coefficients_at(2020.0).unwrap();
        let r = array![A, 6500.0, 7000.0, A + 400.0];
        let theta = array![0.7, 2.0, 1.2, 0.05];
        let phi = array![0.3, -2.0, 4.0, 1.0];
        let field = evaluate(&coeffs, &r, &theta, &phi);

        let (dr, dt, dp) = (1e-3, 1e-6, 1e-6);
        for k in 0..r.len() {
            let (r, t, p) = (r[k], theta[k], phi[k]);
            let b_r = -(potential(&coeffs, r + dr, t, p) - potential(&coeffs, r - dr, t, p))
                / (2.0 * dr);
            let b_theta = -(potential(&coeffs, r, t + dt, p) - potential(&coeffs, r, t - dt, p))
                / (2.0 * dt * r);
            let b_phi = -(potential(&coeffs, r, t, p + dp) - potential(&coeffs, r, t, p - dp))
                / (2.0 * dp * r * t.sin());
            assert_abs_diff_eq!(field.b_r[k], b_r, epsilon = 1e-2);
            assert_abs_diff_eq!(field.b_theta[k], b_theta, epsilon = 1e-2);
            assert_abs_diff_eq!(field.b_phi[k], b_phi, epsilon = 1e-2);
        }
    }

    #[test]
    fn axial_dipole_in_closed_form() {
        let table: CoefficientTable = TABLE.parse().unwrap();
        let coeffs = table.coefficients_at(2020.0).unwrap().truncate(1).unwrap();
        let r = array![A, 2.0 * A];
        let theta = array![0.4, 1.9];
        let phi = array![0.0, 0.0];
        let field = evaluate(&coeffs, &r, &theta, &phi);
        let (g10, g11, h11) = (-29404.8, -1450.9, 4652.5);
        for k in 0..2 {
            let (ratio, (s, c)) = ((A / r[k]).powi(3), theta[k].sin_cos());
            // At phi = 0 the equatorial dipole terms reduce to g11 and h11 alone
            assert_abs_diff_eq!(field.b_r[k], 2.0 * ratio * (g10 * c + g11 * s), epsilon = 1e-9);
            assert_abs_diff_eq!(field.b_theta[k], ratio * (g10 * s - g11 * c), epsilon = 1e-9);
            assert_abs_diff_eq!(field.b_phi[k], -ratio * h11, epsilon = 1e-9);
        }
    }

    #[test]
    fn poles_take_the_limiting_value() {
        let table: CoefficientTable = TABLE.parse().unwrap();
        let coeffs = table.coefficients_at(2020.0).unwrap();
        let r = array![A, A, A, A];
        let theta = array![0.0, 1e-9, PI, PI - 1e-9];
        let phi = array![1.3, 1.3, -0.4, -0.4];
        let field = evaluate(&coeffs, &r, &theta, &phi);
        for k in 0..4 {
            assert!(field.b_r[k].is_finite());
            assert!(field.b_theta[k].is_finite());
            assert!(field.b_phi[k].is_finite());
        }
        for (pole, near) in [(0, 1), (2, 3)] {
            assert_abs_diff_eq!(field.b_phi[pole], field.b_phi[near], epsilon = 1e-3);
            assert_abs_diff_eq!(field.b_theta[pole], field.b_theta[near], epsilon = 1e-3);
            assert_abs_diff_eq!(field.b_r[pole], field.b_r[near], epsilon = 1e-3);
        }
        // The horizontal field at a pole is a single vector: its length does not depend
        // on the longitude it is expressed at
        let other = evaluate(&coeffs, &array![A], &array![0.0], &array![-2.2]);
        assert_abs_diff_eq!(
            field.b_theta[0].hypot(field.b_phi[0]),
            other.b_theta[0].hypot(other.b_phi[0]),
            epsilon = 1e-6
        );
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let table: CoefficientTable = TABLE.parse().unwrap();
        let coeffs = table.coefficients_at(2020.0).unwrap();
        let legendre = LegendreTable::new(3, array![0.1, 0.2].view()).unwrap();
        let result = synthesize(&coeffs, &legendre, array![0.0].view(), array![1.0, 1.0].view());
        assert!(matches!(result, Err(IgrfError::LengthMismatch(_))));

        let shallow = LegendreTable::new(2, array![0.1].view()).unwrap();
        let result = synthesize(&coeffs, &shallow, array![0.0].view(), array![1.0].view());
        assert!(matches!(result, Err(IgrfError::DegreeOutOfRange { .. })));
    }
}
