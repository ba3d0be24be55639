//! Spherical harmonic synthesis of the geomagnetic field.
pub mod field;
pub mod legendre;

pub use field::{synthesize, SphericalField};
pub use legendre::LegendreTable;
