/// Magnetic reference radius of the IGRF expansion, km
pub const REFERENCE_RADIUS_KM: f64 = 6371.2;

/// WGS84 semi-major axis, km
pub const WGS84_A_KM: f64 = 6378.137;
/// WGS84 semi-minor axis, km
pub const WGS84_B_KM: f64 = 6356.752;

/// Number of positions evaluated together in one vectorized chunk.
pub(crate) const CHUNK_SIZE: usize = 4096;
