pub mod constants;
pub mod dates;
pub mod geodesy;
