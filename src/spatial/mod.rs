pub mod aoi;
pub mod clip;
pub mod error;
