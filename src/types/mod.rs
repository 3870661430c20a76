pub mod bbox;
pub mod chunk_result;
pub mod date_range;
pub mod frame_interval;
