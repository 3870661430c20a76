pub mod basemap;
pub mod canvas;
pub mod colormap;
pub mod error;
pub mod frames;
pub mod heatmap;
pub mod text;
pub mod viewport;
