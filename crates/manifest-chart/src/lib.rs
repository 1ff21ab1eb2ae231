//! Fixed chart rendering for the query service.
//!
//! Rasterises a histogram into an RGBA canvas with a built-in bitmap font and
//! encodes it as PNG. No font files or system graphics libraries are needed.

pub mod canvas;
pub mod error;
pub mod font;
pub mod histogram;

pub use canvas::{Canvas, Rgb};
pub use error::ChartError;
pub use histogram::{bin_counts, render_histogram, HistogramSpec};
