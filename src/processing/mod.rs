//! # Signal Processing Kernels
//!
//! Pure numeric functions used by the data objects. None of them touch a
//! [`DataObject`](crate::objects::DataObject); objects call them on their materialized
//! arrays and store the results.
//!
//! - [`spectra`]: crop, linearize, smooth, baseline and normalize for 1-D signals
//! - [`heatmap`]: crop, interpolate, smooth, denoise, normalize, block sums and
//!   spacing equalization for 2-D arrays
//! - [`origami_ms`]: collapse scan-resolved ORIGAMI-MS data into voltage steps

mod defaults;
mod error;
pub mod heatmap;
pub mod origami_ms;
pub mod spectra;
mod utils;

pub use defaults::ProcessingDefaults;
pub use error::ProcessingError;
pub use heatmap::{Crop2dParams, Interpolate2dParams, Normalize2dMethod};
pub use origami_ms::{OrigamiMsMethod, VoltageStep};
pub use spectra::{BaselineMethod, CropParams, LinearizeMethod, LinearizeParams, SmoothMethod};
pub use utils::{find_nearest_index, interp, linspace, nearest_range};

#[cfg(test)]
mod tests;
