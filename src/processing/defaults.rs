use serde::{Deserialize, Serialize};

use super::spectra::LinearizeMethod;
use crate::objects::SpectrumKind;

/// Fallback processing parameters used when a caller leaves them unset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingDefaults {
    /// Linearization method for resampling
    pub linearize_method: LinearizeMethod,
    /// Bin size of m/z axes
    pub mz_bin_size: f64,
    /// Bin size of scan, voltage and drift-time axes
    pub axis_bin_size: f64,
    /// Drop all-zero rows when exporting mass spectra
    pub remove_zeros: bool,
}

impl Default for ProcessingDefaults {
    fn default() -> Self {
        Self {
            linearize_method: LinearizeMethod::LinearInterpolation,
            mz_bin_size: 0.01,
            axis_bin_size: 1.0,
            remove_zeros: true,
        }
    }
}

impl ProcessingDefaults {
    /// Bin size for the x axis of `kind`
    pub fn bin_size(&self, kind: SpectrumKind) -> f64 {
        match kind {
            SpectrumKind::MassSpectrum => self.mz_bin_size,
            SpectrumKind::Chromatogram | SpectrumKind::Mobilogram => self.axis_bin_size,
        }
    }
}
