//! One-dimensional kernels for spectra, chromatograms and mobilograms.

use serde::{Deserialize, Serialize};

use super::utils::{convolve_reflect, gaussian_kernel, interp, reflect_index};
use super::ProcessingError;

/// How a signal is placed on a regular axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinearizeMethod {
    /// Linear interpolation between neighbouring points
    #[default]
    #[serde(rename = "Linear interpolation", alias = "linear")]
    LinearInterpolation,
    /// Sum of all points falling into each bin
    #[serde(rename = "Binning", alias = "binning")]
    Binning,
}

/// Parameters of [`linearize_1d`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearizeParams {
    /// Linearization method
    pub method: LinearizeMethod,
    /// Spacing of the new axis
    pub bin_size: f64,
    /// Use the data range instead of `x_min`/`x_max`
    pub auto_range: bool,
    /// Lower bound of the new axis
    pub x_min: Option<f64>,
    /// Upper bound of the new axis
    pub x_max: Option<f64>,
    /// Build a non-linear axis with a constant relative spacing (parts per million)
    pub ppm: Option<f64>,
}

impl Default for LinearizeParams {
    fn default() -> Self {
        Self {
            method: LinearizeMethod::LinearInterpolation,
            bin_size: 0.01,
            auto_range: true,
            x_min: None,
            x_max: None,
            ppm: None,
        }
    }
}

impl LinearizeParams {
    /// Default parameters with the given bin size
    pub fn with_bin_size(bin_size: f64) -> Self {
        Self {
            bin_size,
            ..Self::default()
        }
    }
}

/// Bounds of [`crop_1d`]; a missing bound is open
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CropParams {
    /// Lower bound (inclusive)
    pub min: Option<f64>,
    /// Upper bound (inclusive)
    pub max: Option<f64>,
}

/// Smoothing filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum SmoothMethod {
    /// Gaussian filter with standard deviation `sigma` (in points)
    Gaussian {
        /// Standard deviation
        sigma: f64,
    },
    /// Moving average; even windows are widened by one point
    MovingAverage {
        /// Window size in points
        window: usize,
    },
}

/// Baseline removal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum BaselineMethod {
    /// Set every value at or below `threshold` to zero
    Linear {
        /// Intensity threshold
        threshold: f64,
    },
    /// Subtract a running median and clip at zero
    Median {
        /// Window size in points
        window: usize,
    },
}

fn check_pair(x: &[f64], y: &[f64]) -> Result<(), ProcessingError> {
    if x.len() != y.len() {
        return Err(ProcessingError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    Ok(())
}

/// Keep the points whose `x` lies within `[min, max]`
pub fn crop_1d(
    x: &[f64],
    y: &[f64],
    min: Option<f64>,
    max: Option<f64>,
) -> Result<(Vec<f64>, Vec<f64>), ProcessingError> {
    check_pair(x, y)?;
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            return Err(ProcessingError::invalid(
                "crop",
                format!("minimum {lo} is larger than maximum {hi}"),
            ));
        }
    }
    let lo = min.unwrap_or(f64::NEG_INFINITY);
    let hi = max.unwrap_or(f64::INFINITY);
    Ok(x.iter()
        .zip(y)
        .filter(|(&xv, _)| xv >= lo && xv <= hi)
        .map(|(&xv, &yv)| (xv, yv))
        .unzip())
}

fn sorted_pairs(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    if x.windows(2).all(|w| w[0] <= w[1]) {
        return (x.to_vec(), y.to_vec());
    }
    let mut pairs: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    pairs.into_iter().unzip()
}

/// Build the regular (or ppm-spaced) axis described by `params` for data spanning `x`
pub fn linearization_axis(x: &[f64], params: &LinearizeParams) -> Result<Vec<f64>, ProcessingError> {
    let data_min = x.iter().copied().fold(f64::INFINITY, f64::min);
    let data_max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !data_min.is_finite() || !data_max.is_finite() {
        return Err(ProcessingError::EmptyInput);
    }
    let (lo, hi) = if params.auto_range {
        (data_min, data_max)
    } else {
        (
            params.x_min.unwrap_or(data_min),
            params.x_max.unwrap_or(data_max),
        )
    };
    if hi < lo {
        return Err(ProcessingError::invalid(
            "x_min",
            format!("range {lo}..{hi} is empty"),
        ));
    }

    match params.ppm {
        Some(ppm) => {
            if !(ppm > 0.0) {
                return Err(ProcessingError::invalid("ppm", "must be positive"));
            }
            if !(lo > 0.0) {
                return Err(ProcessingError::invalid(
                    "x_min",
                    "a ppm-spaced axis must start above zero",
                ));
            }
            let factor = 1.0 + ppm / 1e6;
            let mut axis = Vec::new();
            let mut value = lo;
            while value <= hi {
                axis.push(value);
                value *= factor;
            }
            Ok(axis)
        }
        None => {
            if !(params.bin_size > 0.0) || !params.bin_size.is_finite() {
                return Err(ProcessingError::invalid("bin_size", "must be positive"));
            }
            let n = ((hi - lo) / params.bin_size + 1e-9).floor() as usize + 1;
            Ok((0..n).map(|i| lo + params.bin_size * i as f64).collect())
        }
    }
}

/// Place `(x, y)` on a regular axis
pub fn linearize_1d(
    x: &[f64],
    y: &[f64],
    params: &LinearizeParams,
) -> Result<(Vec<f64>, Vec<f64>), ProcessingError> {
    check_pair(x, y)?;
    if x.is_empty() {
        return Err(ProcessingError::EmptyInput);
    }
    let (x, y) = sorted_pairs(x, y);
    let axis = linearization_axis(&x, params)?;

    let values = match params.method {
        LinearizeMethod::LinearInterpolation => interp(&axis, &x, &y, 0.0),
        LinearizeMethod::Binning => {
            let mut values = vec![0.0; axis.len()];
            let last = axis.len() - 1;
            let last_width = match params.ppm {
                Some(ppm) => axis[last] * ppm / 1e6,
                None => params.bin_size,
            };
            for (&xv, &yv) in x.iter().zip(&y) {
                let upper = axis.partition_point(|&edge| edge <= xv);
                if upper == 0 {
                    continue;
                }
                let idx = upper - 1;
                if idx == last && xv >= axis[last] + last_width {
                    continue;
                }
                values[idx] += yv;
            }
            values
        }
    };
    Ok((axis, values))
}

/// Smooth a signal
pub fn smooth_1d(y: &[f64], method: &SmoothMethod) -> Result<Vec<f64>, ProcessingError> {
    match *method {
        SmoothMethod::Gaussian { sigma } => {
            if !(sigma > 0.0) {
                return Err(ProcessingError::invalid("sigma", "must be positive"));
            }
            Ok(convolve_reflect(y, &gaussian_kernel(sigma)))
        }
        SmoothMethod::MovingAverage { window } => {
            if window == 0 {
                return Err(ProcessingError::invalid("window", "must be at least 1"));
            }
            let window = window | 1;
            Ok(convolve_reflect(y, &vec![1.0 / window as f64; window]))
        }
    }
}

fn running_median(y: &[f64], window: usize) -> Vec<f64> {
    let radius = (window / 2) as isize;
    let len = y.len();
    let mut buffer = Vec::with_capacity(2 * radius as usize + 1);
    (0..len as isize)
        .map(|i| {
            buffer.clear();
            buffer.extend((-radius..=radius).map(|k| y[reflect_index(i + k, len)]));
            buffer.sort_by(f64::total_cmp);
            buffer[buffer.len() / 2]
        })
        .collect()
}

/// Remove the baseline of a signal
pub fn baseline_1d(y: &[f64], method: &BaselineMethod) -> Result<Vec<f64>, ProcessingError> {
    match *method {
        BaselineMethod::Linear { threshold } => {
            if threshold < 0.0 {
                return Err(ProcessingError::invalid(
                    "threshold",
                    "must be zero or positive",
                ));
            }
            Ok(y.iter()
                .map(|&v| if v <= threshold { 0.0 } else { v })
                .collect())
        }
        BaselineMethod::Median { window } => {
            if window == 0 {
                return Err(ProcessingError::invalid("window", "must be at least 1"));
            }
            if y.is_empty() {
                return Ok(Vec::new());
            }
            let median = running_median(y, window | 1);
            Ok(y.iter()
                .zip(median)
                .map(|(v, m)| (v - m).max(0.0))
                .collect())
        }
    }
}

/// Scale a signal so that its maximum is 1; all-zero signals are returned unchanged
pub fn normalize_1d(y: &[f64]) -> Vec<f64> {
    let max = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(max > 0.0) || !max.is_finite() {
        return y.to_vec();
    }
    y.iter().map(|v| v / max).collect()
}
