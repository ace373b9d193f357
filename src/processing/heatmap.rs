//! Two-dimensional kernels for heatmaps.
//!
//! Arrays are laid out as `(rows, columns)` = `(len(y), len(x))`.

use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::spectra::SmoothMethod;
use super::utils::{interp, linspace, nearest_range};
use super::ProcessingError;

/// Heatmap axes and intensities
pub type Heatmap = (Vec<f64>, Vec<f64>, Array2<f64>);

/// Normalization of a whole heatmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Normalize2dMethod {
    /// Divide by the maximum
    #[default]
    Maximum,
    /// `log10(1 + v)` then divide by the maximum
    Logarithmic,
    /// Square root then divide by the maximum
    #[serde(rename = "Square root")]
    SquareRoot,
    /// Divide by the total intensity
    Total,
}

/// Parameters of [`crop_2d`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Crop2dParams {
    /// Lower x bound
    pub x_min: Option<f64>,
    /// Upper x bound
    pub x_max: Option<f64>,
    /// Lower y bound
    pub y_min: Option<f64>,
    /// Upper y bound
    pub y_max: Option<f64>,
}

/// Parameters of [`interpolate_2d`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interpolate2dParams {
    /// Factor by which the number of points grows
    pub fold: f64,
    /// Interpolate along x
    pub x_axis: bool,
    /// Interpolate along y
    pub y_axis: bool,
}

impl Default for Interpolate2dParams {
    fn default() -> Self {
        Self {
            fold: 2.0,
            x_axis: true,
            y_axis: false,
        }
    }
}

fn check_heatmap(x: &[f64], y: &[f64], array: &ArrayView2<f64>) -> Result<(), ProcessingError> {
    let (rows, cols) = array.dim();
    if x.len() != cols || y.len() != rows {
        return Err(ProcessingError::InvalidShape(format!(
            "array {:?} does not match x ({}) and y ({})",
            array.dim(),
            x.len(),
            y.len()
        )));
    }
    Ok(())
}

/// Nearest-index range of `[lo, hi]`; a missing bound extends to the end of the axis
fn bounded_range(axis: &[f64], lo: Option<f64>, hi: Option<f64>) -> std::ops::RangeInclusive<usize> {
    let first = axis.iter().copied().fold(f64::INFINITY, f64::min);
    let last = axis.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    nearest_range(axis, lo.unwrap_or(first), hi.unwrap_or(last))
}

/// Cut the region bounded by nearest axis values (inclusive)
pub fn crop_2d(
    x: &[f64],
    y: &[f64],
    array: &ArrayView2<f64>,
    params: &Crop2dParams,
) -> Result<Heatmap, ProcessingError> {
    check_heatmap(x, y, array)?;
    if x.is_empty() || y.is_empty() {
        return Err(ProcessingError::EmptyInput);
    }
    let xr = bounded_range(x, params.x_min, params.x_max);
    let yr = bounded_range(y, params.y_min, params.y_max);
    let cropped = array
        .slice(s![*yr.start()..=*yr.end(), *xr.start()..=*xr.end()])
        .to_owned();
    Ok((x[xr].to_vec(), y[yr].to_vec(), cropped))
}

/// Resample one or both axes onto `fold` times as many evenly spaced points
pub fn interpolate_2d(
    x: &[f64],
    y: &[f64],
    array: &ArrayView2<f64>,
    params: &Interpolate2dParams,
) -> Result<Heatmap, ProcessingError> {
    check_heatmap(x, y, array)?;
    if !(params.fold > 0.0) {
        return Err(ProcessingError::invalid("fold", "must be positive"));
    }
    let mut x = x.to_vec();
    let mut y = y.to_vec();
    let mut array = array.to_owned();

    if params.x_axis && x.len() > 1 {
        let new_x = linspace(x[0], x[x.len() - 1], (x.len() as f64 * params.fold).round() as usize);
        array = resample_rows(&array.view(), &x, &new_x);
        x = new_x;
    }
    if params.y_axis && y.len() > 1 {
        let new_y = linspace(y[0], y[y.len() - 1], (y.len() as f64 * params.fold).round() as usize);
        array = resample_rows(&array.t(), &y, &new_y).reversed_axes();
        y = new_y;
    }
    Ok((x, y, array))
}

/// Linearly interpolate every row of `array` from `axis` onto `new_axis`
fn resample_rows(array: &ArrayView2<f64>, axis: &[f64], new_axis: &[f64]) -> Array2<f64> {
    let descending = axis.len() > 1 && axis[0] > axis[axis.len() - 1];
    let (xp, order): (Vec<f64>, Vec<usize>) = if descending {
        (axis.iter().rev().copied().collect(), (0..axis.len()).rev().collect())
    } else {
        (axis.to_vec(), (0..axis.len()).collect())
    };
    let mut out = Array2::zeros((array.nrows(), new_axis.len()));
    for (r, row) in array.rows().into_iter().enumerate() {
        let fp: Vec<f64> = order.iter().map(|&i| row[i]).collect();
        let values = interp(new_axis, &xp, &fp, 0.0);
        out.row_mut(r).assign(&Array1::from(values));
    }
    out
}

/// Smooth along both axes with the same one-dimensional filter
pub fn smooth_2d(array: &ArrayView2<f64>, method: &SmoothMethod) -> Result<Array2<f64>, ProcessingError> {
    let mut out = array.to_owned();
    for mut row in out.rows_mut() {
        let smoothed = super::spectra::smooth_1d(&row.to_vec(), method)?;
        row.assign(&Array1::from(smoothed));
    }
    for mut column in out.columns_mut() {
        let smoothed = super::spectra::smooth_1d(&column.to_vec(), method)?;
        column.assign(&Array1::from(smoothed));
    }
    Ok(out)
}

/// Zero every value at or below `threshold`
pub fn remove_noise_2d(array: &ArrayView2<f64>, threshold: f64) -> Result<Array2<f64>, ProcessingError> {
    if threshold < 0.0 {
        return Err(ProcessingError::invalid(
            "threshold",
            "must be zero or positive",
        ));
    }
    Ok(array.mapv(|v| if v <= threshold { 0.0 } else { v }))
}

/// Normalize a heatmap; all-zero arrays are returned unchanged
pub fn normalize_2d(array: &ArrayView2<f64>, method: Normalize2dMethod) -> Array2<f64> {
    let transformed = match method {
        Normalize2dMethod::Logarithmic => array.mapv(|v| (1.0 + v.max(0.0)).log10()),
        Normalize2dMethod::SquareRoot => array.mapv(|v| v.max(0.0).sqrt()),
        Normalize2dMethod::Maximum | Normalize2dMethod::Total => array.to_owned(),
    };
    let divisor = match method {
        Normalize2dMethod::Total => transformed.sum(),
        _ => transformed.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    };
    if !(divisor > 0.0) || !divisor.is_finite() {
        return transformed;
    }
    transformed / divisor
}

/// Sum adjacent groups of `block` columns; the x value of each group is its mean.
///
/// The last group may be narrower than `block`.
pub fn sum_column_blocks(
    x: &[f64],
    array: &ArrayView2<f64>,
    block: usize,
) -> Result<(Vec<f64>, Array2<f64>), ProcessingError> {
    if block == 0 {
        return Err(ProcessingError::invalid("block", "must be at least 1"));
    }
    if x.len() != array.ncols() {
        return Err(ProcessingError::LengthMismatch {
            left: x.len(),
            right: array.ncols(),
        });
    }
    let n_blocks = array.ncols().div_ceil(block);
    let mut new_x = Vec::with_capacity(n_blocks);
    let mut out = Array2::zeros((array.nrows(), n_blocks));
    for b in 0..n_blocks {
        let start = b * block;
        let end = (start + block).min(array.ncols());
        let chunk = &x[start..end];
        new_x.push(chunk.iter().sum::<f64>() / chunk.len() as f64);
        out.column_mut(b)
            .assign(&array.slice(s![.., start..end]).sum_axis(Axis(1)));
    }
    Ok((new_x, out))
}

/// Place unevenly spaced columns on a regular x axis.
///
/// The spacing of the new axis is the smallest gap between neighbouring x values;
/// each row is linearly interpolated onto it. Already regular axes are returned as is.
pub fn equalize_heatmap_spacing(
    x: &[f64],
    y: &[f64],
    array: &ArrayView2<f64>,
) -> Result<Heatmap, ProcessingError> {
    check_heatmap(x, y, array)?;
    if x.len() < 3 {
        return Ok((x.to_vec(), y.to_vec(), array.to_owned()));
    }

    let mut order: Vec<usize> = (0..x.len()).collect();
    order.sort_by(|&a, &b| x[a].total_cmp(&x[b]));
    let sorted_x: Vec<f64> = order.iter().map(|&i| x[i]).collect();
    let sorted = array.select(Axis(1), &order);

    let gaps: Vec<f64> = sorted_x.windows(2).map(|w| w[1] - w[0]).collect();
    let step = gaps
        .iter()
        .copied()
        .filter(|g| *g > 0.0)
        .fold(f64::INFINITY, f64::min);
    if !step.is_finite() {
        return Err(ProcessingError::invalid("x", "all values are identical"));
    }
    let regular = gaps.iter().all(|g| (g - step).abs() <= step * 1e-6);
    if regular {
        return Ok((sorted_x, y.to_vec(), sorted));
    }

    let first = sorted_x[0];
    let last = sorted_x[sorted_x.len() - 1];
    let n = ((last - first) / step).round() as usize + 1;
    let new_x = linspace(first, last, n);
    let out = resample_rows(&sorted.view(), &sorted_x, &new_x);
    Ok((new_x, y.to_vec(), out))
}
