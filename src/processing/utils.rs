use std::ops::RangeInclusive;

/// Index of the element of `axis` closest to `value`.
///
/// Returns 0 for an empty axis. Ties resolve to the lower index.
pub fn find_nearest_index(axis: &[f64], value: f64) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (idx, &v) in axis.iter().enumerate() {
        let distance = (v - value).abs();
        if distance < best_distance {
            best = idx;
            best_distance = distance;
        }
    }
    best
}

/// Inclusive index range spanned by `[lo, hi]` on `axis`; bounds may be given in
/// either order
pub fn nearest_range(axis: &[f64], lo: f64, hi: f64) -> RangeInclusive<usize> {
    let a = find_nearest_index(axis, lo);
    let b = find_nearest_index(axis, hi);
    a.min(b)..=a.max(b)
}

/// `n` evenly spaced values from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Piecewise-linear interpolation of `(xp, fp)` at `x`; `xp` must be ascending.
///
/// Points outside `xp` take the value `outside`.
pub fn interp(x: &[f64], xp: &[f64], fp: &[f64], outside: f64) -> Vec<f64> {
    let n = xp.len().min(fp.len());
    x.iter()
        .map(|&value| {
            if n == 0 || value < xp[0] || value > xp[n - 1] {
                return outside;
            }
            let upper = xp[..n].partition_point(|&p| p < value);
            if upper == 0 {
                return fp[0];
            }
            if upper >= n {
                return fp[n - 1];
            }
            let (x0, x1) = (xp[upper - 1], xp[upper]);
            let (y0, y1) = (fp[upper - 1], fp[upper]);
            if x1 == x0 {
                y0
            } else {
                y0 + (y1 - y0) * (value - x0) / (x1 - x0)
            }
        })
        .collect()
}

/// Reflect an out-of-bounds index back into `0..len` (`d c b a | a b c d | d c b a`)
pub(crate) fn reflect_index(idx: isize, len: usize) -> usize {
    let len = len as isize;
    if len == 1 {
        return 0;
    }
    let period = 2 * len;
    let mut i = idx.rem_euclid(period);
    if i >= len {
        i = period - 1 - i;
    }
    i as usize
}

/// Convolve `values` with `kernel` (odd length, centred) using reflected edges
pub(crate) fn convolve_reflect(values: &[f64], kernel: &[f64]) -> Vec<f64> {
    let len = values.len();
    if len == 0 {
        return Vec::new();
    }
    let radius = (kernel.len() / 2) as isize;
    (0..len as isize)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * values[reflect_index(i + k as isize - radius, len)])
                .sum()
        })
        .collect()
}

/// Normalized Gaussian kernel truncated at four standard deviations
pub(crate) fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (4.0 * sigma).ceil().max(1.0) as isize;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|i| (-0.5 * (i as f64 / sigma).powi(2)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}
