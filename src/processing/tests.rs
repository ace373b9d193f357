use ndarray::array;

use super::heatmap::*;
use super::origami_ms::*;
use super::spectra::*;
use super::*;

fn assert_close(a: &[f64], b: &[f64]) {
    assert_eq!(a.len(), b.len(), "{a:?} vs {b:?}");
    for (x, y) in a.iter().zip(b) {
        assert!((x - y).abs() < 1e-9, "{a:?} vs {b:?}");
    }
}

#[test]
fn test_find_nearest_index() {
    let axis = [0.0, 1.0, 2.0, 3.0];
    assert_eq!(find_nearest_index(&axis, 1.4), 1);
    assert_eq!(find_nearest_index(&axis, 1.6), 2);
    assert_eq!(find_nearest_index(&axis, -10.0), 0);
    assert_eq!(find_nearest_index(&axis, 10.0), 3);
    assert_eq!(nearest_range(&axis, 2.9, 0.2), 0..=3);
}

#[test]
fn test_interp_outside_is_filled() {
    let values = interp(&[-1.0, 0.5, 2.0, 5.0], &[0.0, 1.0, 2.0], &[0.0, 10.0, 20.0], 0.0);
    assert_close(&values, &[0.0, 5.0, 20.0, 0.0]);
}

#[test]
fn test_crop_1d() {
    let x = [1.0, 2.0, 3.0, 4.0, 5.0];
    let y = [10.0, 20.0, 30.0, 40.0, 50.0];
    let (cx, cy) = crop_1d(&x, &y, Some(2.0), Some(4.0)).unwrap();
    assert_close(&cx, &[2.0, 3.0, 4.0]);
    assert_close(&cy, &[20.0, 30.0, 40.0]);

    let (cx, _) = crop_1d(&x, &y, None, Some(2.5)).unwrap();
    assert_close(&cx, &[1.0, 2.0]);

    assert!(crop_1d(&x, &y, Some(4.0), Some(2.0)).is_err());
    assert!(crop_1d(&x, &y[..2], None, None).is_err());
}

#[test]
fn test_linearize_interpolation() {
    let x = [0.0, 1.0, 2.0];
    let y = [0.0, 10.0, 20.0];
    let params = LinearizeParams::with_bin_size(0.5);
    let (nx, ny) = linearize_1d(&x, &y, &params).unwrap();
    assert_close(&nx, &[0.0, 0.5, 1.0, 1.5, 2.0]);
    assert_close(&ny, &[0.0, 5.0, 10.0, 15.0, 20.0]);
}

#[test]
fn test_linearize_binning_sums_points() {
    let x = [0.1, 0.2, 1.1, 1.9];
    let y = [1.0, 2.0, 3.0, 4.0];
    let params = LinearizeParams {
        method: LinearizeMethod::Binning,
        bin_size: 1.0,
        auto_range: false,
        x_min: Some(0.0),
        x_max: Some(1.0),
        ppm: None,
    };
    let (nx, ny) = linearize_1d(&x, &y, &params).unwrap();
    assert_close(&nx, &[0.0, 1.0]);
    assert_close(&ny, &[3.0, 7.0]);
}

#[test]
fn test_linearize_ppm_axis() {
    let params = LinearizeParams {
        ppm: Some(1e5),
        ..LinearizeParams::default()
    };
    let axis = linearization_axis(&[100.0, 130.0], &params).unwrap();
    assert_close(&axis, &[100.0, 110.0, 121.0]);

    let bad = LinearizeParams::with_bin_size(0.0);
    assert!(linearization_axis(&[1.0, 2.0], &bad).is_err());
}

#[test]
fn test_smoothing_preserves_constant_signal() {
    let y = vec![3.0; 20];
    let gaussian = smooth_1d(&y, &SmoothMethod::Gaussian { sigma: 2.0 }).unwrap();
    assert_close(&gaussian, &y);
    let average = smooth_1d(&y, &SmoothMethod::MovingAverage { window: 4 }).unwrap();
    assert_close(&average, &y);
    assert!(smooth_1d(&y, &SmoothMethod::Gaussian { sigma: 0.0 }).is_err());
}

#[test]
fn test_baseline() {
    let y = [0.5, 1.0, 5.0, 0.2];
    let out = baseline_1d(&y, &BaselineMethod::Linear { threshold: 1.0 }).unwrap();
    assert_close(&out, &[0.0, 0.0, 5.0, 0.0]);
    assert!(baseline_1d(&y, &BaselineMethod::Linear { threshold: -1.0 }).is_err());

    let flat = baseline_1d(&[2.0; 7], &BaselineMethod::Median { window: 3 }).unwrap();
    assert_close(&flat, &[0.0; 7]);
}

#[test]
fn test_normalize_1d() {
    assert_close(&normalize_1d(&[1.0, 2.0, 4.0]), &[0.25, 0.5, 1.0]);
    assert_close(&normalize_1d(&[0.0, 0.0]), &[0.0, 0.0]);
}

#[test]
fn test_crop_2d() {
    let x = [0.0, 1.0, 2.0, 3.0];
    let y = [10.0, 20.0, 30.0];
    let a = array![[1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.0], [9.0, 10.0, 11.0, 12.0]];
    let params = Crop2dParams {
        x_min: Some(1.0),
        x_max: Some(2.0),
        y_min: Some(20.0),
        y_max: None,
    };
    let (cx, cy, ca) = crop_2d(&x, &y, &a.view(), &params).unwrap();
    assert_close(&cx, &[1.0, 2.0]);
    assert_close(&cy, &[20.0, 30.0]);
    assert_eq!(ca, array![[6.0, 7.0], [10.0, 11.0]]);
}

#[test]
fn test_interpolate_2d_doubles_x() {
    let x = [0.0, 1.0];
    let y = [0.0];
    let a = array![[0.0, 3.0]];
    let (nx, ny, na) = interpolate_2d(&x, &y, &a.view(), &Interpolate2dParams::default()).unwrap();
    assert_eq!(nx.len(), 4);
    assert_eq!(ny, vec![0.0]);
    assert_close(&na.row(0).to_vec(), &[0.0, 1.0, 2.0, 3.0]);
}

#[test]
fn test_normalize_and_noise_2d() {
    let a = array![[0.0, 2.0], [4.0, 8.0]];
    assert_eq!(normalize_2d(&a.view(), Normalize2dMethod::Maximum), array![[0.0, 0.25], [0.5, 1.0]]);
    let total = normalize_2d(&a.view(), Normalize2dMethod::Total);
    assert!((total.sum() - 1.0).abs() < 1e-12);
    assert_eq!(remove_noise_2d(&a.view(), 2.0).unwrap(), array![[0.0, 0.0], [4.0, 8.0]]);
    assert!(remove_noise_2d(&a.view(), -1.0).is_err());
}

#[test]
fn test_sum_column_blocks() {
    let x = [0.0, 1.0, 2.0, 3.0, 4.0];
    let a = array![[1.0, 1.0, 1.0, 1.0, 1.0]];
    let (nx, na) = sum_column_blocks(&x, &a.view(), 2).unwrap();
    assert_close(&nx, &[0.5, 2.5, 4.0]);
    assert_eq!(na, array![[2.0, 2.0, 1.0]]);
}

#[test]
fn test_equalize_spacing() {
    let x = [0.0, 1.0, 3.0];
    let y = [0.0];
    let a = array![[0.0, 1.0, 3.0]];
    let (nx, _, na) = equalize_heatmap_spacing(&x, &y, &a.view()).unwrap();
    assert_close(&nx, &[0.0, 1.0, 2.0, 3.0]);
    assert_close(&na.row(0).to_vec(), &[0.0, 1.0, 2.0, 3.0]);

    let regular = [0.0, 2.0, 4.0];
    let (rx, _, _) = equalize_heatmap_spacing(&regular, &y, &a.view()).unwrap();
    assert_close(&rx, &regular);
}

#[test]
fn test_origami_linear_scan_list() {
    let method = OrigamiMsMethod::Linear {
        start_scan: 2,
        start_voltage: 4.0,
        end_voltage: 8.0,
        step_voltage: 2.0,
        scans_per_voltage: 3,
    };
    let steps = method.scan_list().unwrap();
    assert_eq!(steps.len(), 3);
    assert_eq!(
        steps[0],
        VoltageStep {
            start: 2,
            end: 5,
            voltage: 4.0
        }
    );
    assert_eq!(steps[2].start, 8);
    assert_eq!(steps[2].voltage, 8.0);
}

#[test]
fn test_origami_combine() {
    let method = OrigamiMsMethod::UserDefined {
        start_scan: 1,
        steps: vec![(2, 10.0), (3, 20.0)],
    };
    let y = [100.0, 1.0, 1.0, 2.0, 2.0, 2.0, 50.0];
    let reduced = combine_chromatogram(&y, &method).unwrap();
    assert_close(&reduced.data, &[2.0, 6.0]);
    assert_close(&reduced.voltages, &[10.0, 20.0]);

    let heatmap = array![[100.0, 1.0, 1.0, 2.0, 2.0, 2.0, 50.0]];
    let reduced = combine_heatmap(&heatmap.view(), &method).unwrap();
    assert_eq!(reduced.data, array![[2.0, 6.0]]);
    assert_close(&steps_to_rows(&reduced.steps), &[1.0, 3.0, 10.0, 3.0, 6.0, 20.0]);
}

#[test]
fn test_origami_method_from_json() {
    let method: OrigamiMsMethod = serde_json::from_value(serde_json::json!({
        "method": "Boltzmann",
        "start_scan": 0,
        "start_voltage": 4.0,
        "end_voltage": 6.0,
        "step_voltage": 2.0,
        "scans_per_voltage": 1,
        "boltzmann_offset": 10.0
    }))
    .unwrap();
    let steps = method.scan_list().unwrap();
    assert_eq!(steps.len(), 2);
    assert!(steps.iter().all(|s| s.end > s.start));
}
