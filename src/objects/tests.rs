use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{array, Array2};
use serde_json::json;
use tempfile::tempdir;

use super::labels::*;
use super::*;
use crate::array::DType;
use crate::processing::{
    BaselineMethod, Crop2dParams, CropParams, LinearizeParams, Normalize2dMethod,
    OrigamiMsMethod, SmoothMethod,
};

fn assert_close(a: &[f64], b: &[f64]) {
    assert_eq!(a.len(), b.len(), "{a:?} vs {b:?}");
    for (x, y) in a.iter().zip(b) {
        assert!((x - y).abs() < 1e-9, "{a:?} vs {b:?}");
    }
}

fn metadata(value: Value) -> Metadata {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

fn ramp(n: usize) -> Vec<f64> {
    (0..n).map(|v| v as f64).collect()
}

fn linear_method() -> OrigamiMsMethod {
    OrigamiMsMethod::Linear {
        start_scan: 0,
        start_voltage: 5.0,
        end_voltage: 10.0,
        step_voltage: 5.0,
        scans_per_voltage: 4,
    }
}

fn small_heatmap() -> HeatmapObject {
    // value = 10 * row + column
    let array = Array2::from_shape_fn((3, 4), |(r, c)| (10 * r + c) as f64);
    HeatmapObject::ion_heatmap(array, ramp(4), ramp(3)).unwrap()
}

#[test]
fn test_mass_spectrum_defaults() {
    let spectrum = SpectrumObject::mass_spectrum(ramp(100), ramp(100)).unwrap();
    assert_eq!(spectrum.base().x_label(), MZ);
    assert_eq!(spectrum.base().y_label(), INTENSITY);
    assert_eq!(spectrum.x_limit().unwrap(), (0.0, 99.0));
    assert_eq!(spectrum.len().unwrap(), 100);
    assert_eq!(spectrum.base().x_label_options(), vec![MZ.to_string()]);
    assert_eq!(spectrum.class_name(), "MassSpectrumObject");
    assert_eq!(spectrum.document_key(), "MassSpectra");
    assert!(spectrum.options().remove_zeros);
    assert!(spectrum.title().is_none());
}

#[test]
fn test_spectrum_length_mismatch() {
    let err = SpectrumObject::mass_spectrum(vec![1.0, 2.0], vec![1.0]).unwrap_err();
    assert!(matches!(err, ObjectError::LengthMismatch { x_len: 2, y_len: 1 }));

    let mut spectrum = SpectrumObject::chromatogram(ramp(3), ramp(3)).unwrap();
    assert!(spectrum.set_xy(ramp(4), ramp(2)).is_err());
    assert_eq!(spectrum.len().unwrap(), 3);
}

#[test]
fn test_mobilogram_bins_to_ms_and_back() {
    let x = ArrayData::arange(200);
    let y = vec![1.0; 200];
    let mut mobilogram = SpectrumObject::mobilogram(x.clone(), y.clone()).unwrap();

    mobilogram
        .change_x_label(DRIFT_TIME_MS, &ConversionParams::pusher_freq(1000.0))
        .unwrap();
    assert_eq!(mobilogram.base().x_label(), DRIFT_TIME_MS);
    assert_close(mobilogram.x().unwrap().values(), x.values());
    assert_close(mobilogram.y().unwrap().values(), &y);
    assert_eq!(
        mobilogram.base().metadata().get("x_label_default"),
        Some(&json!(DRIFT_TIME_BINS))
    );
    assert!(mobilogram.base().extra_data().contains_key("x_bin"));
    assert!(mobilogram.base().extra_data().contains_key("x_ms"));

    // the cached bins are reused, no pusher frequency needed
    mobilogram
        .change_x_label(DRIFT_TIME_BINS, &ConversionParams::default())
        .unwrap();
    assert_eq!(mobilogram.base().x_label(), DRIFT_TIME_BINS);
    assert_eq!(mobilogram.x().unwrap().values(), x.values());
    assert_eq!(mobilogram.x().unwrap().dtype(), DType::Int32);
}

#[test]
fn test_drift_time_conversion_scales_by_pusher() {
    let mut mobilogram = SpectrumObject::mobilogram(ArrayData::arange(4), vec![1.0; 4]).unwrap();
    mobilogram
        .change_x_label(ARRIVAL_TIME_MS, &ConversionParams::pusher_freq(500.0))
        .unwrap();
    assert_close(mobilogram.x().unwrap().values(), &[0.0, 0.5, 1.0, 1.5]);
    // synonyms within the millisecond group keep the values
    mobilogram
        .change_x_label(DRIFT_TIME_MS, &ConversionParams::default())
        .unwrap();
    assert_close(mobilogram.x().unwrap().values(), &[0.0, 0.5, 1.0, 1.5]);
}

#[test]
fn test_chromatogram_scans_to_minutes() {
    let mut chromatogram = SpectrumObject::chromatogram(ArrayData::arange(60), ramp(60)).unwrap();
    chromatogram
        .change_x_label(TIME_MINS, &ConversionParams::scan_time(30.0))
        .unwrap();
    let x = chromatogram.x().unwrap().values();
    assert!((x[59] - 29.5).abs() < 1e-9);
    assert!((x[1] - 0.5).abs() < 1e-9);

    chromatogram
        .change_x_label(RESTORE_DEFAULT, &ConversionParams::default())
        .unwrap();
    assert_eq!(chromatogram.base().x_label(), SCANS);
    assert_close(chromatogram.x().unwrap().values(), &ramp(60));
}

#[test]
fn test_minutes_to_scans_without_cache_rounds() {
    let mut chromatogram = SpectrumObject::chromatogram(vec![0.0, 0.5, 1.0], vec![1.0; 3])
        .unwrap()
        .with_labels(TIME_MINS, INTENSITY);
    chromatogram
        .change_x_label(SCANS, &ConversionParams::scan_time(30.0))
        .unwrap();
    assert_eq!(chromatogram.x().unwrap().values(), &[0.0, 1.0, 2.0]);
    assert_eq!(chromatogram.x().unwrap().dtype(), DType::Int32);
}

#[test]
fn test_missing_scan_time_is_reported() {
    let mut chromatogram = SpectrumObject::chromatogram(ramp(5), ramp(5)).unwrap();
    let err = chromatogram
        .change_x_label(TIME_MINS, &ConversionParams::default())
        .unwrap_err();
    assert!(matches!(err, ObjectError::MissingParameter("scan_time")));
    assert_eq!(chromatogram.base().x_label(), SCANS);

    let err = chromatogram
        .change_x_label(TIME_MINS, &ConversionParams::scan_time(-1.0))
        .unwrap_err();
    assert!(matches!(err, ObjectError::MissingParameter("scan_time")));
}

#[test]
fn test_collision_voltage_to_energy_uses_charge() {
    let mut chromatogram = SpectrumObject::chromatogram(vec![10.0, 20.0, 30.0], vec![1.0; 3])
        .unwrap()
        .with_labels(COLLISION_VOLTAGE, INTENSITY);
    chromatogram
        .change_x_label(LAB_FRAME_ENERGY, &ConversionParams::charge(3.0))
        .unwrap();
    assert_close(chromatogram.x().unwrap().values(), &[30.0, 60.0, 90.0]);
    chromatogram
        .change_x_label(COLLISION_VOLTAGE, &ConversionParams::default())
        .unwrap();
    assert_close(chromatogram.x().unwrap().values(), &[10.0, 20.0, 30.0]);

    // charge taken from the metadata
    let mut charged = SpectrumObject::chromatogram(vec![10.0, 20.0], vec![1.0; 2])
        .unwrap()
        .with_labels(ACTIVATION_VOLTAGE_V, INTENSITY)
        .with_metadata(metadata(json!({"charge": 2})));
    charged
        .change_x_label(ACTIVATION_ENERGY_EV, &ConversionParams::default())
        .unwrap();
    assert_close(charged.x().unwrap().values(), &[20.0, 40.0]);
}

#[test]
fn test_label_outside_options_is_rejected() {
    let mut spectrum = SpectrumObject::mass_spectrum(ramp(3), ramp(3)).unwrap();
    let err = spectrum
        .change_x_label(SCANS, &ConversionParams::default())
        .unwrap_err();
    assert!(matches!(err, ObjectError::LabelNotAllowed { ref label, .. } if label == SCANS));

    let mut mobilogram = SpectrumObject::mobilogram(ramp(3), ramp(3)).unwrap();
    assert!(matches!(
        mobilogram.change_x_label(SCANS, &ConversionParams::default()),
        Err(ObjectError::LabelNotAllowed { .. })
    ));
    // both labels are drift-time labels but there is no bins to CCS conversion
    assert!(matches!(
        mobilogram.change_x_label(CCS, &ConversionParams::pusher_freq(100.0)),
        Err(ObjectError::UnsupportedConversion { .. })
    ));
    assert!(matches!(
        spectrum.change_y_label("Counts", &ConversionParams::default()),
        Err(ObjectError::LabelNotAllowed { .. })
    ));
}

#[test]
fn test_same_label_is_a_no_op() {
    let mut spectrum = SpectrumObject::mass_spectrum(ramp(3), ramp(3)).unwrap();
    spectrum.change_x_label(MZ, &ConversionParams::default()).unwrap();
    spectrum
        .change_x_label(RESTORE_DEFAULT, &ConversionParams::default())
        .unwrap();
    spectrum
        .change_y_label(INTENSITY, &ConversionParams::default())
        .unwrap();
    assert_eq!(spectrum.base().x_label(), MZ);
    assert_close(spectrum.x().unwrap().values(), &ramp(3));
    assert!(!spectrum.is_unsaved());
}

#[test]
fn test_crop_clears_axis_cache() {
    let mut mobilogram = SpectrumObject::mobilogram(ArrayData::arange(200), vec![1.0; 200]).unwrap();
    mobilogram
        .change_x_label(DRIFT_TIME_MS, &ConversionParams::pusher_freq(1000.0))
        .unwrap();
    mobilogram
        .crop(&CropParams {
            min: Some(10.0),
            max: Some(19.0),
        })
        .unwrap();
    assert_eq!(mobilogram.len().unwrap(), 10);
    assert!(!mobilogram.base().extra_data().contains_key("x_bin"));
    assert!(!mobilogram.base().extra_data().contains_key("x_ms"));
    assert!(mobilogram.is_unsaved());

    // the stale bins are gone so the conversion needs the pusher frequency again
    assert!(matches!(
        mobilogram.change_x_label(DRIFT_TIME_BINS, &ConversionParams::default()),
        Err(ObjectError::MissingParameter("pusher_freq"))
    ));
}

#[test]
fn test_x_bin_and_spacing() {
    let spectrum = SpectrumObject::mobilogram(vec![0.0, 2.0, 4.0, 6.0], vec![1.0; 4]).unwrap();
    assert_eq!(spectrum.x_bin().unwrap().values(), &[0.0, 1.0, 2.0, 3.0]);
    assert!((spectrum.x_spacing().unwrap() - 2.0).abs() < 1e-12);
}

#[test]
fn test_spectrum_region_queries() {
    let spectrum = SpectrumObject::mass_spectrum(
        vec![100.0, 101.0, 102.0, 103.0, 104.0],
        vec![1.0, 7.0, 3.0, 9.0, 2.0],
    )
    .unwrap();
    let (x, y) = spectrum.get_x_window(100.5, 102.5).unwrap();
    assert_close(&x, &[101.0, 102.0]);
    assert_close(&y, &[7.0, 3.0]);
    assert_eq!(spectrum.get_y_at_loc(100.0, 102.0).unwrap(), 7.0);
    assert_eq!(spectrum.get_x_at_loc(100.0, 102.0).unwrap(), (101.0, 7.0));
    assert_eq!(spectrum.get_x_at_max().unwrap(), (103.0, 9.0));
    assert_eq!(spectrum.y_limit().unwrap(), (1.0, 9.0));
}

#[test]
fn test_spectrum_processing_chain() {
    let mut spectrum =
        SpectrumObject::mobilogram(ramp(10), vec![0.0, 1.0, 2.0, 8.0, 4.0, 2.0, 1.0, 0.0, 0.0, 0.0])
            .unwrap();
    spectrum
        .process(&SpectrumProcessing {
            crop: Some(CropParams {
                min: Some(1.0),
                max: Some(6.0),
            }),
            baseline: Some(BaselineMethod::Linear { threshold: 1.0 }),
            normalize: true,
            ..SpectrumProcessing::default()
        })
        .unwrap();
    assert_close(spectrum.x().unwrap().values(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_close(spectrum.y().unwrap().values(), &[0.0, 0.25, 1.0, 0.5, 0.25, 0.0]);

    spectrum.divide(2.0).unwrap();
    assert_eq!(spectrum.y_limit().unwrap().1, 0.5);
    assert!(spectrum.divide(0.0).is_err());
    assert!(spectrum.divide(f64::NAN).is_err());

    spectrum
        .smooth(&SmoothMethod::MovingAverage { window: 3 })
        .unwrap();
    assert_eq!(spectrum.len().unwrap(), 6);
}

#[test]
fn test_linearize_places_signal_on_regular_axis() {
    let mut spectrum =
        SpectrumObject::mass_spectrum(vec![100.0, 100.5, 102.0], vec![1.0, 2.0, 4.0]).unwrap();
    spectrum.linearize(&LinearizeParams::with_bin_size(0.5)).unwrap();
    let x = spectrum.x().unwrap().values().to_vec();
    assert!(x.len() >= 4);
    for pair in x.windows(2) {
        assert!((pair[1] - pair[0] - 0.5).abs() < 1e-6);
    }
    assert!(spectrum.is_unsaved());
}

#[test]
fn test_csv_export_spectrum() {
    let dir = tempdir().unwrap();
    let spectrum =
        SpectrumObject::mass_spectrum(vec![0.0, 1.0, 2.0], vec![0.0, 0.0, 3.0]).unwrap();

    let path = spectrum
        .to_csv(dir.path().join("spectrum"), &CsvOptions::default())
        .unwrap();
    assert_eq!(path, dir.path().join("spectrum.csv"));
    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], format!("# {MZ},{INTENSITY}"));
    assert_eq!(lines[1..], ["1.000000,0.000000", "2.000000,3.000000"]);

    let kept = spectrum
        .to_csv(
            dir.path().join("kept.txt"),
            &CsvOptions {
                remove_zeros: Some(false),
                ..CsvOptions::default()
            },
        )
        .unwrap();
    let text = fs::read_to_string(&kept).unwrap();
    assert_eq!(text.lines().count(), 4);
    assert!(text.lines().nth(1).unwrap().contains('\t'));
}

#[test]
fn test_csv_output_resolution() {
    let (path, delimiter) = resolve_output(Path::new("out/a.csv"), None);
    assert_eq!((path, delimiter), (PathBuf::from("out/a.csv"), b','));
    assert_eq!(resolve_output(Path::new("a.tab"), None).1, b'\t');
    assert_eq!(
        resolve_output(Path::new("a"), Some(b'\t')),
        (PathBuf::from("a.txt"), b'\t')
    );
    assert_eq!(
        resolve_output(Path::new("a.dat"), None),
        (PathBuf::from("a.dat.csv"), b',')
    );
    assert_eq!(resolve_output(Path::new("a.csv"), Some(b';')).1, b';');
}

#[test]
fn test_ion_heatmap_shapes() {
    let array = Array2::from_shape_fn((100, 50), |(r, c)| (r + c) as f64);
    let heatmap = HeatmapObject::from_array(HeatmapKind::IonHeatmap, array.clone()).unwrap();
    assert_eq!(heatmap.shape().unwrap(), (100, 50));
    assert_eq!(heatmap.x().unwrap().len(), 50);
    assert_eq!(heatmap.y().unwrap().len(), 100);
    assert_eq!(heatmap.xy().unwrap().len(), 50);
    assert_eq!(heatmap.yy().unwrap().len(), 100);
    assert_eq!(heatmap.xy().unwrap().values()[0], array.column(0).sum());
    assert_eq!(heatmap.yy().unwrap().values()[0], array.row(0).sum());
    assert_eq!(heatmap.base().x_label(), SCANS);
    assert_eq!(heatmap.base().y_label(), DRIFT_TIME_BINS);
    assert_eq!(heatmap.x_limit().unwrap(), (0.0, 49.0));
    assert_eq!(heatmap.y_limit().unwrap(), (0.0, 99.0));
}

#[test]
fn test_heatmap_axis_mismatch() {
    let array = Array2::<f64>::zeros((3, 4));
    let err = HeatmapObject::ion_heatmap(array.clone(), ramp(5), ramp(3)).unwrap_err();
    assert!(matches!(
        err,
        ObjectError::AxisShapeMismatch {
            axis: "x",
            expected: 4,
            actual: 5
        }
    ));
    let err = HeatmapObject::ion_heatmap(array.clone(), ramp(4), ramp(3))
        .unwrap()
        .with_marginals(ramp(4), ramp(2))
        .unwrap_err();
    assert!(matches!(err, ObjectError::AxisShapeMismatch { axis: "yy", .. }));
    assert!(matches!(
        HeatmapObject::from_array(HeatmapKind::IonHeatmap, ramp(3)),
        Err(ObjectError::WrongDimensions { expected: 2, actual: 1 })
    ));
}

#[test]
fn test_heatmap_roi() {
    let heatmap = small_heatmap();
    assert_close(
        &heatmap.get_x_for_roi(1.0, 2.0, 0.0, 1.0).unwrap(),
        &[0.0, 12.0, 14.0, 0.0],
    );
    assert_close(
        &heatmap.get_y_for_roi(1.0, 2.0, 0.0, 1.0).unwrap(),
        &[3.0, 23.0, 0.0],
    );
    let (x, y, array) = heatmap.get_array_for_roi(1.0, 2.0, 0.0, 1.0).unwrap();
    assert_close(&x, &[1.0, 2.0]);
    assert_close(&y, &[0.0, 1.0]);
    assert_eq!(array, array![[1.0, 2.0], [11.0, 12.0]]);
}

#[test]
fn test_heatmap_downsample() {
    let heatmap =
        HeatmapObject::ion_heatmap(Array2::<f64>::ones((2, 6)), ramp(6), ramp(2)).unwrap();
    let (x, y, array) = heatmap.downsample(3, DownsampleMode::SubSample).unwrap();
    assert_close(&x, &[0.0, 2.0, 4.0]);
    assert_close(&y, &[0.0, 1.0]);
    assert_eq!(array.dim(), (2, 3));

    let (x, _, array) = heatmap.downsample(3, DownsampleMode::Summed).unwrap();
    assert_close(&x, &[0.5, 2.5, 4.5]);
    assert!(array.iter().all(|v| *v == 2.0));

    // nothing to reduce
    let (x, _, _) = heatmap.downsample(10, DownsampleMode::SubSample).unwrap();
    assert_eq!(x.len(), 6);
    assert!(heatmap.downsample(0, DownsampleMode::Summed).is_err());
}

#[test]
fn test_heatmap_transpose() {
    let mut heatmap = small_heatmap();
    heatmap.transpose().unwrap();
    assert_eq!(heatmap.shape().unwrap(), (4, 3));
    assert_eq!(heatmap.base().x_label(), DRIFT_TIME_BINS);
    assert_eq!(heatmap.base().y_label(), SCANS);
    assert_close(heatmap.x().unwrap().values(), &ramp(3));
    assert_close(heatmap.y().unwrap().values(), &ramp(4));
    assert_eq!(heatmap.array().unwrap().view2().unwrap()[[3, 2]], 23.0);
    assert!(heatmap.is_unsaved());
}

#[test]
fn test_heatmap_projections() {
    let heatmap = small_heatmap();
    let mobilogram = heatmap.as_mobilogram().unwrap();
    assert_eq!(mobilogram.kind(), SpectrumKind::Mobilogram);
    assert_eq!(mobilogram.base().x_label(), DRIFT_TIME_BINS);
    assert_close(mobilogram.x().unwrap().values(), &ramp(3));
    assert_close(mobilogram.y().unwrap().values(), &[6.0, 46.0, 86.0]);

    let chromatogram = heatmap.as_chromatogram().unwrap();
    assert_eq!(chromatogram.base().x_label(), SCANS);
    assert_close(chromatogram.y().unwrap().values(), &[30.0, 33.0, 36.0, 39.0]);
    assert!(matches!(
        heatmap.as_mass_spectrum(),
        Err(ObjectError::UnsupportedOperation { .. })
    ));

    let msdt = HeatmapObject::msdt_heatmap(
        Array2::<f64>::ones((2, 3)),
        vec![100.0, 200.0, 300.0],
        ramp(2),
    )
    .unwrap();
    let spectrum = msdt.as_mass_spectrum().unwrap();
    assert_eq!(spectrum.base().x_label(), MZ);
    assert_close(spectrum.y().unwrap().values(), &[2.0, 2.0, 2.0]);
    assert!(msdt.as_chromatogram().is_err());
}

#[test]
fn test_heatmap_label_changes() {
    let mut heatmap = small_heatmap();
    heatmap
        .change_y_label(DRIFT_TIME_MS, &ConversionParams::pusher_freq(500.0))
        .unwrap();
    assert_close(heatmap.y().unwrap().values(), &[0.0, 0.5, 1.0]);
    heatmap
        .change_x_label(TIME_MINS, &ConversionParams::scan_time(60.0))
        .unwrap();
    assert_close(heatmap.x().unwrap().values(), &ramp(4));
    assert_eq!(heatmap.base().x_label(), TIME_MINS);
    assert_eq!(heatmap.shape().unwrap(), (3, 4));

    let mut msdt =
        HeatmapObject::msdt_heatmap(Array2::<f64>::ones((2, 3)), ramp(3), ramp(2)).unwrap();
    assert!(matches!(
        msdt.change_x_label(SCANS, &ConversionParams::default()),
        Err(ObjectError::LabelNotAllowed { .. })
    ));
    msdt.change_y_label(DRIFT_TIME_MS, &ConversionParams::pusher_freq(1000.0))
        .unwrap();
    assert_eq!(msdt.base().y_label(), DRIFT_TIME_MS);
}

#[test]
fn test_heatmap_processing() {
    let mut heatmap = small_heatmap();
    heatmap
        .process(&HeatmapProcessing {
            crop: Some(Crop2dParams {
                x_min: Some(1.0),
                x_max: Some(2.0),
                ..Crop2dParams::default()
            }),
            baseline: Some(2.0),
            normalize: Some(Normalize2dMethod::Maximum),
            ..HeatmapProcessing::default()
        })
        .unwrap();
    assert_eq!(heatmap.shape().unwrap(), (3, 2));
    assert_close(heatmap.x().unwrap().values(), &[1.0, 2.0]);
    let array = heatmap.array().unwrap().view2().unwrap().to_owned();
    assert_eq!(array[[0, 0]], 0.0);
    assert_eq!(array[[0, 1]], 0.0);
    assert!((array[[2, 1]] - 1.0).abs() < 1e-12);
    // marginals follow the new array
    assert_eq!(heatmap.xy().unwrap().len(), 2);
}

#[test]
fn test_heatmap_csv_exports() {
    let dir = tempdir().unwrap();
    let heatmap = small_heatmap();

    let path = heatmap
        .to_csv(dir.path().join("full.csv"), HeatmapExport::Array, &CsvOptions::default())
        .unwrap();
    let text = fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0].split(',').count(), 5);

    let path = heatmap
        .to_csv(dir.path().join("dt"), HeatmapExport::DriftTime, &CsvOptions::with_delimiter(b'\t'))
        .unwrap();
    assert_eq!(path, dir.path().join("dt.txt"));
    let text = fs::read_to_string(path).unwrap();
    assert_eq!(text.lines().next().unwrap(), format!("# {DRIFT_TIME_BINS}\t{INTENSITY}"));
    assert_eq!(text.lines().count(), 4);

    let path = heatmap
        .to_csv(dir.path().join("rt.csv"), HeatmapExport::Retention, &CsvOptions::default())
        .unwrap();
    assert_eq!(fs::read_to_string(path).unwrap().lines().count(), 5);
}

#[test]
fn test_stitch_mobilograms() {
    let first = SpectrumObject::mobilogram(ramp(3), vec![1.0, 2.0, 3.0]).unwrap();
    let second = SpectrumObject::mobilogram(ramp(3), vec![4.0, 5.0, 6.0]).unwrap();
    let heatmap = HeatmapObject::stitch(&[first.clone(), second.clone()], &[10.0, 20.0]).unwrap();
    assert_eq!(heatmap.kind(), HeatmapKind::StitchIonHeatmap);
    assert_eq!(heatmap.class_name(), "StitchIonHeatmapObject");
    assert_eq!(heatmap.shape().unwrap(), (3, 2));
    assert_close(heatmap.x().unwrap().values(), &[10.0, 20.0]);
    assert_eq!(heatmap.base().y_label(), DRIFT_TIME_BINS);
    let array = heatmap.array().unwrap().view2().unwrap().to_owned();
    assert_eq!(array.column(1).to_vec(), vec![4.0, 5.0, 6.0]);

    assert!(matches!(
        HeatmapObject::stitch(&[first.clone(), second], &[10.0]),
        Err(ObjectError::Stitch(_))
    ));
    let short = SpectrumObject::mobilogram(ramp(2), vec![1.0, 1.0]).unwrap();
    assert!(HeatmapObject::stitch(&[first, short], &[1.0, 2.0]).is_err());
    assert!(HeatmapObject::stitch(&[], &[]).is_err());
}

#[test]
fn test_chromatogram_origami_ms() {
    let mut chromatogram = SpectrumObject::chromatogram(ramp(20), vec![1.0; 20]).unwrap();
    assert!(matches!(
        chromatogram.apply_origami_ms(None),
        Err(ObjectError::MissingParameter("origami_ms"))
    ));

    chromatogram.apply_origami_ms(Some(linear_method())).unwrap();
    assert_eq!(chromatogram.base().x_label(), COLLISION_VOLTAGE);
    assert_close(chromatogram.x().unwrap().values(), &[5.0, 10.0]);
    assert_close(chromatogram.y().unwrap().values(), &[4.0, 4.0]);
    let steps = &chromatogram.base().extra_data()["oms_ss_es_cv"];
    assert_eq!(steps.shape(), &[2, 3]);
    assert_close(steps.values(), &[0.0, 4.0, 5.0, 4.0, 8.0, 10.0]);
    assert!(chromatogram.base().metadata().contains_key("origami_ms"));

    // already on a voltage axis
    chromatogram.apply_origami_ms(Some(linear_method())).unwrap();
    assert_eq!(chromatogram.len().unwrap(), 2);

    let mut spectrum = SpectrumObject::mass_spectrum(ramp(3), ramp(3)).unwrap();
    assert!(matches!(
        spectrum.apply_origami_ms(Some(linear_method())),
        Err(ObjectError::UnsupportedOperation { .. })
    ));
}

#[test]
fn test_heatmap_origami_ms() {
    let mut heatmap =
        HeatmapObject::ion_heatmap(Array2::<f64>::ones((3, 10)), ramp(10), ramp(3)).unwrap();
    heatmap.apply_origami_ms(Some(linear_method())).unwrap();
    assert_eq!(heatmap.shape().unwrap(), (3, 2));
    assert_eq!(heatmap.base().x_label(), COLLISION_VOLTAGE);
    assert!(heatmap.array().unwrap().values().iter().all(|v| *v == 4.0));
    assert_close(heatmap.xy().unwrap().values(), &[12.0, 12.0]);

    let mut msdt =
        HeatmapObject::msdt_heatmap(Array2::<f64>::ones((2, 3)), ramp(3), ramp(2)).unwrap();
    assert!(msdt.apply_origami_ms(Some(linear_method())).is_err());
}

#[test]
fn test_annotations() {
    let mut annotation = Annotation::new("peak", "A", (1.0, 2.0), (0.5, 0.0, 1.0, 3.0));
    assert_eq!(annotation.width(), 1.0);
    assert_eq!(annotation.span_x_max(), 1.5);
    assert_eq!(annotation.span_y_max(), 3.0);
    assert_eq!(annotation.arrow(Some((2.0, 4.0))), Some((1.0, 2.0, 1.0, 2.0)));
    assert_eq!(annotation.arrow(None), None);
    annotation.marker_position = Some((1.0, 0.0));
    assert_eq!(annotation.arrow(None), Some((1.0, 2.0, 0.0, -2.0)));

    let mut annotations = Annotations::new();
    annotations.add(annotation);
    annotations.add(Annotation::new("other", "B", (5.0, 6.0), (4.0, 0.0, 2.0, 1.0)));
    assert_eq!(annotations.len(), 2);
    assert_eq!(annotations.label_position_x(), vec![5.0, 1.0]);

    let mut spectrum = SpectrumObject::mass_spectrum(ramp(10), ramp(10)).unwrap();
    assert!(spectrum.get_annotations().unwrap().is_empty());
    spectrum.set_annotations(&annotations).unwrap();
    let restored = spectrum.get_annotations().unwrap();
    assert_eq!(restored, annotations);
    assert!(restored.contains("peak"));
    assert!(spectrum.base().metadata().contains_key(ANNOTATIONS_KEY));
}

#[test]
fn test_metadata_must_be_a_mapping() {
    let mut spectrum = SpectrumObject::mass_spectrum(ramp(2), ramp(2)).unwrap();
    assert!(matches!(
        spectrum.base_mut().set_metadata(json!([1, 2])),
        Err(ObjectError::InvalidMetadata(_))
    ));
    spectrum.base_mut().set_metadata(json!({"sample": "A"})).unwrap();
    assert_eq!(spectrum.base().metadata()["sample"], json!("A"));
    let dict = spectrum.to_dict().unwrap();
    assert_eq!(dict["sample"], json!("A"));
    assert_eq!(dict["x_label"], json!(MZ));
}

#[test]
fn test_data_object_dispatch() {
    let object = DataObject::from(SpectrumObject::chromatogram(ramp(2), ramp(2)).unwrap());
    assert_eq!(object.kind(), ObjectKind::Spectrum(SpectrumKind::Chromatogram));
    assert!(object.as_spectrum().is_some());
    assert!(object.as_heatmap().is_none());
    assert!(matches!(
        object.clone().into_heatmap(),
        Err(ObjectError::UnsupportedOperation { .. })
    ));
    assert_eq!(object.as_container().document_key(), "Chromatograms");

    for kind in ObjectKind::ALL {
        assert_eq!(ObjectKind::from_class_name(kind.class_name()), Some(kind));
    }
    assert_eq!(ObjectKind::from_class_name("PlotObject"), None);
    assert!(are_synonyms(TIME_MINS, RETENTION_TIME_MINS));
    assert!(are_synonyms(ACTIVATION_ENERGY_V, COLLISION_VOLTAGE));
    assert!(!are_synonyms(SCANS, MZ));
}

#[test]
fn test_detached_objects_skip_document_writes() {
    let mut spectrum = SpectrumObject::mass_spectrum(ramp(3), ramp(3)).unwrap();
    spectrum.normalize().unwrap();
    assert!(spectrum.is_unsaved());
    assert!(!spectrum.can_flush());
    spectrum.flush().unwrap();
    spectrum.flush_metadata().unwrap();
    assert!(spectrum.copy(None, "copy").unwrap().is_none());
    assert!(matches!(spectrum.rename("other"), Err(ObjectError::InvalidPath(_))));
}

#[test]
fn test_flush_copy_and_rename_through_document() {
    let dir = tempdir().unwrap();
    let store = DocumentStore::open(dir.path().join("doc"), None).unwrap();
    let spectrum = SpectrumObject::mass_spectrum(ramp(5), vec![1.0, 2.0, 4.0, 2.0, 1.0]).unwrap();
    let mut stored = store
        .add_spectrum("S", &spectrum)
        .unwrap()
        .into_spectrum()
        .unwrap();
    assert_eq!(stored.title(), Some("MassSpectra/S"));
    assert_eq!(stored.dataset_name(), Some("S"));
    assert!(stored.can_flush());

    stored.normalize().unwrap();
    stored.flush().unwrap();
    assert!(!stored.is_unsaved());
    let reloaded = store.get_object("MassSpectra/S").unwrap().into_spectrum().unwrap();
    assert_close(reloaded.y().unwrap().values(), &[0.25, 0.5, 1.0, 0.5, 0.25]);

    let (path, copy) = stored.copy(None, "copy").unwrap().unwrap();
    assert_eq!(path, "MassSpectra/S (copy 0)");
    assert_eq!(copy.as_container().title(), Some(path.as_str()));
    let (path, _) = stored.copy(Some("T"), "copy").unwrap().unwrap();
    assert_eq!(path, "MassSpectra/T");

    stored.rename("R").unwrap();
    assert_eq!(stored.title(), Some("MassSpectra/R"));
    assert_eq!(stored.name(), "R");
    assert!(store.contains("MassSpectra/R"));
    assert!(!store.contains("MassSpectra/S"));
    assert_eq!(stored.len().unwrap(), 5);
    // same name is a no-op
    stored.rename("R").unwrap();
    assert!(matches!(stored.rename("T"), Err(ObjectError::StoreError(_))));
}

#[test]
fn test_conversion_reads_document_parameters() {
    let dir = tempdir().unwrap();
    let store = DocumentStore::open(dir.path().join("doc"), None).unwrap();
    store
        .add_attrs("Metadata/Parameters", &metadata(json!({"scan_time": 60.0})))
        .unwrap();
    let chromatogram = SpectrumObject::chromatogram(ArrayData::arange(5), vec![1.0; 5]).unwrap();
    let mut stored = store
        .add_chromatogram("C", &chromatogram)
        .unwrap()
        .into_spectrum()
        .unwrap();
    stored
        .change_x_label(TIME_MINS, &ConversionParams::default())
        .unwrap();
    assert_close(stored.x().unwrap().values(), &ramp(5));

    // the label change was flushed, together with the unit caches
    let reloaded = store.get_object("Chromatograms/C").unwrap().into_spectrum().unwrap();
    assert_eq!(reloaded.base().x_label(), TIME_MINS);
    assert_eq!(
        reloaded.base().metadata().get("x_label_default"),
        Some(&json!(SCANS))
    );
    assert!(reloaded.base().extra_data().contains_key("x_bin"));
    assert!(reloaded.base().extra_data().contains_key("x_min"));
}

#[test]
fn test_processing_removes_stored_unit_caches() {
    let dir = tempdir().unwrap();
    let store = DocumentStore::open(dir.path().join("doc"), None).unwrap();
    let chromatogram = SpectrumObject::chromatogram(ArrayData::arange(4), vec![1.0; 4]).unwrap();
    let mut stored = store
        .add_chromatogram("C", &chromatogram)
        .unwrap()
        .into_spectrum()
        .unwrap();
    let params = ConversionParams::scan_time(60.0);
    stored.change_x_label(TIME_MINS, &params).unwrap();
    let group = store.get("Chromatograms/C").unwrap();
    assert_eq!(group.array_keys().unwrap(), vec!["x", "x_bin", "x_min", "y"]);

    stored
        .linearize(&LinearizeParams {
            bin_size: 1.0,
            auto_range: false,
            x_min: Some(10.0),
            x_max: Some(13.0),
            ..LinearizeParams::default()
        })
        .unwrap();
    stored.flush().unwrap();
    assert_close(stored.x().unwrap().values(), &[10.0, 11.0, 12.0, 13.0]);
    assert!(!stored.base().extra_data().contains_key("x_bin"));
    assert_eq!(group.array_keys().unwrap(), vec!["x", "y"]);

    let mut reloaded = store.get_object("Chromatograms/C").unwrap().into_spectrum().unwrap();
    assert!(!reloaded.base().extra_data().contains_key("x_bin"));
    assert!(!reloaded.base().extra_data().contains_key("x_min"));
    reloaded.change_x_label(SCANS, &params).unwrap();
    stored.change_x_label(SCANS, &params).unwrap();
    assert_close(reloaded.x().unwrap().values(), &[10.0, 11.0, 12.0, 13.0]);
    assert_eq!(reloaded.x().unwrap(), stored.x().unwrap());
}

#[test]
fn test_conversion_refreshes_base_copy() {
    let bins = ArrayData::from_i32(vec![10, 11, 12, 13]);
    let mut stale = ArrayMap::new();
    stale.insert("x_bin".into(), ArrayData::from_i32(vec![0, 1, 2, 3]));

    let mut mobilogram = SpectrumObject::mobilogram(bins.clone(), vec![1.0; 4])
        .unwrap()
        .with_extra_data(stale.clone());
    mobilogram
        .change_x_label(DRIFT_TIME_MS, &ConversionParams::pusher_freq(1000.0))
        .unwrap();
    assert_eq!(mobilogram.base().extra_data()["x_bin"], bins);
    mobilogram
        .change_x_label(DRIFT_TIME_BINS, &ConversionParams::default())
        .unwrap();
    assert_eq!(mobilogram.x().unwrap(), &bins);

    let mut chromatogram = SpectrumObject::chromatogram(bins.clone(), vec![1.0; 4])
        .unwrap()
        .with_extra_data(stale);
    chromatogram
        .change_x_label(TIME_MINS, &ConversionParams::scan_time(60.0))
        .unwrap();
    assert_eq!(chromatogram.base().extra_data()["x_bin"], bins);
    chromatogram
        .change_x_label(SCANS, &ConversionParams::default())
        .unwrap();
    assert_eq!(chromatogram.x().unwrap(), &bins);
}

#[test]
fn test_origami_ms_from_document_config() {
    let dir = tempdir().unwrap();
    let store = DocumentStore::open(dir.path().join("doc"), None).unwrap();
    store
        .add_config("origami_ms", &serde_json::to_value(linear_method()).unwrap())
        .unwrap();
    let heatmap =
        HeatmapObject::ion_heatmap(Array2::<f64>::ones((3, 10)), ramp(10), ramp(3)).unwrap();
    let mut stored = store
        .add_heatmap("H", &heatmap)
        .unwrap()
        .into_heatmap()
        .unwrap();
    stored.apply_origami_ms(None).unwrap();
    assert_eq!(stored.title(), Some("IonHeatmaps/H [CIU]"));
    assert!(store.contains("IonHeatmaps/H [CIU]"));

    let reloaded = store
        .get_object("IonHeatmaps/H [CIU]")
        .unwrap()
        .into_heatmap()
        .unwrap();
    assert_eq!(reloaded.shape().unwrap(), (3, 2));
    assert_eq!(reloaded.base().x_label(), COLLISION_VOLTAGE);
    assert!(reloaded.base().extra_data().contains_key("oms_ss_es_cv"));
}

#[test]
fn test_duplicate_is_detached() {
    let dir = tempdir().unwrap();
    let store = DocumentStore::open(dir.path().join("doc"), None).unwrap();
    let heatmap = small_heatmap();
    let stored = store.add_heatmap("H", &heatmap).unwrap().into_heatmap().unwrap();
    let copy = stored.duplicate().unwrap();
    assert!(copy.title().is_none());
    assert!(!copy.can_flush());
    assert_eq!(copy.shape().unwrap(), (3, 4));
    assert_close(copy.yy().unwrap().values(), &[6.0, 46.0, 86.0]);
}
