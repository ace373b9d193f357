//! Integration tests for origami-docstore
//!
//! These tests exercise a document from creation through reopening, lazy loading,
//! groups and export.

use ndarray::Array2;
use origami_docstore::prelude::*;
use origami_docstore::processing::Crop2dParams;
use origami_docstore::store::chunks::{guess_chunks, read_array, read_region, write_array, CHUNK_MAX};
use std::fs;
use tempfile::tempdir;

fn assert_close(a: &[f64], b: &[f64]) {
    assert_eq!(a.len(), b.len(), "{a:?} != {b:?}");
    for (x, y) in a.iter().zip(b) {
        assert!((x - y).abs() < 1e-9, "{a:?} != {b:?}");
    }
}

/// Objects written to a document come back with their labels, values and metadata
#[test]
fn test_write_reopen_cycle() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.origami");

    {
        let store = DocumentStore::open(&path, None).unwrap();
        store.set_data_type("Type: ORIGAMI").unwrap();
        let spectrum = SpectrumObject::mass_spectrum(vec![500.0, 500.5, 501.0], vec![0.0, 10.0, 2.0])
            .unwrap()
            .with_metadata(serde_json::from_value(serde_json::json!({"charge": 2})).unwrap());
        store.add_spectrum("Summed Spectrum", &spectrum).unwrap();

        let array = Array2::from_shape_fn((4, 6), |(r, c)| (r * 6 + c) as f64);
        let heatmap = HeatmapObject::ion_heatmap(array, ArrayData::arange(6), ArrayData::arange(4)).unwrap();
        store.add_heatmap("Summed Heatmap", &heatmap).unwrap();
        store.close();
        assert!(matches!(store.view(), Err(StoreError::Closed(_))));
    }

    let store = DocumentStore::open(&path, None).unwrap();
    assert_eq!(store.title(), "run");
    assert_eq!(store.data_type().unwrap().as_deref(), Some("Type: ORIGAMI"));
    let view = store.view().unwrap();
    assert_eq!(view.len(), 2);
    assert!(view.contains(&"MassSpectra/Summed Spectrum".to_string()));
    assert!(view.contains(&"IonHeatmaps/Summed Heatmap".to_string()));

    let spectrum = store
        .get_object("MassSpectra/Summed Spectrum")
        .unwrap()
        .into_spectrum()
        .unwrap();
    assert!(!spectrum.is_loaded());
    assert_eq!(spectrum.base().x_label(), MZ);
    assert_close(spectrum.y().unwrap().values(), &[0.0, 10.0, 2.0]);
    assert_eq!(spectrum.base().metadata().get("charge"), Some(&serde_json::json!(2)));
    assert!(spectrum.base().metadata().get("class").is_none());

    let heatmap = store
        .get_object("IonHeatmaps/Summed Heatmap")
        .unwrap()
        .into_heatmap()
        .unwrap();
    assert_eq!(heatmap.shape().unwrap(), (4, 6));
    assert_eq!(heatmap.x().unwrap().dtype(), DType::Int32);
    assert_close(heatmap.yy().unwrap().values(), &[15.0, 51.0, 87.0, 123.0]);
}

/// Label changes persist and revert to the original values after reopening
#[test]
fn test_conversion_persists_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("conv.origami");
    {
        let store = DocumentStore::open(&path, None).unwrap();
        let mut params = Metadata::new();
        params.insert("pusher_freq".into(), serde_json::json!(250.0));
        store.add_attrs("Metadata/Parameters", &params).unwrap();
        let mobilogram = SpectrumObject::mobilogram(ArrayData::arange(8), vec![1.0; 8]).unwrap();
        let mut stored = store
            .add_mobilogram("M", &mobilogram)
            .unwrap()
            .into_spectrum()
            .unwrap();
        stored
            .change_x_label(DRIFT_TIME_MS, &ConversionParams::default())
            .unwrap();
        assert_close(stored.x().unwrap().values(), &[0.0, 0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 1.75]);
    }

    let store = DocumentStore::open(&path, None).unwrap();
    let mut mobilogram = store
        .get_object("Mobilograms/M")
        .unwrap()
        .into_spectrum()
        .unwrap();
    assert_eq!(mobilogram.base().x_label(), DRIFT_TIME_MS);
    mobilogram
        .change_x_label(RESTORE_DEFAULT, &ConversionParams::default())
        .unwrap();
    assert_eq!(mobilogram.base().x_label(), DRIFT_TIME_BINS);
    assert_eq!(mobilogram.x().unwrap(), &ArrayData::arange(8));
}

/// Groups combine members that are still stored in an open document
#[test]
fn test_group_over_document_members() {
    let dir = tempdir().unwrap();
    let env = Environment::new();
    let store = env.open(dir.path().join("scans")).unwrap();
    for (i, offset) in [0.0, 1.0, 2.0].iter().enumerate() {
        let x: Vec<f64> = (0..5).map(|v| v as f64 + offset).collect();
        let spectrum = SpectrumObject::mass_spectrum(x, vec![1.0; 5]).unwrap();
        store.add_spectrum(&format!("Scan {i}"), &spectrum).unwrap();
    }

    let members = DataObjectsContainer::from_list(
        store
            .view_group("MassSpectra")
            .unwrap()
            .into_iter()
            .map(|path| ("scans", path)),
    );
    let mut group = SpectrumGroup::mass_spectra(members);
    group.set_registry(std::rc::Rc::new(env.clone()));
    assert!(group.validate_size(2, 10));
    assert_eq!(group.get_x_range().unwrap(), (0.0, 6.0));

    let params = ResampleParams {
        bin_size: Some(1.0),
        ..ResampleParams::default()
    };
    let summed = group.sum(&params).unwrap();
    assert_close(
        summed.y().unwrap().values(),
        &[1.0, 2.0, 3.0, 3.0, 3.0, 2.0, 1.0],
    );

    let out = dir.path().join("summed.csv");
    let written = summed.to_csv(&out, &CsvOptions::default()).unwrap();
    let text = fs::read_to_string(written).unwrap();
    assert!(text.starts_with("# m/z (Da),Intensity"));
    assert_eq!(text.lines().count(), 8);
    env.close_all();
    assert!(env.is_empty());
}

/// ORIGAMI-MS reduction driven by the configuration blob in the document
#[test]
fn test_origami_ms_through_document() {
    let dir = tempdir().unwrap();
    let store = DocumentStore::open(dir.path().join("ciu"), None).unwrap();
    let method = OrigamiMsMethod::Linear {
        start_scan: 2,
        start_voltage: 10.0,
        end_voltage: 20.0,
        step_voltage: 5.0,
        scans_per_voltage: 3,
    };
    store
        .add_config("origami_ms", &serde_json::to_value(&method).unwrap())
        .unwrap();
    let loaded: Option<OrigamiMsMethod> = store.get_config_as("origami_ms").unwrap();
    assert_eq!(loaded, Some(method));

    let array = Array2::from_elem((2, 12), 1.0);
    let heatmap = HeatmapObject::ion_heatmap(array, ArrayData::arange(12), ArrayData::arange(2)).unwrap();
    let mut stored = store.add_heatmap("H", &heatmap).unwrap().into_heatmap().unwrap();
    stored.apply_origami_ms(None).unwrap();
    assert_eq!(stored.base().x_label(), COLLISION_VOLTAGE);
    assert_close(stored.x().unwrap().values(), &[10.0, 15.0, 20.0]);
    assert_eq!(stored.shape().unwrap(), (2, 3));
    assert!(store.contains("IonHeatmaps/H [CIU]"));
}

fn metadata(value: serde_json::Value) -> Metadata {
    serde_json::from_value(value).unwrap()
}

fn reload_spectrum(store: &DocumentStore, path: &str) -> SpectrumObject {
    store.get_object(path).unwrap().into_spectrum().unwrap()
}

fn reload_heatmap(store: &DocumentStore, path: &str) -> HeatmapObject {
    store.get_object(path).unwrap().into_heatmap().unwrap()
}

fn assert_same_spectrum(restored: &SpectrumObject, original: &SpectrumObject) {
    assert_eq!(restored.kind(), original.kind());
    assert_eq!(restored.base().x_label(), original.base().x_label());
    assert_eq!(restored.base().y_label(), original.base().y_label());
    assert_eq!(restored.x().unwrap(), original.x().unwrap());
    assert_eq!(restored.y().unwrap(), original.y().unwrap());
    assert_eq!(restored.base().extra_data(), original.base().extra_data());
}

fn assert_same_heatmap(restored: &HeatmapObject, original: &HeatmapObject) {
    assert_eq!(restored.kind(), original.kind());
    assert_eq!(restored.base().x_label(), original.base().x_label());
    assert_eq!(restored.base().y_label(), original.base().y_label());
    assert_eq!(restored.array().unwrap(), original.array().unwrap());
    assert_eq!(restored.x().unwrap(), original.x().unwrap());
    assert_eq!(restored.y().unwrap(), original.y().unwrap());
    assert_close(restored.xy().unwrap().values(), original.xy().unwrap().values());
    assert_close(restored.yy().unwrap().values(), original.yy().unwrap().values());
    assert_eq!(restored.base().extra_data(), original.base().extra_data());
}

/// Chromatograms and mobilograms come back with their class, axes and metadata
#[test]
fn test_chromatogram_and_mobilogram_round_trip() {
    let dir = tempdir().unwrap();
    let store = DocumentStore::open(dir.path().join("traces"), None).unwrap();

    let chromatogram = SpectrumObject::chromatogram(
        ArrayData::arange(6),
        vec![0.0, 5.0, 12.5, 7.0, 1.0, 0.0],
    )
    .unwrap()
    .with_metadata(metadata(serde_json::json!({"mz_range": [500.0, 510.0]})));
    store.add_chromatogram("TIC", &chromatogram).unwrap();

    let mobilogram = SpectrumObject::mobilogram(ArrayData::arange(5), vec![1.0, 4.0, 9.0, 4.0, 1.0])
        .unwrap()
        .with_metadata(metadata(serde_json::json!({"charge": 3})));
    store.add_mobilogram("DT", &mobilogram).unwrap();

    let store = DocumentStore::open(dir.path().join("traces"), None).unwrap();
    let restored = reload_spectrum(&store, "Chromatograms/TIC");
    assert_eq!(restored.class_name(), "ChromatogramObject");
    assert_eq!(restored.base().x_label(), SCANS);
    assert_same_spectrum(&restored, &chromatogram);
    assert_eq!(
        restored.base().metadata().get("mz_range"),
        Some(&serde_json::json!([500.0, 510.0]))
    );

    let restored = reload_spectrum(&store, "Mobilograms/DT");
    assert_eq!(restored.class_name(), "MobilogramObject");
    assert_eq!(restored.base().x_label(), DRIFT_TIME_BINS);
    assert_same_spectrum(&restored, &mobilogram);
    assert_eq!(restored.base().metadata().get("charge"), Some(&serde_json::json!(3)));
}

/// MS/DT heatmaps and stitched heatmaps keep their class and every array
#[test]
fn test_msdt_and_stitched_heatmaps_round_trip() {
    let dir = tempdir().unwrap();
    let store = DocumentStore::open(dir.path().join("maps"), None).unwrap();

    let array = Array2::from_shape_fn((3, 5), |(r, c)| (r * 5 + c) as f64 * 0.5);
    let mz = vec![500.0, 500.25, 500.5, 500.75, 501.0];
    let msdt = HeatmapObject::msdt_heatmap(array, mz, ArrayData::arange(3)).unwrap();
    store.add_msdt("MSDT", &msdt).unwrap();

    let mobilograms: Vec<SpectrumObject> = (0..4)
        .map(|i| {
            let y: Vec<f64> = (0..6).map(|b| ((b + i) % 6) as f64).collect();
            SpectrumObject::mobilogram(ArrayData::arange(6), y).unwrap()
        })
        .collect();
    let stitched = HeatmapObject::stitch(&mobilograms, &[10.0, 20.0, 30.0, 40.0]).unwrap();
    store.add_heatmap("Stitched", &stitched).unwrap();

    let store = DocumentStore::open(dir.path().join("maps"), None).unwrap();
    let restored = reload_heatmap(&store, "MSDTHeatmaps/MSDT");
    assert_eq!(restored.kind(), HeatmapKind::MassSpectrumHeatmap);
    assert_eq!(restored.class_name(), "MassSpectrumHeatmapObject");
    assert_eq!(restored.base().x_label(), MZ);
    assert_same_heatmap(&restored, &msdt);
    let spectrum = restored.as_mass_spectrum().unwrap();
    assert_close(spectrum.y().unwrap().values(), msdt.xy().unwrap().values());

    let restored = reload_heatmap(&store, "IonHeatmaps/Stitched");
    assert_eq!(restored.kind(), HeatmapKind::StitchIonHeatmap);
    assert_eq!(restored.class_name(), "StitchIonHeatmapObject");
    assert_eq!(restored.shape().unwrap(), (6, 4));
    assert_close(restored.x().unwrap().values(), &[10.0, 20.0, 30.0, 40.0]);
    assert_same_heatmap(&restored, &stitched);
}

/// Processing that invalidates unit caches leaves none behind in the document
#[test]
fn test_processed_object_reloads_without_stale_caches() {
    let dir = tempdir().unwrap();
    let store = DocumentStore::open(dir.path().join("processed"), None).unwrap();
    let array = Array2::from_shape_fn((4, 6), |(r, c)| (r + c) as f64);
    let heatmap = HeatmapObject::ion_heatmap(array, ArrayData::arange(6), ArrayData::arange(4)).unwrap();
    let mut stored = store.add_heatmap("H", &heatmap).unwrap().into_heatmap().unwrap();

    let params = ConversionParams::pusher_freq(1000.0);
    stored.change_y_label(DRIFT_TIME_MS, &params).unwrap();
    let cached = reload_heatmap(&store, "IonHeatmaps/H");
    assert!(cached.base().extra_data().contains_key("y_bin"));
    assert!(cached.base().extra_data().contains_key("y_ms"));

    stored
        .crop(&Crop2dParams {
            y_min: Some(1.0),
            y_max: Some(2.0),
            ..Crop2dParams::default()
        })
        .unwrap();
    stored.flush().unwrap();
    assert_eq!(stored.shape().unwrap(), (2, 6));

    let mut restored = reload_heatmap(&store, "IonHeatmaps/H");
    assert_same_heatmap(&restored, &stored);
    assert!(restored.base().extra_data().is_empty());

    restored.change_y_label(DRIFT_TIME_BINS, &params).unwrap();
    stored.change_y_label(DRIFT_TIME_BINS, &params).unwrap();
    assert_close(restored.y().unwrap().values(), &[1.0, 2.0]);
    assert_eq!(restored.y().unwrap(), stored.y().unwrap());
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn dtype_strategy() -> impl Strategy<Value = DType> {
        prop_oneof![
            Just(DType::Int32),
            Just(DType::Int64),
            Just(DType::Float32),
            Just(DType::Float64),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Any 2-D array survives the chunk codec, and regions match the full read
        #[test]
        fn test_chunk_codec_roundtrip(
            rows in 1usize..40,
            cols in 1usize..40,
            dtype in dtype_strategy(),
            level in 0u32..10,
            seed in any::<u32>(),
        ) {
            let values: Vec<f64> = (0..rows * cols)
                .map(|i| ((i as u64 * 7919 + seed as u64) % 1000) as f64 - 500.0)
                .collect();
            let array = ArrayData::new(dtype, vec![rows, cols], values).unwrap();

            let dir = tempdir().unwrap();
            let array_dir = dir.path().join("array");
            write_array(&array_dir, &array, level, true).unwrap();
            let restored = read_array(&array_dir).unwrap();
            prop_assert_eq!(&restored, &array);

            let (r0, c0) = (rows / 3, cols / 2);
            let region = read_region(&array_dir, &[r0..rows, c0..cols]).unwrap();
            prop_assert_eq!(region.shape(), &[rows - r0, cols - c0][..]);
            let expected: Vec<f64> = (r0..rows)
                .flat_map(|r| (c0..cols).map(move |c| (r, c)))
                .map(|(r, c)| array.values()[r * cols + c])
                .collect();
            prop_assert_eq!(region.values(), &expected[..]);
        }

        /// Chunks never exceed the array or the size ceiling
        #[test]
        fn test_guess_chunks_bounds(shape in prop::collection::vec(1usize..5000, 1..4)) {
            let chunks = guess_chunks(&shape, 8);
            prop_assert_eq!(chunks.len(), shape.len());
            for (&chunk, &size) in chunks.iter().zip(&shape) {
                prop_assert!(chunk >= 1 && chunk <= size);
            }
            let bytes = chunks.iter().map(|&c| c as f64).product::<f64>() * 8.0;
            prop_assert!(bytes < CHUNK_MAX);
        }

        /// Converting to minutes and back restores the original scans exactly
        #[test]
        fn test_scan_conversion_roundtrip(n in 1usize..300, scan_time in 0.1f64..10.0) {
            let mut chromatogram = SpectrumObject::chromatogram(ArrayData::arange(n), vec![1.0; n]).unwrap();
            chromatogram
                .change_x_label(TIME_MINS, &ConversionParams::scan_time(scan_time))
                .unwrap();
            let last = chromatogram.x().unwrap().values()[n - 1];
            prop_assert!((last - (n - 1) as f64 * scan_time / 60.0).abs() < 1e-9);

            chromatogram
                .change_x_label(SCANS, &ConversionParams::default())
                .unwrap();
            prop_assert_eq!(chromatogram.x().unwrap(), &ArrayData::arange(n));
        }

        /// Drift-time bins survive a trip through milliseconds
        #[test]
        fn test_drift_conversion_roundtrip(n in 1usize..300, pusher in 10.0f64..200.0) {
            let mut mobilogram = SpectrumObject::mobilogram(ArrayData::arange(n), vec![1.0; n]).unwrap();
            mobilogram
                .change_x_label(DRIFT_TIME_MS, &ConversionParams::pusher_freq(pusher))
                .unwrap();
            mobilogram
                .change_x_label(DRIFT_TIME_BINS, &ConversionParams::default())
                .unwrap();
            prop_assert_eq!(mobilogram.x().unwrap(), &ArrayData::arange(n));
        }

        /// Collision voltages survive a trip through lab-frame energies
        #[test]
        fn test_energy_conversion_roundtrip(
            voltages in prop::collection::vec(1.0f64..200.0, 1..50),
            charge in 1u32..8,
        ) {
            let n = voltages.len();
            let mut chromatogram = SpectrumObject::chromatogram(voltages.clone(), vec![1.0; n])
                .unwrap()
                .with_labels(COLLISION_VOLTAGE, INTENSITY);
            chromatogram
                .change_x_label(LAB_FRAME_ENERGY, &ConversionParams::charge(f64::from(charge)))
                .unwrap();
            for (ev, v) in chromatogram.x().unwrap().values().iter().zip(&voltages) {
                prop_assert!((ev - v * f64::from(charge)).abs() < 1e-9);
            }

            chromatogram
                .change_x_label(COLLISION_VOLTAGE, &ConversionParams::default())
                .unwrap();
            prop_assert_eq!(chromatogram.x().unwrap().values(), &voltages[..]);

            // without a cached copy the energies are divided by the charge
            let energies: Vec<f64> = voltages.iter().map(|v| v * f64::from(charge)).collect();
            let mut energy = SpectrumObject::chromatogram(energies, vec![1.0; n])
                .unwrap()
                .with_labels(LAB_FRAME_ENERGY, INTENSITY);
            energy
                .change_x_label(COLLISION_VOLTAGE, &ConversionParams::charge(f64::from(charge)))
                .unwrap();
            for (a, b) in energy.x().unwrap().values().iter().zip(&voltages) {
                prop_assert!((a - b).abs() < 1e-9);
            }
        }
    }
}
