use anyhow::{Context, Result};
use log::info;
use ndarray::Array2;
use serde_json::json;
use std::path::PathBuf;

use origami_docstore::objects::{
    Annotation, Annotations, DataContainer, HeatmapObject, SpectrumObject,
};
use origami_docstore::processing::OrigamiMsMethod;
use origami_docstore::store::{DocumentStore, Metadata};

const N_SCANS: usize = 150;
const N_BINS: usize = 200;
const VOLTAGES: [f64; 6] = [5.0, 10.0, 15.0, 20.0, 25.0, 30.0];
const SCANS_PER_VOLTAGE: usize = N_SCANS / VOLTAGES.len();

/// Generate a synthetic ORIGAMI document
pub fn run(output: PathBuf, config: &super::Config) -> Result<()> {
    if output.exists() {
        anyhow::bail!("Output already exists: {}", output.display());
    }
    info!("Creating demo document: {}", output.display());
    let store = DocumentStore::open_with_config(&output, None, config.store.clone())
        .context("Failed to create document")?;

    store.set_data_type("Type: ORIGAMI")?;
    store.set_file_format("Format: Waters (.raw)")?;
    let parameters: Metadata = serde_json::from_value(json!({
        "scan_time": 1.0,
        "pusher_freq": 69.0,
        "charge": 3,
    }))?;
    store.add_attrs("Metadata/Parameters", &parameters)?;
    store.add_config(
        "origami_ms",
        &serde_json::to_value(OrigamiMsMethod::Linear {
            start_scan: 0,
            start_voltage: VOLTAGES[0],
            end_voltage: VOLTAGES[VOLTAGES.len() - 1],
            step_voltage: 5.0,
            scans_per_voltage: SCANS_PER_VOLTAGE,
        })?,
    )?;

    info!("Writing mass spectrum...");
    let (mz, intensity) = generate_mass_spectrum();
    let spectrum = SpectrumObject::mass_spectrum(mz, intensity)?;
    let mut stored = store
        .add_spectrum("Summed Spectrum", &spectrum)?
        .into_spectrum()?;
    let mut annotations = Annotations::new();
    for (name, mz, height) in [("3+", 650.3, 1.0), ("2+", 975.0, 0.6)] {
        annotations.add(Annotation::new(
            name,
            format!("m/z {mz:.1}"),
            (mz, height),
            (mz - 2.0, 0.0, 4.0, height),
        ));
    }
    stored.set_annotations(&annotations)?;

    info!("Writing chromatogram and mobilogram...");
    let chromatogram = SpectrumObject::chromatogram(
        (0..N_SCANS).map(|s| s as f64).collect::<Vec<_>>(),
        (0..N_SCANS).map(chromatogram_value).collect::<Vec<_>>(),
    )?;
    store.add_chromatogram("Summed Chromatogram", &chromatogram)?;

    let bins: Vec<f64> = (0..N_BINS).map(|b| b as f64).collect();
    let mobilogram = SpectrumObject::mobilogram(
        bins.clone(),
        bins.iter().map(|&b| gaussian(b, 60.0, 8.0)).collect::<Vec<_>>(),
    )?;
    store.add_mobilogram("Summed Mobilogram", &mobilogram)?;

    info!("Writing heatmaps...");
    let heatmap = HeatmapObject::ion_heatmap(
        generate_ciu_array(),
        (0..N_SCANS).map(|s| s as f64).collect::<Vec<_>>(),
        bins.clone(),
    )?;
    let mut stored = store.add_heatmap("Summed Heatmap", &heatmap)?.into_heatmap()?;
    stored.apply_origami_ms(None)?;
    info!("  Reduced heatmap stored as {}", stored.title().unwrap_or("-"));

    let (mz_axis, msdt) = generate_msdt_array();
    let heatmap = HeatmapObject::msdt_heatmap(msdt, mz_axis, bins.clone())?;
    store.add_msdt("Summed MS-DT", &heatmap)?;

    let mobilograms = VOLTAGES
        .iter()
        .map(|&voltage| {
            let center = 40.0 + 3.0 * voltage;
            SpectrumObject::mobilogram(
                bins.clone(),
                bins.iter().map(|&b| gaussian(b, center, 6.0)).collect::<Vec<_>>(),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    let stitched = HeatmapObject::stitch(&mobilograms, &VOLTAGES)?;
    store.add_heatmap("Stitched Heatmap", &stitched)?;

    let datasets = store.view()?;
    info!("Demo document complete: {} datasets", datasets.len());
    for path in &datasets {
        info!("  {path}");
    }
    println!("{}", store.path().display());
    Ok(())
}

fn gaussian(x: f64, center: f64, width: f64) -> f64 {
    (-(x - center).powi(2) / (2.0 * width * width)).exp()
}

/// Two charge states of the same ion on a low baseline
fn generate_mass_spectrum() -> (Vec<f64>, Vec<f64>) {
    let mz: Vec<f64> = (0..2001).map(|i| 500.0 + 0.5 * i as f64).collect();
    let intensity = mz
        .iter()
        .map(|&x| 1000.0 * gaussian(x, 650.3, 0.8) + 600.0 * gaussian(x, 975.0, 1.0))
        .map(|v| if v < 1e-3 { 0.0 } else { v })
        .collect();
    (mz, intensity)
}

/// Total ion current dropping a little at every voltage step
fn chromatogram_value(scan: usize) -> f64 {
    let step = (scan / SCANS_PER_VOLTAGE) as f64;
    1e5 * (1.0 - 0.05 * step)
}

/// Drift-time distribution that unfolds as the collision voltage rises
fn generate_ciu_array() -> Array2<f64> {
    Array2::from_shape_fn((N_BINS, N_SCANS), |(bin, scan)| {
        let step = (scan / SCANS_PER_VOLTAGE) as f64;
        let folded = gaussian(bin as f64, 50.0, 6.0) * (1.0 - step / 6.0);
        let unfolded = gaussian(bin as f64, 90.0 + 5.0 * step, 8.0) * step / 6.0;
        100.0 * (folded + unfolded)
    })
}

/// Two ions with different drift times
fn generate_msdt_array() -> (Vec<f64>, Array2<f64>) {
    let mz: Vec<f64> = (0..400).map(|i| 600.0 + i as f64).collect();
    let array = Array2::from_shape_fn((N_BINS, mz.len()), |(bin, i)| {
        let x = mz[i];
        50.0 * gaussian(x, 650.0, 2.0) * gaussian(bin as f64, 55.0, 5.0)
            + 30.0 * gaussian(x, 975.0, 2.0) * gaussian(bin as f64, 80.0, 5.0)
    });
    (mz, array)
}
