use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use origami_docstore::objects::{CsvOptions, DataObject, HeatmapExport, SpectrumKind};

use super::{open_existing, Config};

/// Export one dataset of a document as delimited text
pub fn run(
    document: PathBuf,
    dataset: &str,
    output: PathBuf,
    delimiter: Option<char>,
    keep_zeros: bool,
    shape: HeatmapExport,
    config: &Config,
) -> Result<()> {
    let delimiter = match delimiter {
        Some(c) if c.is_ascii() => Some(c as u8),
        Some(c) => anyhow::bail!("Delimiter must be a single ASCII character, got `{c}`"),
        None => None,
    };
    let store = open_existing(&document, config)?;
    let object = store
        .get_object(dataset)
        .with_context(|| format!("Failed to load `{dataset}`"))?;

    let written = match object {
        DataObject::Spectrum(spectrum) => {
            let remove_zeros = if keep_zeros {
                Some(false)
            } else if spectrum.kind() == SpectrumKind::MassSpectrum {
                Some(config.defaults.remove_zeros)
            } else {
                None
            };
            let options = CsvOptions {
                delimiter,
                remove_zeros,
            };
            spectrum.to_csv(&output, &options)
        }
        DataObject::Heatmap(heatmap) => {
            let options = CsvOptions {
                delimiter,
                remove_zeros: None,
            };
            heatmap.to_csv(&output, shape, &options)
        }
    }
    .with_context(|| format!("Failed to export `{dataset}`"))?;

    info!("Exported `{dataset}` to {}", written.display());
    println!("{}", written.display());
    Ok(())
}
