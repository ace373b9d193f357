use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use origami_docstore::objects::{DataContainer, DataObject};

use super::{open_existing, Config};

/// Run the configured processing steps on a dataset and write it back
pub fn run(document: PathBuf, dataset: &str, config: &Config) -> Result<()> {
    let Some(steps) = &config.process else {
        anyhow::bail!("No [process] table in the configuration; pass one with --config");
    };
    let store = open_existing(&document, config)?;
    let mut object = store
        .get_object(dataset)
        .with_context(|| format!("Failed to load `{dataset}`"))?;

    match &mut object {
        DataObject::Spectrum(spectrum) => {
            let Some(steps) = &steps.spectrum else {
                anyhow::bail!("`{dataset}` is a spectrum but [process.spectrum] is not set");
            };
            spectrum
                .process(steps)
                .with_context(|| format!("Failed to process `{dataset}`"))?;
        }
        DataObject::Heatmap(heatmap) => {
            let Some(steps) = &steps.heatmap else {
                anyhow::bail!("`{dataset}` is a heatmap but [process.heatmap] is not set");
            };
            heatmap
                .process(steps)
                .with_context(|| format!("Failed to process `{dataset}`"))?;
        }
    }

    let container = object.as_container_mut();
    container
        .flush()
        .with_context(|| format!("Failed to save `{dataset}`"))?;
    info!("Processed and saved `{dataset}`");
    Ok(())
}
