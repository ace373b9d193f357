//! TOML configuration file support.
//!
//! Store settings, processing defaults and the steps run by `process` can be kept
//! in one file:
//!
//! ```toml
//! # origami.toml
//! [store]
//! extension = ".origami"
//! compression_level = 4
//!
//! [defaults]
//! linearize_method = "Binning"
//! mz_bin_size = 0.05
//!
//! [process.spectrum]
//! normalize = true
//! smooth = { method = "Gaussian", sigma = 1.5 }
//!
//! [process.heatmap]
//! baseline = 0.1
//! normalize = "Maximum"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use origami_docstore::objects::{HeatmapProcessing, SpectrumProcessing};
use origami_docstore::processing::ProcessingDefaults;
use origami_docstore::store::StoreConfig;

/// Root configuration structure for origami.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// How documents are opened and written.
    #[serde(default)]
    pub store: StoreConfig,

    /// Fallback processing parameters.
    #[serde(default)]
    pub defaults: ProcessingDefaults,

    /// Steps applied by the `process` command.
    #[serde(default)]
    pub process: Option<ProcessConfig>,
}

/// Processing steps per object family.
#[derive(Debug, Default, Deserialize)]
pub struct ProcessConfig {
    /// Steps for mass spectra, chromatograms and mobilograms.
    pub spectrum: Option<SpectrumProcessing>,

    /// Steps for ion and MS/DT heatmaps.
    pub heatmap: Option<HeatmapProcessing>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}
