//! # origami-docstore
//!
//! Command-line front-end for ORIGAMI documents.
//!
//! ## Usage
//!
//! ```bash
//! # Write a synthetic document with every object class
//! origami-docstore demo demo.origami
//!
//! # Inspect it
//! origami-docstore info demo.origami
//! origami-docstore tree demo.origami --category IonHeatmaps
//!
//! # Export a dataset as text
//! origami-docstore export demo.origami "MassSpectra/Summed Spectrum" spectrum.csv
//!
//! # Apply the [process] steps of a config file and save the result
//! origami-docstore --config origami.toml process demo.origami "IonHeatmaps/Summed Heatmap"
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
