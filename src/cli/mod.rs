use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use origami_docstore::objects::HeatmapExport;
use origami_docstore::store::DocumentStore;

mod config;
mod demo;
mod export;
mod info;
mod process;
mod tree;

pub use config::Config;

/// origami-docstore - inspect, export and process ORIGAMI documents
#[derive(Parser)]
#[command(name = "origami-docstore")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Load store, default and processing settings from a TOML config file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Which part of a heatmap to export.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ShapeArg {
    /// Full array with the x axis as header
    #[default]
    Array,
    /// Drift-time projection (row sums)
    DriftTime,
    /// Retention projection (column sums)
    Retention,
}

impl From<ShapeArg> for HeatmapExport {
    fn from(arg: ShapeArg) -> Self {
        match arg {
            ShapeArg::Array => HeatmapExport::Array,
            ShapeArg::DriftTime => HeatmapExport::DriftTime,
            ShapeArg::Retention => HeatmapExport::Retention,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Display information about a document
    Info {
        /// Document directory
        #[arg(value_name = "DOC")]
        document: PathBuf,
    },

    /// List the datasets stored in a document
    Tree {
        /// Document directory
        #[arg(value_name = "DOC")]
        document: PathBuf,

        /// Only list this category, e.g. `MassSpectra`
        #[arg(short = 'c', long)]
        category: Option<String>,
    },

    /// Export a dataset as delimited text
    Export {
        /// Document directory
        #[arg(value_name = "DOC")]
        document: PathBuf,

        /// Dataset path, e.g. `MassSpectra/Summed Spectrum`
        #[arg(value_name = "DATASET")]
        dataset: String,

        /// Output file; `.csv` is comma-separated, `.txt`/`.tab` tab-separated
        #[arg(value_name = "OUT")]
        output: PathBuf,

        /// Column delimiter (overrides the one implied by the extension)
        #[arg(short = 'd', long)]
        delimiter: Option<char>,

        /// Keep rows where both columns are zero
        #[arg(long)]
        keep_zeros: bool,

        /// Heatmap export shape
        #[arg(long, value_enum, default_value = "array")]
        shape: ShapeArg,
    },

    /// Apply the `[process]` steps of the config file to a dataset and save it
    Process {
        /// Document directory
        #[arg(value_name = "DOC")]
        document: PathBuf,

        /// Dataset path, e.g. `IonHeatmaps/Summed Heatmap`
        #[arg(value_name = "DATASET")]
        dataset: String,
    },

    /// Write a synthetic document containing every object class
    Demo {
        /// Output document directory
        #[arg(value_name = "OUT", default_value = "demo.origami")]
        output: PathBuf,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

/// Open a document that must already exist; `path` may omit the extension
fn open_existing(path: &Path, config: &Config) -> Result<DocumentStore> {
    let extension = config.store.extension();
    let candidate = if path.exists() {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(&extension);
        PathBuf::from(name)
    };
    if !candidate.is_dir() {
        anyhow::bail!("Document does not exist: {}", path.display());
    }
    DocumentStore::open_with_config(&candidate, None, config.store.clone())
        .with_context(|| format!("Failed to open document {}", candidate.display()))
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    match cli.command {
        Commands::Info { document } => info::run(document, &config),
        Commands::Tree { document, category } => tree::run(document, category, &config),
        Commands::Export {
            document,
            dataset,
            output,
            delimiter,
            keep_zeros,
            shape,
        } => export::run(
            document,
            &dataset,
            output,
            delimiter,
            keep_zeros,
            shape.into(),
            &config,
        ),
        Commands::Process { document, dataset } => process::run(document, &dataset, &config),
        Commands::Demo { output } => demo::run(output, &config),
    }
}
