//! # Document store
//!
//! A document is a directory laid out like a Zarr v2 directory store:
//!
//! ```text
//! {title}.origami/
//! ├── .zgroup / .zattrs           # format_version, origami_version, data_type, file_format
//! ├── MassSpectra/{name}/         # x, y + attributes
//! ├── Chromatograms/{name}/
//! ├── Mobilograms/{name}/
//! ├── IonHeatmaps/{name}/         # array, x, y, xy, yy + attributes
//! ├── MSDTHeatmaps/{name}/
//! ├── Metadata/Parameters/        # acquisition parameters as attributes
//! ├── Overlays/
//! ├── Configs/{name}.json         # JSON configuration blobs
//! ├── Raw/                        # verbatim copies of input files
//! ├── Output/                     # export target
//! └── Tandem/tandem_spectra.pkl   # read-only tandem spectra (pickle)
//! ```
//!
//! Arrays are split into zlib-compressed chunks whose size follows the array's byte
//! size (see [`chunks::guess_chunks`]). Region reads only touch the chunks they need.

pub mod chunks;
mod config;
mod document;
mod error;
mod factory;
mod group;
pub mod paths;
mod tandem;


pub use config::{StoreConfig, DEFAULT_EXTENSION};
pub(crate) use document::StoreInner;
pub use document::{DocumentStore, ToZarr, GROUPS, VERSION};
pub use error::StoreError;
pub use group::{ArrayHandle, Group, Metadata, ATTRS_KEY, GROUP_META_KEY};
pub use tandem::{TandemSpectra, TANDEM_FILENAME, TANDEM_JSON_FILENAME};
