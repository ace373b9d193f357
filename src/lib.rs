//! # origami-docstore - Data objects and document store for ORIGAMI IM-MS data
//!
//! `origami_docstore` holds ion-mobility mass spectrometry results as typed data
//! objects and persists them in a chunked, Zarr-compatible directory document.
//!
//! ## Key Features
//!
//! - **Typed data objects**: mass spectra, chromatograms, mobilograms, ion heatmaps
//!   and MS/DT heatmaps, each with labelled axes and free-form metadata.
//!
//! - **Reversible axis conversions**: scans to minutes, drift-time bins to
//!   milliseconds and collision voltage to energy, restoring the original values
//!   exactly through cached copies.
//!
//! - **Chunked document store**: one directory per document, zlib-compressed chunks
//!   sized by a heuristic, partial region reads and lazily loaded arrays.
//!
//! - **Groups**: validate, resample and combine several objects, including objects
//!   that still live in an open document.
//!
//! - **ORIGAMI-MS**: collapse scan-resolved activation ramps into collision-voltage
//!   steps.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use origami_docstore::prelude::*;
//!
//! let store = DocumentStore::open("run.origami", None)?;
//!
//! let spectrum = SpectrumObject::mass_spectrum(vec![500.0, 500.5, 501.0], vec![0.0, 10.0, 2.0])?;
//! let mut stored = store.add_spectrum("Summed Spectrum", &spectrum)?.into_spectrum()?;
//! stored.normalize()?;
//! stored.flush()?;
//!
//! let reloaded = store.get_object("MassSpectra/Summed Spectrum")?;
//! assert_eq!(reloaded.as_container().class_name(), "MassSpectrumObject");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`array`]: typed numeric buffers and lazily loaded arrays
//! - [`store`]: chunk codec, group handles and the [`DocumentStore`](store::DocumentStore)
//! - [`objects`]: the data objects, axis labels and unit conversions
//! - [`groups`]: collections of objects that are validated and combined together
//! - [`processing`]: pure numeric kernels used by the objects

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
// Allow some patterns common in scientific code
#![allow(clippy::too_many_arguments)]

pub mod array;
pub mod groups;
pub mod objects;
pub mod processing;
pub mod store;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::array::{ArrayData, ArrayError, DType, LazyArray};
    pub use crate::groups::{
        DataGroup, DataObjectsContainer, DocumentRegistry, Environment, GroupError, HeatmapGroup,
        ResampleParams, SpectrumGroup,
    };
    pub use crate::objects::labels::*;
    pub use crate::objects::{
        Annotation, Annotations, ConversionParams, CsvOptions, DataContainer, DataObject,
        HeatmapExport, HeatmapKind, HeatmapObject, ObjectError, SpectrumKind, SpectrumObject,
    };
    pub use crate::processing::{
        BaselineMethod, CropParams, LinearizeMethod, LinearizeParams, OrigamiMsMethod,
        ProcessingDefaults, ProcessingError, SmoothMethod,
    };
    pub use crate::store::{DocumentStore, Metadata, StoreConfig, StoreError, ToZarr};
}
