//! Typed data objects: spectra, chromatograms, mobilograms and heatmaps.
//!
//! Every object carries a [`ContainerBase`] (labels, metadata, auxiliary arrays and a
//! weak link to the owning document) plus its own lazily loaded axes. Processing
//! methods mutate the object in place, mark it unsaved and return `&mut Self` so
//! calls can be chained:
//!
//! ```no_run
//! use origami_docstore::objects::SpectrumObject;
//! use origami_docstore::processing::CropParams;
//!
//! let mut spectrum = SpectrumObject::mass_spectrum(vec![100.0, 200.0, 300.0], vec![1.0, 5.0, 2.0])?;
//! spectrum
//!     .crop(&CropParams { min: Some(150.0), max: None })?
//!     .normalize()?;
//! # Ok::<(), origami_docstore::objects::ObjectError>(())
//! ```
//!
//! Objects that belong to a [`DocumentStore`] can be written back with
//! [`DataContainer::flush`]; detached objects silently skip the write.

mod annotations;
pub mod axes;
mod container;
mod error;
mod export;
mod heatmap;
pub mod labels;
mod spectrum;

#[cfg(test)]
mod tests;

pub use annotations::{Annotation, AnnotationKind, Annotations, ANNOTATIONS_KEY};
pub use axes::{AxisFamily, Conversion, ConversionParams};
pub use container::{ContainerBase, ObjectOptions, Owner};
pub use error::ObjectError;
pub use export::{resolve_output, CsvOptions};
pub use heatmap::{DownsampleMode, HeatmapExport, HeatmapObject, HeatmapProcessing};
pub use labels::{HeatmapKind, ObjectKind, SpectrumKind};
pub use spectrum::{SpectrumObject, SpectrumProcessing};

use log::debug;
use serde_json::Value;

use crate::array::{ArrayData, ArrayMap};
use crate::store::{DocumentStore, Metadata, StoreError, ToZarr};

/// Attribute keys that describe the object itself rather than user metadata
pub const RESERVED_ATTRIBUTES: [&str; 4] = ["class", "x_label", "y_label", "x_limit"];

/// Behaviour shared by every data object
pub trait DataContainer: ToZarr {
    /// Shared labels, metadata and ownership
    fn base(&self) -> &ContainerBase;

    /// Mutable shared state
    fn base_mut(&mut self) -> &mut ContainerBase;

    /// Value of the `class` attribute
    fn class_name(&self) -> &'static str;

    /// Top-level document category
    fn document_key(&self) -> &'static str;

    /// Dataset name
    fn name(&self) -> &str;

    /// Set the dataset name without touching the document
    fn set_name(&mut self, name: String);

    /// Whether in-memory changes have not been flushed
    fn is_unsaved(&self) -> bool;

    /// Set the dirty flag
    fn set_unsaved(&mut self, unsaved: bool);

    /// Group path inside the owning document
    fn title(&self) -> Option<&str> {
        self.base().owner().map(Owner::path)
    }

    /// Point the object at a different group path; the next flush writes there
    fn set_title(&mut self, title: &str) {
        let name = title.rsplit('/').next().unwrap_or(title).to_string();
        if let Some(owner) = self.base_mut().owner.as_mut() {
            owner.set_path(title);
        }
        self.set_name(name);
    }

    /// Last component of the group path
    fn dataset_name(&self) -> Option<&str> {
        self.base().owner().map(Owner::dataset_name)
    }

    /// The owning document, if it is still open
    fn get_parent(&self) -> Option<DocumentStore> {
        self.base().owner()?.store()
    }

    /// Whether [`flush`](Self::flush) would write anything
    fn can_flush(&self) -> bool {
        self.get_parent().is_some()
    }

    /// Attributes written by [`flush_metadata`](Self::flush_metadata)
    fn to_attrs(&self) -> Metadata {
        let base = self.base();
        let mut attrs = base.metadata().clone();
        attrs.insert("class".into(), Value::from(self.class_name()));
        attrs.insert("x_label".into(), Value::from(base.x_label()));
        attrs.insert("y_label".into(), Value::from(base.y_label()));
        attrs
    }

    /// Write the object to its group in the owning document
    fn flush(&mut self) -> Result<(), ObjectError> {
        self.flush_to(None)
    }

    /// Write the object to `title` (or its own group) in the owning document
    fn flush_to(&mut self, title: Option<&str>) -> Result<(), ObjectError> {
        let (Some(store), Some(title)) = (
            self.get_parent(),
            title.map(str::to_string).or_else(|| self.title().map(str::to_string)),
        ) else {
            debug!("Skipping flush of detached {}", self.class_name());
            return Ok(());
        };
        let (data, attrs) = self.to_zarr()?;
        store.replace(&title, &data, &attrs)?;
        self.set_unsaved(false);
        Ok(())
    }

    /// Write only the attributes
    fn flush_metadata(&self) -> Result<(), ObjectError> {
        let (Some(store), Some(title)) = (self.get_parent(), self.title()) else {
            debug!("Skipping metadata flush of detached {}", self.class_name());
            return Ok(());
        };
        store.add_attrs(title, &self.to_attrs())?;
        Ok(())
    }

    /// Persist a copy next to this object and return it with its path.
    ///
    /// `new_name` may be a bare name (stored in the same category) or a full path.
    /// Without a name, the first free `"<title> (<suffix> N)"` is used.
    /// Detached objects return `Ok(None)`.
    fn copy(
        &self,
        new_name: Option<&str>,
        suffix: &str,
    ) -> Result<Option<(String, DataObject)>, ObjectError> {
        let (Some(store), Some(title)) = (self.get_parent(), self.title()) else {
            debug!("Skipping copy of detached {}", self.class_name());
            return Ok(None);
        };
        let new_path = match new_name {
            Some(name) if name.contains('/') => name.to_string(),
            Some(name) => format!("{}/{name}", self.document_key()),
            None => store.get_new_name(title, suffix)?,
        };
        let (data, attrs) = self.to_zarr()?;
        store.replace(&new_path, &data, &attrs)?;
        let object = store.get_object(&new_path)?;
        Ok(Some((new_path, object)))
    }

    /// Move the object's group to `<category>/<new_name>`
    fn rename(&mut self, new_name: &str) -> Result<(), ObjectError> {
        let key = self.document_key();
        let Some(title) = self.title().map(str::to_string) else {
            return Err(ObjectError::InvalidPath(format!(
                "{} is not stored in a document",
                self.class_name()
            )));
        };
        if !title.starts_with(&format!("{key}/")) {
            return Err(ObjectError::InvalidPath(format!(
                "`{title}` is not inside `{key}`"
            )));
        }
        let new_title = format!("{key}/{new_name}");
        if new_title == title {
            log::warn!("The new name is the same as the old name ({new_name})");
            return Ok(());
        }
        if let Some(store) = self.get_parent() {
            // arrays still on disk would point at the old location after the move
            self.to_zarr()?;
            store.move_group(&title, &new_title)?;
        }
        self.set_title(&new_title);
        Ok(())
    }

    /// Annotations stored in the metadata
    fn get_annotations(&self) -> Result<Annotations, ObjectError> {
        match self.base().metadata().get(ANNOTATIONS_KEY) {
            Some(value) => Annotations::from_value(value),
            None => Ok(Annotations::new()),
        }
    }

    /// Replace the annotations and flush
    fn set_annotations(&mut self, annotations: &Annotations) -> Result<(), ObjectError> {
        let value = annotations.to_value()?;
        self.base_mut()
            .metadata_mut()
            .insert(ANNOTATIONS_KEY.to_string(), value);
        self.flush()
    }
}

/// Any data object, as reconstructed from a document
#[derive(Debug, Clone)]
pub enum DataObject {
    /// Mass spectrum, chromatogram or mobilogram
    Spectrum(SpectrumObject),
    /// Ion heatmap, stitched ion heatmap or MS/DT heatmap
    Heatmap(HeatmapObject),
}

impl DataObject {
    /// Kind of the wrapped object
    pub fn kind(&self) -> ObjectKind {
        match self {
            DataObject::Spectrum(s) => ObjectKind::Spectrum(s.kind()),
            DataObject::Heatmap(h) => ObjectKind::Heatmap(h.kind()),
        }
    }

    /// The wrapped object behind the shared interface
    pub fn as_container(&self) -> &dyn DataContainer {
        match self {
            DataObject::Spectrum(s) => s,
            DataObject::Heatmap(h) => h,
        }
    }

    /// Mutable access behind the shared interface
    pub fn as_container_mut(&mut self) -> &mut dyn DataContainer {
        match self {
            DataObject::Spectrum(s) => s,
            DataObject::Heatmap(h) => h,
        }
    }

    /// Borrow the spectrum, if this is one
    pub fn as_spectrum(&self) -> Option<&SpectrumObject> {
        match self {
            DataObject::Spectrum(s) => Some(s),
            DataObject::Heatmap(_) => None,
        }
    }

    /// Borrow the heatmap, if this is one
    pub fn as_heatmap(&self) -> Option<&HeatmapObject> {
        match self {
            DataObject::Heatmap(h) => Some(h),
            DataObject::Spectrum(_) => None,
        }
    }

    /// Unwrap a spectrum
    pub fn into_spectrum(self) -> Result<SpectrumObject, ObjectError> {
        match self {
            DataObject::Spectrum(s) => Ok(s),
            DataObject::Heatmap(h) => Err(ObjectError::UnsupportedOperation {
                operation: "into_spectrum",
                class: h.class_name(),
            }),
        }
    }

    /// Unwrap a heatmap
    pub fn into_heatmap(self) -> Result<HeatmapObject, ObjectError> {
        match self {
            DataObject::Heatmap(h) => Ok(h),
            DataObject::Spectrum(s) => Err(ObjectError::UnsupportedOperation {
                operation: "into_heatmap",
                class: s.class_name(),
            }),
        }
    }

    /// Change the x label of the wrapped object
    pub fn change_x_label(
        &mut self,
        to_label: &str,
        params: &ConversionParams,
    ) -> Result<(), ObjectError> {
        match self {
            DataObject::Spectrum(s) => s.change_x_label(to_label, params).map(|_| ()),
            DataObject::Heatmap(h) => h.change_x_label(to_label, params).map(|_| ()),
        }
    }

    /// Change the y label of the wrapped object
    pub fn change_y_label(
        &mut self,
        to_label: &str,
        params: &ConversionParams,
    ) -> Result<(), ObjectError> {
        match self {
            DataObject::Spectrum(s) => s.change_y_label(to_label, params).map(|_| ()),
            DataObject::Heatmap(h) => h.change_y_label(to_label, params).map(|_| ()),
        }
    }

    /// Flat export mapping of the wrapped object
    pub fn to_dict(&self) -> Result<Metadata, ObjectError> {
        match self {
            DataObject::Spectrum(s) => s.to_dict(),
            DataObject::Heatmap(h) => h.to_dict(),
        }
    }

    /// Detached deep copy
    pub fn duplicate(&self) -> Result<DataObject, ObjectError> {
        Ok(match self {
            DataObject::Spectrum(s) => DataObject::Spectrum(s.duplicate()?),
            DataObject::Heatmap(h) => DataObject::Heatmap(h.duplicate()?),
        })
    }
}

impl ToZarr for DataObject {
    fn to_zarr(&self) -> Result<(ArrayMap, Metadata), StoreError> {
        self.as_container().to_zarr()
    }
}

impl From<SpectrumObject> for DataObject {
    fn from(object: SpectrumObject) -> Self {
        DataObject::Spectrum(object)
    }
}

impl From<HeatmapObject> for DataObject {
    fn from(object: HeatmapObject) -> Self {
        DataObject::Heatmap(object)
    }
}

/// JSON form of an array: nested lists for 2-D data, a flat list otherwise
pub(crate) fn array_to_json(data: &ArrayData) -> Value {
    let number = |v: f64| {
        if data.dtype().is_integer() {
            Value::from(v as i64)
        } else {
            Value::from(v)
        }
    };
    match data.shape() {
        [_, cols] if *cols > 0 => Value::Array(
            data.values()
                .chunks(*cols)
                .map(|row| Value::Array(row.iter().copied().map(number).collect()))
                .collect(),
        ),
        _ => Value::Array(data.values().iter().copied().map(number).collect()),
    }
}

/// Attributes of a stored group minus the keys describing the object itself
pub(crate) fn user_metadata(attrs: &Metadata) -> Metadata {
    attrs
        .iter()
        .filter(|(k, _)| !RESERVED_ATTRIBUTES.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
