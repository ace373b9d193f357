//! # Data groups
//!
//! A group bundles several data objects of the same kind so they can be validated,
//! resampled onto a common axis and combined:
//!
//! ```no_run
//! use origami_docstore::groups::{DataGroup, DataObjectsContainer, SpectrumGroup};
//! use origami_docstore::groups::ResampleParams;
//! use origami_docstore::objects::SpectrumObject;
//!
//! let a = SpectrumObject::mass_spectrum(vec![100.0, 101.0], vec![1.0, 2.0])?;
//! let b = SpectrumObject::mass_spectrum(vec![100.5, 102.0], vec![3.0, 1.0])?;
//! let mut group = SpectrumGroup::mass_spectra(DataObjectsContainer::from_list([a, b]));
//! let summed = group.sum(&ResampleParams::default())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Members may also be `(document, path)` references; they are loaded through a
//! [`DocumentRegistry`] the first time they are needed.

mod container;
mod error;
mod heatmap;
mod registry;
mod spectrum;


use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;

pub use container::{DataObjectsContainer, Member, ObjectRef};
pub use error::GroupError;
pub use heatmap::HeatmapGroup;
pub use registry::{DocumentRegistry, Environment};
pub use spectrum::{ResampleParams, SpectrumGroup};

use crate::array::ArrayMap;
use crate::objects::labels::{are_synonyms, RESTORE_DEFAULT};
use crate::objects::{ContainerBase, ConversionParams, DataObject};
use crate::store::{Metadata, StoreError, ToZarr};

/// State shared by every group: labels, members, registry and processing log
#[derive(Clone)]
pub struct GroupCore {
    base: ContainerBase,
    members: DataObjectsContainer,
    registry: Option<Rc<dyn DocumentRegistry>>,
    processing: BTreeMap<String, Value>,
}

impl std::fmt::Debug for GroupCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupCore")
            .field("base", &self.base)
            .field("members", &self.members)
            .field("has_registry", &self.registry.is_some())
            .field("processing", &self.processing)
            .finish()
    }
}

impl GroupCore {
    pub(crate) fn new(members: DataObjectsContainer, base: ContainerBase) -> Self {
        Self {
            base,
            members,
            registry: None,
            processing: BTreeMap::new(),
        }
    }

    /// Labels, options and metadata of the group
    pub fn base(&self) -> &ContainerBase {
        &self.base
    }

    /// Mutable labels, options and metadata
    pub fn base_mut(&mut self) -> &mut ContainerBase {
        &mut self.base
    }

    /// The members
    pub fn members(&self) -> &DataObjectsContainer {
        &self.members
    }

    /// Load every lazy member and return all of them in order
    pub fn objects(&mut self) -> Result<Vec<&DataObject>, GroupError> {
        self.members.resolve_all(self.registry.as_deref())?;
        Ok(self.members.loaded().collect())
    }

    /// Load every lazy member and return mutable access to all of them
    pub fn objects_mut(&mut self) -> Result<Vec<&mut DataObject>, GroupError> {
        self.members.resolve_all(self.registry.as_deref())?;
        Ok(self.members.loaded_mut().collect())
    }

    /// Member at `index`, loaded on first access
    pub fn get(&mut self, index: usize) -> Result<&DataObject, GroupError> {
        Ok(&*self.members.resolve(index, self.registry.as_deref())?)
    }

    /// Member called `name`; only for groups built from named members
    pub fn get_by_name(&mut self, name: &str) -> Result<&DataObject, GroupError> {
        let index = self.members.index_of(name)?;
        self.get(index)
    }
}

/// Behaviour shared by spectrum and heatmap groups
pub trait DataGroup {
    /// Shared state
    fn core(&self) -> &GroupCore;

    /// Mutable shared state
    fn core_mut(&mut self) -> &mut GroupCore;

    /// Value of the `class` attribute
    fn class_name(&self) -> &'static str;

    /// Whether members must be resampled before they can be combined
    fn need_resample(&mut self) -> Result<bool, GroupError>;

    /// Forget every cached aggregate
    fn reset(&mut self);

    /// Resolve lazy members through `registry`
    fn set_registry(&mut self, registry: Rc<dyn DocumentRegistry>) {
        self.core_mut().registry = Some(registry);
    }

    /// Number of members
    fn len(&self) -> usize {
        self.core().members.len()
    }

    /// Whether the group has no members
    fn is_empty(&self) -> bool {
        self.core().members.is_empty()
    }

    /// Member names; positions for groups built from a list
    fn names(&self) -> Vec<String> {
        self.core().members.names()
    }

    /// Single pass over the members in order, loading lazy ones first
    fn iter(&mut self) -> Result<std::vec::IntoIter<&DataObject>, GroupError> {
        Ok(self.core_mut().objects()?.into_iter())
    }

    /// Member at `index`
    fn get(&mut self, index: usize) -> Result<&DataObject, GroupError> {
        self.core_mut().get(index)
    }

    /// Member called `name`
    fn get_by_name(&mut self, name: &str) -> Result<&DataObject, GroupError> {
        self.core_mut().get_by_name(name)
    }

    /// Every member's x label
    fn x_labels(&mut self) -> Result<Vec<String>, GroupError> {
        let objects = self.core_mut().objects()?;
        Ok(objects
            .iter()
            .map(|o| o.as_container().base().x_label().to_string())
            .collect())
    }

    /// Every member's y label
    fn y_labels(&mut self) -> Result<Vec<String>, GroupError> {
        let objects = self.core_mut().objects()?;
        Ok(objects
            .iter()
            .map(|o| o.as_container().base().y_label().to_string())
            .collect())
    }

    /// Every member's shape
    fn shapes(&mut self) -> Result<Vec<Vec<usize>>, GroupError> {
        let objects = self.core_mut().objects()?;
        objects
            .iter()
            .map(|object| match object {
                DataObject::Spectrum(s) => Ok(s.shape()?),
                DataObject::Heatmap(h) => {
                    let (rows, cols) = h.shape()?;
                    Ok(vec![rows, cols])
                }
            })
            .collect()
    }

    /// Whether every member has the same shape
    fn validate_shape(&mut self) -> Result<bool, GroupError> {
        let shapes = self.shapes()?;
        Ok(shapes.windows(2).all(|w| w[0] == w[1]))
    }

    /// Whether every member's x label names the same unit
    fn validate_x_labels(&mut self) -> Result<bool, GroupError> {
        Ok(all_synonyms(&self.x_labels()?))
    }

    /// Whether every member's y label names the same unit
    fn validate_y_labels(&mut self) -> Result<bool, GroupError> {
        Ok(all_synonyms(&self.y_labels()?))
    }

    /// Whether the number of members is within `n_min..=n_max`
    fn validate_size(&self, n_min: usize, n_max: usize) -> bool {
        (n_min..=n_max).contains(&self.len())
    }

    /// Record the parameters of a processing step.
    ///
    /// Cached aggregates are dropped when the parameters differ from the ones
    /// recorded before. Returns whether they did.
    fn add_processing_step(&mut self, method: &str, params: Value) -> bool {
        let previous = self
            .core_mut()
            .processing
            .insert(method.to_string(), params.clone());
        let changed = previous.as_ref() != Some(&params);
        if changed {
            self.reset();
        }
        changed
    }

    /// Parameters recorded for `method`
    fn get_processing_step(&self, method: &str) -> Option<&Value> {
        self.core().processing.get(method)
    }

    /// Every recorded processing step
    fn processing(&self) -> &BTreeMap<String, Value> {
        &self.core().processing
    }

    /// Value of metadata `key` for every member, `None` where it is missing
    fn group_metadata(&mut self, key: &str) -> Result<Vec<Option<Value>>, GroupError> {
        let objects = self.core_mut().objects()?;
        Ok(objects
            .iter()
            .map(|o| o.as_container().base().metadata().get(key).cloned())
            .collect())
    }

    /// Convert the x axis of every member
    fn change_x_label(&mut self, to_label: &str, params: &ConversionParams) -> Result<(), GroupError> {
        let options = self.core().base.x_label_options();
        check_option(to_label, &options)?;
        let mut label = None;
        for object in self.core_mut().objects_mut()? {
            object.change_x_label(to_label, params)?;
            label = Some(object.as_container().base().x_label().to_string());
        }
        if let Some(label) = label {
            self.core_mut().base.set_x_label(label);
        }
        self.reset();
        Ok(())
    }

    /// Convert the y axis of every member
    fn change_y_label(&mut self, to_label: &str, params: &ConversionParams) -> Result<(), GroupError> {
        let options = self.core().base.y_label_options();
        check_option(to_label, &options)?;
        let mut label = None;
        for object in self.core_mut().objects_mut()? {
            object.change_y_label(to_label, params)?;
            label = Some(object.as_container().base().y_label().to_string());
        }
        if let Some(label) = label {
            self.core_mut().base.set_y_label(label);
        }
        self.reset();
        Ok(())
    }

    /// Title followed by one line per member
    fn describe(&self, title: &str) -> String {
        format!("{title}\n{}", self.core().members.describe())
    }
}

fn all_synonyms(labels: &[String]) -> bool {
    labels.windows(2).all(|w| are_synonyms(&w[0], &w[1]))
}

fn check_option(label: &str, options: &[String]) -> Result<(), GroupError> {
    if label == RESTORE_DEFAULT || options.iter().any(|o| o == label) {
        Ok(())
    } else {
        Err(GroupError::LabelNotAllowed {
            label: label.to_string(),
            options: options.to_vec(),
        })
    }
}

/// Groups are stored as an attribute-only node
fn group_attrs(class: &str, base: &ContainerBase) -> Result<(ArrayMap, Metadata), StoreError> {
    let mut attrs = base.metadata().clone();
    attrs.insert("class".into(), Value::from(class));
    Ok((ArrayMap::new(), attrs))
}

impl ToZarr for SpectrumGroup {
    fn to_zarr(&self) -> Result<(ArrayMap, Metadata), StoreError> {
        group_attrs(self.class_name(), self.core().base())
    }
}

impl ToZarr for HeatmapGroup {
    fn to_zarr(&self) -> Result<(ArrayMap, Metadata), StoreError> {
        group_attrs(self.class_name(), self.core().base())
    }
}
