use std::path::PathBuf;
use std::rc::Weak;

use serde_json::Value;

use super::ObjectError;
use crate::array::ArrayMap;
use crate::store::{paths::clean_filename, DocumentStore, Metadata, StoreInner};

/// Weak link from an object to the document it was read from or written to.
///
/// Holding an `Owner` never keeps the document open; once every
/// [`DocumentStore`] handle is dropped, [`Owner::store`] returns `None` and
/// flushes become no-ops.
#[derive(Debug, Clone)]
pub struct Owner {
    document: String,
    path: String,
    store: Weak<StoreInner>,
}

impl Owner {
    /// Link to `path` inside `store`
    pub fn new(store: &DocumentStore, path: impl Into<String>) -> Self {
        Self {
            document: store.title().to_string(),
            path: path.into(),
            store: store.downgrade(),
        }
    }

    /// Title of the owning document
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Group path inside the document
    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    /// Last component of the group path
    pub fn dataset_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// The owning document, if it is still open
    pub fn store(&self) -> Option<DocumentStore> {
        self.store.upgrade().map(DocumentStore::from_inner)
    }
}

impl PartialEq for Owner {
    fn eq(&self, other: &Self) -> bool {
        self.document == other.document && self.path == other.path
    }
}

/// Instance-local behaviour flags; never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectOptions {
    /// Drop rows where both columns are zero on export
    pub remove_zeros: bool,
}

/// Labels, metadata, auxiliary arrays and ownership shared by every object
#[derive(Debug, Clone, Default)]
pub struct ContainerBase {
    pub(crate) x_label: String,
    pub(crate) y_label: String,
    pub(crate) x_label_options: Option<Vec<String>>,
    pub(crate) y_label_options: Option<Vec<String>>,
    pub(crate) metadata: Metadata,
    pub(crate) extra_data: ArrayMap,
    pub(crate) owner: Option<Owner>,
    pub(crate) output_path: Option<PathBuf>,
}

impl ContainerBase {
    /// Container with the given labels and nothing else
    pub fn new(x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        Self {
            x_label: x_label.into(),
            y_label: y_label.into(),
            ..Self::default()
        }
    }

    /// Current x label
    pub fn x_label(&self) -> &str {
        &self.x_label
    }

    /// Set the x label without touching the data
    pub fn set_x_label(&mut self, label: impl Into<String>) {
        self.x_label = label.into();
    }

    /// Current y label
    pub fn y_label(&self) -> &str {
        &self.y_label
    }

    /// Set the y label without touching the data
    pub fn set_y_label(&mut self, label: impl Into<String>) {
        self.y_label = label.into();
    }

    /// Allowed x labels; the current label alone if never set
    pub fn x_label_options(&self) -> Vec<String> {
        self.x_label_options
            .clone()
            .unwrap_or_else(|| vec![self.x_label.clone()])
    }

    /// Set the allowed x labels
    pub fn set_x_label_options<S: AsRef<str>>(&mut self, options: &[S]) {
        self.x_label_options = Some(options.iter().map(|s| s.as_ref().to_string()).collect());
    }

    /// Allowed y labels; the current label alone if never set
    pub fn y_label_options(&self) -> Vec<String> {
        self.y_label_options
            .clone()
            .unwrap_or_else(|| vec![self.y_label.clone()])
    }

    /// Set the allowed y labels
    pub fn set_y_label_options<S: AsRef<str>>(&mut self, options: &[S]) {
        self.y_label_options = Some(options.iter().map(|s| s.as_ref().to_string()).collect());
    }

    /// Metadata
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Mutable metadata
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Merge a JSON value into the metadata; fails unless it is an object
    pub fn set_metadata(&mut self, metadata: Value) -> Result<(), ObjectError> {
        match metadata {
            Value::Object(map) => {
                self.metadata.extend(map);
                Ok(())
            }
            other => Err(ObjectError::InvalidMetadata(json_type_name(&other).to_string())),
        }
    }

    /// Auxiliary arrays
    pub fn extra_data(&self) -> &ArrayMap {
        &self.extra_data
    }

    /// Mutable auxiliary arrays
    pub fn extra_data_mut(&mut self) -> &mut ArrayMap {
        &mut self.extra_data
    }

    /// Owning document link
    pub fn owner(&self) -> Option<&Owner> {
        self.owner.as_ref()
    }

    /// Set or clear the owning document link
    pub fn set_owner(&mut self, owner: Option<Owner>) {
        self.owner = owner;
    }

    /// Set the base directory used by [`output_path`](Self::output_path)
    pub fn set_output_path(&mut self, path: Option<PathBuf>) {
        self.output_path = path;
    }

    /// Export location: the base directory joined with a file-safe dataset name.
    ///
    /// `None` unless both the base directory and the owner are set.
    pub fn output_path(&self) -> Option<PathBuf> {
        let base = self.output_path.as_ref()?;
        let owner = self.owner.as_ref()?;
        Some(base.join(clean_filename(owner.dataset_name())))
    }

    /// Numeric parameter from the owning document's `Metadata/Parameters`
    pub fn store_parameter(&self, key: &str) -> Option<f64> {
        let store = self.owner.as_ref()?.store()?;
        store.parameters().ok()?.get(key)?.as_f64()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
