use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use super::chunks::{self, ARRAY_META_KEY};
use super::{StoreConfig, StoreError};
use crate::array::ArrayData;

/// Flat JSON attribute mapping attached to a group
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Name of the group marker file
pub const GROUP_META_KEY: &str = ".zgroup";
/// Name of the attribute file
pub const ATTRS_KEY: &str = ".zattrs";

/// Create the group marker and an empty attribute file if missing
pub(crate) fn init_group_dir(dir: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dir)?;
    let marker = dir.join(GROUP_META_KEY);
    if !marker.is_file() {
        fs::write(marker, serde_json::to_string(&serde_json::json!({"zarr_format": 2}))?)?;
    }
    let attrs = dir.join(ATTRS_KEY);
    if !attrs.is_file() {
        fs::write(attrs, "{}")?;
    }
    Ok(())
}

/// Whether `dir` is a group
pub(crate) fn is_group(dir: &Path) -> bool {
    dir.join(GROUP_META_KEY).is_file()
}

/// Reference to an array inside a store, used for deferred loading
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayHandle {
    dir: PathBuf,
}

impl ArrayHandle {
    pub(crate) fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Directory of the array on disk
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read the whole array
    pub fn read(&self) -> Result<ArrayData, StoreError> {
        chunks::read_array(&self.dir)
    }

    /// Read a hyper-rectangular region of the array
    pub fn read_region(&self, region: &[Range<usize>]) -> Result<ArrayData, StoreError> {
        chunks::read_region(&self.dir, region)
    }

    /// Shape from the array header, without reading any chunk
    pub fn shape(&self) -> Result<Vec<usize>, StoreError> {
        Ok(chunks::read_meta(&self.dir)?.shape)
    }
}

/// A named node in a document store.
///
/// Groups hold arrays, child groups and a flat attribute mapping. A `Group` is only a
/// path; every accessor goes to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    root: PathBuf,
    path: String,
}

impl Group {
    pub(crate) fn new(root: impl Into<PathBuf>, path: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            path: path.into(),
        }
    }

    /// Slash-separated path relative to the store root; empty for the root
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last component of the path
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }

    /// Location of the group on disk
    pub fn dir(&self) -> PathBuf {
        if self.path.is_empty() {
            self.root.clone()
        } else {
            self.root.join(&self.path)
        }
    }

    fn child_path(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.path, name)
        }
    }

    /// Read the attributes
    pub fn attrs(&self) -> Result<Metadata, StoreError> {
        let path = self.dir().join(ATTRS_KEY);
        if !path.is_file() {
            return Ok(Metadata::new());
        }
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Merge `attrs` into the stored attributes
    pub fn update_attrs(&self, attrs: &Metadata) -> Result<(), StoreError> {
        let mut current = self.attrs()?;
        for (key, value) in attrs {
            current.insert(key.clone(), value.clone());
        }
        self.write_attrs(&current)
    }

    /// Set a single attribute
    pub fn set_attr(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        let mut current = self.attrs()?;
        current.insert(key.to_string(), value);
        self.write_attrs(&current)
    }

    fn write_attrs(&self, attrs: &Metadata) -> Result<(), StoreError> {
        fs::write(self.dir().join(ATTRS_KEY), serde_json::to_string_pretty(attrs)?)?;
        Ok(())
    }

    fn children(&self, predicate: fn(&Path) -> bool) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.dir())? {
            let entry = entry?;
            if predicate(&entry.path()) {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort_by(|a, b| super::paths::natural_cmp(a, b));
        Ok(names)
    }

    /// Names of the arrays in this group, in natural order
    pub fn array_keys(&self) -> Result<Vec<String>, StoreError> {
        self.children(chunks::is_array)
    }

    /// Names of the child groups, in natural order
    pub fn group_keys(&self) -> Result<Vec<String>, StoreError> {
        self.children(is_group)
    }

    /// Whether an array called `name` exists
    pub fn contains_array(&self, name: &str) -> bool {
        self.dir().join(name).join(ARRAY_META_KEY).is_file()
    }

    /// Child group called `name`, if it exists
    pub fn child(&self, name: &str) -> Option<Group> {
        let group = Group::new(self.root.clone(), self.child_path(name));
        is_group(&group.dir()).then_some(group)
    }

    /// Child group called `name`, created if missing
    pub fn require_group(&self, name: &str) -> Result<Group, StoreError> {
        let group = Group::new(self.root.clone(), self.child_path(name));
        init_group_dir(&group.dir())?;
        Ok(group)
    }

    /// Handle to the array called `name`
    pub fn array_handle(&self, name: &str) -> Result<ArrayHandle, StoreError> {
        if !self.contains_array(name) {
            return Err(StoreError::NotFound(self.child_path(name)));
        }
        Ok(ArrayHandle::new(self.dir().join(name)))
    }

    /// Read the array called `name`
    pub fn read_array(&self, name: &str) -> Result<ArrayData, StoreError> {
        self.array_handle(name)?.read()
    }

    /// Write or overwrite the array called `name`
    pub fn write_array(
        &self,
        name: &str,
        data: &ArrayData,
        config: &StoreConfig,
    ) -> Result<(), StoreError> {
        chunks::write_array(
            &self.dir().join(name),
            data,
            config.compression_level(),
            config.chunked,
        )?;
        Ok(())
    }

    /// Delete the array called `name`
    pub fn remove_array(&self, name: &str) -> Result<(), StoreError> {
        let handle = self.array_handle(name)?;
        fs::remove_dir_all(handle.dir())?;
        Ok(())
    }

    /// Remove every array, child group and attribute, keeping the group itself
    pub fn clear(&self) -> Result<(), StoreError> {
        let dir = self.dir();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else if path.file_name().map_or(true, |n| n != GROUP_META_KEY) {
                fs::remove_file(&path)?;
            }
        }
        init_group_dir(&dir)
    }
}
