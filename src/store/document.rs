use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::group::{init_group_dir, is_group};
use super::paths::{clean_filename, copy_tree, split_path, with_extension};
use super::tandem::{TandemSpectra, TANDEM_FILENAME};
use super::{factory, Group, Metadata, StoreConfig, StoreError};
use crate::array::ArrayMap;
use crate::objects::DataObject;

/// Format version written to new documents
pub const VERSION: i64 = 1;

/// Top-level categories present in every document
pub const GROUPS: [&str; 11] = [
    "MassSpectra",
    "Mobilograms",
    "Chromatograms",
    "IonHeatmaps",
    "MSDTHeatmaps",
    "Metadata",
    "Overlays",
    "Configs",
    "Raw",
    "Output",
    "Tandem",
];

/// Anything that can be written to a group as arrays plus attributes
pub trait ToZarr {
    /// Arrays and attributes to store
    fn to_zarr(&self) -> Result<(ArrayMap, Metadata), StoreError>;
}

impl ToZarr for (ArrayMap, Metadata) {
    fn to_zarr(&self) -> Result<(ArrayMap, Metadata), StoreError> {
        Ok(self.clone())
    }
}

/// Shared state behind every [`DocumentStore`] handle
#[derive(Debug)]
pub(crate) struct StoreInner {
    path: PathBuf,
    title: String,
    config: StoreConfig,
    open: Cell<bool>,
    tandem: TandemSpectra,
}

/// A document: one directory holding spectra, heatmaps, metadata and side-car files.
///
/// Cloning a `DocumentStore` yields another handle to the same document. Objects read
/// from the store only keep a weak link, so dropping every handle detaches them.
///
/// ```no_run
/// use origami_docstore::objects::SpectrumObject;
/// use origami_docstore::store::DocumentStore;
///
/// let store = DocumentStore::open("experiment.origami", None)?;
/// let spectrum = SpectrumObject::mass_spectrum(vec![100.0, 200.0], vec![3.0, 4.0])?;
/// store.add_spectrum("Summed spectrum", &spectrum)?;
/// let restored = store.get_object("MassSpectra/Summed spectrum")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct DocumentStore {
    inner: Rc<StoreInner>,
}

impl DocumentStore {
    /// Open or create the document at `path` with the default configuration
    pub fn open(path: impl AsRef<Path>, title: Option<&str>) -> Result<Self, StoreError> {
        Self::open_with_config(path, title, StoreConfig::default())
    }

    /// Open or create the document at `path`.
    ///
    /// The configured extension is enforced, the top-level categories are created if
    /// missing and the format version is checked.
    pub fn open_with_config(
        path: impl AsRef<Path>,
        title: Option<&str>,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        let path = with_extension(path.as_ref(), &config.extension());
        let created = !is_group(&path);
        init_group_dir(&path)?;

        let root = Group::new(path.clone(), "");
        for name in GROUPS {
            root.require_group(name)?;
        }
        if created {
            root.set_attr("created", Value::from(chrono::Utc::now().to_rfc3339()))?;
            info!("Created document {}", path.display());
        }

        let title = match title {
            Some(title) => title.to_string(),
            None => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let tandem = TandemSpectra::new(path.join("Tandem").join(TANDEM_FILENAME));
        let store = Self {
            inner: Rc::new(StoreInner {
                path,
                title,
                config,
                open: Cell::new(true),
                tandem,
            }),
        };

        if store.get_config("paths")?.is_none() {
            store.add_config("paths", &Value::Object(Metadata::new()))?;
        }
        store.check_version()?;
        Ok(store)
    }

    pub(crate) fn from_inner(inner: Rc<StoreInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<StoreInner> {
        Rc::downgrade(&self.inner)
    }

    fn check_version(&self) -> Result<(), StoreError> {
        let root = self.root()?;
        let attrs = root.attrs()?;
        root.set_attr("origami_version", Value::from(env!("CARGO_PKG_VERSION")))?;
        let version = match attrs.get("format_version").and_then(Value::as_i64) {
            Some(version) => version,
            None => {
                root.set_attr("format_version", Value::from(VERSION))?;
                VERSION
            }
        };
        if version != VERSION {
            warn!(
                "Document {} has format version {version}, expected {VERSION}; continuing without migration",
                self.inner.path.display()
            );
        }
        Ok(())
    }

    /// Document title; the file stem unless given on open
    pub fn title(&self) -> &str {
        &self.inner.title
    }

    /// Document directory
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Configuration the document was opened with
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Location of `item` on disk
    pub fn full_path(&self, item: &str) -> PathBuf {
        self.inner.path.join(item)
    }

    /// Base directory for exported files
    pub fn output_path(&self) -> PathBuf {
        self.full_path("Output")
    }

    /// Mark the document closed; further access fails with [`StoreError::Closed`]
    pub fn close(&self) {
        if self.inner.open.replace(false) {
            debug!("Closed document {}", self.inner.path.display());
        }
    }

    /// Whether the document can still be accessed
    pub fn is_open(&self) -> bool {
        self.inner.open.get()
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(StoreError::Closed(self.inner.title.clone()))
        }
    }

    /// Root group
    pub fn root(&self) -> Result<Group, StoreError> {
        self.ensure_open()?;
        Ok(Group::new(self.inner.path.clone(), ""))
    }

    /// Group at `path`, if it exists
    pub fn get(&self, path: &str) -> Option<Group> {
        let parts = split_path(path).ok()?;
        let root = self.root().ok()?;
        let group = Group::new(root.dir(), parts.join("/"));
        is_group(&group.dir()).then_some(group)
    }

    /// One of the top-level categories
    pub fn group(&self, name: &str) -> Result<Group, StoreError> {
        if !GROUPS.contains(&name) {
            return Err(StoreError::NotFound(format!(
                "group `{name}` is not a document category; try one of {GROUPS:?}"
            )));
        }
        self.get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    /// Whether a group or array exists at `path`
    pub fn contains(&self, path: &str) -> bool {
        match split_path(path) {
            Ok(parts) => {
                let dir = self.inner.path.join(parts.join("/"));
                is_group(&dir) || super::chunks::is_array(&dir)
            }
            Err(_) => false,
        }
    }

    /// Names of the top-level groups
    pub fn groups(&self) -> Result<Vec<String>, StoreError> {
        self.root()?.group_keys()
    }

    /// Existing group at `key` or a newly created one; at most two levels deep
    fn require(&self, key: &str) -> Result<Group, StoreError> {
        let parts = split_path(key)?;
        if parts.len() > 2 {
            return Err(StoreError::PathTooDeep {
                path: key.to_string(),
                depth: parts.len(),
            });
        }
        let mut group = self.root()?;
        for part in parts {
            group = group.require_group(part)?;
        }
        Ok(group)
    }

    /// Write arrays and merge attributes into the group at `key`, creating it if needed
    pub fn add(&self, key: &str, data: &ArrayMap, attrs: &Metadata) -> Result<Group, StoreError> {
        let group = self.require(key)?;
        for (name, array) in data {
            group.write_array(name, array, &self.inner.config)?;
        }
        group.update_attrs(attrs)?;
        Ok(group)
    }

    /// Like [`add`](Self::add), but arrays stored in the group that are not part of
    /// `data` are deleted, so the group holds exactly the arrays of `data`
    pub fn replace(&self, key: &str, data: &ArrayMap, attrs: &Metadata) -> Result<Group, StoreError> {
        let group = self.add(key, data, attrs)?;
        for name in group.array_keys()? {
            if !data.contains_key(name.as_str()) {
                group.remove_array(&name)?;
                debug!("Removed stale array `{name}` from `{key}`");
            }
        }
        Ok(group)
    }

    /// Merge attributes into the group at `key`, creating it if needed
    pub fn add_attrs(&self, key: &str, attrs: &Metadata) -> Result<Group, StoreError> {
        let group = self.require(key)?;
        group.update_attrs(attrs)?;
        Ok(group)
    }

    /// Attributes of the existing group at `key`
    pub fn get_attrs(&self, key: &str) -> Result<Metadata, StoreError> {
        self.existing(key)?.attrs()
    }

    fn existing(&self, key: &str) -> Result<Group, StoreError> {
        self.ensure_open()?;
        self.get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    /// Reconstruct the typed object stored at `path`
    pub fn get_object(&self, path: &str) -> Result<DataObject, StoreError> {
        let group = self.existing(path)?;
        self.as_object(&group)
    }

    /// Reconstruct the typed object stored in `group`, dispatching on its `class`
    pub fn as_object(&self, group: &Group) -> Result<DataObject, StoreError> {
        factory::reconstruct(self, group)
    }

    fn add_object<T: ToZarr + ?Sized>(
        &self,
        category: &str,
        title: &str,
        data: &T,
    ) -> Result<DataObject, StoreError> {
        let (arrays, attrs) = data.to_zarr()?;
        let key = if title.starts_with(&format!("{category}/")) {
            title.to_string()
        } else {
            format!("{category}/{title}")
        };
        let group = self.replace(&key, &arrays, &attrs)?;
        self.as_object(&group)
    }

    /// Store a mass spectrum under `MassSpectra`
    pub fn add_spectrum<T: ToZarr + ?Sized>(&self, title: &str, data: &T) -> Result<DataObject, StoreError> {
        self.add_object("MassSpectra", title, data)
    }

    /// Store a chromatogram under `Chromatograms`
    pub fn add_chromatogram<T: ToZarr + ?Sized>(&self, title: &str, data: &T) -> Result<DataObject, StoreError> {
        self.add_object("Chromatograms", title, data)
    }

    /// Store a mobilogram under `Mobilograms`
    pub fn add_mobilogram<T: ToZarr + ?Sized>(&self, title: &str, data: &T) -> Result<DataObject, StoreError> {
        self.add_object("Mobilograms", title, data)
    }

    /// Store an ion heatmap under `IonHeatmaps`
    pub fn add_heatmap<T: ToZarr + ?Sized>(&self, title: &str, data: &T) -> Result<DataObject, StoreError> {
        self.add_object("IonHeatmaps", title, data)
    }

    /// Store an MS/DT heatmap under `MSDTHeatmaps`
    pub fn add_msdt<T: ToZarr + ?Sized>(&self, title: &str, data: &T) -> Result<DataObject, StoreError> {
        self.add_object("MSDTHeatmaps", title, data)
    }

    /// Store untyped arrays and attributes under `Metadata`
    pub fn add_metadata<T: ToZarr + ?Sized>(&self, title: &str, data: &T) -> Result<Group, StoreError> {
        let (arrays, attrs) = data.to_zarr()?;
        self.add(&format!("Metadata/{title}"), &arrays, &attrs)
    }

    /// Delete `key`. Top-level categories are emptied but kept.
    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        let parts = split_path(key)?;
        let dir = self.inner.path.join(parts.join("/"));
        if parts.len() == 1 && GROUPS.contains(&parts[0]) {
            return Group::new(self.inner.path.clone(), parts[0]).clear();
        }
        if dir.is_dir() {
            fs::remove_dir_all(&dir)?;
            Ok(())
        } else {
            Err(StoreError::NotFound(key.to_string()))
        }
    }

    /// Delete the group or array at `key`; failures are logged, not returned
    pub fn remove(&self, key: &str) -> bool {
        let result = self.ensure_open().and_then(|_| {
            let dir = self.inner.path.join(split_path(key)?.join("/"));
            if !dir.is_dir() {
                return Err(StoreError::NotFound(key.to_string()));
            }
            fs::remove_dir_all(&dir)?;
            Ok(())
        });
        match result {
            Ok(()) => true,
            Err(err) => {
                warn!("Could not delete `{key}`: {err}");
                false
            }
        }
    }

    /// Remove the contents of the group at `key`, keeping the group itself
    pub fn clear(&self, key: &str) -> bool {
        match self.existing(key).and_then(|group| group.clear()) {
            Ok(()) => true,
            Err(err) => {
                warn!("Could not clear `{key}`: {err}");
                false
            }
        }
    }

    /// Remove the whole document from disk and close it
    pub fn delete_document(self) -> Result<(), StoreError> {
        self.ensure_open()?;
        fs::remove_dir_all(&self.inner.path)?;
        info!("Deleted document {}", self.inner.path.display());
        self.close();
        Ok(())
    }

    /// Copy the arrays and attributes of `item` to `copy`, or to the first free
    /// `"<item> #N"`. Returns the new path.
    pub fn copy(&self, item: &str, copy: Option<&str>) -> Result<String, StoreError> {
        let group = self.existing(item)?;
        let target = match copy {
            Some(copy) => copy.to_string(),
            None => (0..)
                .map(|n| format!("{item} #{n}"))
                .find(|name| !self.contains(name))
                .unwrap_or_else(|| format!("{item} #copy")),
        };
        let mut data = ArrayMap::new();
        for name in group.array_keys()? {
            data.insert(name.clone(), group.read_array(&name)?);
        }
        self.add(&target, &data, &group.attrs()?)?;
        Ok(target)
    }

    /// First `"<name> (<suffix> N)"` that does not exist in the document.
    ///
    /// A name that already ends with such a counter is incremented instead of
    /// getting a second one.
    pub fn get_new_name(&self, name: &str, suffix: &str) -> Result<String, StoreError> {
        self.ensure_open()?;
        let (base, mut n) = split_counter(name, suffix);
        loop {
            let candidate = format!("{base} ({suffix} {n})");
            if !self.inner.path.join(&candidate).exists() {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    /// Move the group at `src` to `dst`; the parent of `dst` is created if needed
    pub fn move_group(&self, src: &str, dst: &str) -> Result<(), StoreError> {
        let source = self.existing(src)?;
        let parts = split_path(dst)?;
        if self.contains(dst) {
            return Err(StoreError::InvalidPath(format!("`{dst}` already exists")));
        }
        if let Some((_, parents)) = parts.split_last() {
            if !parents.is_empty() {
                self.require(&parents.join("/"))?;
            }
        }
        fs::rename(source.dir(), self.inner.path.join(parts.join("/")))?;
        debug!("Moved `{src}` to `{dst}`");
        Ok(())
    }

    fn config_path(&self, name: &str) -> PathBuf {
        with_extension(&self.full_path("Configs").join(clean_filename(name)), ".json")
    }

    /// Write a JSON configuration blob to `Configs/<name>.json`
    pub fn add_config(&self, name: &str, data: &Value) -> Result<PathBuf, StoreError> {
        self.ensure_open()?;
        if !data.is_object() {
            return Err(StoreError::InvalidConfig(format!(
                "configuration `{name}` should be a JSON object"
            )));
        }
        let path = self.config_path(name);
        fs::write(&path, serde_json::to_string_pretty(data)?)?;
        debug!("Wrote configuration file to {}", path.display());
        Ok(path)
    }

    /// Configuration blob `name`, if present
    pub fn get_config(&self, name: &str) -> Result<Option<Value>, StoreError> {
        self.ensure_open()?;
        let path = self.config_path(name);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&fs::read_to_string(path)?)?))
    }

    /// Configuration blob `name` deserialized into `T`
    pub fn get_config_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        match self.get_config(name)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Record the raw file path of a dataset in the `paths` configuration
    pub fn add_file_path(&self, title: &str, path: &Path) -> Result<(), StoreError> {
        let mut config = match self.get_config("paths")? {
            Some(Value::Object(map)) => map,
            _ => Metadata::new(),
        };
        config.insert(title.to_string(), Value::from(path.to_string_lossy().into_owned()));
        self.add_config("paths", &Value::Object(config))?;
        Ok(())
    }

    /// Raw file path recorded for `title`
    pub fn get_file_path(&self, title: &str) -> Result<Option<PathBuf>, StoreError> {
        Ok(self
            .get_config("paths")?
            .as_ref()
            .and_then(|config| config.get(title))
            .and_then(Value::as_str)
            .map(PathBuf::from))
    }

    /// Copy a raw input file or directory into `Raw`
    pub fn add_raw(&self, path: impl AsRef<Path>) -> Result<PathBuf, StoreError> {
        self.ensure_open()?;
        let path = path.as_ref();
        let name = path
            .file_name()
            .filter(|_| path.exists())
            .ok_or_else(|| StoreError::NotFound(path.display().to_string()))?;
        let target = self.full_path("Raw").join(name);
        copy_tree(path, &target)?;
        debug!("Copied {} to {}", path.display(), target.display());
        Ok(target)
    }

    /// Tandem spectra side-car
    pub fn tandem_spectra(&self) -> &TandemSpectra {
        &self.inner.tandem
    }

    /// Attributes of `Metadata/Parameters`; empty if the group does not exist
    pub fn parameters(&self) -> Result<Metadata, StoreError> {
        match self.get("Metadata/Parameters") {
            Some(group) => group.attrs(),
            None => {
                self.ensure_open()?;
                Ok(Metadata::new())
            }
        }
    }

    fn root_attr(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .root()?
            .attrs()?
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Kind of experiment, e.g. `Type: ORIGAMI`
    pub fn data_type(&self) -> Result<Option<String>, StoreError> {
        self.root_attr("data_type")
    }

    /// Set the kind of experiment
    pub fn set_data_type(&self, data_type: &str) -> Result<(), StoreError> {
        self.root()?.set_attr("data_type", Value::from(data_type))
    }

    /// Raw file format, e.g. `Format: Waters (.raw)`
    pub fn file_format(&self) -> Result<Option<String>, StoreError> {
        self.root_attr("file_format")
    }

    /// Set the raw file format
    pub fn set_file_format(&self, file_format: &str) -> Result<(), StoreError> {
        self.root()?.set_attr("file_format", Value::from(file_format))
    }

    /// Paths of every dataset in every category, in natural order per category
    pub fn view(&self) -> Result<Vec<String>, StoreError> {
        let mut paths = Vec::new();
        for category in self.groups()? {
            paths.extend(self.view_group(&category)?);
        }
        Ok(paths)
    }

    /// Paths of the datasets in `category`; empty with a warning if it does not exist
    pub fn view_group(&self, category: &str) -> Result<Vec<String>, StoreError> {
        self.ensure_open()?;
        let Some(group) = self.get(category) else {
            warn!("Group `{category}` does not exist");
            return Ok(Vec::new());
        };
        Ok(group
            .group_keys()?
            .into_iter()
            .map(|name| format!("{}/{name}", group.path()))
            .collect())
    }

    /// Copy the whole document to `path` and open the copy
    pub fn duplicate(&self, path: impl AsRef<Path>) -> Result<DocumentStore, StoreError> {
        self.ensure_open()?;
        let extension = self.inner.config.extension();
        let requested = path.as_ref();
        let path = with_extension(requested, &extension);
        if path != requested {
            warn!("Path `{}` should end with `{extension}`", requested.display());
        }
        if path == self.inner.path {
            return Err(StoreError::InvalidPath(
                "destination cannot be the document itself".into(),
            ));
        }
        copy_tree(&self.inner.path, &path)?;
        info!("Duplicated {} to {}", self.inner.path.display(), path.display());
        Self::open_with_config(path, None, self.inner.config.clone())
    }
}

/// Split `"<base> (<suffix> N)"` into the base and `N`; other names start at 0
fn split_counter<'a>(name: &'a str, suffix: &str) -> (&'a str, u64) {
    let marker = format!(" ({suffix} ");
    let counter = name
        .strip_suffix(')')
        .and_then(|rest| rest.rfind(&marker).map(|i| (i, &rest[i + marker.len()..])))
        .and_then(|(i, digits)| digits.parse::<u64>().ok().map(|n| (i, n)));
    match counter {
        Some((i, n)) => (&name[..i], n),
        None => (name, 0),
    }
}
