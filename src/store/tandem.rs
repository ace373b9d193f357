use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde_json::{Map, Number, Value};
use serde_pickle::{DeOptions, HashableValue};

use super::StoreError;

/// File name of the tandem side-car inside the `Tandem` category
pub const TANDEM_FILENAME: &str = "tandem_spectra.pkl";

/// JSON side-car read when no pickle is present
pub const TANDEM_JSON_FILENAME: &str = "tandem_spectra.json";

/// Read-only mapping of tandem (MS/MS) spectra stored next to a document.
///
/// The side-car is a pickled dictionary keyed by scan. It is parsed on first access
/// and its values are exposed as JSON. Objects the pickle references by class, such
/// as numpy arrays, come back as `null`. When the pickle is absent a
/// [`TANDEM_JSON_FILENAME`] object in the same directory is read instead, and with
/// neither file the mapping is empty.
#[derive(Debug, Clone)]
pub struct TandemSpectra {
    path: PathBuf,
    data: OnceCell<Map<String, Value>>,
}

impl TandemSpectra {
    /// Mapping backed by the pickle at `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            data: OnceCell::new(),
        }
    }

    /// Location of the pickle side-car
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the JSON fallback
    pub fn json_path(&self) -> PathBuf {
        self.path.with_file_name(TANDEM_JSON_FILENAME)
    }

    /// Whether either side-car exists on disk
    pub fn exists(&self) -> bool {
        self.path.is_file() || self.json_path().is_file()
    }

    fn load(&self) -> Result<&Map<String, Value>, StoreError> {
        if let Some(data) = self.data.get() {
            return Ok(data);
        }
        let json_path = self.json_path();
        let (value, source) = if self.path.is_file() {
            let bytes = fs::read(&self.path)?;
            let options = DeOptions::new().replace_unresolved_globals();
            let value = serde_pickle::value_from_slice(&bytes, options)?;
            (pickle_to_json(value), &self.path)
        } else if json_path.is_file() {
            let text = fs::read_to_string(&json_path)?;
            (serde_json::from_str::<Value>(&text)?, &json_path)
        } else {
            return Ok(self.data.get_or_init(Map::new));
        };
        let Value::Object(map) = value else {
            return Err(StoreError::InvalidConfig(format!(
                "{} does not contain a dictionary",
                source.display()
            )));
        };
        debug!("Loaded {} tandem spectra from {}", map.len(), source.display());
        Ok(self.data.get_or_init(|| map))
    }

    /// Spectrum stored under `key`
    pub fn get(&self, key: &str) -> Result<Option<&Value>, StoreError> {
        Ok(self.load()?.get(key))
    }

    /// All keys
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.load()?.keys().cloned().collect())
    }

    /// Number of spectra
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.load()?.len())
    }

    /// Whether there are no spectra
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.load()?.is_empty())
    }
}

fn pickle_to_json(value: serde_pickle::Value) -> Value {
    use serde_pickle::Value as Pickle;
    match value {
        Pickle::None => Value::Null,
        Pickle::Bool(b) => Value::Bool(b),
        Pickle::I64(i) => Value::from(i),
        Pickle::Int(i) => Value::String(i.to_string()),
        Pickle::F64(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        Pickle::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Value::String(text),
            Err(err) => Value::from(err.into_bytes()),
        },
        Pickle::String(s) => Value::String(s),
        Pickle::List(items) | Pickle::Tuple(items) => {
            Value::Array(items.into_iter().map(pickle_to_json).collect())
        }
        Pickle::Set(items) | Pickle::FrozenSet(items) => Value::Array(
            items
                .into_iter()
                .map(|item| pickle_to_json(item.into_value()))
                .collect(),
        ),
        Pickle::Dict(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(key, value)| (key_to_string(key), pickle_to_json(value)))
                .collect(),
        ),
    }
}

/// Dictionary keys become strings; scan numbers are the common case
fn key_to_string(key: HashableValue) -> String {
    match key {
        HashableValue::String(s) => s,
        HashableValue::I64(i) => i.to_string(),
        other => match pickle_to_json(other.into_value()) {
            Value::String(s) => s,
            value => value.to_string(),
        },
    }
}
