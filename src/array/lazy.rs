use std::cell::OnceCell;

use super::ArrayData;
use crate::store::{ArrayHandle, StoreError};

/// An array that is either already in memory or still on disk.
///
/// Arrays reconstructed from a document start out unloaded and hold only an
/// [`ArrayHandle`]. The first call to [`materialize`](Self::materialize) reads the
/// chunks and caches the result; later calls return the cached values.
#[derive(Debug, Clone)]
pub struct LazyArray {
    source: Option<ArrayHandle>,
    value: OnceCell<ArrayData>,
}

impl LazyArray {
    /// Array that is already in memory
    pub fn loaded(data: ArrayData) -> Self {
        Self {
            source: None,
            value: OnceCell::from(data),
        }
    }

    /// Array that will be read from `handle` on first access
    pub fn unloaded(handle: ArrayHandle) -> Self {
        Self {
            source: Some(handle),
            value: OnceCell::new(),
        }
    }

    /// Array with no values yet; see [`materialize_with`](Self::materialize_with)
    pub fn pending() -> Self {
        Self {
            source: None,
            value: OnceCell::new(),
        }
    }

    /// Whether the values are in memory
    pub fn is_loaded(&self) -> bool {
        self.value.get().is_some()
    }

    /// Load the values if needed and return them
    pub fn materialize(&self) -> Result<&ArrayData, StoreError> {
        if let Some(data) = self.value.get() {
            return Ok(data);
        }
        let handle = self
            .source
            .as_ref()
            .ok_or_else(|| StoreError::NotFound("array has neither values nor a source".into()))?;
        let data = handle.read()?;
        Ok(self.value.get_or_init(|| data))
    }

    /// Like [`materialize`](Self::materialize), but computes the values with `compute`
    /// when there is no on-disk source
    pub fn materialize_with<E>(
        &self,
        compute: impl FnOnce() -> Result<ArrayData, E>,
    ) -> Result<&ArrayData, E>
    where
        E: From<StoreError>,
    {
        if let Some(data) = self.value.get() {
            return Ok(data);
        }
        let data = match &self.source {
            Some(handle) => handle.read()?,
            None => compute()?,
        };
        Ok(self.value.get_or_init(|| data))
    }

    /// Forget both the cached values and the source
    pub fn reset(&mut self) {
        self.source = None;
        self.value = OnceCell::new();
    }

    /// Mutable access to the values, loading them first if needed
    pub fn materialize_mut(&mut self) -> Result<&mut ArrayData, StoreError> {
        self.materialize()?;
        self.value
            .get_mut()
            .ok_or_else(|| StoreError::NotFound("array values were not cached".into()))
    }

    /// Shape of the array without loading it
    pub fn shape(&self) -> Result<Vec<usize>, StoreError> {
        match (self.value.get(), &self.source) {
            (Some(data), _) => Ok(data.shape().to_vec()),
            (None, Some(handle)) => handle.shape(),
            (None, None) => Ok(Vec::new()),
        }
    }

    /// Replace the values; the on-disk source is forgotten
    pub fn replace(&mut self, data: ArrayData) {
        self.source = None;
        self.value = OnceCell::from(data);
    }

    /// Consume and return the values, loading them if needed
    pub fn into_data(self) -> Result<ArrayData, StoreError> {
        if let Some(data) = self.value.into_inner() {
            return Ok(data);
        }
        match self.source {
            Some(handle) => handle.read(),
            None => Err(StoreError::NotFound("array has neither values nor a source".into())),
        }
    }
}

impl From<ArrayData> for LazyArray {
    fn from(data: ArrayData) -> Self {
        Self::loaded(data)
    }
}
