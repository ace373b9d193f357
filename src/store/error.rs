use crate::array::ArrayError;
use crate::objects::ObjectError;

/// Errors that can occur while reading or writing a document store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error serializing/deserializing JSON metadata or attributes
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// Stored array could not be interpreted
    #[error("Array error: {0}")]
    ArrayError(#[from] ArrayError),

    /// Requested group, array or file does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Path is empty or contains an invalid component
    #[error("Invalid store path: {0}")]
    InvalidPath(String),

    /// Path has more levels than `add` supports
    #[error("Path `{path}` has {depth} levels; at most two are supported")]
    PathTooDeep {
        /// Offending path
        path: String,
        /// Number of components in the path
        depth: usize,
    },

    /// Group has no `class` attribute
    #[error("Group `{0}` has no `class` attribute")]
    MissingClass(String),

    /// Group's `class` attribute names an unknown object type
    #[error("Unknown object class `{class}` in group `{path}`")]
    UnknownClass {
        /// Value of the `class` attribute
        class: String,
        /// Group path
        path: String,
    },

    /// Stored data did not form a valid object
    #[error("Could not reconstruct object from `{path}`: {source}")]
    Reconstruct {
        /// Group path
        path: String,
        /// Validation failure
        source: Box<ObjectError>,
    },

    /// Decompressed chunk has the wrong size
    #[error("Chunk `{path}` has {actual} bytes, expected {expected}")]
    CorruptChunk {
        /// Chunk file path
        path: String,
        /// Expected number of bytes
        expected: usize,
        /// Actual number of bytes
        actual: usize,
    },

    /// `.zarray` header is inconsistent
    #[error("Invalid array metadata in `{path}`: {reason}")]
    InvalidArrayMeta {
        /// Array directory
        path: String,
        /// What is wrong with the header
        reason: String,
    },

    /// Tandem side-car could not be decoded
    #[error("Pickle error: {0}")]
    PickleError(#[from] serde_pickle::Error),

    /// Configuration blob is not a JSON object
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Store was closed
    #[error("Document `{0}` is closed")]
    Closed(String),
}
