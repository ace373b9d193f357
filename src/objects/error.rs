use crate::array::ArrayError;
use crate::processing::ProcessingError;
use crate::store::StoreError;

/// Errors raised by data objects
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    /// x and y of a spectrum have different lengths
    #[error("x and y must have the same length (x: {x_len}, y: {y_len})")]
    LengthMismatch {
        /// Length of x
        x_len: usize,
        /// Length of y
        y_len: usize,
    },

    /// Array has the wrong number of dimensions
    #[error("Expected a {expected}-dimensional array, got {actual} dimensions")]
    WrongDimensions {
        /// Required number of dimensions
        expected: usize,
        /// Actual number of dimensions
        actual: usize,
    },

    /// Heatmap axis does not match the array shape
    #[error("Axis `{axis}` has {actual} values but the array needs {expected}")]
    AxisShapeMismatch {
        /// Axis name
        axis: &'static str,
        /// Number of values implied by the array
        expected: usize,
        /// Number of values supplied
        actual: usize,
    },

    /// Metadata is not a mapping
    #[error("Metadata must be a mapping, got {0}")]
    InvalidMetadata(String),

    /// Object holds no data points
    #[error("Object has no data")]
    Empty,

    /// Requested label is not one of the object's options
    #[error("Cannot change label to `{label}`; allowed labels: {options:?}")]
    LabelNotAllowed {
        /// Requested label
        label: String,
        /// Allowed labels
        options: Vec<String>,
    },

    /// Conversion needs a parameter that is missing or not positive
    #[error("Cannot perform conversion due to a missing `{0}` information")]
    MissingParameter(&'static str),

    /// No axis family converts between the two labels
    #[error("Cannot convert label from `{from}` to `{to}`")]
    UnsupportedConversion {
        /// Current label
        from: String,
        /// Requested label
        to: String,
    },

    /// Operation is not available for this kind of object
    #[error("`{operation}` is not supported by {class}")]
    UnsupportedOperation {
        /// Operation name
        operation: &'static str,
        /// Object class
        class: &'static str,
    },

    /// Object path does not belong to the object's category
    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    /// Mobilograms to stitch do not match the variables or each other
    #[error("Cannot stitch heatmap: {0}")]
    Stitch(String),

    /// Store access failed
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    /// Array could not be built or viewed
    #[error("Array error: {0}")]
    ArrayError(#[from] ArrayError),

    /// Processing kernel rejected its input
    #[error("Processing error: {0}")]
    ProcessingError(#[from] ProcessingError),

    /// CSV writer failed
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// I/O error during export
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Annotation payload could not be (de)serialized
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}
