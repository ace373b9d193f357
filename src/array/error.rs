/// Errors raised when building or viewing numeric arrays
#[derive(Debug, thiserror::Error)]
pub enum ArrayError {
    /// Number of values does not match the product of the shape
    #[error("Shape {shape:?} requires {expected} values, got {actual}")]
    ShapeMismatch {
        /// Requested shape
        shape: Vec<usize>,
        /// Number of values implied by the shape
        expected: usize,
        /// Number of values supplied
        actual: usize,
    },

    /// Array does not have the dimensionality required by the caller
    #[error("Expected a {expected}-dimensional array, got {actual} dimensions")]
    DimensionMismatch {
        /// Required number of dimensions
        expected: usize,
        /// Actual number of dimensions
        actual: usize,
    },

    /// Data type code is not one of the supported numeric types
    #[error("Unsupported data type: {0}")]
    UnsupportedDtype(String),
}
