/// Errors raised by the numeric processing kernels
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    /// A parameter is outside its valid range
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Input arrays are empty
    #[error("Cannot process empty data")]
    EmptyInput,

    /// Paired inputs have different lengths
    #[error("Length mismatch: {left} vs {right}")]
    LengthMismatch {
        /// Length of the first input
        left: usize,
        /// Length of the second input
        right: usize,
    },

    /// Input does not have the required shape
    #[error("Invalid shape: {0}")]
    InvalidShape(String),
}

impl ProcessingError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ProcessingError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
