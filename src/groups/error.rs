use crate::objects::ObjectError;
use crate::processing::ProcessingError;
use crate::store::StoreError;

/// Errors raised by data groups
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    /// Group has no members
    #[error("Group has no members")]
    Empty,

    /// Member index past the end of the group
    #[error("Index {index} is out of range for a group of {len} members")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of members
        len: usize,
    },

    /// Member name not present in a keyed group
    #[error("Group has no member named `{0}`")]
    NotFound(String),

    /// Name lookup on a group built from a list
    #[error("Cannot retrieve `{0}` by name; the group was built from a list")]
    NotKeyed(String),

    /// Two members share a name
    #[error("Duplicate member name `{0}`")]
    DuplicateName(String),

    /// Lazy reference names a document that is not registered
    #[error("Document `{0}` is not open")]
    DocumentNotFound(String),

    /// Member is not the kind of object the group holds
    #[error("Expected a {expected} member, got {actual}")]
    WrongMember {
        /// Kind the group holds
        expected: &'static str,
        /// Class of the offending member
        actual: &'static str,
    },

    /// Members cannot be combined
    #[error("Incompatible members: {0}")]
    Incompatible(String),

    /// Requested label is not one of the group's options
    #[error("Cannot change group label to `{label}`; allowed labels: {options:?}")]
    LabelNotAllowed {
        /// Requested label
        label: String,
        /// Allowed labels
        options: Vec<String>,
    },

    /// Error from a member object
    #[error("Object error: {0}")]
    ObjectError(#[from] ObjectError),

    /// Error while resolving a lazy reference
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    /// Error from a processing kernel
    #[error("Processing error: {0}")]
    ProcessingError(#[from] ProcessingError),

    /// Processing log entry could not be (de)serialized
    #[error("JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}
