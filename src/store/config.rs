use serde::{Deserialize, Serialize};

/// Default extension of a document directory
pub const DEFAULT_EXTENSION: &str = ".origami";

/// Configuration for opening and writing document stores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Extension enforced on document paths
    pub extension: String,

    /// zlib compression level for chunks (0-9)
    pub compression_level: u32,

    /// Use the size-aware chunk heuristic; when false each array is one chunk
    pub chunked: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            compression_level: 1,
            chunked: true,
        }
    }
}

impl StoreConfig {
    /// Normalized extension, always starting with a dot
    pub fn extension(&self) -> String {
        if self.extension.starts_with('.') {
            self.extension.clone()
        } else {
            format!(".{}", self.extension)
        }
    }

    /// Compression level clamped to the valid zlib range
    pub fn compression_level(&self) -> u32 {
        self.compression_level.min(9)
    }
}
