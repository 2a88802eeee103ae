use serde::{Deserialize, Serialize};

use crate::types::{BlobSource, DocumentFormat};

/// A document content block.
///
/// The provider is strict about `name`: see [`crate::sanitize_name`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentBlock {
    /// The document format.
    pub format: DocumentFormat,

    /// The sanitized document name.
    pub name: String,

    /// The document bytes.
    pub source: BlobSource,
}

impl DocumentBlock {
    /// Create a new `DocumentBlock`.
    pub fn new(format: DocumentFormat, name: impl Into<String>, source: BlobSource) -> Self {
        Self {
            format,
            name: name.into(),
            source,
        }
    }
}
