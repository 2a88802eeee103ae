use serde::{Deserialize, Serialize};

use crate::types::{BlobSource, ImageFormat};

/// An image content block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageBlock {
    /// The image format.
    pub format: ImageFormat,

    /// The image bytes.
    pub source: BlobSource,
}

impl ImageBlock {
    /// Create a new `ImageBlock`.
    pub fn new(format: ImageFormat, source: BlobSource) -> Self {
        Self { format, source }
    }
}
