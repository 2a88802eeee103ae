use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Inline binary content for image and document blocks.
///
/// The bytes are base64 encoded on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlobSource {
    /// The raw content.
    #[serde(with = "crate::utils::base64_bytes")]
    pub bytes: Bytes,
}

impl BlobSource {
    /// Create a new `BlobSource` sharing the given buffer.
    pub fn new(bytes: Bytes) -> Self {
        Self { bytes }
    }
}
