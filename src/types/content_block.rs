use serde::{Deserialize, Serialize};

use crate::types::{CachePointBlock, DocumentBlock, ImageBlock};

/// A block of content in a message.
///
/// Blocks are externally tagged on the wire: `{"text": "..."}`,
/// `{"image": {...}}`, `{"document": {...}}`, `{"cachePoint": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ContentBlock {
    /// A block of text content
    Text(String),

    /// An image block
    Image(ImageBlock),

    /// A document block
    Document(DocumentBlock),

    /// A cache boundary marker
    CachePoint(CachePointBlock),
}

impl ContentBlock {
    /// Create a text block.
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text(text.into())
    }

    /// Create a default cache point.
    pub fn cache_point() -> Self {
        ContentBlock::CachePoint(CachePointBlock::new())
    }

    /// Returns true if this block is a text block
    pub fn is_text(&self) -> bool {
        matches!(self, ContentBlock::Text(_))
    }

    /// Returns true if this block is an image block
    pub fn is_image(&self) -> bool {
        matches!(self, ContentBlock::Image(_))
    }

    /// Returns true if this block is a document block
    pub fn is_document(&self) -> bool {
        matches!(self, ContentBlock::Document(_))
    }

    /// Returns true if this block is a cache point
    pub fn is_cache_point(&self) -> bool {
        matches!(self, ContentBlock::CachePoint(_))
    }

    /// Returns the text if this is a Text variant, or None otherwise.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns a reference to the inner DocumentBlock if this is a Document variant,
    /// or None otherwise.
    pub fn as_document(&self) -> Option<&DocumentBlock> {
        match self {
            ContentBlock::Document(block) => Some(block),
            _ => None,
        }
    }
}

/// A block in the system section of a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SystemContentBlock {
    /// System prompt text
    Text(String),

    /// A cache boundary marker after the system prompt
    CachePoint(CachePointBlock),
}

impl SystemContentBlock {
    /// Returns true if this block is a cache point
    pub fn is_cache_point(&self) -> bool {
        matches!(self, SystemContentBlock::CachePoint(_))
    }
}
