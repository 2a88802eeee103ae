use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// The broad kind of an attachment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    /// An image sent as an image content block.
    Image,
    /// Any other file, sent as a document content block.
    Document,
}

/// Image formats understood by the provider.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// JPEG image.
    Jpeg,
    /// PNG image.
    Png,
    /// GIF image.
    Gif,
    /// WebP image.
    Webp,
}

impl ImageFormat {
    /// Maps a lower-cased file extension to an image format.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "gif" => Some(ImageFormat::Gif),
            "webp" => Some(ImageFormat::Webp),
            _ => None,
        }
    }

    /// The provider tag for this format.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }
}

/// Document formats understood by the provider.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// Comma-separated values.
    Csv,
    /// Legacy Word document.
    Doc,
    /// Word document.
    Docx,
    /// Legacy Excel workbook.
    Xls,
    /// Excel workbook.
    Xlsx,
    /// HTML page.
    Html,
    /// Plain text.
    Txt,
    /// Markdown.
    Md,
}

impl DocumentFormat {
    /// Maps a lower-cased file extension to a document format.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "pdf" => Some(DocumentFormat::Pdf),
            "csv" => Some(DocumentFormat::Csv),
            "doc" => Some(DocumentFormat::Doc),
            "docx" => Some(DocumentFormat::Docx),
            "xls" => Some(DocumentFormat::Xls),
            "xlsx" => Some(DocumentFormat::Xlsx),
            "html" => Some(DocumentFormat::Html),
            "txt" => Some(DocumentFormat::Txt),
            "md" => Some(DocumentFormat::Md),
            _ => None,
        }
    }

    /// The provider tag for this format.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Csv => "csv",
            DocumentFormat::Doc => "doc",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Xls => "xls",
            DocumentFormat::Xlsx => "xlsx",
            DocumentFormat::Html => "html",
            DocumentFormat::Txt => "txt",
            DocumentFormat::Md => "md",
        }
    }
}

/// The provider format of an attachment, which also fixes its kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AttachmentFormat {
    /// An image in the given format.
    Image(ImageFormat),
    /// A document in the given format.
    Document(DocumentFormat),
}

impl fmt::Display for AttachmentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentFormat::Image(format) => write!(f, "{}", format.as_str()),
            AttachmentFormat::Document(format) => write!(f, "{}", format.as_str()),
        }
    }
}

/// A single uploaded file bound to a user turn.
///
/// Attachments are immutable.  The bytes live in a reference-counted buffer so
/// every request that resubmits the history shares the original upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    format: AttachmentFormat,
    name: String,
    original_name: String,
    bytes: Bytes,
    cached: bool,
}

impl Attachment {
    /// Create a new attachment.
    ///
    /// Outside the crate, attachments come from [`crate::normalize`], which
    /// derives the format and the sanitized name from the upload.
    pub(crate) fn new(
        format: AttachmentFormat,
        name: impl Into<String>,
        original_name: impl Into<String>,
        bytes: impl Into<Bytes>,
        cached: bool,
    ) -> Self {
        Self {
            format,
            name: name.into(),
            original_name: original_name.into(),
            bytes: bytes.into(),
            cached,
        }
    }

    /// Image or document.
    pub fn kind(&self) -> AttachmentKind {
        match self.format {
            AttachmentFormat::Image(_) => AttachmentKind::Image,
            AttachmentFormat::Document(_) => AttachmentKind::Document,
        }
    }

    /// The provider format.
    pub fn format(&self) -> AttachmentFormat {
        self.format
    }

    /// The name sent to the provider.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file name as uploaded, for display.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// The raw file contents.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Whether a cache point follows this attachment in requests.
    pub fn cached(&self) -> bool {
        self.cached
    }

    /// Set whether a cache point follows this attachment.
    ///
    /// Images are never cached; the flag only sticks to documents.
    pub fn with_cached(mut self, cached: bool) -> Self {
        self.cached = cached && self.kind() == AttachmentKind::Document;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_format() {
        let image = Attachment::new(
            AttachmentFormat::Image(ImageFormat::Png),
            "cat.png",
            "cat.png",
            Bytes::from_static(b"\x89PNG"),
            false,
        );
        assert_eq!(image.kind(), AttachmentKind::Image);

        let doc = Attachment::new(
            AttachmentFormat::Document(DocumentFormat::Pdf),
            "report pdf",
            "report.pdf",
            Bytes::from_static(b"%PDF"),
            true,
        );
        assert_eq!(doc.kind(), AttachmentKind::Document);
        assert!(doc.cached());
        assert_eq!(doc.format().to_string(), "pdf");
    }

    #[test]
    fn clones_share_bytes() {
        let doc = Attachment::new(
            AttachmentFormat::Document(DocumentFormat::Txt),
            "notes txt",
            "notes.txt",
            Bytes::from(vec![b'x'; 1024]),
            false,
        );
        let copy = doc.clone();
        assert_eq!(doc.bytes().as_ptr(), copy.bytes().as_ptr());
    }

    #[test]
    fn with_cached_only_marks_documents() {
        let doc = Attachment::new(
            AttachmentFormat::Document(DocumentFormat::Md),
            "notes md",
            "notes.md",
            Bytes::from_static(b"# hi"),
            false,
        );
        let doc = doc.with_cached(true);
        assert!(doc.cached());
        assert!(!doc.with_cached(false).cached());

        let image = Attachment::new(
            AttachmentFormat::Image(ImageFormat::Gif),
            "a.gif",
            "a.gif",
            Bytes::from_static(b"GIF89a"),
            false,
        );
        assert!(!image.with_cached(true).cached());
    }

    #[test]
    fn format_tags() {
        assert_eq!(ImageFormat::from_extension("jpg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("bmp"), None);
        assert_eq!(
            DocumentFormat::from_extension("xlsx"),
            Some(DocumentFormat::Xlsx)
        );
        assert_eq!(
            serde_json::to_string(&DocumentFormat::Docx).unwrap(),
            r#""docx""#
        );
    }
}
