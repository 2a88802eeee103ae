//! Turning raw uploads into provider-ready attachments.

use std::path::Path;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::types::{Attachment, AttachmentFormat, DocumentFormat, ImageFormat};

/// Extensions accepted at the upload boundary.
pub const UPLOAD_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "pdf", "csv", "doc", "docx", "xls", "xlsx", "html",
    "txt", "md",
];

/// Name used when sanitizing leaves nothing behind.
pub const PLACEHOLDER_NAME: &str = "document";

/// Normalize an upload into an [`Attachment`].
///
/// The MIME type decides between image and document; the file extension
/// decides the format, falling back to jpeg for images and txt for documents.
/// Documents get a sanitized name and inherit `cache_documents`; images are
/// never cached.
pub fn normalize(
    bytes: impl Into<Bytes>,
    filename: &str,
    mime_type: &str,
    cache_documents: bool,
) -> Attachment {
    let extension = extension_of(filename);
    if mime_type.starts_with("image/") {
        let format = ImageFormat::from_extension(&extension).unwrap_or(ImageFormat::Jpeg);
        Attachment::new(
            AttachmentFormat::Image(format),
            filename,
            filename,
            bytes,
            false,
        )
    } else {
        let format = DocumentFormat::from_extension(&extension).unwrap_or(DocumentFormat::Txt);
        Attachment::new(
            AttachmentFormat::Document(format),
            sanitize_name(filename),
            filename,
            bytes,
            cache_documents,
        )
    }
}

/// Sanitize a file name for use as a document name.
///
/// Every character other than ASCII alphanumerics, whitespace, `-`, `(`, `)`,
/// `[` and `]` becomes a space, whitespace runs collapse to a single space,
/// and the result is trimmed.  An empty result becomes `document`.
pub fn sanitize_name(filename: &str) -> String {
    let mut name = String::with_capacity(filename.len());
    let mut in_space = false;
    for c in filename.chars() {
        let keep = c.is_ascii_alphanumeric() || matches!(c, '-' | '(' | ')' | '[' | ']');
        if keep {
            name.push(c);
            in_space = false;
        } else if !in_space {
            name.push(' ');
            in_space = true;
        }
    }
    let name = name.trim();
    if name.is_empty() {
        PLACEHOLDER_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// The lower-cased text after the last `.`, or the whole name without one.
pub fn extension_of(filename: &str) -> String {
    filename
        .rsplit('.')
        .next()
        .unwrap_or(filename)
        .to_ascii_lowercase()
}

/// Guess a MIME type from a lower-cased extension.
pub fn mime_type_for_extension(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "html" => "text/html",
        "md" => "text/markdown",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

impl Attachment {
    /// Read a file from disk and normalize it.
    ///
    /// Files whose extension is not in [`UPLOAD_EXTENSIONS`] are rejected
    /// before they are read.
    pub fn from_path(path: impl AsRef<Path>, cache_documents: bool) -> Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::validation(
                    format!("{} is not a file name", path.display()),
                    Some("path".to_string()),
                )
            })?;
        let extension = extension_of(filename);
        if !UPLOAD_EXTENSIONS.contains(&extension.as_str()) {
            return Err(Error::validation(
                format!(
                    "unsupported file type {extension:?}; expected one of {}",
                    UPLOAD_EXTENSIONS.join(", ")
                ),
                Some("path".to_string()),
            ));
        }
        let bytes = std::fs::read(path)
            .map_err(|err| Error::io(format!("could not read {}", path.display()), err))?;
        let mime_type = mime_type_for_extension(&extension);
        Ok(normalize(bytes, filename, mime_type, cache_documents))
    }
}
