//! Caller-facing input model.
//!
//! A conversion call takes a list of [`ConversionInput`]s — either an HTML
//! body (an email, a report fragment) or raw file bytes with their MIME
//! type. The input also determines which conversion engine the job asks
//! for: HTML renders through a headless browser, office documents through
//! the office converter, images through imagemagick. Unknown formats leave
//! the choice to the service.

use std::fmt;

/// One document to convert. Owned; the orchestrator clones the payload per
/// upload attempt, so buffers should be handed over rather than shared.
#[derive(Clone)]
pub enum ConversionInput {
    /// An HTML body, uploaded as UTF-8 `text/html`.
    Html { filename: String, html: String },
    /// Arbitrary file bytes with an explicit MIME type.
    File {
        filename: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

impl ConversionInput {
    /// HTML input with a display filename (extension optional; the output
    /// is re-extensioned to `.pdf` regardless).
    pub fn html(filename: impl Into<String>, html: impl Into<String>) -> Self {
        ConversionInput::Html {
            filename: filename.into(),
            html: html.into(),
        }
    }

    /// File input from bytes already in memory.
    pub fn file(
        filename: impl Into<String>,
        mime: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        ConversionInput::File {
            filename: filename.into(),
            mime: mime.into(),
            bytes,
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            ConversionInput::Html { filename, .. } => filename,
            ConversionInput::File { filename, .. } => filename,
        }
    }

    /// MIME type sent with the upload.
    pub fn mime(&self) -> &str {
        match self {
            ConversionInput::Html { .. } => "text/html",
            ConversionInput::File { mime, .. } => mime,
        }
    }

    pub fn size_bytes(&self) -> usize {
        match self {
            ConversionInput::Html { html, .. } => html.len(),
            ConversionInput::File { bytes, .. } => bytes.len(),
        }
    }

    /// Upload payload. Owned copy per call — retried uploads rebuild the
    /// multipart form from scratch.
    pub(crate) fn payload(&self) -> Vec<u8> {
        match self {
            ConversionInput::Html { html, .. } => html.clone().into_bytes(),
            ConversionInput::File { bytes, .. } => bytes.clone(),
        }
    }
}

// Payloads can be megabytes; Debug prints sizes, not contents.
impl fmt::Debug for ConversionInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionInput::Html { filename, html } => f
                .debug_struct("Html")
                .field("filename", filename)
                .field("html_len", &html.len())
                .finish(),
            ConversionInput::File {
                filename,
                mime,
                bytes,
            } => f
                .debug_struct("File")
                .field("filename", filename)
                .field("mime", mime)
                .field("bytes_len", &bytes.len())
                .finish(),
        }
    }
}

/// Engine requested in the convert task for a given input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConvertEngine {
    /// Headless-browser rendering for HTML.
    Chrome,
    /// Word-processor documents.
    Office,
    /// Raster images.
    ImageMagick,
    /// Omit the engine field; the service picks.
    ServiceDefault,
}

impl ConvertEngine {
    /// Wire value for the `engine` field, `None` when the field is omitted.
    pub(crate) fn wire_name(self) -> Option<&'static str> {
        match self {
            ConvertEngine::Chrome => Some("chrome"),
            ConvertEngine::Office => Some("office"),
            ConvertEngine::ImageMagick => Some("imagemagick"),
            ConvertEngine::ServiceDefault => None,
        }
    }
}

/// Word-processor MIME types routed to the office engine.
const OFFICE_MIMES: &[&str] = &[
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.oasis.opendocument.text",
    "application/rtf",
    "text/rtf",
];

pub(crate) fn engine_for(input: &ConversionInput) -> ConvertEngine {
    match input {
        ConversionInput::Html { .. } => ConvertEngine::Chrome,
        ConversionInput::File { mime, .. } => engine_for_mime(mime),
    }
}

/// MIME-family routing. Parameters (`; charset=...`) and case are ignored.
fn engine_for_mime(mime: &str) -> ConvertEngine {
    let essence = mime
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    if essence == "text/html" || essence == "application/xhtml+xml" {
        ConvertEngine::Chrome
    } else if OFFICE_MIMES.contains(&essence.as_str()) {
        ConvertEngine::Office
    } else if essence.starts_with("image/") {
        ConvertEngine::ImageMagick
    } else {
        ConvertEngine::ServiceDefault
    }
}
