//! Caller-facing output model.
//!
//! A successful conversion returns one [`ConvertedFile`] per input, in
//! input order, plus phase timings. Consumers get finished PDF buffers
//! and never see job or task internals; the only service detail that
//! survives is the id trail in [`FileMeta`] for support tickets.

use std::fmt;
use std::path::Path;

use serde::Serialize;

/// One produced PDF. `filename` is the input's name re-extensioned to
/// `.pdf`; the original name is kept in [`FileMeta`].
#[derive(Clone, Serialize)]
pub struct ConvertedFile {
    pub filename: String,
    /// Full PDF body. Not serialized; `--json` summaries and logs carry
    /// sizes only.
    #[serde(skip_serializing)]
    pub pdf_bytes: Vec<u8>,
    pub meta: FileMeta,
}

/// Provenance of a converted file.
#[derive(Debug, Clone, Serialize)]
pub struct FileMeta {
    pub original_filename: String,
    /// Size of the produced PDF in bytes.
    pub size: u64,
    /// Export task that produced this file, for correlating with service logs.
    pub task_id: String,
}

// Same rule as inputs: Debug prints sizes, never payloads.
impl fmt::Debug for ConvertedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertedFile")
            .field("filename", &self.filename)
            .field("pdf_len", &self.pdf_bytes.len())
            .field("meta", &self.meta)
            .finish()
    }
}

/// Wall-clock accounting for one conversion call, split by phase.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionStats {
    pub input_count: usize,
    pub file_count: usize,
    /// Sum of produced PDF sizes.
    pub total_bytes: u64,
    pub create_ms: u64,
    pub upload_ms: u64,
    pub poll_ms: u64,
    pub download_ms: u64,
    pub total_ms: u64,
}

/// Everything a successful [`crate::convert::Converter::convert_to_pdf`]
/// call produces.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    /// One entry per input, in input order.
    pub files: Vec<ConvertedFile>,
    pub job_id: String,
    pub stats: ConversionStats,
}

/// Replace the final extension with `.pdf` (`scan.tiff` → `scan.pdf`,
/// `notes` → `notes.pdf`). Empty names fall back to `document.pdf`.
pub(crate) fn pdf_file_name(original: &str) -> String {
    match Path::new(original).file_stem().and_then(|s| s.to_str()) {
        Some(stem) if !stem.is_empty() => format!("{stem}.pdf"),
        _ => "document.pdf".to_string(),
    }
}

/// PDF magic-byte check, used to flag suspicious downloads in logs.
pub(crate) fn is_pdf_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}
