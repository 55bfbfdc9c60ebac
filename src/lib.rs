//! # paperpress
//!
//! Convert HTML bodies, office documents, and images to PDF through a
//! remote job-based conversion service.
//!
//! ## Why this crate?
//!
//! Rendering arbitrary HTML and attachments to PDF locally means bundling
//! a browser, an office suite, and an image toolchain — and keeping all
//! three patched. This crate outsources the rendering to a conversion
//! service and concentrates on the part that is genuinely hard on the
//! client side: driving many inputs through one remote job reliably, with
//! layered retries, a health gate that fails fast during outages, and
//! bounded concurrency for the transfers.
//!
//! ## Pipeline Overview
//!
//! ```text
//! inputs (HTML / office / image)
//!  │
//!  ├─ 1. Create    POST /jobs with an import→convert→export chain per input
//!  ├─ 2. Upload    concurrent multipart uploads to presigned forms
//!  ├─ 3. Poll      GET /jobs/{id} until finished / error / timeout
//!  └─ 4. Download  concurrent fetches, PDFs returned in input order
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paperpress::{ConversionInput, Converter, ConverterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConverterConfig::builder()
//!         .api_key(std::env::var("PAPERPRESS_API_KEY")?)
//!         .build()?;
//!     let converter = Converter::new(config)?;
//!
//!     let inputs = vec![
//!         ConversionInput::html("welcome.html", "<h1>Hello</h1>"),
//!         ConversionInput::file("scan.png", "image/png", std::fs::read("scan.png")?),
//!     ];
//!     let result = converter.convert_to_pdf(&inputs).await?;
//!     for file in &result.files {
//!         std::fs::write(&file.filename, &file.pdf_bytes)?;
//!     }
//!     eprintln!("job {} done in {}ms", result.job_id, result.stats.total_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Outcome Handling
//!
//! Callers branch on [`ConvertError::reason`], never on HTTP status codes:
//! the `Skipped*` reasons mean an input can never convert (unsupported
//! format, password-protected, too large) and should be dropped without
//! alarm, while [`ConversionReason::Error`] is worth requeueing.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paperpress` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! paperpress = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod events;
pub mod health;
pub mod input;
pub mod output;
pub mod retry;

mod client;
mod job;
mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConverterConfig, ConverterConfigBuilder, Endpoint};
pub use convert::Converter;
pub use error::{ConversionReason, ConvertError};
pub use events::{EventSink, NoopEventSink, SharedEventSink};
pub use health::HealthGate;
pub use input::ConversionInput;
pub use output::{ConversionResult, ConversionStats, ConvertedFile, FileMeta};
pub use retry::RetryPolicy;
