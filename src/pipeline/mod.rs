//! Pipeline stages for one conversion call.
//!
//! Each submodule implements exactly one stage of the job lifecycle.
//! Keeping stages separate makes each independently testable and keeps the
//! retry budgets honest: every stage wraps its own requests, so an upload
//! that burned its attempts never consumes the poll loop's.
//!
//! ## Flow
//!
//! ```text
//! create ──▶ upload ──▶ poll ──▶ download
//! (POST /jobs) (multipart) (GET /jobs/{id}) (pre-signed URLs)
//! ```
//!
//! 1. [`create`]   — build the import/convert/export task graph and submit it
//! 2. [`upload`]   — push every input's bytes to its import-task form, concurrently
//! 3. [`poll`]     — watch the job until it finishes, errors, or times out
//! 4. [`download`] — fetch every export's PDF and restore input order

pub(crate) mod create;
pub(crate) mod download;
pub(crate) mod poll;
pub(crate) mod upload;
