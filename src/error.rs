//! Error types for the paperpress library.
//!
//! Failures carry two independent dimensions:
//!
//! * [`ConvertError::code`] — **Internal**: a stable machine label
//!   (`JOB_CREATE_FAILED`, `TRANSIENT`, …) used in logs and metrics so
//!   operators can grep for a failure class across releases.
//!
//! * [`ConvertError::reason`] — **Caller-facing**: collapses the full error
//!   surface into [`ConversionReason`], the contract callers branch on.
//!   A password-protected attachment and an unsupported format are both
//!   "skip this input, not our fault" conditions; an expired API key is not.
//!
//! Callers must never branch on HTTP status codes — the classifier in this
//! module is the single place where transport detail becomes meaning.

use thiserror::Error;

/// All errors returned by the paperpress library.
///
/// The sum is closed on purpose: every failure the conversion flow can
/// produce has a named variant, so exhaustive `match` in callers keeps
/// working when the transport layer changes underneath.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Classified service responses ──────────────────────────────────────
    /// The service rejected our credentials (HTTP 401/403), or the health
    /// gate failed the call before any request went out.
    ///
    /// Retrying cannot help; the health gate is opened so subsequent calls
    /// fail fast until a probe confirms recovery. `status` is `None` for the
    /// gate's own fail-fast error, which never saw a response.
    #[error("Conversion service rejected the call{}: {detail}\nCheck PAPERPRESS_API_KEY and the configured endpoint.", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Configuration {
        status: Option<u16>,
        detail: String,
    },

    /// The service cannot convert this input format (HTTP 415, or 422
    /// without a password indication).
    #[error("Unsupported input format: {detail}")]
    UnsupportedFormat { detail: String },

    /// The input exceeds the service's size limit (HTTP 413).
    #[error("Input too large for the conversion service: {detail}")]
    TooLarge { detail: String },

    /// The input is password-protected or encrypted (HTTP 422 with a
    /// password keyword in the body).
    #[error("Input is password-protected: {detail}")]
    PasswordProtected { detail: String },

    /// A failure worth retrying: rate limit, request timeout, gateway
    /// timeout, server error, or a transport-level error.
    ///
    /// `status` is `None` when the request never produced a response
    /// (connect failure, client-side timeout).
    #[error("Transient conversion service failure{}: {detail}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transient { status: Option<u16>, detail: String },

    /// Any other non-retryable service response (4xx outside the table).
    #[error("Conversion service error (HTTP {status}): {detail}")]
    Api { status: u16, detail: String },

    // ── Job lifecycle errors ──────────────────────────────────────────────
    /// `POST /jobs` returned 2xx but the payload is unusable (no job id,
    /// or an error-shaped body). Resubmitting the same graph will not help.
    #[error("Job creation failed: {detail}")]
    JobCreateFailed { detail: String },

    /// The job reached the `error` terminal state. `detail` concatenates
    /// one `name: message` line per failed task.
    #[error("Job '{job_id}' failed:\n{detail}")]
    JobFailed { job_id: String, detail: String },

    /// The job did not reach a terminal state within the configured
    /// completion timeout. The remote job is abandoned, not cancelled.
    #[error("Job '{job_id}' did not finish within {}", fmt_window(.timeout_ms))]
    JobTimeout { job_id: String, timeout_ms: u64 },

    /// An export task finished but its result carries no file URL.
    #[error("Export task '{task_id}' finished without a download URL")]
    MissingDownloadUrl { task_id: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed, or the call was malformed (e.g. an empty
    /// input list).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Protocol errors ───────────────────────────────────────────────────
    /// The service answered with a shape this client does not understand
    /// (missing task, missing upload form, undecodable JSON).
    #[error("Unexpected response from the conversion service: {0}")]
    Protocol(String),
}

impl ConvertError {
    /// Collapse this error into the caller-facing outcome contract.
    pub fn reason(&self) -> ConversionReason {
        match self {
            ConvertError::UnsupportedFormat { .. } => ConversionReason::SkippedUnsupported,
            ConvertError::TooLarge { .. } => ConversionReason::SkippedTooLarge,
            ConvertError::PasswordProtected { .. } => ConversionReason::SkippedPasswordProtected,
            _ => ConversionReason::Error,
        }
    }

    /// Whether the retry executor may re-attempt the failed request.
    ///
    /// Only [`ConvertError::Transient`] qualifies. Everything else either
    /// cannot succeed on retry (auth, bad input, malformed graph) or is a
    /// final verdict about the job itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConvertError::Transient { .. })
    }

    /// Stable machine label for logs. Grep-friendly, never shown to users.
    pub fn code(&self) -> &'static str {
        match self {
            ConvertError::Configuration { .. } => "CONFIGURATION",
            ConvertError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            ConvertError::TooLarge { .. } => "TOO_LARGE",
            ConvertError::PasswordProtected { .. } => "PASSWORD_PROTECTED",
            ConvertError::Transient { .. } => "TRANSIENT",
            ConvertError::Api { .. } => "API_ERROR",
            ConvertError::JobCreateFailed { .. } => "JOB_CREATE_FAILED",
            ConvertError::JobFailed { .. } => "JOB_FAILED",
            ConvertError::JobTimeout { .. } => "JOB_TIMEOUT",
            ConvertError::MissingDownloadUrl { .. } => "MISSING_DOWNLOAD_URL",
            ConvertError::InvalidConfig(_) => "INVALID_CONFIG",
            ConvertError::Protocol(_) => "PROTOCOL",
        }
    }

    /// The job id this error refers to, when one exists yet.
    pub fn job_id(&self) -> Option<&str> {
        match self {
            ConvertError::JobFailed { job_id, .. } | ConvertError::JobTimeout { job_id, .. } => {
                Some(job_id)
            }
            _ => None,
        }
    }

    /// The task id this error refers to, when one is attributable.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            ConvertError::MissingDownloadUrl { task_id } => Some(task_id),
            _ => None,
        }
    }
}

/// Caller-facing outcome of a conversion attempt.
///
/// Callers branch on this, never on HTTP status codes. The `Skipped*`
/// variants mean "this input can never convert, drop it without alarm";
/// [`ConversionReason::Error`] means "something went wrong, consider
/// requeueing". [`ConversionReason::Ok`] is the success marker used in
/// summaries and structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionReason {
    /// Conversion succeeded.
    Ok,
    /// The service cannot handle this format.
    SkippedUnsupported,
    /// The input exceeds the service size limit.
    SkippedTooLarge,
    /// The input is password-protected.
    SkippedPasswordProtected,
    /// Any other failure.
    Error,
}

impl ConversionReason {
    /// `true` for the benign skip outcomes.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            ConversionReason::SkippedUnsupported
                | ConversionReason::SkippedTooLarge
                | ConversionReason::SkippedPasswordProtected
        )
    }
}

/// Longest body excerpt carried inside an error detail. Service error
/// bodies are occasionally full HTML pages; logs do not need them.
const DETAIL_MAX: usize = 300;

pub(crate) fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "(empty body)".to_string();
    }
    match trimmed.char_indices().nth(DETAIL_MAX) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Render a millisecond window the way a human reads it: whole seconds
/// as `45s`, anything finer as `300ms`.
fn fmt_window(ms: &u64) -> String {
    if *ms > 0 && ms % 1000 == 0 {
        format!("{}s", ms / 1000)
    } else {
        format!("{ms}ms")
    }
}

/// Map a non-2xx service response to its error class.
///
/// This is the classification table the whole crate routes through:
///
/// | Status        | Class                                        |
/// |---------------|----------------------------------------------|
/// | 401, 403      | `Configuration` (opens the health gate)      |
/// | 415           | `UnsupportedFormat`                          |
/// | 422           | `PasswordProtected` if the body mentions a password, else `UnsupportedFormat` |
/// | 413           | `TooLarge`                                   |
/// | 408, 429, 504 | `Transient` (retryable)                      |
/// | other ≥ 500   | `Transient` (retryable)                      |
/// | other  < 500  | `Api` (non-retryable)                        |
pub(crate) fn classify_response(status: reqwest::StatusCode, body: &str) -> ConvertError {
    let code = status.as_u16();
    let detail = excerpt(body);
    match code {
        401 | 403 => ConvertError::Configuration {
            status: Some(code),
            detail,
        },
        415 => ConvertError::UnsupportedFormat { detail },
        422 => {
            // The service reports both "can't parse this format" and
            // "file is encrypted" as 422; only the body tells them apart.
            let lower = body.to_lowercase();
            if lower.contains("password") || lower.contains("encrypted") {
                ConvertError::PasswordProtected { detail }
            } else {
                ConvertError::UnsupportedFormat { detail }
            }
        }
        413 => ConvertError::TooLarge { detail },
        408 | 429 | 504 => ConvertError::Transient {
            status: Some(code),
            detail,
        },
        c if c >= 500 => ConvertError::Transient {
            status: Some(code),
            detail,
        },
        _ => ConvertError::Api {
            status: code,
            detail,
        },
    }
}

/// Map a transport-level failure (no usable response) to its error class.
///
/// Timeouts and connect failures are retryable almost by definition; body
/// decode failures mid-stream get the same treatment since re-requesting
/// is the only recovery available.
pub(crate) fn map_transport_error(err: reqwest::Error) -> ConvertError {
    let detail = if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        format!("transport error: {err}")
    };
    ConvertError::Transient {
        status: None,
        detail,
    }
}
