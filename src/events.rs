//! Event-sink trait for job lifecycle notifications.
//!
//! Inject an [`Arc<dyn EventSink>`] via
//! [`crate::config::ConverterConfigBuilder::event_sink`] to observe job
//! outcomes as they happen: alerting on repeated create failures, counting
//! conversions per tenant, driving a progress display.
//!
//! # Why a sink instead of return values?
//!
//! The caller of [`crate::convert::Converter::convert_to_pdf`] already gets
//! the outcome as a `Result`. The sink exists for the *other* audience —
//! monitoring — so that alerting side-effects do not have to live inside
//! error-handling code paths. The library calls the sink at the moment an
//! outcome is known; what to do with it (page someone, bump a counter,
//! tick a progress bar) stays in the host application.
//!
//! # Example
//!
//! ```rust
//! use paperpress::{ConverterConfig, EventSink};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct CountingSink {
//!     failures: AtomicUsize,
//! }
//!
//! impl EventSink for CountingSink {
//!     fn on_job_failed(&self, job_id: &str, error: &paperpress::ConvertError) {
//!         self.failures.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("job {job_id} failed: {error}");
//!     }
//! }
//!
//! let config = ConverterConfig::builder()
//!     .api_key("live_key".to_string())
//!     .event_sink(Arc::new(CountingSink::default()))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

use crate::error::ConvertError;

/// Called by the orchestrator as jobs reach their outcomes.
///
/// Implementations must be `Send + Sync`; a converter may serve concurrent
/// calls, so methods can fire from different tasks. All methods have
/// default no-op implementations so callers only override what they care
/// about. Implementations should return quickly — they run inline on the
/// conversion path.
pub trait EventSink: Send + Sync {
    /// Called when job creation fails and no job id exists yet.
    ///
    /// Inspect [`ConvertError::code`] and [`ConvertError::reason`] to
    /// decide severity; a `CONFIGURATION` code here usually deserves a
    /// page, a `TRANSIENT` one a counter.
    fn on_job_create_failed(&self, error: &ConvertError) {
        let _ = error;
    }

    /// Called when a created job ends in failure: task errors, timeout,
    /// or an unusable result set.
    fn on_job_failed(&self, job_id: &str, error: &ConvertError) {
        let _ = (job_id, error);
    }

    /// Called when a job completes and every output was downloaded.
    ///
    /// # Arguments
    /// * `job_id`     — service-assigned job identifier
    /// * `file_count` — number of PDFs produced (equals the input count)
    /// * `elapsed_ms` — wall-clock duration of the whole conversion call
    fn on_job_succeeded(&self, job_id: &str, file_count: usize, elapsed_ms: u64) {
        let _ = (job_id, file_count, elapsed_ms);
    }
}

/// A no-op implementation for callers that don't need lifecycle events.
///
/// This is the default when no sink is configured.
pub struct NoopEventSink;

impl EventSink for NoopEventSink {}

/// Convenience alias matching the type stored in [`crate::config::ConverterConfig`].
pub type SharedEventSink = Arc<dyn EventSink>;
