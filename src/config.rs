//! Configuration types for the conversion client.
//!
//! All behaviour is controlled through [`ConverterConfig`], built via its
//! [`ConverterConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share a setup across tasks, log it (the API key is redacted
//! in `Debug`), and diff two runs to understand why their outcomes differ.
//!
//! # Design choice: builder over constructor
//! A twelve-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConvertError;
use crate::events::{EventSink, NoopEventSink};
use crate::health::HealthGate;
use crate::retry::RetryPolicy;

/// Which deployment of the conversion service to talk to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Endpoint {
    /// The paid production deployment (default).
    #[default]
    Production,
    /// The free sandbox deployment: identical API, watermarked output.
    Sandbox,
    /// An explicit base URL, mainly for tests against a mock server.
    Custom(String),
}

impl Endpoint {
    /// Base URL without a trailing slash; paths are appended verbatim.
    pub fn base_url(&self) -> &str {
        match self {
            Endpoint::Production => "https://api.paperpress.io/v2",
            Endpoint::Sandbox => "https://api.sandbox.paperpress.io/v2",
            Endpoint::Custom(url) => url.trim_end_matches('/'),
        }
    }
}

/// Configuration for a [`crate::convert::Converter`].
///
/// Built via [`ConverterConfig::builder()`] or, for the common env-driven
/// setup, [`ConverterConfig::from_env()`].
///
/// # Example
/// ```rust
/// use paperpress::ConverterConfig;
///
/// let config = ConverterConfig::builder()
///     .api_key("live_abc123")
///     .concurrency(4)
///     .completion_timeout_secs(60)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConverterConfig {
    /// Bearer token for the job API. Required; `build()` rejects an empty
    /// key. Never logged — `Debug` prints a redaction marker.
    pub api_key: String,

    /// Service deployment. Default: [`Endpoint::Production`].
    pub endpoint: Endpoint,

    /// Per-request network timeout. Default: 30 s.
    ///
    /// This bounds a single HTTP exchange, not the whole conversion; a
    /// request that hits this limit classifies as transient and retries.
    pub request_timeout: Duration,

    /// Pause between job status polls. Default: 1500 ms.
    ///
    /// Conversions routinely take several seconds; polling faster burns
    /// rate-limit budget without finishing any sooner.
    pub poll_interval: Duration,

    /// How long a job may run before the client gives up. Default: 45 s.
    ///
    /// On expiry the call fails with `JOB_TIMEOUT` and the remote job is
    /// abandoned (not cancelled). Raise this for large office documents.
    pub completion_timeout: Duration,

    /// Total attempts per service request, the first try included.
    /// Default: 3.
    ///
    /// Each call site gets its own budget: job creation, every upload, and
    /// every status poll count their attempts independently. Non-retryable
    /// failures (bad key, unsupported format) surface on the first attempt
    /// regardless of this setting.
    pub max_retries: u32,

    /// Backoff unit for retries. Default: 500 ms.
    ///
    /// Delays double per attempt (500 ms → 1 s → 2 s) with up to one base
    /// unit of random jitter added, so concurrent workers do not retry in
    /// lockstep against a recovering endpoint.
    pub retry_base_delay: Duration,

    /// Hard ceiling on a single retry delay. Default: 8 s.
    pub retry_max_delay: Duration,

    /// Concurrent result downloads per conversion call. Default: 8.
    ///
    /// Uploads always fan out across all inputs; this knob bounds the
    /// download phase, where PDF payloads are largest.
    pub concurrency: usize,

    /// Pin the HTML rendering engine version (e.g. `"130"`). Default: None.
    ///
    /// Unpinned jobs track the service's current browser build, which can
    /// shift page breaks between runs. Pin when byte-stable rendering
    /// matters more than engine updates.
    pub engine_version: Option<String>,

    /// Correlation tag attached to every created job and echoed back by
    /// the service. Default: None.
    pub tag: Option<String>,

    /// Receiver for job lifecycle events. Default: a no-op sink.
    pub event_sink: Arc<dyn EventSink>,

    /// Shared health gate. Default: a fresh gate, healthy.
    ///
    /// Hand the same gate to several converters to make them share fate:
    /// one discovering a revoked key fails the rest fast.
    pub health: HealthGate,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: Endpoint::default(),
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(1500),
            completion_timeout: Duration::from_secs(45),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
            retry_max_delay: Duration::from_secs(8),
            concurrency: 8,
            engine_version: None,
            tag: None,
            event_sink: Arc::new(NoopEventSink),
            health: HealthGate::default(),
        }
    }
}

impl fmt::Debug for ConverterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("request_timeout", &self.request_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("completion_timeout", &self.completion_timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("retry_max_delay", &self.retry_max_delay)
            .field("concurrency", &self.concurrency)
            .field("engine_version", &self.engine_version)
            .field("tag", &self.tag)
            .field("event_sink", &"<dyn EventSink>")
            .finish()
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a configuration from environment variables:
    ///
    /// * `PAPERPRESS_API_KEY` — required
    /// * `PAPERPRESS_SANDBOX` — `1`/`true`/`yes` selects the sandbox
    /// * `PAPERPRESS_TIMEOUT_MS` — request timeout override
    /// * `PAPERPRESS_ENGINE_VERSION` — HTML engine pin
    pub fn from_env() -> Result<Self, ConvertError> {
        let mut builder = Self::builder();

        match std::env::var("PAPERPRESS_API_KEY") {
            Ok(key) => builder = builder.api_key(key),
            Err(_) => {
                return Err(ConvertError::InvalidConfig(
                    "PAPERPRESS_API_KEY is not set".into(),
                ))
            }
        }

        if let Ok(flag) = std::env::var("PAPERPRESS_SANDBOX") {
            builder = builder.sandbox(matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            ));
        }

        if let Ok(raw) = std::env::var("PAPERPRESS_TIMEOUT_MS") {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                ConvertError::InvalidConfig(format!(
                    "PAPERPRESS_TIMEOUT_MS must be an integer, got '{raw}'"
                ))
            })?;
            builder = builder.request_timeout_ms(ms);
        }

        if let Ok(version) = std::env::var("PAPERPRESS_ENGINE_VERSION") {
            if !version.trim().is_empty() {
                builder = builder.engine_version(version.trim());
            }
        }

        builder.build()
    }

    /// Retry shape for service requests, derived from the config fields.
    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_base_delay, self.retry_max_delay)
    }

    /// Shared by `build()` and `Converter::new` so a hand-assembled config
    /// goes through the same checks as a built one.
    pub(crate) fn validate(&self) -> Result<(), ConvertError> {
        if self.api_key.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "API key must not be empty".into(),
            ));
        }
        if let Endpoint::Custom(url) = &self.endpoint {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConvertError::InvalidConfig(format!(
                    "custom endpoint must be an http(s) URL, got '{url}'"
                )));
            }
        }
        if self.retry_max_delay < self.retry_base_delay {
            return Err(ConvertError::InvalidConfig(
                "retry_max_delay must be at least retry_base_delay".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.config.endpoint = endpoint;
        self
    }

    /// Convenience toggle between [`Endpoint::Sandbox`] and
    /// [`Endpoint::Production`].
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.config.endpoint = if sandbox {
            Endpoint::Sandbox
        } else {
            Endpoint::Production
        };
        self
    }

    pub fn request_timeout_ms(mut self, ms: u64) -> Self {
        self.config.request_timeout = Duration::from_millis(ms.max(100));
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval = Duration::from_millis(ms.max(50));
        self
    }

    pub fn completion_timeout_secs(mut self, secs: u64) -> Self {
        self.config.completion_timeout = Duration::from_secs(secs.max(1));
        self
    }

    /// Sub-second completion timeout, for tests.
    pub fn completion_timeout_ms(mut self, ms: u64) -> Self {
        self.config.completion_timeout = Duration::from_millis(ms.max(10));
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.max(1);
        self
    }

    pub fn retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_base_delay = Duration::from_millis(ms);
        self
    }

    pub fn retry_max_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_max_delay = Duration::from_millis(ms);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.clamp(1, 64);
        self
    }

    pub fn engine_version(mut self, version: impl Into<String>) -> Self {
        self.config.engine_version = Some(version.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.config.tag = Some(tag.into());
        self
    }

    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.config.event_sink = sink;
        self
    }

    pub fn health_gate(mut self, gate: HealthGate) -> Self {
        self.config.health = gate;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ConvertError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
