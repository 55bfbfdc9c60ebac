//! Conversion entry point: the [`Converter`] facade.
//!
//! ## Why a facade?
//!
//! Callers hand over inputs and receive PDF buffers; everything in between
//! — task graph, uploads, polling, downloads, retries, the health gate —
//! stays behind [`Converter::convert_to_pdf`]. Downstream code never sees
//! job or task internals, so the service's job model can evolve without
//! touching callers.
//!
//! A `Converter` is cheap to keep around and safe to share across tasks:
//! it owns one HTTP connection pool, and concurrent calls create
//! independent jobs that need no coordination beyond the shared
//! [`HealthGate`].

use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::client::ApiClient;
use crate::config::ConverterConfig;
use crate::error::{excerpt, ConvertError};
use crate::health::HealthGate;
use crate::input::ConversionInput;
use crate::output::{ConversionResult, ConversionStats};
use crate::pipeline::{create, download, poll, upload};

/// Lightweight request the probe issues; exists on every deployment and
/// touches no job state.
const PROBE_PATH: &str = "/jobs?per_page=1";

/// Client for the conversion service. Construct once per credential set
/// and reuse; see [`crate::config::ConverterConfig`] for the knobs.
pub struct Converter {
    client: ApiClient,
    config: ConverterConfig,
}

impl Converter {
    /// Validate the configuration and build the HTTP client.
    pub fn new(config: ConverterConfig) -> Result<Self, ConvertError> {
        config.validate()?;
        let client = ApiClient::new(&config)?;
        Ok(Self { client, config })
    }

    /// The health gate this converter consults and updates.
    pub fn health(&self) -> &HealthGate {
        &self.config.health
    }

    /// Current gate verdict; `false` means calls fail before any network I/O.
    pub fn is_healthy(&self) -> bool {
        self.config.health.is_healthy()
    }

    /// Issue one authenticated, retry-free status request and record the
    /// verdict in the gate.
    ///
    /// Any failure — rejected credentials, unreachable host — leaves the
    /// gate open. Hosts should run this once at startup and treat an `Err`
    /// as advisory: the process stays up, conversions fail fast until a
    /// later probe succeeds.
    pub async fn probe(&self) -> Result<(), ConvertError> {
        match self.client.get_raw(PROBE_PATH).await {
            Ok((status, body)) => {
                if status.is_success() {
                    self.config.health.set_healthy(true);
                    debug!("health probe succeeded");
                    Ok(())
                } else {
                    self.config.health.set_healthy(false);
                    warn!(status = status.as_u16(), "health probe rejected");
                    Err(ConvertError::Configuration {
                        status: Some(status.as_u16()),
                        detail: excerpt(&body),
                    })
                }
            }
            Err(err) => {
                self.config.health.set_healthy(false);
                warn!(error = %err, "health probe could not reach the service");
                Err(err)
            }
        }
    }

    /// Convert every input to PDF through one remote job.
    ///
    /// All-or-nothing: the result carries exactly one file per input, in
    /// input order, or the call fails with the first error. Benign
    /// per-input conditions (unsupported format, password protection,
    /// oversize) surface through [`ConvertError::reason`] so callers can
    /// drop the offending input and requeue the rest.
    pub async fn convert_to_pdf(
        &self,
        inputs: &[ConversionInput],
    ) -> Result<ConversionResult, ConvertError> {
        let total_start = Instant::now();

        if inputs.is_empty() {
            return Err(ConvertError::InvalidConfig(
                "conversion requires at least one input".into(),
            ));
        }
        if !self.config.health.is_healthy() {
            debug!("health gate open, failing fast without network I/O");
            return Err(ConvertError::Configuration {
                status: None,
                detail: "conversion service marked unhealthy; waiting for a successful probe"
                    .into(),
            });
        }

        info!(inputs = inputs.len(), "starting conversion");

        // ── Step 1: Create the job ───────────────────────────────────────
        let create_start = Instant::now();
        let job = match create::create_job(&self.client, &self.config, inputs).await {
            Ok(job) => job,
            Err(err) => {
                error!(code = err.code(), error = %err, "job creation failed");
                self.config.event_sink.on_job_create_failed(&err);
                return Err(err);
            }
        };
        let create_ms = create_start.elapsed().as_millis() as u64;

        // ── Step 2: Upload every input ───────────────────────────────────
        let upload_start = Instant::now();
        upload::upload_all(&self.client, &self.config, &job, inputs)
            .await
            .map_err(|e| self.fail_job(&job.id, e))?;
        let upload_ms = upload_start.elapsed().as_millis() as u64;
        debug!(job_id = %job.id, upload_ms, "all inputs uploaded");

        // ── Step 3: Wait for completion ──────────────────────────────────
        let poll_start = Instant::now();
        let finished = poll::wait_for_completion(&self.client, &self.config, &job.id)
            .await
            .map_err(|e| self.fail_job(&job.id, e))?;
        let poll_ms = poll_start.elapsed().as_millis() as u64;

        // ── Step 4: Download the results ─────────────────────────────────
        let download_start = Instant::now();
        let files = download::download_all(&self.client, &self.config, &finished, inputs)
            .await
            .map_err(|e| self.fail_job(&job.id, e))?;
        let download_ms = download_start.elapsed().as_millis() as u64;

        // ── Step 5: Assemble the result ──────────────────────────────────
        let stats = ConversionStats {
            input_count: inputs.len(),
            file_count: files.len(),
            total_bytes: files.iter().map(|f| f.meta.size).sum(),
            create_ms,
            upload_ms,
            poll_ms,
            download_ms,
            total_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            job_id = %job.id,
            files = stats.file_count,
            total_bytes = stats.total_bytes,
            total_ms = stats.total_ms,
            "conversion complete"
        );
        self.config
            .event_sink
            .on_job_succeeded(&job.id, stats.file_count, stats.total_ms);

        Ok(ConversionResult {
            files,
            job_id: job.id,
            stats,
        })
    }

    /// Log and notify a post-creation failure, passing the error through.
    fn fail_job(&self, job_id: &str, err: ConvertError) -> ConvertError {
        if matches!(err, ConvertError::Configuration { .. }) {
            error!(job_id, code = err.code(), error = %err, "conversion failed");
        } else {
            warn!(job_id, code = err.code(), reason = ?err.reason(), error = %err, "conversion failed");
        }
        self.config.event_sink.on_job_failed(job_id, &err);
        err
    }
}
