//! Job status polling until a terminal state or the completion timeout.
//!
//! Polling is strictly sequential — one in-flight status request, a fixed
//! pause, repeat. Conversions take seconds; polling harder only spends
//! rate-limit budget. The deadline is wall-clock: the error is raised at
//! or after the configured timeout, never before, and the remote job is
//! left to finish on its own (abandoned, not cancelled).

use std::time::Instant;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::client::ApiClient;
use crate::config::ConverterConfig;
use crate::error::ConvertError;
use crate::job::{ApiEnvelope, ConversionJob, JobStatus};
use crate::retry::with_retries;

/// Poll `GET /jobs/{id}` until the job finishes, errors, or the timeout
/// elapses. Each status request carries its own transient-retry budget.
pub(crate) async fn wait_for_completion(
    client: &ApiClient,
    config: &ConverterConfig,
    job_id: &str,
) -> Result<ConversionJob, ConvertError> {
    let started = Instant::now();
    let deadline = started + config.completion_timeout;
    let path = format!("/jobs/{job_id}");
    let path_ref = path.as_str();
    let policy = config.retry_policy();

    loop {
        let envelope: ApiEnvelope<ConversionJob> =
            with_retries(&policy, "job status", move || async move {
                client.get_json(path_ref).await
            })
            .await?;
        let job = envelope.data;

        match job.status {
            JobStatus::Finished => {
                info!(
                    job_id = %job.id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "job finished"
                );
                return Ok(job);
            }
            JobStatus::Error => {
                let detail = job.failure_summary();
                return Err(ConvertError::JobFailed {
                    job_id: job.id,
                    detail,
                });
            }
            JobStatus::Waiting | JobStatus::Processing => {
                debug!(job_id = %job.id, status = ?job.status, "job still running");
            }
        }

        if Instant::now() >= deadline {
            return Err(ConvertError::JobTimeout {
                job_id: job_id.to_string(),
                timeout_ms: config.completion_timeout.as_millis() as u64,
            });
        }
        sleep(config.poll_interval).await;
    }
}
