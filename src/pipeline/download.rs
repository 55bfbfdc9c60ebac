//! Result downloads: fetch every export's PDF and restore input order.
//!
//! The whole export set is validated before the first byte is fetched —
//! an errored or unfinished export fails the call outright, even when the
//! job claims success, because a partial result set silently dropping an
//! input is worse than a clean failure. Fetches then run concurrently,
//! bounded by `config.concurrency`, and the collected files are sorted
//! back into input order.

use futures::StreamExt;
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::config::ConverterConfig;
use crate::error::ConvertError;
use crate::input::ConversionInput;
use crate::job::{export_task_name, ConversionJob, TaskStatus};
use crate::output::{is_pdf_magic, pdf_file_name, ConvertedFile, FileMeta};

/// Fetch every export task's file. Returns exactly `inputs.len()` files in
/// input order, or the first validation/fetch error.
pub(crate) async fn download_all(
    client: &ApiClient,
    config: &ConverterConfig,
    job: &ConversionJob,
    inputs: &[ConversionInput],
) -> Result<Vec<ConvertedFile>, ConvertError> {
    let mut targets = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        let task_name = export_task_name(index);
        let task = job.task_named(&task_name).ok_or_else(|| {
            ConvertError::Protocol(format!("job '{}' has no task '{task_name}'", job.id))
        })?;
        match task.status {
            TaskStatus::Finished => {}
            TaskStatus::Error => {
                return Err(ConvertError::JobFailed {
                    job_id: job.id.clone(),
                    detail: format!(
                        "{}: {}",
                        task.name,
                        task.message.as_deref().unwrap_or("task failed without a message")
                    ),
                });
            }
            TaskStatus::Waiting | TaskStatus::Processing => {
                return Err(ConvertError::Protocol(format!(
                    "export task '{task_name}' is not terminal in a finished job"
                )));
            }
        }
        let url = task
            .result
            .as_ref()
            .and_then(|r| r.files.first())
            .and_then(|f| f.url.as_deref())
            .ok_or_else(|| ConvertError::MissingDownloadUrl {
                task_id: task.id.clone(),
            })?;
        targets.push((index, input, task, url));
    }

    let fetches = targets.into_iter().map(|(index, input, task, url)| {
        let client = client;
        async move {
            debug!(task = %task.name, file = %input.filename(), "downloading result");
            let bytes = client.fetch_bytes(url).await?;
            if !is_pdf_magic(&bytes) {
                warn!(
                    task = %task.name,
                    file = %input.filename(),
                    "downloaded result does not start with the PDF magic bytes"
                );
            }
            let meta = FileMeta {
                original_filename: input.filename().to_string(),
                size: bytes.len() as u64,
                task_id: task.id.clone(),
            };
            Ok((
                index,
                ConvertedFile {
                    filename: pdf_file_name(input.filename()),
                    pdf_bytes: bytes,
                    meta,
                },
            ))
        }
    });

    let settled: Vec<Result<(usize, ConvertedFile), ConvertError>> =
        futures::stream::iter(fetches)
            .buffer_unordered(config.concurrency)
            .collect()
            .await;

    let mut indexed = settled
        .into_iter()
        .collect::<Result<Vec<_>, ConvertError>>()?;
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, file)| file).collect())
}
