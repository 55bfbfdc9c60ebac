//! Concurrent input uploads to the import tasks' form destinations.
//!
//! Each import task returns a pre-authorized multipart form (URL plus
//! provider parameters). The manager posts every input to its form with an
//! independent retry budget, all inputs in flight at once. It always waits
//! for every upload to settle — succeed or exhaust retries — before
//! failing the call, so a flaky first input never cancels a sibling
//! mid-upload and leaves the job half-fed.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::config::ConverterConfig;
use crate::error::ConvertError;
use crate::input::ConversionInput;
use crate::job::{import_task_name, ConversionJob, UploadForm};
use crate::retry::with_retries;

/// Push every input to its import task. Returns once all uploads settled;
/// on failure, the error for the lowest input index is surfaced.
pub(crate) async fn upload_all(
    client: &ApiClient,
    config: &ConverterConfig,
    job: &ConversionJob,
    inputs: &[ConversionInput],
) -> Result<(), ConvertError> {
    let policy = config.retry_policy();

    let uploads = inputs.iter().enumerate().map(|(index, input)| {
        let client = client;
        async move {
            let task_name = import_task_name(index);
            let form = upload_form_for(job, &task_name)?;
            debug!(
                task = %task_name,
                file = %input.filename(),
                bytes = input.size_bytes(),
                "uploading input"
            );

            let form_ref = form;
            let input_ref = input;
            let outcome = with_retries(&policy, "upload", move || async move {
                let body = build_form(form_ref, input_ref)?;
                client.post_form(&form_ref.url, body).await
            })
            .await;

            if let Err(err) = &outcome {
                warn!(
                    task = %task_name,
                    file = %input.filename(),
                    error = %err,
                    "upload failed"
                );
            }
            outcome
        }
    });

    for result in join_all(uploads).await {
        result?;
    }
    Ok(())
}

fn upload_form_for<'a>(
    job: &'a ConversionJob,
    task_name: &str,
) -> Result<&'a UploadForm, ConvertError> {
    let task = job.task_named(task_name).ok_or_else(|| {
        ConvertError::Protocol(format!("job '{}' has no task '{task_name}'", job.id))
    })?;
    task.result
        .as_ref()
        .and_then(|r| r.form.as_ref())
        .ok_or_else(|| {
            ConvertError::Protocol(format!("import task '{task_name}' carries no upload form"))
        })
}

/// Rebuild the multipart body from scratch; a form consumed by a failed
/// attempt cannot be reused. Provider parameters go first, the file part
/// last — upload targets commonly require that order.
fn build_form(
    form: &UploadForm,
    input: &ConversionInput,
) -> Result<reqwest::multipart::Form, ConvertError> {
    let mut body = reqwest::multipart::Form::new();
    for (key, value) in &form.parameters {
        body = body.text(key.clone(), value.clone());
    }
    let part = reqwest::multipart::Part::bytes(input.payload())
        .file_name(input.filename().to_string())
        .mime_str(input.mime())
        .map_err(|e| {
            ConvertError::InvalidConfig(format!(
                "input '{}' has an invalid MIME type '{}': {e}",
                input.filename(),
                input.mime()
            ))
        })?;
    Ok(body.part("file", part))
}
