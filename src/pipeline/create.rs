//! Job creation: task-graph construction and submission.
//!
//! Every input becomes an import → convert → export triple with
//! deterministic names (`input_N`, `convert_N`, `export_N`), so a task
//! failure reported later attributes straight back to an input index. The
//! convert task carries the engine choice and, for HTML, fixed page
//! geometry — identical emails must produce identically laid-out PDFs.

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::client::ApiClient;
use crate::config::ConverterConfig;
use crate::error::ConvertError;
use crate::input::{engine_for, ConversionInput, ConvertEngine};
use crate::job::{
    convert_task_name, export_task_name, import_task_name, ApiEnvelope, ConversionJob,
};
use crate::retry::with_retries;

// Page geometry for browser-rendered HTML. Fixed rather than configurable:
// downstream archiving expects uniform A4 pages.
const HTML_PAGE_SIZE: &str = "a4";
const HTML_MARGIN_MM: u32 = 10;

/// Build the task-graph payload for `POST /jobs`.
pub(crate) fn build_task_graph(
    config: &ConverterConfig,
    inputs: &[ConversionInput],
) -> Value {
    let mut tasks = serde_json::Map::new();

    for (index, input) in inputs.iter().enumerate() {
        let import = import_task_name(index);
        let convert = convert_task_name(index);
        let export = export_task_name(index);

        tasks.insert(import.clone(), json!({ "operation": "import" }));

        let mut convert_def = serde_json::Map::new();
        convert_def.insert("operation".into(), json!("convert"));
        convert_def.insert("input".into(), json!(import));
        convert_def.insert("output_format".into(), json!("pdf"));
        match engine_for(input) {
            ConvertEngine::Chrome => {
                convert_def.insert("engine".into(), json!("chrome"));
                convert_def.insert("page_size".into(), json!(HTML_PAGE_SIZE));
                convert_def.insert("margin_top".into(), json!(HTML_MARGIN_MM));
                convert_def.insert("margin_bottom".into(), json!(HTML_MARGIN_MM));
                convert_def.insert("margin_left".into(), json!(HTML_MARGIN_MM));
                convert_def.insert("margin_right".into(), json!(HTML_MARGIN_MM));
                convert_def.insert("print_background".into(), json!(true));
                if let Some(version) = &config.engine_version {
                    convert_def.insert("engine_version".into(), json!(version));
                }
            }
            engine => {
                if let Some(name) = engine.wire_name() {
                    convert_def.insert("engine".into(), json!(name));
                }
            }
        }
        tasks.insert(convert.clone(), Value::Object(convert_def));

        tasks.insert(
            export,
            json!({ "operation": "export", "input": convert }),
        );
    }

    let mut body = serde_json::Map::new();
    body.insert("tasks".into(), Value::Object(tasks));
    if let Some(tag) = &config.tag {
        body.insert("tag".into(), json!(tag));
    }
    Value::Object(body)
}

/// Submit the graph and return the created job.
///
/// Transient failures retry on the configured budget. An authorization
/// failure additionally opens the health gate so queued callers stop
/// hammering a dead credential.
pub(crate) async fn create_job(
    client: &ApiClient,
    config: &ConverterConfig,
    inputs: &[ConversionInput],
) -> Result<ConversionJob, ConvertError> {
    let graph = build_task_graph(config, inputs);

    // Names and operations only — payload bytes never hit the logs.
    if let Some(tasks) = graph.get("tasks").and_then(|t| t.as_object()) {
        let names: Vec<&str> = tasks.keys().map(String::as_str).collect();
        debug!(inputs = inputs.len(), tasks = %names.join(","), "submitting job graph");
    }

    let policy = config.retry_policy();
    let graph_ref = &graph;
    let result = with_retries(&policy, "create job", move || async move {
        client.post_json("/jobs", graph_ref).await
    })
    .await;

    let payload = match result {
        Ok(payload) => payload,
        Err(err) => {
            if matches!(err, ConvertError::Configuration { .. }) {
                config.health.set_healthy(false);
            }
            return Err(err);
        }
    };

    // A 2xx answer is not necessarily a job: some gateways return error
    // payloads with success statuses. No id means no job, and resubmitting
    // the identical graph cannot go differently.
    let has_id = payload
        .pointer("/data/id")
        .and_then(Value::as_str)
        .is_some_and(|id| !id.is_empty());
    if !has_id {
        let detail = payload
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("response carried no job id")
            .to_string();
        return Err(ConvertError::JobCreateFailed { detail });
    }

    let envelope: ApiEnvelope<ConversionJob> = serde_json::from_value(payload)
        .map_err(|e| ConvertError::JobCreateFailed {
            detail: format!("undecodable job payload: {e}"),
        })?;
    let job = envelope.data;
    info!(job_id = %job.id, tasks = job.tasks.len(), "conversion job created");
    Ok(job)
}
