//! Wire model for the conversion service's job API.
//!
//! A job is a graph of named tasks. This client always builds the same
//! shape: one `input_N` import task, one `convert_N` task, and one
//! `export_N` task per input, so any task failure attributes back to an
//! input by index. Fields the flow never reads are not modelled; the
//! service may send more than this.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Every service response wraps its payload in `{ "data": ... }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: T,
}

/// Task kind within a job graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskOperation {
    Import,
    Convert,
    Export,
}

/// Task lifecycle. `Finished` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Waiting,
    Processing,
    Finished,
    Error,
}

/// Job lifecycle. The job is `Finished` only when every task finished;
/// a single task error moves the whole job to `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Waiting,
    Processing,
    Finished,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Error)
    }
}

/// Upload destination returned by an import task: POST the file as
/// multipart form data to `url`, with `parameters` included as form
/// fields. The parameters carry the authorization; no bearer token is
/// sent to this URL.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadForm {
    pub url: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// One output file of a finished export task. `url` is pre-signed and
/// fetched without authentication.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultFile {
    pub filename: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Operation-specific result payload of a task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskResult {
    #[serde(default)]
    pub form: Option<UploadForm>,
    #[serde(default)]
    pub files: Vec<ResultFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversionTask {
    pub id: String,
    pub name: String,
    pub operation: TaskOperation,
    pub status: TaskStatus,
    /// Human-readable failure description, set when `status` is `Error`.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<TaskResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversionJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub tasks: Vec<ConversionTask>,
    /// Caller-supplied correlation tag, echoed back by the service.
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ConversionJob {
    pub fn task_named(&self, name: &str) -> Option<&ConversionTask> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// `name: message` lines for every errored task, for [`crate::error::ConvertError::JobFailed`].
    pub(crate) fn failure_summary(&self) -> String {
        let lines: Vec<String> = self
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Error)
            .map(|t| {
                format!(
                    "{}: {}",
                    t.name,
                    t.message.as_deref().unwrap_or("task failed without a message")
                )
            })
            .collect();
        if lines.is_empty() {
            "job ended in error state but no task reported a failure".to_string()
        } else {
            lines.join("\n")
        }
    }
}

// Deterministic task names tie every task to its input index.

pub(crate) fn import_task_name(index: usize) -> String {
    format!("input_{index}")
}

pub(crate) fn convert_task_name(index: usize) -> String {
    format!("convert_{index}")
}

pub(crate) fn export_task_name(index: usize) -> String {
    format!("export_{index}")
}
