//! Integration tests driving the full conversion flow against a mock
//! service.
//!
//! Every test runs against a local wiremock server, so the suite is fast,
//! deterministic, and needs no credentials. Mock expectations are verified
//! on drop: a test fails if the client sends requests it should not have
//! sent, not just if assertions on the result fail.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use paperpress::{
    ConversionInput, ConversionReason, Converter, ConverterConfig, ConvertError, EventSink,
    HealthGate,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Fast-retry config pointed at the mock server.
fn test_config(server: &MockServer) -> ConverterConfig {
    ConverterConfig::builder()
        .api_key("test_key")
        .endpoint(paperpress::Endpoint::Custom(server.uri()))
        .poll_interval_ms(50)
        .retry_base_delay_ms(1)
        .retry_max_delay_ms(2)
        .build()
        .expect("valid test config")
}

fn envelope(job: Value) -> Value {
    json!({ "data": job })
}

/// A freshly created job: one import (with upload form), convert, and
/// export task per input, all waiting.
fn upload_ready_job(server: &MockServer, id: &str, inputs: usize) -> Value {
    let mut tasks = Vec::new();
    for i in 0..inputs {
        tasks.push(json!({
            "id": format!("imp-{i}"),
            "name": format!("input_{i}"),
            "operation": "import",
            "status": "waiting",
            "result": {
                "form": {
                    "url": format!("{}/upload/{i}", server.uri()),
                    "parameters": { "key": format!("slot-{i}") }
                }
            }
        }));
        tasks.push(json!({
            "id": format!("cnv-{i}"),
            "name": format!("convert_{i}"),
            "operation": "convert",
            "status": "waiting"
        }));
        tasks.push(json!({
            "id": format!("exp-{i}"),
            "name": format!("export_{i}"),
            "operation": "export",
            "status": "waiting"
        }));
    }
    json!({ "id": id, "status": "waiting", "tasks": tasks })
}

/// A finished job whose export tasks point at `/files/{i}` on the server.
fn finished_job(server: &MockServer, id: &str, filenames: &[&str]) -> Value {
    let tasks: Vec<Value> = filenames
        .iter()
        .enumerate()
        .map(|(i, name)| {
            json!({
                "id": format!("exp-{i}"),
                "name": format!("export_{i}"),
                "operation": "export",
                "status": "finished",
                "result": {
                    "files": [{
                        "filename": name,
                        "url": format!("{}/files/{i}", server.uri())
                    }]
                }
            })
        })
        .collect();
    json!({ "id": id, "status": "finished", "tasks": tasks })
}

fn processing_job(id: &str) -> Value {
    json!({ "id": id, "status": "processing", "tasks": [] })
}

/// Event sink that records every notification for assertions.
#[derive(Default)]
struct TrackingSink {
    create_failures: AtomicUsize,
    job_failures: AtomicUsize,
    successes: AtomicUsize,
    last_job: Mutex<Option<String>>,
}

impl EventSink for TrackingSink {
    fn on_job_create_failed(&self, _error: &ConvertError) {
        self.create_failures.fetch_add(1, Ordering::SeqCst);
    }

    fn on_job_failed(&self, job_id: &str, _error: &ConvertError) {
        self.job_failures.fetch_add(1, Ordering::SeqCst);
        *self.last_job.lock().unwrap() = Some(job_id.to_string());
    }

    fn on_job_succeeded(&self, job_id: &str, _file_count: usize, _elapsed_ms: u64) {
        self.successes.fetch_add(1, Ordering::SeqCst);
        *self.last_job.lock().unwrap() = Some(job_id.to_string());
    }
}

fn sample_inputs() -> Vec<ConversionInput> {
    vec![
        ConversionInput::html("report.html", "<h1>Quarterly report</h1>"),
        ConversionInput::file("scan.png", "image/png", vec![0x89, 0x50, 0x4E, 0x47]),
    ]
}

// ── Full flow ────────────────────────────────────────────────────────────────

/// Happy path: two inputs travel through create, upload, poll, and
/// download, and come back as PDFs in input order with accurate stats.
#[tokio::test]
async fn converts_a_mixed_batch_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jobs"))
        .and(header("authorization", "Bearer test_key"))
        .and(body_string_contains("input_1"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(envelope(upload_ready_job(
                &server, "job-1", 2,
            ))),
        )
        .expect(1)
        .mount(&server)
        .await;

    for i in 0..2 {
        Mock::given(method("POST"))
            .and(path(format!("/upload/{i}")))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
    }

    // First poll sees the job still processing, the second sees it done.
    Mock::given(method("GET"))
        .and(path("/jobs/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(processing_job("job-1"))))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(finished_job(
            &server,
            "job-1",
            &["report.pdf", "scan.pdf"],
        ))))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/0"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7 report".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7 scan".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let sink = Arc::new(TrackingSink::default());
    let config = ConverterConfig::builder()
        .api_key("test_key")
        .endpoint(paperpress::Endpoint::Custom(server.uri()))
        .poll_interval_ms(50)
        .retry_base_delay_ms(1)
        .retry_max_delay_ms(2)
        .event_sink(sink.clone())
        .build()
        .unwrap();
    let converter = Converter::new(config).unwrap();

    let result = converter.convert_to_pdf(&sample_inputs()).await.unwrap();

    assert_eq!(result.job_id, "job-1");
    assert_eq!(result.files.len(), 2);
    assert_eq!(result.files[0].filename, "report.pdf");
    assert_eq!(result.files[1].filename, "scan.pdf");
    assert!(result.files[0].pdf_bytes.starts_with(b"%PDF"));
    assert!(result.files[1].pdf_bytes.starts_with(b"%PDF"));
    assert_eq!(result.files[0].meta.original_filename, "report.html");
    assert_eq!(result.files[1].meta.task_id, "exp-1");

    assert_eq!(result.stats.input_count, 2);
    assert_eq!(result.stats.file_count, 2);
    assert_eq!(
        result.stats.total_bytes,
        (b"%PDF-1.7 report".len() + b"%PDF-1.7 scan".len()) as u64
    );
    // One processing poll forces one 50 ms pause before the finished poll.
    assert!(result.stats.poll_ms >= 50, "poll_ms: {}", result.stats.poll_ms);
    assert!(result.stats.total_ms >= result.stats.poll_ms);

    assert_eq!(sink.successes.load(Ordering::SeqCst), 1);
    assert_eq!(sink.job_failures.load(Ordering::SeqCst), 0);
    assert_eq!(sink.last_job.lock().unwrap().as_deref(), Some("job-1"));
    assert!(converter.is_healthy());
}

/// An empty input slice is a caller bug; it is rejected before any
/// request goes out.
#[tokio::test]
async fn empty_input_list_is_rejected_locally() {
    let server = MockServer::start().await;
    let converter = Converter::new(test_config(&server)).unwrap();

    let err = converter.convert_to_pdf(&[]).await.unwrap_err();

    assert!(matches!(err, ConvertError::InvalidConfig(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ── Health gate ──────────────────────────────────────────────────────────────

/// With the gate open, conversion fails fast and the service sees nothing.
#[tokio::test]
async fn open_gate_short_circuits_before_any_request() {
    let server = MockServer::start().await;

    let config = ConverterConfig::builder()
        .api_key("test_key")
        .endpoint(paperpress::Endpoint::Custom(server.uri()))
        .health_gate(HealthGate::new(false))
        .build()
        .unwrap();
    let converter = Converter::new(config).unwrap();
    assert!(!converter.is_healthy());

    let err = converter.convert_to_pdf(&sample_inputs()).await.unwrap_err();

    assert!(
        matches!(err, ConvertError::Configuration { status: None, .. }),
        "got: {err:?}"
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

/// Rejected credentials during job creation take exactly one request —
/// no retries — open the gate, and make the next call fail without any
/// network traffic.
#[tokio::test]
async fn rejected_credentials_fail_the_next_call_fast() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid token" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let converter = Converter::new(test_config(&server)).unwrap();

    let err = converter.convert_to_pdf(&sample_inputs()).await.unwrap_err();
    assert!(
        matches!(
            err,
            ConvertError::Configuration {
                status: Some(401),
                ..
            }
        ),
        "got: {err:?}"
    );
    assert!(!converter.is_healthy());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    let err = converter.convert_to_pdf(&sample_inputs()).await.unwrap_err();
    assert!(matches!(
        err,
        ConvertError::Configuration { status: None, .. }
    ));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

/// A successful probe closes a previously opened gate.
#[tokio::test]
async fn probe_success_closes_the_gate() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs"))
        .and(header("authorization", "Bearer test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ConverterConfig::builder()
        .api_key("test_key")
        .endpoint(paperpress::Endpoint::Custom(server.uri()))
        .health_gate(HealthGate::new(false))
        .build()
        .unwrap();
    let converter = Converter::new(config).unwrap();
    assert!(!converter.is_healthy());

    converter.probe().await.unwrap();

    assert!(converter.is_healthy());
}

/// A rejected probe opens the gate, and the next conversion fails fast.
#[tokio::test]
async fn probe_failure_opens_the_gate() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid token" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    // The follow-up conversion must not reach the service at all.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let converter = Converter::new(test_config(&server)).unwrap();
    assert!(converter.is_healthy());

    let err = converter.probe().await.unwrap_err();
    assert!(
        matches!(
            err,
            ConvertError::Configuration {
                status: Some(401),
                ..
            }
        ),
        "got: {err:?}"
    );
    assert!(!converter.is_healthy());

    let err = converter.convert_to_pdf(&sample_inputs()).await.unwrap_err();
    assert!(matches!(
        err,
        ConvertError::Configuration { status: None, .. }
    ));
}

// ── Retries ──────────────────────────────────────────────────────────────────

/// A rate-limited job creation retries after sitting out the backoff
/// delay; the rest of the flow proceeds normally.
#[tokio::test]
async fn transient_create_failure_retries_until_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(envelope(upload_ready_job(
                &server, "job-2", 1,
            ))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload/0"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/job-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(finished_job(
            &server,
            "job-2",
            &["invoice.pdf"],
        ))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/0"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    // A base delay long enough to show up in wall-clock time.
    let config = ConverterConfig::builder()
        .api_key("test_key")
        .endpoint(paperpress::Endpoint::Custom(server.uri()))
        .poll_interval_ms(50)
        .retry_base_delay_ms(100)
        .retry_max_delay_ms(200)
        .build()
        .expect("valid test config");
    let converter = Converter::new(config).unwrap();
    let inputs = vec![ConversionInput::html("invoice.html", "<p>42,00</p>")];

    let started = Instant::now();
    let result = converter.convert_to_pdf(&inputs).await.unwrap();

    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files[0].filename, "invoice.pdf");
    assert!(
        started.elapsed() >= Duration::from_millis(100),
        "second attempt went out before the base delay: {:?}",
        started.elapsed()
    );
}

// ── Outcome classification ───────────────────────────────────────────────────

/// A password-protected source surfaces as a skip reason, not as a hard
/// error, and never opens the health gate.
#[tokio::test]
async fn password_protected_input_reports_skip_reason() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({ "message": "Source file is password protected" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let sink = Arc::new(TrackingSink::default());
    let config = ConverterConfig::builder()
        .api_key("test_key")
        .endpoint(paperpress::Endpoint::Custom(server.uri()))
        .retry_base_delay_ms(1)
        .event_sink(sink.clone())
        .build()
        .unwrap();
    let converter = Converter::new(config).unwrap();

    let inputs = vec![ConversionInput::file(
        "locked.docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        vec![1, 2, 3],
    )];
    let err = converter.convert_to_pdf(&inputs).await.unwrap_err();

    assert_eq!(err.reason(), ConversionReason::SkippedPasswordProtected);
    assert!(err.reason().is_skip());
    assert_eq!(sink.create_failures.load(Ordering::SeqCst), 1);
    assert!(converter.is_healthy(), "a skip must not open the gate");
}

/// An export task in the error state fails the conversion even though the
/// job as a whole reports `finished`, and nothing is downloaded.
#[tokio::test]
async fn errored_export_fails_the_job_even_when_finished() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(envelope(upload_ready_job(
                &server, "job-3", 1,
            ))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload/0"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let finished_with_failed_export = json!({
        "id": "job-3",
        "status": "finished",
        "tasks": [{
            "id": "exp-0",
            "name": "export_0",
            "operation": "export",
            "status": "error",
            "message": "upstream storage unavailable"
        }]
    });
    Mock::given(method("GET"))
        .and(path("/jobs/job-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(finished_with_failed_export)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let sink = Arc::new(TrackingSink::default());
    let config = ConverterConfig::builder()
        .api_key("test_key")
        .endpoint(paperpress::Endpoint::Custom(server.uri()))
        .poll_interval_ms(50)
        .retry_base_delay_ms(1)
        .event_sink(sink.clone())
        .build()
        .unwrap();
    let converter = Converter::new(config).unwrap();

    let inputs = vec![ConversionInput::html("page.html", "<p>x</p>")];
    let err = converter.convert_to_pdf(&inputs).await.unwrap_err();

    match err {
        ConvertError::JobFailed { job_id, detail } => {
            assert_eq!(job_id, "job-3");
            assert!(detail.contains("upstream storage unavailable"), "{detail}");
        }
        other => panic!("expected JobFailed, got {other:?}"),
    }
    assert_eq!(sink.job_failures.load(Ordering::SeqCst), 1);
    assert_eq!(sink.last_job.lock().unwrap().as_deref(), Some("job-3"));
}

// ── Timeout ──────────────────────────────────────────────────────────────────

/// The completion timeout only fires after the full window has elapsed; a
/// job that stays in `processing` for the whole window becomes JobTimeout.
#[tokio::test]
async fn stuck_job_times_out_after_the_full_window() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(envelope(upload_ready_job(
                &server, "job-4", 1,
            ))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload/0"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/job-4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(processing_job("job-4"))))
        .mount(&server)
        .await;

    let config = ConverterConfig::builder()
        .api_key("test_key")
        .endpoint(paperpress::Endpoint::Custom(server.uri()))
        .poll_interval_ms(50)
        .completion_timeout_ms(300)
        .retry_base_delay_ms(1)
        .build()
        .unwrap();
    let converter = Converter::new(config).unwrap();

    let inputs = vec![ConversionInput::html("slow.html", "<p>y</p>")];
    let started = Instant::now();
    let err = converter.convert_to_pdf(&inputs).await.unwrap_err();

    assert!(matches!(err, ConvertError::JobTimeout { .. }), "got: {err:?}");
    assert_eq!(err.job_id(), Some("job-4"));
    assert!(
        started.elapsed() >= Duration::from_millis(300),
        "timed out early after {:?}",
        started.elapsed()
    );
}
