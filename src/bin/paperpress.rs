//! CLI binary for paperpress.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConverterConfig`, sends local files through the conversion service,
//! and writes the resulting PDFs to disk.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use paperpress::{
    ConversionInput, Converter, ConverterConfig, ConvertError, Endpoint, EventSink,
    SharedEventSink,
};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI event sink using indicatif ───────────────────────────────────────────

/// Terminal event sink: logs job outcomes through the spinner so lines do
/// not tear the bar, and marks success/failure with coloured ticks.
struct CliEventSink {
    bar: ProgressBar,
}

impl EventSink for CliEventSink {
    fn on_job_create_failed(&self, error: &ConvertError) {
        self.bar
            .println(format!("  {} job creation failed: {error}", red("✗")));
    }

    fn on_job_failed(&self, job_id: &str, error: &ConvertError) {
        // JobFailed messages can span several task lines; the first one is
        // enough for the terminal, the rest lands in the error chain.
        let msg = error.to_string();
        let first = msg.lines().next().unwrap_or("conversion failed");
        self.bar
            .println(format!("  {} job {job_id}: {first}", red("✗")));
    }

    fn on_job_succeeded(&self, job_id: &str, file_count: usize, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} job {job_id}: {file_count} file(s) in {}",
            green("✓"),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert one HTML file (PDF written next to the shell, as report.pdf)
  paperpress report.html

  # Convert a mixed batch into a directory
  paperpress body.html scan.png contract.docx -o out/

  # Sandbox deployment, JSON summary on stdout
  paperpress --sandbox --json invoice.html > summary.json

  # Pin the HTML engine version for byte-stable rendering
  paperpress --engine-version 124.0 newsletter.html

  # Check connectivity and credentials without converting anything
  paperpress --probe

SUPPORTED INPUTS:
  .html .htm                rendered by the service's Chrome engine
  .doc .docx .odt .rtf      office engine
  .png .jpg .gif .webp ...  image engine
  anything else             uploaded as application/octet-stream; the
                            service picks an engine from the content

ENVIRONMENT VARIABLES:
  PAPERPRESS_API_KEY         API key (same as --api-key)
  PAPERPRESS_SANDBOX         true to target the sandbox deployment
  PAPERPRESS_ENDPOINT        Custom base URL, overrides --sandbox
  PAPERPRESS_ENGINE_VERSION  Pin the HTML engine version

EXIT STATUS:
  0  all inputs converted (or probe succeeded)
  1  configuration error, probe failure, or conversion failure
"#;

/// Convert HTML, office documents, and images to PDF via the paperpress
/// conversion service.
#[derive(Parser, Debug)]
#[command(
    name = "paperpress",
    version,
    about = "Convert HTML, office documents, and images to PDF",
    long_about = "Convert local HTML files, office documents, and images to PDF through the \
paperpress conversion service. Inputs travel through one remote job: uploads and downloads \
run concurrently, transient service failures are retried with backoff, and the resulting \
PDFs come back in input order.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input files to convert (HTML, office documents, images).
    #[arg(required_unless_present = "probe")]
    inputs: Vec<PathBuf>,

    /// Directory for the produced PDFs.
    #[arg(short, long, env = "PAPERPRESS_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// API key for the conversion service.
    #[arg(long, env = "PAPERPRESS_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Target the sandbox deployment instead of production.
    #[arg(long, env = "PAPERPRESS_SANDBOX")]
    sandbox: bool,

    /// Custom service base URL (overrides --sandbox).
    #[arg(long, env = "PAPERPRESS_ENDPOINT")]
    endpoint: Option<String>,

    /// Give up on a job after this many seconds without a terminal state.
    #[arg(long, env = "PAPERPRESS_COMPLETION_TIMEOUT", default_value_t = 45)]
    timeout: u64,

    /// Pause between job status polls, in milliseconds.
    #[arg(long, env = "PAPERPRESS_POLL_INTERVAL_MS", default_value_t = 1500)]
    poll_interval_ms: u64,

    /// Attempts per request before a transient failure becomes final.
    #[arg(long, env = "PAPERPRESS_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Concurrent transfers during the download phase.
    #[arg(short, long, env = "PAPERPRESS_CONCURRENCY", default_value_t = 8)]
    concurrency: usize,

    /// Pin the HTML engine version (e.g. "124.0").
    #[arg(long, env = "PAPERPRESS_ENGINE_VERSION")]
    engine_version: Option<String>,

    /// Free-form tag attached to the job, for service-side bookkeeping.
    #[arg(long, env = "PAPERPRESS_TAG")]
    tag: Option<String>,

    /// Print a JSON conversion summary on stdout (PDFs still go to files).
    #[arg(long, env = "PAPERPRESS_JSON")]
    json: bool,

    /// Probe the service once, set the exit code, and do nothing else.
    #[arg(long)]
    probe: bool,

    /// Disable the spinner.
    #[arg(long, env = "PAPERPRESS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAPERPRESS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAPERPRESS_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner is active; the
    // sink prints the outcome lines that matter to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Probe mode ───────────────────────────────────────────────────────
    if cli.probe {
        let converter =
            Converter::new(build_config(&cli, None)?).context("Invalid configuration")?;
        converter
            .probe()
            .await
            .context("Conversion service probe failed")?;
        if !cli.quiet {
            eprintln!("{} conversion service reachable", green("✔"));
        }
        return Ok(());
    }

    // ── Load inputs ──────────────────────────────────────────────────────
    let mut inputs = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        inputs.push(load_input(path).await?);
    }

    // ── Build config and converter ───────────────────────────────────────
    let bar = show_progress.then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Converting");
        bar.set_message(format!("{} input(s)", inputs.len()));
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let sink: Option<SharedEventSink> = bar
        .as_ref()
        .map(|bar| Arc::new(CliEventSink { bar: bar.clone() }) as SharedEventSink);

    let converter =
        Converter::new(build_config(&cli, sink)?).context("Invalid configuration")?;

    // ── Run conversion ───────────────────────────────────────────────────
    let result = converter.convert_to_pdf(&inputs).await;
    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }
    let result = result.context("Conversion failed")?;

    // ── Write PDFs ───────────────────────────────────────────────────────
    tokio::fs::create_dir_all(&cli.out_dir)
        .await
        .with_context(|| format!("Failed to create {}", cli.out_dir.display()))?;

    let mut used = HashSet::new();
    let mut written = Vec::with_capacity(result.files.len());
    for file in &result.files {
        let target = unique_target(&cli.out_dir, &file.filename, &mut used);
        tokio::fs::write(&target, &file.pdf_bytes)
            .await
            .with_context(|| format!("Failed to write {}", target.display()))?;
        written.push(target);
    }

    // ── Summary ──────────────────────────────────────────────────────────
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialise summary")?
        );
    }
    if !cli.quiet {
        eprintln!(
            "{}  {} file(s)  {}ms  →  {}",
            green("✔"),
            bold(&written.len().to_string()),
            result.stats.total_ms,
            bold(&cli.out_dir.display().to_string()),
        );
        if cli.verbose {
            eprintln!(
                "   {}",
                dim(&format!(
                    "create {}ms / upload {}ms / poll {}ms / download {}ms",
                    result.stats.create_ms,
                    result.stats.upload_ms,
                    result.stats.poll_ms,
                    result.stats.download_ms
                ))
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ConverterConfig`.
fn build_config(cli: &Cli, sink: Option<SharedEventSink>) -> Result<ConverterConfig> {
    let endpoint = if let Some(ref url) = cli.endpoint {
        Endpoint::Custom(url.clone())
    } else if cli.sandbox {
        Endpoint::Sandbox
    } else {
        Endpoint::Production
    };

    let mut builder = ConverterConfig::builder()
        .api_key(cli.api_key.clone())
        .endpoint(endpoint)
        .completion_timeout_secs(cli.timeout)
        .poll_interval_ms(cli.poll_interval_ms)
        .max_retries(cli.max_retries)
        .concurrency(cli.concurrency);

    if let Some(ref version) = cli.engine_version {
        builder = builder.engine_version(version.clone());
    }
    if let Some(ref tag) = cli.tag {
        builder = builder.tag(tag.clone());
    }
    if let Some(sink) = sink {
        builder = builder.event_sink(sink);
    }

    builder.build().context("Invalid configuration")
}

/// Read one input file into a [`ConversionInput`], picking the MIME type
/// from the extension. HTML goes in as text so the service renders it
/// directly; everything else is uploaded as bytes.
async fn load_input(path: &Path) -> Result<ConversionInput> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("Input path has no usable file name: {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if ext == "html" || ext == "htm" {
        let html = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(ConversionInput::html(filename, html))
    } else {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(ConversionInput::file(
            filename,
            mime_for_extension(&ext),
            bytes,
        ))
    }
}

/// Extension → MIME table for the formats the service converts. Unknown
/// extensions upload as octet-stream and let the service sniff the content.
fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "odt" => "application/vnd.oasis.opendocument.text",
        "rtf" => "application/rtf",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Pick a non-colliding path under `out_dir`. Two inputs named `a.html`
/// and `a.docx` both produce `a.pdf`; the second becomes `a-2.pdf`.
fn unique_target(out_dir: &Path, name: &str, used: &mut HashSet<String>) -> PathBuf {
    if used.insert(name.to_string()) {
        return out_dir.join(name);
    }
    let stem = name.strip_suffix(".pdf").unwrap_or(name);
    for i in 2u32.. {
        let candidate = format!("{stem}-{i}.pdf");
        if used.insert(candidate.clone()) {
            return out_dir.join(candidate);
        }
    }
    unreachable!("u32 range exhausted before finding a free name")
}
