//! CLI binary for xray2report.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalysisConfig`, prints each report as it arrives, and writes the
//! batch PDF.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use xray2report::{
    analyze, render_pdf, write_pdf, AnalysisConfig, AnalysisProgressCallback, Backend,
    ProgressCallback,
};

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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch, a log line per image.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_batch_start

        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>2}/{len} images  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Analyzing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_images: usize) {
        self.bar.set_length(total_images as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Analyzing {total_images} X-ray image(s)…"))
        ));
    }

    fn on_image_start(&self, _index: usize, _total: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_image_complete(&self, index: usize, total: usize, report_len: usize) {
        self.bar.println(format!(
            "  {} Image {:>2}/{:<2}  {}",
            green("✓"),
            index,
            total,
            dim(&format!("{report_len:>5} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_image_error(&self, index: usize, total: usize, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Image {:>2}/{:<2}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_images: usize, success_count: usize) {
        let failed = total_images.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} image(s) analyzed successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} images analyzed  ({} failed)",
                if failed == total_images {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_images,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyze one X-ray against LM Studio (default backend) and print the report
  xray2report chest.png

  # Batch-analyze and write the PDF report
  xray2report chest.png wrist.jpg ankle.jpeg -o xray_medical_report.pdf

  # Use Ollama with the llava model
  xray2report --backend ollama chest.png -o report.pdf

  # Point at a non-default server
  xray2report --endpoint http://192.168.1.20:1234/v1/chat/completions chest.png

  # Fully offline: skip the ipinfo.io location lookup
  xray2report --no-location chest.png -o report.pdf

  # Structured JSON output (reports + stats)
  xray2report --json chest.png > result.json

SUPPORTED BACKENDS:
  Backend    Endpoint (default)                            Model (default)
  ────────   ───────────────────────────────────────────   ───────────────
  lmstudio   http://localhost:1234/v1/chat/completions     medgemma-4b-it
  ollama     http://localhost:11434/api/generate           llava

ENVIRONMENT VARIABLES:
  XRAY2REPORT_BACKEND    Override backend (lmstudio, ollama)
  XRAY2REPORT_ENDPOINT   Override endpoint URL
  XRAY2REPORT_MODEL      Override model ID

SETUP:
  1. Start a local model server, e.g.:  ollama pull llava && ollama serve
  2. Analyze:                           xray2report scan.png -o report.pdf

  All image data stays on this machine. The only non-local request is the
  optional ipinfo.io location lookup (disable with --no-location).
"#;

/// Analyse X-ray images with a local vision model and build a PDF report.
#[derive(Parser, Debug)]
#[command(
    name = "xray2report",
    version,
    about = "Analyze X-ray images with a locally hosted vision model and render a clinical PDF report",
    long_about = "Send X-ray images to a locally hosted vision-language model (LM Studio or \
Ollama), print the generated clinical reports, and optionally lay the whole batch out into a \
formatted PDF document. No image data leaves the machine.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// X-ray image files (.png, .jpg, .jpeg).
    #[arg(required = true)]
    images: Vec<String>,

    /// Write a PDF report to this file.
    #[arg(short, long, env = "XRAY2REPORT_OUTPUT")]
    output: Option<PathBuf>,

    /// Inference backend: lmstudio, ollama.
    #[arg(long, env = "XRAY2REPORT_BACKEND", default_value = "lmstudio")]
    backend: BackendArg,

    /// Inference endpoint URL (default depends on backend).
    #[arg(long, env = "XRAY2REPORT_ENDPOINT")]
    endpoint: Option<String>,

    /// Model ID (default: medgemma-4b-it for lmstudio, llava for ollama).
    #[arg(long, env = "XRAY2REPORT_MODEL")]
    model: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "XRAY2REPORT_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Max tokens the model may generate per report.
    #[arg(long, env = "XRAY2REPORT_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Maximum image width in pixels before submission.
    #[arg(long, env = "XRAY2REPORT_MAX_WIDTH", default_value_t = 800)]
    max_width: u32,

    /// Per-image inference timeout in seconds.
    #[arg(long, env = "XRAY2REPORT_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "XRAY2REPORT_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Skip the ipinfo.io location lookup (fully offline run).
    #[arg(long, env = "XRAY2REPORT_NO_LOCATION")]
    no_location: bool,

    /// Clinic name printed in the PDF banner.
    #[arg(long, env = "XRAY2REPORT_CLINIC", default_value = "MEDICAL CENTER")]
    clinic_name: String,

    /// Output the whole batch as JSON instead of formatted text.
    #[arg(long, env = "XRAY2REPORT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "XRAY2REPORT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "XRAY2REPORT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "XRAY2REPORT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum BackendArg {
    Lmstudio,
    Ollama,
}

impl From<BackendArg> for Backend {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Lmstudio => Backend::LmStudio,
            BackendArg::Ollama => Backend::Ollama,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new();
        Some(cb as Arc<dyn AnalysisProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run analysis ─────────────────────────────────────────────────────
    let output = analyze(&cli.images, &config)
        .await
        .context("Analysis failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        for report in &output.reports {
            writeln!(handle, "\n{}", bold(&format!("── Report for {} ──", report.name)))?;
            writeln!(handle, "{}", report.report)?;
        }
        handle.flush().ok();
    }

    // ── Write the PDF, if requested ──────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let bytes = render_pdf(&output, &config).context("PDF generation failed")?;
        write_pdf(&bytes, output_path)
            .await
            .context("Failed to write PDF")?;

        if !cli.quiet {
            eprintln!(
                "{}  {}/{} images  {}ms  →  {}",
                if output.stats.failed_images == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                output.stats.analyzed_images,
                output.stats.total_images,
                output.stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
            eprintln!(
                "   {}  {}",
                dim(&format!("{} bytes", bytes.len())),
                dim(&output.location),
            );
        }
    } else if !cli.quiet && !show_progress && !cli.json {
        eprintln!(
            "Analyzed {}/{} images in {}ms",
            output.stats.analyzed_images, output.stats.total_images, output.stats.total_duration_ms
        );
        if output.stats.failed_images > 0 {
            eprintln!("  {} images failed", output.stats.failed_images);
        }
    }

    Ok(())
}

/// Map CLI args to `AnalysisConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalysisConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {path:?}"))?,
        )
    } else {
        None
    };

    let mut builder = AnalysisConfig::builder()
        .backend(cli.backend.clone().into())
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_image_width(cli.max_width)
        .api_timeout_secs(cli.api_timeout)
        .lookup_location(!cli.no_location)
        .clinic_name(cli.clinic_name.clone());

    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
