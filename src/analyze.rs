//! Batch analysis entry points.
//!
//! One user action maps to one pass over the batch: resolve each image,
//! encode it, call the local model, sanitise the report. Images are
//! processed **sequentially** — the backend is a single local model server
//! that serves one request at a time, so concurrency would only queue
//! requests on its side while complicating ours.
//!
//! A failed image does not abort the batch: its slot keeps a
//! `Analysis failed: …` placeholder (plus the typed error) so the PDF can
//! still account for every submitted file. Only a batch where *every*
//! image failed is a fatal error.

use crate::config::AnalysisConfig;
use crate::error::Xray2ReportError;
use crate::location;
use crate::output::{BatchOutput, BatchStats, ImageReport};
use crate::pipeline::{encode, input, llm, render, sanitize};
use chrono::Local;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Timestamp format for the cover page, e.g. "August 30, 2026 at 02:15 PM".
const TIMESTAMP_FORMAT: &str = "%B %d, %Y at %I:%M %p";

/// Analyse a batch of X-ray images with the configured local backend.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `inputs` — paths to local `.png`/`.jpg`/`.jpeg` files
/// * `config` — analysis configuration
///
/// # Returns
/// `Ok(BatchOutput)` on success, even if some images failed
/// (check `output.stats.failed_images`).
///
/// # Errors
/// Returns `Err(Xray2ReportError)` only for fatal errors:
/// - No inputs, or an input that is missing/unreadable/not an image
/// - Every image in the batch failed analysis
pub async fn analyze(
    inputs: &[impl AsRef<str>],
    config: &AnalysisConfig,
) -> Result<BatchOutput, Xray2ReportError> {
    let total_start = Instant::now();

    if inputs.is_empty() {
        return Err(Xray2ReportError::NoInputs);
    }
    info!("Starting analysis of {} image(s)", inputs.len());

    // ── Step 1: Resolve all inputs up front ──────────────────────────────
    // A typo'd path should fail before the first network request, not
    // after half the batch has been analysed.
    let mut images = Vec::with_capacity(inputs.len());
    for input_str in inputs {
        images.push(input::resolve_image(input_str.as_ref())?);
    }

    let client = build_client(config)?;

    // ── Step 2: Optional location lookup ─────────────────────────────────
    let location = if config.lookup_location {
        location::detect_location(&client).await
    } else {
        location::UNKNOWN_LOCATION.to_string()
    };
    debug!("Location: {}", location);

    // ── Step 3: Encode + infer, one image at a time ──────────────────────
    let total_images = images.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total_images);
    }

    let llm_start = Instant::now();
    let mut reports = Vec::with_capacity(total_images);

    for (i, loaded) in images.iter().enumerate() {
        let index = i + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_image_start(index, total_images, &loaded.name);
        }

        let image_start = Instant::now();
        let result = analyze_one(&client, config, loaded).await;
        let duration_ms = image_start.elapsed().as_millis() as u64;

        let report = match result {
            Ok(text) => {
                debug!("'{}': report of {} bytes", loaded.name, text.len());
                if let Some(ref cb) = config.progress_callback {
                    cb.on_image_complete(index, total_images, text.len());
                }
                ImageReport {
                    index,
                    name: loaded.name.clone(),
                    report: text,
                    duration_ms,
                    error: None,
                }
            }
            Err(e) => {
                warn!("'{}' failed: {}", loaded.name, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_image_error(index, total_images, &e.to_string());
                }
                ImageReport {
                    index,
                    name: loaded.name.clone(),
                    report: format!("Analysis failed: {e}"),
                    duration_ms,
                    error: Some(e),
                }
            }
        };
        reports.push(report);
    }
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    // ── Step 4: Stats + fatal-if-all-failed ──────────────────────────────
    let analyzed = reports.iter().filter(|r| r.succeeded()).count();
    let failed = total_images - analyzed;

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total_images, analyzed);
    }

    if analyzed == 0 {
        let first_error = reports
            .iter()
            .find_map(|r| r.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(Xray2ReportError::AllImagesFailed {
            total: total_images,
            first_error,
        });
    }

    let stats = BatchStats {
        total_images,
        analyzed_images: analyzed,
        failed_images: failed,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        llm_duration_ms,
    };

    info!(
        "Analysis complete: {}/{} images, {}ms total",
        analyzed, total_images, stats.total_duration_ms
    );

    Ok(BatchOutput {
        reports,
        location,
        generated_at: Local::now().format(TIMESTAMP_FORMAT).to_string(),
        stats,
    })
}

/// Analyse a batch and write the PDF report directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial PDFs.
pub async fn analyze_to_pdf(
    inputs: &[impl AsRef<str>],
    output_path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<BatchStats, Xray2ReportError> {
    let output = analyze(inputs, config).await?;
    let bytes = render_pdf(&output, config)?;
    write_pdf(&bytes, output_path.as_ref()).await?;
    Ok(output.stats)
}

/// Render (or re-render) an existing batch output into PDF bytes.
///
/// Pure layout; no network. Lets callers analyse once and render many
/// times (different clinic banner, re-run after a crash, tests).
pub fn render_pdf(
    output: &BatchOutput,
    config: &AnalysisConfig,
) -> Result<Vec<u8>, Xray2ReportError> {
    render::render_report(output, &config.clinic_name)
}

/// Write PDF bytes atomically: temp file in the target directory + rename.
pub async fn write_pdf(bytes: &[u8], path: &Path) -> Result<(), Xray2ReportError> {
    let write_err = |source: std::io::Error| Xray2ReportError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    inputs: &[impl AsRef<str>],
    config: &AnalysisConfig,
) -> Result<BatchOutput, Xray2ReportError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Xray2ReportError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(analyze(inputs, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// One image through encode → llm → sanitize.
async fn analyze_one(
    client: &reqwest::Client,
    config: &AnalysisConfig,
    loaded: &input::LoadedImage,
) -> Result<String, crate::error::ImageReportError> {
    let encoded = encode::encode_image(&loaded.image, config.max_image_width).map_err(|e| {
        crate::error::ImageReportError::EncodeFailed {
            name: loaded.name.clone(),
            detail: e.to_string(),
        }
    })?;

    let raw = llm::request_report(client, config, &loaded.name, &encoded).await?;
    Ok(sanitize::clean_report(&raw))
}

fn build_client(config: &AnalysisConfig) -> Result<reqwest::Client, Xray2ReportError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.api_timeout_secs))
        .build()
        .map_err(|e| Xray2ReportError::Internal(format!("Failed to build HTTP client: {e}")))
}
