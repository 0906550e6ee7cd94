//! End-to-end integration tests for xray2report.
//!
//! The PDF rendering tests are fully offline and always run. The analysis
//! tests make live calls to a local model server and are gated behind the
//! `E2E_ENABLED` environment variable so they do not run in CI unless
//! explicitly requested.
//!
//! Run everything (LM Studio or Ollama must be up):
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! Select the backend for the live tests with E2E_BACKEND=ollama (default
//! is lmstudio).

use image::{DynamicImage, RgbImage};
use std::path::PathBuf;
use xray2report::{
    analyze, render_pdf, AnalysisConfig, Backend, BatchOutput, BatchStats, ImageReport,
    ImageReportError, Xray2ReportError,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this live test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run live backend tests");
            return;
        }
    }};
}

fn e2e_backend() -> Backend {
    match std::env::var("E2E_BACKEND").as_deref() {
        Ok("ollama") => Backend::Ollama,
        _ => Backend::LmStudio,
    }
}

/// Write a synthetic grayscale "X-ray" PNG into `dir` and return its path.
///
/// A dark frame with a lighter oblong in the middle is enough for a VLM to
/// produce *some* description; we assert on plumbing, not medicine.
fn write_test_xray(dir: &std::path::Path, name: &str) -> PathBuf {
    let mut img = RgbImage::new(320, 400);
    for (x, y, px) in img.enumerate_pixels_mut() {
        let dx = x as i64 - 160;
        let dy = y as i64 - 200;
        let inside = dx * dx / 4 + dy * dy / 9 < 3600;
        let v = if inside { 190u8 } else { 25u8 };
        *px = image::Rgb([v, v, v]);
    }
    let path = dir.join(name);
    DynamicImage::ImageRgb8(img).save(&path).unwrap();
    path
}

fn report(index: usize, name: &str, body: &str) -> ImageReport {
    ImageReport {
        index,
        name: name.to_string(),
        report: body.to_string(),
        duration_ms: 1234,
        error: None,
    }
}

fn batch(reports: Vec<ImageReport>) -> BatchOutput {
    let total = reports.len();
    let analyzed = reports.iter().filter(|r| r.succeeded()).count();
    BatchOutput {
        stats: BatchStats {
            total_images: total,
            analyzed_images: analyzed,
            failed_images: total - analyzed,
            total_duration_ms: 5000,
            llm_duration_ms: 4000,
        },
        reports,
        location: "Geneva, Geneva".to_string(),
        generated_at: "August 30, 2026 at 02:15 PM".to_string(),
    }
}

const TYPICAL_REPORT: &str = "\
**🩻 Medical Analysis:**
The chest radiograph shows clear lung fields with no focal consolidation.
Cardiac silhouette is within normal limits. No pleural effusion.

**🩺 Next Steps:**
Routine follow-up in 12 months unless symptoms develop.

**💊 Recovery Advice:**
Maintain regular exercise and avoid smoking.

**💙 Encouragement:**
Everything looks healthy — keep taking good care of yourself.";

// ── Offline: PDF rendering ───────────────────────────────────────────────────

#[test]
fn renders_typical_batch_to_valid_pdf() {
    let output = batch(vec![
        report(1, "chest.png", TYPICAL_REPORT),
        report(2, "wrist.jpg", "Plain text report without any headings at all."),
    ]);
    let config = AnalysisConfig::default();

    let bytes = render_pdf(&output, &config).expect("render failed");

    assert!(bytes.starts_with(b"%PDF-"), "missing PDF magic");
    // Cover page + 2 report pages + advice page: well past a trivial size
    assert!(bytes.len() > 2_000, "suspiciously small PDF: {} bytes", bytes.len());
}

#[test]
fn renders_failed_image_placeholder() {
    let mut failed = report(2, "broken.jpeg", "Analysis failed: model returned an empty report");
    failed.error = Some(ImageReportError::EmptyReport {
        name: "broken.jpeg".to_string(),
    });

    let output = batch(vec![report(1, "ok.png", TYPICAL_REPORT), failed]);
    let bytes = render_pdf(&output, &AnalysisConfig::default()).expect("render failed");
    assert!(bytes.starts_with(b"%PDF-"));
}

#[test]
fn renders_hostile_model_output() {
    // Emoji soup, CJK, very long unbroken token, control chars: the layout
    // must survive all of it without panicking.
    let hostile = format!(
        "🩻🩺💊💙 漢字テスト\u{0007}\n\n**{}**\n\n{}",
        "A".repeat(400),
        "word ".repeat(2000)
    );
    let output = batch(vec![report(1, "hostile.png", &hostile)]);

    let bytes = render_pdf(&output, &AnalysisConfig::default()).expect("render failed");
    assert!(bytes.starts_with(b"%PDF-"));
}

#[test]
fn renders_custom_clinic_name() {
    let config = AnalysisConfig::builder()
        .clinic_name("ST. ELSEWHERE RADIOLOGY")
        .build()
        .unwrap();
    let output = batch(vec![report(1, "chest.png", TYPICAL_REPORT)]);

    let bytes = render_pdf(&output, &config).expect("render failed");
    assert!(bytes.starts_with(b"%PDF-"));
}

#[test]
fn renders_large_batch() {
    let reports = (1..=12)
        .map(|i| report(i, &format!("scan_{i:02}.png"), TYPICAL_REPORT))
        .collect();
    let bytes = render_pdf(&batch(reports), &AnalysisConfig::default()).expect("render failed");
    assert!(bytes.starts_with(b"%PDF-"));
    assert!(bytes.len() > 10_000);
}

// ── Offline: batch validation ────────────────────────────────────────────────

#[tokio::test]
async fn rejects_empty_input_list() {
    let inputs: Vec<String> = vec![];
    let err = analyze(&inputs, &AnalysisConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Xray2ReportError::NoInputs));
}

#[tokio::test]
async fn rejects_unsupported_extension_before_network() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "not an image").unwrap();

    let err = analyze(&[path.to_str().unwrap()], &AnalysisConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Xray2ReportError::UnsupportedFormat { .. }));
}

#[tokio::test]
async fn rejects_missing_file_before_network() {
    let err = analyze(&["/no/such/dir/chest.png"], &AnalysisConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Xray2ReportError::FileNotFound { .. }));
}

#[tokio::test]
async fn unreachable_backend_fails_whole_batch() {
    // Nothing listens on this port; every image fails, which is fatal.
    let dir = tempfile::tempdir().unwrap();
    let img = write_test_xray(dir.path(), "chest.png");

    let config = AnalysisConfig::builder()
        .endpoint("http://127.0.0.1:9") // discard port, nothing there
        .api_timeout_secs(5)
        .lookup_location(false)
        .build()
        .unwrap();

    let err = analyze(&[img.to_str().unwrap()], &config).await.unwrap_err();
    assert!(
        matches!(err, Xray2ReportError::AllImagesFailed { total: 1, .. }),
        "unexpected error: {err}"
    );
}

// ── Live: requires a local model server ──────────────────────────────────────

#[tokio::test]
async fn live_single_image_analysis() {
    e2e_skip_unless_enabled!();

    let dir = tempfile::tempdir().unwrap();
    let img = write_test_xray(dir.path(), "chest.png");

    let config = AnalysisConfig::builder()
        .backend(e2e_backend())
        .lookup_location(false)
        .build()
        .unwrap();

    let output = analyze(&[img.to_str().unwrap()], &config)
        .await
        .expect("live analysis failed — is the model server running?");

    assert_eq!(output.stats.total_images, 1);
    assert_eq!(output.stats.analyzed_images, 1);

    let report = &output.reports[0];
    assert!(report.succeeded());
    assert!(
        report.report.len() > 50,
        "implausibly short report: {:?}",
        report.report
    );
    // clean_report guarantees: no outer fence, no CRLF, trimmed
    assert!(!report.report.starts_with("```"));
    assert!(!report.report.contains('\r'));
    assert_eq!(report.report, report.report.trim());

    println!("── live report ──\n{}\n", report.report);
}

#[tokio::test]
async fn live_batch_to_pdf() {
    e2e_skip_unless_enabled!();

    let dir = tempfile::tempdir().unwrap();
    let a = write_test_xray(dir.path(), "chest.png");
    let b = write_test_xray(dir.path(), "wrist.jpg");
    let out = dir.path().join("xray_medical_report.pdf");

    let config = AnalysisConfig::builder()
        .backend(e2e_backend())
        .lookup_location(false)
        .build()
        .unwrap();

    let stats = xray2report::analyze_to_pdf(
        &[a.to_str().unwrap(), b.to_str().unwrap()],
        &out,
        &config,
    )
    .await
    .expect("live batch failed — is the model server running?");

    assert_eq!(stats.total_images, 2);
    assert!(stats.analyzed_images >= 1);

    let bytes = std::fs::read(&out).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    println!("wrote {} bytes to {}", bytes.len(), out.display());
}
