//! # xray2report
//!
//! Analyse X-ray images with a locally hosted vision-language model and
//! render the results into a clinical-style PDF report.
//!
//! ## Why this crate?
//!
//! Local model servers (LM Studio, Ollama) make capable medical-imaging
//! VLMs a `POST http://localhost:…` away, but turning "a folder of X-rays"
//! into "a document you can hand someone" still takes plumbing: image
//! normalisation, two different wire formats, cleanup of markdown-ish
//! model prose, and a PDF layout that survives arbitrary model output.
//! This crate is that plumbing. The intelligence stays in the model; no
//! image data ever leaves the machine.
//!
//! ## Pipeline Overview
//!
//! ```text
//! X-ray images
//!  │
//!  ├─ 1. Input    validate path, decode pixels
//!  ├─ 2. Encode   RGB → width-capped JPEG → base64
//!  ├─ 3. VLM      one call per image to LM Studio / Ollama (sequential)
//!  ├─ 4. Sanitize deterministic cleanup of the report text
//!  └─ 5. Render   paginated A4 PDF (cover, per-image pages, advice page)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use xray2report::{analyze, AnalysisConfig, Backend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalysisConfig::builder()
//!         .backend(Backend::Ollama)
//!         .build()?;
//!     let output = analyze(&["chest.png", "wrist.jpg"], &config).await?;
//!     for report in &output.reports {
//!         println!("## {}\n{}\n", report.name, report.report);
//!     }
//!     let pdf = xray2report::render_pdf(&output, &config)?;
//!     std::fs::write("xray_medical_report.pdf", pdf)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `xray2report` binary (clap + anyhow + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//! ```toml
//! xray2report = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod location;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_sync, analyze_to_pdf, render_pdf, write_pdf};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, Backend};
pub use error::{ImageReportError, Xray2ReportError};
pub use output::{BatchOutput, BatchStats, ImageReport};
pub use progress::{AnalysisProgressCallback, ProgressCallback};
