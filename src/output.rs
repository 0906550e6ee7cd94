//! Result types returned by the analysis pipeline.
//!
//! Everything here is `Serialize` so the CLI can emit the whole batch as
//! JSON (`--json`) and tests can snapshot results without touching a model
//! server.

use crate::error::ImageReportError;
use serde::{Deserialize, Serialize};

/// The outcome of analysing a single image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageReport {
    /// 1-indexed position of the image within the batch.
    pub index: usize,
    /// File name of the image (without directory components).
    pub name: String,
    /// The sanitised report text.
    ///
    /// On failure this holds a `Analysis failed: …` placeholder so a batch
    /// PDF can still be produced; check [`ImageReport::error`] to tell the
    /// two apart.
    pub report: String,
    /// Wall-clock duration of the inference call in milliseconds.
    pub duration_ms: u64,
    /// Set when the image failed; `None` on success.
    pub error: Option<ImageReportError>,
}

impl ImageReport {
    /// Whether the backend produced a real report for this image.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate statistics for a batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Number of images submitted.
    pub total_images: usize,
    /// Images with a real report.
    pub analyzed_images: usize,
    /// Images that failed (placeholder text only).
    pub failed_images: usize,
    /// End-to-end wall-clock time in milliseconds.
    pub total_duration_ms: u64,
    /// Time spent waiting on the inference backend, summed over images.
    pub llm_duration_ms: u64,
}

/// Complete output of a batch analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    /// One entry per input image, in submission order.
    pub reports: Vec<ImageReport>,
    /// Coarse location from the IP geolocation lookup, e.g. `"Lyon, Auvergne-Rhône-Alpes"`.
    /// `"Unknown Location"` when the lookup failed or was disabled.
    pub location: String,
    /// Human-readable timestamp of the run, e.g. `"August 30, 2026 at 02:15 PM"`.
    pub generated_at: String,
    /// Aggregate statistics.
    pub stats: BatchStats,
}

impl BatchOutput {
    /// Iterate over the reports that actually succeeded.
    pub fn successful_reports(&self) -> impl Iterator<Item = &ImageReport> {
        self.reports.iter().filter(|r| r.succeeded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BatchOutput {
        BatchOutput {
            reports: vec![
                ImageReport {
                    index: 1,
                    name: "chest.png".into(),
                    report: "**Medical Analysis:**\nClear lung fields.".into(),
                    duration_ms: 900,
                    error: None,
                },
                ImageReport {
                    index: 2,
                    name: "wrist.jpg".into(),
                    report: "Analysis failed: connection refused".into(),
                    duration_ms: 12,
                    error: Some(ImageReportError::ApiFailed {
                        name: "wrist.jpg".into(),
                        detail: "connection refused".into(),
                    }),
                },
            ],
            location: "Unknown Location".into(),
            generated_at: "August 30, 2026 at 02:15 PM".into(),
            stats: BatchStats {
                total_images: 2,
                analyzed_images: 1,
                failed_images: 1,
                total_duration_ms: 1000,
                llm_duration_ms: 912,
            },
        }
    }

    #[test]
    fn successful_reports_skips_failures() {
        let out = sample();
        let ok: Vec<_> = out.successful_reports().collect();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].name, "chest.png");
    }

    #[test]
    fn json_round_trip() {
        let out = sample();
        let json = serde_json::to_string(&out).unwrap();
        let back: BatchOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back.reports.len(), 2);
        assert!(!back.reports[1].succeeded());
    }
}
