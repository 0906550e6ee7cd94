//! Error types for the xray2report library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Xray2ReportError`] — **Fatal**: the analysis cannot proceed at all
//!   (bad input path, unsupported format, invalid config, PDF rendering or
//!   output write failure). Returned as `Err(Xray2ReportError)` from the
//!   top-level `analyze*` functions.
//!
//! * [`ImageReportError`] — **Non-fatal**: a single image failed (backend
//!   refused the request, empty report text) but the other images in the
//!   batch are fine. Stored inside [`crate::output::ImageReport`] so callers
//!   can inspect partial success rather than losing the whole batch to one
//!   bad image.
//!
//! The separation lets callers decide their own tolerance: abort on the
//! first image failure, log and continue, or keep the placeholder text and
//! still generate the PDF.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the xray2report library.
///
/// Image-level failures use [`ImageReportError`] and are stored in
/// [`crate::output::ImageReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Xray2ReportError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file extension is not one of png/jpg/jpeg.
    #[error("Unsupported image type '{extension}' for '{path}'\nSupported: png, jpg, jpeg.")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// The file exists and was read, but does not decode as an image.
    #[error("File is not a valid image: '{path}': {detail}")]
    InvalidImage { path: PathBuf, detail: String },

    /// No input images were supplied at all.
    #[error("No input images provided.\nPass at least one .png/.jpg/.jpeg file.")]
    NoInputs,

    // ── Backend errors ────────────────────────────────────────────────────
    /// The inference endpoint could not be reached at all.
    #[error(
        "Cannot reach inference endpoint '{endpoint}': {reason}\n\
         Is the local model server running? (LM Studio default: http://localhost:1234,\n\
         Ollama default: http://localhost:11434)"
    )]
    BackendUnreachable { endpoint: String, reason: String },

    /// Every image in the batch failed; there is nothing to report on.
    #[error("All {total} images failed analysis.\nFirst error: {first_error}")]
    AllImagesFailed { total: usize, first_error: String },

    // ── Report errors ─────────────────────────────────────────────────────
    /// The PDF layout routine failed.
    #[error("PDF report generation failed: {0}")]
    PdfRenderFailed(String),

    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image.
///
/// Stored alongside [`crate::output::ImageReport`] when an image fails.
/// The overall batch continues unless ALL images fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageReportError {
    /// The image could not be re-encoded for the API request.
    #[error("'{name}': image encoding failed: {detail}")]
    EncodeFailed { name: String, detail: String },

    /// The backend returned a non-success HTTP status.
    #[error("'{name}': inference API returned HTTP {status}: {detail}")]
    ApiStatus {
        name: String,
        status: u16,
        detail: String,
    },

    /// The HTTP request itself failed (connection refused, malformed JSON).
    #[error("'{name}': inference call failed: {detail}")]
    ApiFailed { name: String, detail: String },

    /// The inference call exceeded the configured timeout.
    #[error("'{name}': inference call timed out after {secs}s")]
    Timeout { name: String, secs: u64 },

    /// The backend answered, but with an empty report.
    ///
    /// A valid image must produce a non-empty string; blank output means
    /// the model saw nothing it could describe.
    #[error("'{name}': backend returned an empty report")]
    EmptyReport { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_display() {
        let e = Xray2ReportError::UnsupportedFormat {
            path: PathBuf::from("scan.tiff"),
            extension: "tiff".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("tiff"), "got: {msg}");
        assert!(msg.contains("png, jpg, jpeg"));
    }

    #[test]
    fn all_images_failed_display() {
        let e = Xray2ReportError::AllImagesFailed {
            total: 3,
            first_error: "connection refused".into(),
        };
        assert!(e.to_string().contains("All 3 images"));
        assert!(e.to_string().contains("connection refused"));
    }

    #[test]
    fn backend_unreachable_mentions_defaults() {
        let e = Xray2ReportError::BackendUnreachable {
            endpoint: "http://localhost:1234/v1/chat/completions".into(),
            reason: "connection refused".into(),
        };
        assert!(e.to_string().contains("localhost:11434"));
    }

    #[test]
    fn image_error_display() {
        let e = ImageReportError::ApiStatus {
            name: "chest.png".into(),
            status: 404,
            detail: "model not found".into(),
        };
        assert!(e.to_string().contains("chest.png"));
        assert!(e.to_string().contains("404"));
    }

    #[test]
    fn timeout_display() {
        let e = ImageReportError::Timeout {
            name: "wrist.jpg".into(),
            secs: 120,
        };
        assert!(e.to_string().contains("120s"));
    }
}
