//! Progress-callback trait for per-image analysis events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline works through the batch.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a terminal progress bar, a log file, or a GUI —
//! without the library knowing anything about how the host application
//! communicates. The trait is `Send + Sync` so the same callback object can
//! be shared with other tasks even though the batch itself runs
//! sequentially.

use std::sync::Arc;

/// Called by the analysis pipeline as it processes each image.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Images are processed one at a time, in submission
/// order.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once before any image is analysed.
    ///
    /// # Arguments
    /// * `total_images` — number of images in the batch
    fn on_batch_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called when an image's inference call is about to start.
    fn on_image_start(&self, index: usize, total_images: usize, name: &str) {
        let _ = (index, total_images, name);
    }

    /// Called when an image's report arrived and passed sanitisation.
    ///
    /// `report_len` is the length of the sanitised report in bytes.
    fn on_image_complete(&self, index: usize, total_images: usize, report_len: usize) {
        let _ = (index, total_images, report_len);
    }

    /// Called when an image failed; the batch continues with the next one.
    fn on_image_error(&self, index: usize, total_images: usize, error: &str) {
        let _ = (index, total_images, error);
    }

    /// Called once after the last image, with the final success count.
    fn on_batch_complete(&self, total_images: usize, success_count: usize) {
        let _ = (total_images, success_count);
    }
}

/// Shared handle to a progress callback.
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
