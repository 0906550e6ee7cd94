//! Input resolution: validate a user-supplied image path and decode it.
//!
//! Everything that can be checked locally is checked here, before any
//! request is built: extension, existence, read permission, and that the
//! bytes actually decode as an image. A typo'd path should fail in
//! microseconds with a pointed message, not after a round-trip to the
//! model server.

use crate::error::Xray2ReportError;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions accepted for upload, matching the original intake filter.
const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// A validated, decoded input image.
#[derive(Debug)]
pub struct LoadedImage {
    /// File name without directory components, used in reports and the PDF.
    pub name: String,
    /// Decoded pixel data.
    pub image: DynamicImage,
}

/// Check whether the path carries a supported image extension.
pub fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Resolve and decode a local image file.
pub fn resolve_image(path_str: &str) -> Result<LoadedImage, Xray2ReportError> {
    let path = PathBuf::from(path_str);

    if !is_supported_extension(&path) {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string();
        return Err(Xray2ReportError::UnsupportedFormat { path, extension });
    }

    if !path.exists() {
        return Err(Xray2ReportError::FileNotFound { path });
    }

    let bytes = match std::fs::read(&path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Xray2ReportError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Xray2ReportError::FileNotFound { path });
        }
    };

    let image = image::load_from_memory(&bytes).map_err(|e| Xray2ReportError::InvalidImage {
        path: path.clone(),
        detail: e.to_string(),
    })?;

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path_str)
        .to_string();

    debug!(
        "Resolved image '{}' ({}x{} px)",
        name,
        image.width(),
        image.height()
    );

    Ok(LoadedImage { name, image })
}
