//! Pipeline stages for X-ray analysis and report generation.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. add another inference backend) without
//! touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ sanitize ──▶ render
//! (path)   (JPEG/b64)  (VLM)   (cleanup)    (PDF)
//! ```
//!
//! 1. [`input`]    — validate the image path and decode the pixels
//! 2. [`encode`]   — RGB-convert, cap the width, JPEG-encode, base64-wrap
//! 3. [`llm`]      — one synchronous call to the local inference server;
//!    the only stage with network I/O
//! 4. [`sanitize`] — deterministic text cleanup of the model's report
//! 5. [`render`]   — lay the batch out into a paginated A4 PDF

pub mod encode;
pub mod input;
pub mod llm;
pub mod render;
pub mod sanitize;
