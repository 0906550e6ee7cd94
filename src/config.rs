//! Configuration types for X-ray analysis.
//!
//! All behaviour is controlled through [`AnalysisConfig`], built via its
//! [`AnalysisConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across calls, log them, and diff two runs to
//! understand why their outputs differ.

use crate::error::Xray2ReportError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which local inference server to talk to.
///
/// Both speak JSON over localhost; they differ only in wire format and
/// default model. See [`crate::pipeline::llm`] for the request shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Backend {
    /// LM Studio's OpenAI-compatible `/v1/chat/completions` endpoint. (default)
    #[default]
    LmStudio,
    /// Ollama's native `/api/generate` endpoint.
    Ollama,
}

impl Backend {
    /// Default endpoint URL for the backend.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Backend::LmStudio => "http://localhost:1234/v1/chat/completions",
            Backend::Ollama => "http://localhost:11434/api/generate",
        }
    }

    /// Default vision model served on the backend.
    pub fn default_model(&self) -> &'static str {
        match self {
            Backend::LmStudio => "medgemma-4b-it",
            Backend::Ollama => "llava",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::LmStudio => write!(f, "lmstudio"),
            Backend::Ollama => write!(f, "ollama"),
        }
    }
}

/// Configuration for a batch X-ray analysis.
///
/// Built via [`AnalysisConfig::builder()`] or using
/// [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use xray2report::{AnalysisConfig, Backend};
///
/// let config = AnalysisConfig::builder()
///     .backend(Backend::Ollama)
///     .model("llava")
///     .max_image_width(800)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Which inference server wire format to use. Default: [`Backend::LmStudio`].
    pub backend: Backend,

    /// Inference endpoint URL. If None, uses the backend default
    /// (`http://localhost:1234/v1/chat/completions` for LM Studio,
    /// `http://localhost:11434/api/generate` for Ollama).
    pub endpoint: Option<String>,

    /// Model identifier, e.g. "medgemma-4b-it" or "llava".
    /// If None, uses the backend default.
    pub model: Option<String>,

    /// Sampling temperature. Default: 0.7.
    ///
    /// The report is free prose, not transcription; a moderate temperature
    /// keeps the language natural without drifting from the image.
    pub temperature: f32,

    /// Maximum tokens the model may generate per report. Default: 1024.
    ///
    /// A four-section clinical report fits comfortably; setting this too
    /// low truncates the healing-message section mid-sentence.
    pub max_tokens: usize,

    /// Maximum image width in pixels before submission. Default: 800.
    ///
    /// X-rays straight off a scanner can be 3000+ px wide. Vision models
    /// downsample internally anyway, so shipping more pixels only inflates
    /// the base64 payload and the request latency. Images at or below the
    /// cap are passed through untouched.
    pub max_image_width: u32,

    /// Per-call timeout in seconds. Default: 120.
    ///
    /// Local model servers on CPU can legitimately take a minute per image;
    /// a dead server should still not hang the batch forever. There is no
    /// retry on timeout — the image is recorded as failed and the batch
    /// moves on.
    pub api_timeout_secs: u64,

    /// Custom system prompt. If None, uses the built-in prompt for the
    /// selected backend (see [`crate::prompts`]).
    pub system_prompt: Option<String>,

    /// Look up a coarse location via ipinfo.io for the PDF cover page.
    /// Default: true.
    ///
    /// This is the single piece of non-local network traffic in the tool.
    /// Disable it to keep the run fully offline; the PDF then reads
    /// "Unknown Location".
    pub lookup_location: bool,

    /// Clinic name printed in the PDF banner. Default: "MEDICAL CENTER".
    pub clinic_name: String,

    /// Optional per-image progress callback (used by the CLI progress bar).
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            endpoint: None,
            model: None,
            temperature: 0.7,
            max_tokens: 1024,
            max_image_width: 800,
            api_timeout_secs: 120,
            system_prompt: None,
            lookup_location: true,
            clinic_name: "MEDICAL CENTER".to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("backend", &self.backend)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_image_width", &self.max_image_width)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("lookup_location", &self.lookup_location)
            .field("clinic_name", &self.clinic_name)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn callback>"),
            )
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// The endpoint to call, falling back to the backend default.
    pub fn endpoint_url(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.backend.default_endpoint())
    }

    /// The model to request, falling back to the backend default.
    pub fn model_id(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.backend.default_model())
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn backend(mut self, backend: Backend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = Some(url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn max_image_width(mut self, px: u32) -> Self {
        self.config.max_image_width = px.max(64);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn lookup_location(mut self, v: bool) -> Self {
        self.config.lookup_location = v;
        self
    }

    pub fn clinic_name(mut self, name: impl Into<String>) -> Self {
        self.config.clinic_name = name.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, Xray2ReportError> {
        let c = &self.config;
        if let Some(ref url) = c.endpoint {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Xray2ReportError::InvalidConfig(format!(
                    "Endpoint must be an http(s) URL, got '{url}'"
                )));
            }
        }
        if c.clinic_name.trim().is_empty() {
            return Err(Xray2ReportError::InvalidConfig(
                "Clinic name must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_backend() {
        let config = AnalysisConfig::default();
        assert_eq!(config.backend, Backend::LmStudio);
        assert_eq!(
            config.endpoint_url(),
            "http://localhost:1234/v1/chat/completions"
        );
        assert_eq!(config.model_id(), "medgemma-4b-it");
        assert_eq!(config.max_image_width, 800);
    }

    #[test]
    fn ollama_defaults() {
        let config = AnalysisConfig::builder()
            .backend(Backend::Ollama)
            .build()
            .unwrap();
        assert_eq!(config.endpoint_url(), "http://localhost:11434/api/generate");
        assert_eq!(config.model_id(), "llava");
    }

    #[test]
    fn explicit_endpoint_wins() {
        let config = AnalysisConfig::builder()
            .endpoint("http://10.0.0.5:1234/v1/chat/completions")
            .build()
            .unwrap();
        assert_eq!(
            config.endpoint_url(),
            "http://10.0.0.5:1234/v1/chat/completions"
        );
    }

    #[test]
    fn temperature_is_clamped() {
        let config = AnalysisConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(config.temperature, 2.0);
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let err = AnalysisConfig::builder()
            .endpoint("localhost:1234")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn rejects_blank_clinic_name() {
        assert!(AnalysisConfig::builder()
            .clinic_name("   ")
            .build()
            .is_err());
    }
}
