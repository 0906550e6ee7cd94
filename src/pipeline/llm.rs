//! Inference call: build the backend request and extract the report text.
//!
//! This module owns the two wire formats the tool speaks:
//!
//! * **LM Studio** — OpenAI-style chat completions. The image travels as a
//!   `data:image/jpeg;base64,…` URI inside the user message's content
//!   parts, next to a short text part.
//! * **Ollama** — the native `/api/generate` API. The image travels as a
//!   bare base64 string in the `images` array and the whole instruction is
//!   a single `prompt` field.
//!
//! It is intentionally thin — prompt text lives in [`crate::prompts`] and
//! request policy (timeout, model, temperature) in the config. There is no
//! retry: one user action maps to one request per image, and a failed
//! image is reported as failed.

use crate::config::{AnalysisConfig, Backend};
use crate::error::ImageReportError;
use crate::pipeline::encode::EncodedImage;
use crate::prompts::{LMSTUDIO_SYSTEM_PROMPT, LMSTUDIO_USER_PROMPT, OLLAMA_PROMPT};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ── LM Studio (OpenAI-compatible) wire types ─────────────────────────────

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: MessageContent<'a>,
}

/// System messages carry a plain string; the user turn carries an array of
/// typed parts. `untagged` picks the right JSON shape for each.
#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: String,
}

// ── Ollama wire types ────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<&'a str>,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

// ── Request builders ─────────────────────────────────────────────────────

fn build_chat_request<'a>(
    config: &'a AnalysisConfig,
    image: &EncodedImage,
) -> ChatCompletionRequest<'a> {
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(LMSTUDIO_SYSTEM_PROMPT);

    ChatCompletionRequest {
        model: config.model_id(),
        messages: vec![
            ChatMessage {
                role: "system",
                content: MessageContent::Text(system_prompt),
            },
            ChatMessage {
                role: "user",
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: LMSTUDIO_USER_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.to_data_uri(),
                        },
                    },
                ]),
            },
        ],
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        stream: false,
    }
}

fn build_generate_request<'a>(
    config: &'a AnalysisConfig,
    image: &'a EncodedImage,
) -> GenerateRequest<'a> {
    GenerateRequest {
        model: config.model_id(),
        prompt: config.system_prompt.as_deref().unwrap_or(OLLAMA_PROMPT),
        images: vec![&image.base64],
        stream: false,
    }
}

// ── Entry point ──────────────────────────────────────────────────────────

/// Submit one image to the configured backend and return the raw report.
///
/// Maps every failure to an [`ImageReportError`] so the caller can record
/// it against the image and keep going. An empty or whitespace-only answer
/// counts as a failure: a valid image must produce a non-empty report.
pub async fn request_report(
    client: &reqwest::Client,
    config: &AnalysisConfig,
    name: &str,
    image: &EncodedImage,
) -> Result<String, ImageReportError> {
    let endpoint = config.endpoint_url();
    debug!(
        "Requesting report for '{}' from {} backend at {}",
        name, config.backend, endpoint
    );

    let request = match config.backend {
        Backend::LmStudio => client.post(endpoint).json(&build_chat_request(config, image)),
        Backend::Ollama => client
            .post(endpoint)
            .json(&build_generate_request(config, image)),
    };

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            ImageReportError::Timeout {
                name: name.to_string(),
                secs: config.api_timeout_secs,
            }
        } else {
            ImageReportError::ApiFailed {
                name: name.to_string(),
                detail: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        warn!("Backend returned {} for '{}': {}", status, name, detail);
        return Err(ImageReportError::ApiStatus {
            name: name.to_string(),
            status: status.as_u16(),
            detail: truncate(&detail, 200),
        });
    }

    let report = match config.backend {
        Backend::LmStudio => {
            let body: ChatCompletionResponse =
                response.json().await.map_err(|e| ImageReportError::ApiFailed {
                    name: name.to_string(),
                    detail: format!("malformed response: {e}"),
                })?;
            body.choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .unwrap_or_default()
        }
        Backend::Ollama => {
            let body: GenerateResponse =
                response.json().await.map_err(|e| ImageReportError::ApiFailed {
                    name: name.to_string(),
                    detail: format!("malformed response: {e}"),
                })?;
            body.response
        }
    };

    if report.trim().is_empty() {
        return Err(ImageReportError::EmptyReport {
            name: name.to_string(),
        });
    }

    debug!("'{}': received {} bytes of report text", name, report.len());
    Ok(report)
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let cut = s
            .char_indices()
            .take_while(|(i, _)| *i < max)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}…", &s[..cut])
    }
}
