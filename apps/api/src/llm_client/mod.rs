/// LLM Client: the single point of entry for all model calls in the analyzer.
///
/// ARCHITECTURAL RULE: No other module may call the provider API directly.
/// All LLM interactions MUST go through this module.
///
/// Speaks the OpenAI-compatible chat-completions protocol (OpenRouter by default).
/// Each request tries the primary model once, then the fallback model once.
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;

pub mod prompts;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("primary model '{primary_model}' failed ({primary}); fallback model '{fallback_model}' failed ({fallback})")]
    AllModelsFailed {
        primary_model: String,
        primary: Box<LlmError>,
        fallback_model: String,
        fallback: Box<LlmError>,
    },
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
    /// OpenRouter reports some upstream failures in a 200 body.
    error: Option<ProviderErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
    code: Option<serde_json::Value>,
}

/// The text returned by a successful call, with the model that produced it.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub fallback_used: bool,
    pub usage: Option<Usage>,
}

/// Connection and model settings for [`LlmClient`].
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: String,
    pub primary_model: String,
    pub fallback_model: Option<String>,
    pub temperature: f32,
    pub timeout: Duration,
}

impl From<&Config> for LlmSettings {
    fn from(config: &Config) -> Self {
        Self {
            base_url: config.llm_base_url.clone(),
            api_key: config.openrouter_api_key.clone(),
            primary_model: config.primary_model.clone(),
            fallback_model: config.fallback_model.clone(),
            temperature: config.llm_temperature,
            timeout: Duration::from_secs(config.llm_timeout_secs),
        }
    }
}

/// The single LLM client shared by all handlers.
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { client, settings })
    }

    pub fn primary_model(&self) -> &str {
        &self.settings.primary_model
    }

    pub fn fallback_model(&self) -> Option<&str> {
        self.settings.fallback_model.as_deref()
    }

    /// Sends one system + user exchange, switching to the fallback model if the
    /// primary call fails for any reason. No retries beyond that single switch.
    pub async fn complete(&self, system: &str, user: &str) -> Result<Completion, LlmError> {
        let primary = self.settings.primary_model.as_str();

        let primary_err = match self.call_model(primary, system, user).await {
            Ok(completion) => return Ok(completion),
            Err(e) => e,
        };

        let Some(fallback) = self.settings.fallback_model.as_deref() else {
            warn!(model = primary, "LLM call failed and no fallback is configured: {primary_err}");
            return Err(primary_err);
        };

        warn!(
            primary = primary,
            fallback = fallback,
            "Primary model failed, switching to fallback: {primary_err}"
        );

        match self.call_model(fallback, system, user).await {
            Ok(mut completion) => {
                completion.fallback_used = true;
                Ok(completion)
            }
            Err(fallback_err) => Err(LlmError::AllModelsFailed {
                primary_model: primary.to_string(),
                primary: Box::new(primary_err),
                fallback_model: fallback.to_string(),
                fallback: Box::new(fallback_err),
            }),
        }
    }

    /// Makes a single call to one model and returns its text content.
    async fn call_model(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<Completion, LlmError> {
        let request_body = ChatRequest {
            model,
            temperature: self.settings.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        info!(model = model, "Calling LLM");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.settings.base_url))
            .bearer_auth(&self.settings.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ProviderError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;

        if let Some(err) = chat.error {
            let status = err
                .code
                .as_ref()
                .and_then(|c| c.as_u64())
                .and_then(|c| u16::try_from(c).ok())
                .unwrap_or(status.as_u16());
            return Err(LlmError::Api {
                status,
                message: err.message,
            });
        }

        let text = chat
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or(LlmError::EmptyContent)?;

        if let Some(usage) = chat.usage {
            debug!(
                model = model,
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }

        Ok(Completion {
            text,
            model: model.to_string(),
            fallback_used: false,
            usage: chat.usage,
        })
    }
}

/// Deserializes a model reply as JSON, tolerating code fences and surrounding prose.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    serde_json::from_str(extract_json_object(text)).map_err(LlmError::Parse)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
/// Anything after the closing fence is dropped.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(body) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Narrows the reply to the outermost `{ ... }` span, dropping prose on either side.
fn extract_json_object(text: &str) -> &str {
    let text = strip_json_fences(text);
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}
