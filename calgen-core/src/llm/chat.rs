//! OpenAI-style `/chat/completions` client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{CompletionOptions, ProviderKind};
use crate::config::ProviderSettings;
use crate::error::{CoreError, CoreResult};

const SYSTEM_PROMPT: &str = "You are a helpful assistant that generates realistic data for \
calendar applications. Always return valid JSON as requested.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

pub struct ChatClient {
    http: reqwest::Client,
    kind: ProviderKind,
    base_url: String,
    api_key: String,
}

impl ChatClient {
    pub fn new(kind: ProviderKind, settings: &ProviderSettings) -> CoreResult<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CoreError::Config(format!("API key not configured for {}", kind)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| CoreError::Provider(format!("{}: could not build HTTP client: {}", kind, e)))?;

        Ok(ChatClient {
            http,
            kind,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub async fn complete(&self, prompt: &str, options: &CompletionOptions) -> CoreResult<String> {
        let request = ChatRequest {
            model: &options.model,
            messages: [
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        tracing::debug!(provider = %self.kind, model = %options.model, "sending completion request");

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CoreError::Provider(format!("{}: request failed: {}", self.kind, e)))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| CoreError::Provider(format!("{}: could not read response: {}", self.kind, e)))?;

        if !status.is_success() {
            return Err(CoreError::Provider(format!(
                "{} returned {}: {}",
                self.kind,
                status,
                error_message(&body)
            )));
        }

        content_from(&body).map_err(|reason| CoreError::Provider(format!("{}: {}", self.kind, reason)))
    }
}

/// The message text of the first choice.
fn content_from(body: &str) -> Result<String, String> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| format!("invalid response format: {}", e))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .ok_or("response has no choices")?
        .message
        .content
        .unwrap_or_default();

    let content = content.trim();
    if content.is_empty() {
        return Err("empty response".to_string());
    }

    Ok(content.to_string())
}

/// The vendor's error message if the body has one, else the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
