//! The completion capability: send a prompt, get text back.
//!
//! Both supported vendors expose an OpenAI-style chat completions API, so
//! the HTTP plumbing lives in `chat` and each vendor wraps it.

mod chat;
mod deepseek;
mod openai;

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ApiSettings;
use crate::error::{CoreError, CoreResult};

pub use deepseek::DeepSeekProvider;
pub use openai::OpenAiProvider;

/// Sampling options for one completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// One attempt; failures come back as `CoreError::Provider`.
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> CoreResult<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    DeepSeek,
}

impl ProviderKind {
    /// In auto-selection order.
    pub const ALL: [ProviderKind; 2] = [ProviderKind::OpenAi, ProviderKind::DeepSeek];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::DeepSeek => "deepseek",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-3.5-turbo",
            ProviderKind::DeepSeek => "deepseek-chat",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::DeepSeek => "https://api.deepseek.com/v1",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let available: Vec<_> = ProviderKind::ALL.iter().map(|k| k.as_str()).collect();
                CoreError::Config(format!(
                    "Unsupported LLM provider '{}'. Available: {}",
                    s,
                    available.join(", ")
                ))
            })
    }
}

/// Pick the provider to use: the preferred one if given, else the first with an API key.
pub fn select_provider(
    preferred: Option<ProviderKind>,
    api: &ApiSettings,
) -> CoreResult<ProviderKind> {
    if let Some(kind) = preferred {
        if !api.provider(kind).has_api_key() {
            return Err(CoreError::Config(format!(
                "No API key configured for {}. Set {}_API_KEY or api.{}.api_key",
                kind,
                kind.as_str().to_uppercase(),
                kind
            )));
        }
        return Ok(kind);
    }

    ProviderKind::ALL
        .into_iter()
        .find(|kind| api.provider(*kind).has_api_key())
        .ok_or_else(|| {
            CoreError::Config(
                "No LLM clients available. Set OPENAI_API_KEY or DEEPSEEK_API_KEY".into(),
            )
        })
}

/// Build the client for `kind`.
pub fn provider_for(kind: ProviderKind, api: &ApiSettings) -> CoreResult<Box<dyn LlmProvider>> {
    let settings = api.provider(kind);
    Ok(match kind {
        ProviderKind::OpenAi => Box::new(OpenAiProvider::new(settings)?),
        ProviderKind::DeepSeek => Box::new(DeepSeekProvider::new(settings)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_with_keys(openai: Option<&str>, deepseek: Option<&str>) -> ApiSettings {
        let mut api = ApiSettings::default();
        api.openai.api_key = openai.map(str::to_string);
        api.deepseek.api_key = deepseek.map(str::to_string);
        api
    }

    #[test]
    fn test_parse_provider_names() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("DeepSeek".parse::<ProviderKind>().unwrap(), ProviderKind::DeepSeek);
        assert!(matches!("claude".parse::<ProviderKind>(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_select_prefers_named_provider() {
        let api = api_with_keys(Some("sk-a"), Some("sk-b"));
        assert_eq!(
            select_provider(Some(ProviderKind::DeepSeek), &api).unwrap(),
            ProviderKind::DeepSeek
        );
    }

    #[test]
    fn test_select_falls_back_to_first_configured() {
        let api = api_with_keys(None, Some("sk-b"));
        assert_eq!(select_provider(None, &api).unwrap(), ProviderKind::DeepSeek);

        let api = api_with_keys(Some("sk-a"), Some("sk-b"));
        assert_eq!(select_provider(None, &api).unwrap(), ProviderKind::OpenAi);
    }

    #[test]
    fn test_select_requires_a_key() {
        let api = api_with_keys(None, Some(" "));
        assert!(select_provider(None, &api).is_err());
        assert!(select_provider(Some(ProviderKind::OpenAi), &api).is_err());
    }

    #[test]
    fn test_provider_for_builds_configured_client() {
        let api = api_with_keys(Some("sk-a"), None);
        assert!(provider_for(ProviderKind::OpenAi, &api).is_ok());
        assert!(provider_for(ProviderKind::DeepSeek, &api).is_err());
    }
}
