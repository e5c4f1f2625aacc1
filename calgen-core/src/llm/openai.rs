use async_trait::async_trait;

use super::chat::ChatClient;
use super::{CompletionOptions, LlmProvider, ProviderKind};
use crate::config::ProviderSettings;
use crate::error::CoreResult;

/// OpenAI chat completions.
pub struct OpenAiProvider {
    chat: ChatClient,
}

impl OpenAiProvider {
    pub fn new(settings: &ProviderSettings) -> CoreResult<Self> {
        Ok(OpenAiProvider {
            chat: ChatClient::new(ProviderKind::OpenAi, settings)?,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> CoreResult<String> {
        self.chat.complete(prompt, options).await
    }
}
