use async_trait::async_trait;

use super::chat::ChatClient;
use super::{CompletionOptions, LlmProvider, ProviderKind};
use crate::config::ProviderSettings;
use crate::error::CoreResult;

/// DeepSeek's OpenAI-compatible chat API.
pub struct DeepSeekProvider {
    chat: ChatClient,
}

impl DeepSeekProvider {
    pub fn new(settings: &ProviderSettings) -> CoreResult<Self> {
        Ok(DeepSeekProvider {
            chat: ChatClient::new(ProviderKind::DeepSeek, settings)?,
        })
    }
}

#[async_trait]
impl LlmProvider for DeepSeekProvider {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> CoreResult<String> {
        self.chat.complete(prompt, options).await
    }
}
