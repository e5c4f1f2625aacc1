use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::event_range::EventRange;
use crate::export::ExportFormat;
use crate::llm::{CompletionOptions, ProviderKind};

fn default_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_secs() -> u64 {
    30
}

/// Connection and sampling settings for one LLM vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderSettings {
    pub fn for_kind(kind: ProviderKind) -> Self {
        ProviderSettings {
            api_key: None,
            model: kind.default_model().to_string(),
            base_url: kind.default_base_url().to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "openai_settings")]
    pub openai: ProviderSettings,
    #[serde(default = "deepseek_settings")]
    pub deepseek: ProviderSettings,
}

fn openai_settings() -> ProviderSettings {
    ProviderSettings::for_kind(ProviderKind::OpenAi)
}

fn deepseek_settings() -> ProviderSettings {
    ProviderSettings::for_kind(ProviderKind::DeepSeek)
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            openai: openai_settings(),
            deepseek: deepseek_settings(),
        }
    }
}

impl ApiSettings {
    pub fn provider(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::DeepSeek => &self.deepseek,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub db: i64,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl Default for RedisSettings {
    fn default() -> Self {
        RedisSettings {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            password: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Users requested per run.
    pub users: u32,
    pub events_per_user: EventRange,
    /// Formats written after a run and by `export` when none are given.
    pub formats: Vec<ExportFormat>,
    pub output_dir: PathBuf,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings {
            users: 50,
            events_per_user: EventRange::default(),
            formats: vec![ExportFormat::Json],
            output_dir: PathBuf::from("data/exported"),
        }
    }
}
