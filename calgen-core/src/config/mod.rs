//! Configuration for calgen.
//!
//! Settings are resolved once at startup and handed to each component by
//! reference. Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. the TOML config file (~/.config/calgen/config.toml unless given)
//! 3. `CALGEN__SECTION__KEY` environment variables
//! 4. `OPENAI_API_KEY`, `DEEPSEEK_API_KEY`, `REDIS_HOST`, `REDIS_PORT`,
//!    `REDIS_PASSWORD`, `REDIS_DB`

mod sections;

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::llm::ProviderKind;
use crate::prompt::Prompts;

pub use sections::{ApiSettings, GenerationSettings, ProviderSettings, RedisSettings};

/// Well-known variables and the keys they override.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("OPENAI_API_KEY", "api.openai.api_key"),
    ("DEEPSEEK_API_KEY", "api.deepseek.api_key"),
    ("REDIS_HOST", "redis.host"),
    ("REDIS_PORT", "redis.port"),
    ("REDIS_PASSWORD", "redis.password"),
    ("REDIS_DB", "redis.db"),
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub redis: RedisSettings,
    pub generation: GenerationSettings,
    pub prompts: Prompts,
}

fn config_error(e: config::ConfigError) -> CoreError {
    CoreError::Config(e.to_string())
}

impl Settings {
    /// ~/.config/calgen/config.toml
    pub fn default_path() -> CoreResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CoreError::Config("Could not determine config directory".into()))?
            .join("calgen");

        Ok(config_dir.join("config.toml"))
    }

    /// Load settings from `path` (must exist) or the default path (may be absent).
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        Self::load_with_env(path, |name| std::env::var(name).ok())
    }

    /// Like `load`, reading the well-known variables through `lookup`.
    pub fn load_with_env(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> CoreResult<Self> {
        let (path, required) = match path {
            Some(p) => (expand_path(p), true),
            None => (Self::default_path()?, false),
        };

        let mut builder = Config::builder();

        for kind in ProviderKind::ALL {
            builder = builder
                .set_default(format!("api.{}.model", kind), kind.default_model())
                .map_err(config_error)?
                .set_default(format!("api.{}.base_url", kind), kind.default_base_url())
                .map_err(config_error)?;
        }

        builder = builder
            .add_source(File::from(path.clone()).required(required))
            .add_source(
                Environment::with_prefix("CALGEN")
                    .prefix_separator("__")
                    .separator("__"),
            );

        for (var, key) in ENV_OVERRIDES {
            let value = lookup(var).filter(|v| !v.trim().is_empty());
            builder = builder
                .set_override_option(*key, value)
                .map_err(config_error)?;
        }

        let settings: Settings = builder
            .build()
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))?
            .try_deserialize()
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Write a starter config file with every option commented out.
    pub fn create_default_config(path: &Path) -> CoreResult<()> {
        let contents = format!(
            "\
# calgen configuration

# [api.openai]
# api_key = \"sk-...\"            # or set OPENAI_API_KEY
# model = \"{openai_model}\"
# max_tokens = 1000
# temperature = 0.7

# [api.deepseek]
# api_key = \"...\"               # or set DEEPSEEK_API_KEY
# model = \"{deepseek_model}\"

# [redis]
# host = \"localhost\"
# port = 6379
# db = 0

# [generation]
# users = 50
# events_per_user = \"2-4\"
# formats = [\"json\", \"csv\"]
# output_dir = \"data/exported\"
",
            openai_model = ProviderKind::OpenAi.default_model(),
            deepseek_model = ProviderKind::DeepSeek.default_model(),
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CoreError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| CoreError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

/// Expand `~` in a user-supplied path.
pub fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportFormat;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_empty_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "");
        let settings = Settings::load_with_env(Some(&path), no_env).unwrap();

        assert_eq!(settings.api.openai.model, "gpt-3.5-turbo");
        assert_eq!(settings.api.deepseek.model, "deepseek-chat");
        assert_eq!(settings.api.deepseek.base_url, "https://api.deepseek.com/v1");
        assert_eq!(settings.api.openai.api_key, None);
        assert_eq!(settings.redis.host, "localhost");
        assert_eq!(settings.redis.port, 6379);
        assert_eq!(settings.generation.users, 50);
        assert_eq!(settings.generation.events_per_user.to_string(), "2-4");
        assert_eq!(settings.generation.formats, vec![ExportFormat::Json]);
        assert!(settings.prompts.user_generation.contains("{count}"));
    }

    #[test]
    fn test_file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[api.openai]
api_key = "sk-file"
model = "gpt-4o-mini"
temperature = 0.2

[redis]
host = "cache.internal"
port = 6380

[generation]
users = 5
events_per_user = "2-3"
formats = ["json", "csv"]
"#,
        );
        let settings = Settings::load_with_env(Some(&path), no_env).unwrap();

        assert_eq!(settings.api.openai.api_key.as_deref(), Some("sk-file"));
        assert_eq!(settings.api.openai.model, "gpt-4o-mini");
        assert!((settings.api.openai.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(settings.api.openai.max_tokens, 1000);
        assert_eq!(settings.redis.host, "cache.internal");
        assert_eq!(settings.redis.port, 6380);
        assert_eq!(settings.generation.users, 5);
        assert_eq!(settings.generation.events_per_user.max(), 3);
        assert_eq!(
            settings.generation.formats,
            vec![ExportFormat::Json, ExportFormat::Csv]
        );
    }

    #[test]
    fn test_well_known_env_vars_win() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[api.openai]\napi_key = \"sk-file\"\n");
        let env = HashMap::from([
            ("OPENAI_API_KEY", "sk-env"),
            ("DEEPSEEK_API_KEY", "  "),
            ("REDIS_PORT", "6390"),
            ("REDIS_PASSWORD", "hunter2"),
        ]);

        let settings =
            Settings::load_with_env(Some(&path), |name| env.get(name).map(|v| v.to_string()))
                .unwrap();

        assert_eq!(settings.api.openai.api_key.as_deref(), Some("sk-env"));
        assert_eq!(settings.api.deepseek.api_key, None);
        assert_eq!(settings.redis.port, 6390);
        assert_eq!(settings.redis.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(matches!(
            Settings::load_with_env(Some(&path), no_env),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn test_bad_event_range_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[generation]\nevents_per_user = \"5-1\"\n");
        assert!(matches!(
            Settings::load_with_env(Some(&path), no_env),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn test_default_config_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Settings::create_default_config(&path).unwrap();

        let settings = Settings::load_with_env(Some(&path), no_env).unwrap();
        assert_eq!(settings.generation.users, 50);
    }
}
