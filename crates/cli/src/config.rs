//! Configuration loading from twin.toml and the environment.

use notify::MailConfig;
use runtime::{
    AnthropicBackend, AnyBackend, EngineOptions, OpenAiBackend, PersonaContext,
    providers::{DEEPSEEK_BASE_URL, OPENAI_BASE_URL},
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

const DEFAULT_BIOGRAPHY: &str = "biography.txt";
const DEFAULT_PROFILE: &str = "profile.txt";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub persona: PersonaConfig,
    pub mail: MailConfig,
    pub engine: EngineConfig,
}

/// Model provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    DeepSeek,
    Anthropic,
}

impl ProviderKind {
    /// Environment variable holding this provider's API key.
    pub fn key_var(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::DeepSeek => "DEEPSEEK_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::DeepSeek => "deepseek-chat",
            Self::Anthropic => "claude-sonnet-4-20250514",
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "deepseek" => Ok(Self::DeepSeek),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::OpenAi => "openai",
            Self::DeepSeek => "deepseek",
            Self::Anthropic => "anthropic",
        };
        f.write_str(name)
    }
}

/// Backend provider configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Inferred from whichever API key is set when absent.
    pub provider: Option<ProviderKind>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    /// Overrides the provider's API root (OpenAI-compatible providers only).
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// Who the agent speaks for.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    pub name: Option<String>,
    /// Plain-text biography. Defaults to `biography.txt`.
    pub biography: Option<PathBuf>,
    /// Plain-text profile. Defaults to `profile.txt`.
    pub profile: Option<PathBuf>,
}

/// Turn limits.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_rounds: Option<usize>,
    pub max_retries: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
}

impl EngineConfig {
    pub fn options(&self) -> EngineOptions {
        let defaults = EngineOptions::default();
        EngineOptions {
            max_rounds: self.max_rounds.unwrap_or(defaults.max_rounds),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff: self
                .retry_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load the file if it exists, otherwise start from defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> std::result::Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Fill unset values from the process environment.
    pub fn with_env(self) -> std::result::Result<Self, ConfigError> {
        self.fill_from(|key| std::env::var(key).ok())
    }

    /// Fill unset values from `lookup`. File values always win.
    pub fn fill_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> std::result::Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.backend.provider.is_none() {
            self.backend.provider = match get("TWIN_PROVIDER") {
                Some(name) => Some(name.parse()?),
                None if self.backend.api_key.is_some() => None,
                None => [
                    ProviderKind::OpenAi,
                    ProviderKind::DeepSeek,
                    ProviderKind::Anthropic,
                ]
                .into_iter()
                .find(|kind| get(kind.key_var()).is_some()),
            };
        }
        let provider = self.provider();
        let backend = &mut self.backend;
        backend.api_key = backend.api_key.take().or_else(|| get(provider.key_var()));
        backend.model = backend.model.take().or_else(|| get("TWIN_MODEL"));
        backend.base_url = backend.base_url.take().or_else(|| get("TWIN_BASE_URL"));

        let persona = &mut self.persona;
        persona.name = persona.name.take().or_else(|| get("TWIN_PERSONA_NAME"));
        persona.biography = persona
            .biography
            .take()
            .or_else(|| get("TWIN_BIOGRAPHY").map(PathBuf::from));
        persona.profile = persona
            .profile
            .take()
            .or_else(|| get("TWIN_PROFILE").map(PathBuf::from));

        self.mail = self.mail.fill_from(&lookup);
        Ok(self)
    }

    pub fn provider(&self) -> ProviderKind {
        self.backend.provider.unwrap_or(ProviderKind::OpenAi)
    }

    pub fn model(&self) -> &str {
        self.backend
            .model
            .as_deref()
            .unwrap_or_else(|| self.provider().default_model())
    }

    /// Build the configured model backend.
    pub fn backend(&self) -> Result<AnyBackend> {
        let provider = self.provider();
        let api_key = self
            .backend
            .api_key
            .clone()
            .ok_or(ConfigError::MissingApiKey {
                provider,
                var: provider.key_var(),
            })?;
        let timeout = self.backend.timeout_secs.map(Duration::from_secs);

        let backend = match provider {
            ProviderKind::OpenAi | ProviderKind::DeepSeek => {
                let default_url = if provider == ProviderKind::DeepSeek {
                    DEEPSEEK_BASE_URL
                } else {
                    OPENAI_BASE_URL
                };
                let base_url = self.backend.base_url.as_deref().unwrap_or(default_url);
                let mut builder = OpenAiBackend::builder(api_key, self.model()).base_url(base_url);
                if let Some(timeout) = timeout {
                    builder = builder.timeout(timeout);
                }
                AnyBackend::from(builder.build()?)
            }
            ProviderKind::Anthropic => {
                let mut builder = AnthropicBackend::builder(api_key, self.model());
                if let Some(max_tokens) = self.backend.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }
                if let Some(timeout) = timeout {
                    builder = builder.timeout(timeout);
                }
                AnyBackend::from(builder.build()?)
            }
        };
        Ok(backend)
    }

    /// Read the biography and profile and build the persona.
    pub fn persona(&self) -> Result<PersonaContext> {
        let name = self
            .persona
            .name
            .as_deref()
            .ok_or(ConfigError::MissingPersonaName)?;
        let biography = read_text(self.persona.biography.as_deref(), DEFAULT_BIOGRAPHY)?;
        let profile = read_text(self.persona.profile.as_deref(), DEFAULT_PROFILE)?;
        Ok(PersonaContext::new(name, biography, profile))
    }
}

fn read_text(path: Option<&Path>, default: &str) -> Result<String> {
    let path = path.unwrap_or_else(|| Path::new(default));
    std::fs::read_to_string(path).map_err(|source| Error::ReadPersona {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("unknown provider '{0}': expected openai, deepseek or anthropic")]
    UnknownProvider(String),

    #[error("no API key for {provider}: set backend.api_key or {var}")]
    MissingApiKey {
        provider: ProviderKind,
        var: &'static str,
    },

    #[error("persona name not configured: set persona.name or TWIN_PERSONA_NAME")]
    MissingPersonaName,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parse_full_file() {
        let config = Config::parse(
            r#"
[backend]
provider = "deepseek"
model = "deepseek-chat"
api_key = "sk-file"

[persona]
name = "Ada Lovelace"
biography = "me/summary.txt"

[mail]
smtp_host = "smtp.example.com"
from = "bot@example.com"

[engine]
max_rounds = 4
retry_backoff_ms = 10
"#,
        )
        .unwrap();

        assert_eq!(config.provider(), ProviderKind::DeepSeek);
        assert_eq!(config.persona.name.as_deref(), Some("Ada Lovelace"));
        assert!(config.mail.check().is_ok());
        let options = config.engine.options();
        assert_eq!(options.max_rounds, 4);
        assert_eq!(options.max_retries, runtime::DEFAULT_MAX_RETRIES);
        assert_eq!(options.retry_backoff, Duration::from_millis(10));
    }

    #[test]
    fn provider_inferred_from_key() {
        let config = Config::default()
            .fill_from(env(&[("DEEPSEEK_API_KEY", "sk-ds")]))
            .unwrap();
        assert_eq!(config.provider(), ProviderKind::DeepSeek);
        assert_eq!(config.backend.api_key.as_deref(), Some("sk-ds"));
        assert_eq!(config.model(), "deepseek-chat");
    }

    #[test]
    fn explicit_provider_reads_its_key() {
        let config = Config::default()
            .fill_from(env(&[
                ("TWIN_PROVIDER", "anthropic"),
                ("OPENAI_API_KEY", "sk-openai"),
                ("ANTHROPIC_API_KEY", "sk-ant"),
            ]))
            .unwrap();
        assert_eq!(config.provider(), ProviderKind::Anthropic);
        assert_eq!(config.backend.api_key.as_deref(), Some("sk-ant"));
    }

    #[test]
    fn unknown_provider_rejected() {
        let err = Config::default()
            .fill_from(env(&[("TWIN_PROVIDER", "parrot")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProvider(name) if name == "parrot"));
    }

    #[test]
    fn missing_key_is_reported() {
        let err = Config::default().backend().err().unwrap();
        assert!(matches!(
            err,
            Error::Config(ConfigError::MissingApiKey {
                var: "OPENAI_API_KEY",
                ..
            })
        ));
    }

    #[test]
    fn backend_builds_from_file_key() {
        let config = Config::parse(
            r#"
[backend]
provider = "openai"
api_key = "sk-file"
model = "gpt-4o"
"#,
        )
        .unwrap();
        let backend = config.backend().unwrap();
        assert_eq!(
            backend.to_string(),
            "openai(gpt-4o, https://api.openai.com/v1/chat/completions)"
        );
    }

    #[test]
    fn persona_requires_name() {
        let err = Config::default().persona().unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::MissingPersonaName)));
    }

    #[test]
    fn persona_reads_files() {
        let dir = std::env::temp_dir().join(format!("twin-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let bio = dir.join("bio.txt");
        let profile = dir.join("profile.txt");
        std::fs::write(&bio, "Born in London.").unwrap();
        std::fs::write(&profile, "Mathematician").unwrap();

        let config = Config {
            persona: PersonaConfig {
                name: Some("Ada".into()),
                biography: Some(bio),
                profile: Some(profile),
            },
            ..Default::default()
        };
        let persona = config.persona().unwrap();

        assert_eq!(persona.biography(), "Born in London.");
        assert!(persona.instruction().contains("Mathematician"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_persona_file_names_path() {
        let config = Config {
            persona: PersonaConfig {
                name: Some("Ada".into()),
                biography: Some(PathBuf::from("/nonexistent/bio.txt")),
                profile: None,
            },
            ..Default::default()
        };
        let err = config.persona().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/bio.txt"));
    }
}
