//! Configuration management for Sift.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `sift.toml` or `config.yaml` file
//! 3. User config `~/.config/sift/config.toml`
//! 4. Built-in defaults (lowest priority)
//!
//! The loaded [`Config`] is resolved once into an immutable
//! [`ProviderConfiguration`] that every component receives by reference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
///
/// These are the only errors allowed to abort a research run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to parse YAML config file: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Missing {credential} for provider '{provider}'")]
    MissingCredential {
        provider: &'static str,
        credential: &'static str,
    },
}

/// The three supported backend families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Gemini with built-in Google Search grounding.
    NativeGrounded,
    /// OpenRouter chat completions paired with the Exa search index.
    ExternalIndexChat,
    /// A local OpenAI-compatible inference server paired with Exa.
    LocalInference,
}

impl ProviderKind {
    /// Identifier used in config files and environment variables.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::NativeGrounded => "google",
            ProviderKind::ExternalIndexChat => "openrouter",
            ProviderKind::LocalInference => "local",
        }
    }

    /// Whether the LLM endpoint needs an API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderKind::LocalInference)
    }

    /// Whether web search goes through the external index (and needs its key).
    pub fn uses_external_index(&self) -> bool {
        !matches!(self, ProviderKind::NativeGrounded)
    }

    /// Environment variable consulted when the config file has no API key.
    fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::NativeGrounded => Some("GEMINI_API_KEY"),
            ProviderKind::ExternalIndexChat => Some("OPENROUTER_API_KEY"),
            ProviderKind::LocalInference => None,
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::NativeGrounded => DEFAULT_GOOGLE_URL,
            ProviderKind::ExternalIndexChat => DEFAULT_OPENROUTER_URL,
            ProviderKind::LocalInference => DEFAULT_LOCAL_URL,
        }
    }

    fn default_model(&self, role: ModelRole) -> &'static str {
        match (self, role) {
            (ProviderKind::NativeGrounded, ModelRole::Answer) => DEFAULT_GOOGLE_ANSWER_MODEL,
            (ProviderKind::NativeGrounded, _) => DEFAULT_GOOGLE_FAST_MODEL,
            (ProviderKind::ExternalIndexChat, _) => DEFAULT_OPENROUTER_MODEL,
            (ProviderKind::LocalInference, _) => DEFAULT_LOCAL_MODEL,
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" | "gemini" => Ok(ProviderKind::NativeGrounded),
            "openrouter" => Ok(ProviderKind::ExternalIndexChat),
            "local" => Ok(ProviderKind::LocalInference),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The role a model plays in the research loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    QueryGenerator,
    Reflection,
    Answer,
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Provider used for this process: "google", "openrouter" or "local".
    pub active_provider: String,

    /// Gemini settings.
    pub google: ProviderSettings,

    /// OpenRouter settings.
    pub openrouter: ProviderSettings,

    /// Local inference server settings.
    pub local: ProviderSettings,

    /// Research loop configuration.
    pub research: ResearchConfig,

    /// HTTP timeout and retry configuration.
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            active_provider: DEFAULT_PROVIDER.to_string(),
            google: ProviderSettings::default(),
            openrouter: ProviderSettings::default(),
            local: ProviderSettings::default(),
            research: ResearchConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./sift.toml`
    /// 2. `./config.yaml`
    /// 3. `~/.config/sift/config.toml`
    /// 4. Falls back to defaults
    ///
    /// Environment overrides are applied in every case.
    pub fn load() -> Result<Self, ConfigError> {
        for local in [CONFIG_FILE_TOML, CONFIG_FILE_YAML] {
            if Path::new(local).exists() {
                return Self::from_file(local);
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join(USER_CONFIG_DIR).join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file.
    ///
    /// `.yaml` / `.yml` files are parsed as YAML, everything else as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        let mut config: Config = if is_yaml {
            serde_yaml::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides using an arbitrary variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("SIFT_PROVIDER") {
            self.active_provider = provider;
        }

        if let Ok(kind) = self.active_provider.parse::<ProviderKind>() {
            let settings = self.settings_mut(kind);
            if let Some(model) = lookup("SIFT_QUERY_GENERATOR_MODEL") {
                settings.query_generator_model = Some(model);
            }
            if let Some(model) = lookup("SIFT_REFLECTION_MODEL") {
                settings.reflection_model = Some(model);
            }
            if let Some(model) = lookup("SIFT_ANSWER_MODEL") {
                settings.answer_model = Some(model);
            }
        }

        if let Some(n) = lookup("SIFT_INITIAL_QUERIES").and_then(|v| v.parse().ok()) {
            self.research.number_of_initial_queries = n;
        }
        if let Some(n) = lookup("SIFT_MAX_RESEARCH_LOOPS").and_then(|v| v.parse().ok()) {
            self.research.max_research_loops = n;
        }

        // Credentials only fill gaps left by the file.
        for kind in [
            ProviderKind::NativeGrounded,
            ProviderKind::ExternalIndexChat,
            ProviderKind::LocalInference,
        ] {
            let settings = self.settings_mut(kind);
            // A blank placeholder in the file counts as unset.
            settings.api_key = non_empty(settings.api_key.take());
            settings.exa_api_key = non_empty(settings.exa_api_key.take());
            if settings.api_key.is_none() {
                settings.api_key = non_empty(kind.api_key_env().and_then(&lookup));
            }
            if kind.uses_external_index() && settings.exa_api_key.is_none() {
                settings.exa_api_key = non_empty(lookup("EXA_API_KEY"));
            }
        }
    }

    /// The active provider kind.
    pub fn provider_kind(&self) -> Result<ProviderKind, ConfigError> {
        self.active_provider.parse()
    }

    /// Settings section for a provider kind.
    pub fn settings(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::NativeGrounded => &self.google,
            ProviderKind::ExternalIndexChat => &self.openrouter,
            ProviderKind::LocalInference => &self.local,
        }
    }

    fn settings_mut(&mut self, kind: ProviderKind) -> &mut ProviderSettings {
        match kind {
            ProviderKind::NativeGrounded => &mut self.google,
            ProviderKind::ExternalIndexChat => &mut self.openrouter,
            ProviderKind::LocalInference => &mut self.local,
        }
    }

    /// Resolve the active provider into an immutable [`ProviderConfiguration`].
    ///
    /// Credentials are not validated here; that happens when the provider
    /// client is built.
    pub fn resolve(&self) -> Result<ProviderConfiguration, ConfigError> {
        let kind = self.provider_kind()?;
        self.validate()?;
        let settings = self.settings(kind);

        Ok(ProviderConfiguration {
            kind,
            models: ModelNames {
                query_generator: settings.model_or_default(kind, ModelRole::QueryGenerator),
                reflection: settings.model_or_default(kind, ModelRole::Reflection),
                answer: settings.model_or_default(kind, ModelRole::Answer),
            },
            api_key: non_empty(settings.api_key.clone()),
            search_api_key: non_empty(settings.exa_api_key.clone()),
            base_url: settings.base_url_or_default(kind),
            search_base_url: settings
                .search_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_EXA_URL.to_string()),
            http: self.http.clone(),
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "http.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.research.search_results_per_query == 0 {
            return Err(ConfigError::Invalid(
                "research.search_results_per_query must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Per-provider configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// API key for the LLM endpoint.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL for the LLM endpoint.
    pub base_url: Option<String>,

    /// Model used to generate search queries and summarize search results.
    pub query_generator_model: Option<String>,

    /// Model used for reflection.
    pub reflection_model: Option<String>,

    /// Model used for the final answer.
    pub answer_model: Option<String>,

    /// API key for the Exa search index.
    #[serde(skip_serializing)]
    pub exa_api_key: Option<String>,

    /// Base URL for the Exa search index.
    pub search_base_url: Option<String>,
}

impl ProviderSettings {
    /// Get the model for a role, falling back to provider defaults.
    pub fn model_or_default(&self, kind: ProviderKind, role: ModelRole) -> String {
        let configured = match role {
            ModelRole::QueryGenerator => &self.query_generator_model,
            ModelRole::Reflection => &self.reflection_model,
            ModelRole::Answer => &self.answer_model,
        };
        configured
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| kind.default_model(role).to_string())
    }

    /// Get the base URL, falling back to provider defaults.
    pub fn base_url_or_default(&self, kind: ProviderKind) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| kind.default_base_url().to_string())
    }
}

/// Research loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Number of search queries generated for the first wave.
    pub number_of_initial_queries: usize,

    /// Maximum number of reflection cycles.
    pub max_research_loops: usize,

    /// Results requested from the search index per query.
    pub search_results_per_query: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            number_of_initial_queries: DEFAULT_INITIAL_QUERIES,
            max_research_loops: DEFAULT_MAX_RESEARCH_LOOPS,
            search_results_per_query: DEFAULT_SEARCH_RESULTS,
        }
    }
}

/// HTTP timeout and retry configuration shared by all clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,

    /// Backoff before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,

    /// Upper bound for a single backoff delay, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Model names per role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelNames {
    pub query_generator: String,
    pub reflection: String,
    pub answer: String,
}

/// Immutable per-run provider selection, resolved once from [`Config`].
#[derive(Debug, Clone)]
pub struct ProviderConfiguration {
    pub kind: ProviderKind,
    pub models: ModelNames,
    /// LLM endpoint credential.
    pub api_key: Option<String>,
    /// External search index credential.
    pub search_api_key: Option<String>,
    /// LLM endpoint base URL.
    pub base_url: String,
    /// External search index base URL.
    pub search_base_url: String,
    pub http: HttpConfig,
}

impl ProviderConfiguration {
    /// Whether any credential is configured.
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() || self.search_api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.active_provider, DEFAULT_PROVIDER);
        assert_eq!(config.research.max_research_loops, DEFAULT_MAX_RESEARCH_LOOPS);
        assert_eq!(config.http.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[research]"));
        assert!(toml_str.contains("[http]"));
        assert!(!toml_str.contains("api_key"));
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("google".parse::<ProviderKind>().unwrap(), ProviderKind::NativeGrounded);
        assert_eq!("Gemini".parse::<ProviderKind>().unwrap(), ProviderKind::NativeGrounded);
        assert_eq!(
            "openrouter".parse::<ProviderKind>().unwrap(),
            ProviderKind::ExternalIndexChat
        );
        assert_eq!("local".parse::<ProviderKind>().unwrap(), ProviderKind::LocalInference);
        assert!(matches!(
            "bedrock".parse::<ProviderKind>(),
            Err(ConfigError::UnknownProvider(p)) if p == "bedrock"
        ));
    }

    #[test]
    fn test_overrides_fill_missing_credentials_only() {
        let mut config = Config::default();
        config.google.api_key = Some("from-file".to_string());

        let env: HashMap<&str, &str> = [
            ("GEMINI_API_KEY", "from-env"),
            ("OPENROUTER_API_KEY", "router-key"),
            ("EXA_API_KEY", "exa-key"),
        ]
        .into_iter()
        .collect();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.google.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.openrouter.api_key.as_deref(), Some("router-key"));
        assert_eq!(config.openrouter.exa_api_key.as_deref(), Some("exa-key"));
        assert_eq!(config.local.exa_api_key.as_deref(), Some("exa-key"));
        assert!(config.google.exa_api_key.is_none());
        assert!(config.local.api_key.is_none());
    }

    #[test]
    fn test_blank_file_credentials_fall_back_to_env() {
        let mut config = Config::default();
        config.google.api_key = Some(String::new());
        config.openrouter.exa_api_key = Some("  ".to_string());

        let env: HashMap<&str, &str> = [("GEMINI_API_KEY", "env-key"), ("EXA_API_KEY", "exa-key")]
            .into_iter()
            .collect();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.kind, ProviderKind::NativeGrounded);
        assert_eq!(resolved.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.openrouter.exa_api_key.as_deref(), Some("exa-key"));
    }

    #[test]
    fn test_resolve_uses_provider_defaults() {
        let config = Config::default();
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.kind, ProviderKind::NativeGrounded);
        assert_eq!(resolved.models.query_generator, DEFAULT_GOOGLE_FAST_MODEL);
        assert_eq!(resolved.models.answer, DEFAULT_GOOGLE_ANSWER_MODEL);
        assert_eq!(resolved.base_url, DEFAULT_GOOGLE_URL);
        assert_eq!(resolved.search_base_url, DEFAULT_EXA_URL);
    }

    #[test]
    fn test_resolve_treats_blank_key_as_missing() {
        let mut config = Config {
            active_provider: "openrouter".to_string(),
            ..Default::default()
        };
        config.openrouter.api_key = Some("  ".to_string());
        let resolved = config.resolve().unwrap();
        assert!(resolved.api_key.is_none());
        assert!(!resolved.has_credentials());
    }
}
