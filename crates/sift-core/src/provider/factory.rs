use tracing::debug;

use super::{GroundedBackend, IndexedChatBackend, ResearchBackend};
use crate::config::{ConfigError, HttpConfig, ProviderConfiguration, ProviderKind};
use crate::llm::{GeminiClient, OpenAIClient};
use crate::search::ExaClient;

/// A backend selection with everything needed to build its clients.
#[derive(Debug, Clone)]
pub enum Provider {
    /// Gemini with Google Search grounding.
    NativeGrounded {
        api_key: Option<String>,
        base_url: String,
        search_model: String,
        http: HttpConfig,
    },
    /// OpenRouter chat with the Exa index.
    ExternalIndexChat {
        api_key: Option<String>,
        base_url: String,
        search_api_key: Option<String>,
        search_base_url: String,
        search_model: String,
        http: HttpConfig,
    },
    /// Local OpenAI-compatible server with the Exa index.
    LocalInference {
        base_url: String,
        search_api_key: Option<String>,
        search_base_url: String,
        search_model: String,
        http: HttpConfig,
    },
}

impl Provider {
    /// Creates a provider from a resolved configuration.
    ///
    /// Web searches use the query generator model.
    pub fn from_config(config: &ProviderConfiguration) -> Self {
        let search_model = config.models.query_generator.clone();
        match config.kind {
            ProviderKind::NativeGrounded => Provider::NativeGrounded {
                api_key: config.api_key.clone(),
                base_url: config.base_url.clone(),
                search_model,
                http: config.http.clone(),
            },
            ProviderKind::ExternalIndexChat => Provider::ExternalIndexChat {
                api_key: config.api_key.clone(),
                base_url: config.base_url.clone(),
                search_api_key: config.search_api_key.clone(),
                search_base_url: config.search_base_url.clone(),
                search_model,
                http: config.http.clone(),
            },
            ProviderKind::LocalInference => Provider::LocalInference {
                base_url: config.base_url.clone(),
                search_api_key: config.search_api_key.clone(),
                search_base_url: config.search_base_url.clone(),
                search_model,
                http: config.http.clone(),
            },
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::NativeGrounded { .. } => ProviderKind::NativeGrounded,
            Provider::ExternalIndexChat { .. } => ProviderKind::ExternalIndexChat,
            Provider::LocalInference { .. } => ProviderKind::LocalInference,
        }
    }

    /// Creates the research backend.
    ///
    /// Fails only on missing credentials.
    pub fn build(self) -> Result<Box<dyn ResearchBackend>, ConfigError> {
        let kind = self.kind();
        debug!(provider = kind.as_str(), "Building research backend");

        match self {
            Provider::NativeGrounded {
                api_key,
                base_url,
                search_model,
                http,
            } => {
                let key = api_key.ok_or(ConfigError::MissingCredential {
                    provider: kind.as_str(),
                    credential: "GEMINI_API_KEY",
                })?;
                let client = GeminiClient::with_http(base_url, key, &http);
                Ok(Box::new(GroundedBackend::new(client, search_model)))
            }

            Provider::ExternalIndexChat {
                api_key,
                base_url,
                search_api_key,
                search_base_url,
                search_model,
                http,
            } => {
                let key = api_key.ok_or(ConfigError::MissingCredential {
                    provider: kind.as_str(),
                    credential: "OPENROUTER_API_KEY",
                })?;
                let index = exa_client(kind, search_api_key, search_base_url, &http)?;
                let llm = OpenAIClient::with_http(base_url, key, &http);
                Ok(Box::new(IndexedChatBackend::new(kind, llm, index, search_model)))
            }

            Provider::LocalInference {
                base_url,
                search_api_key,
                search_base_url,
                search_model,
                http,
            } => {
                let index = exa_client(kind, search_api_key, search_base_url, &http)?;
                let llm = OpenAIClient::with_http(base_url, "", &http);
                Ok(Box::new(IndexedChatBackend::new(kind, llm, index, search_model)))
            }
        }
    }
}

fn exa_client(
    kind: ProviderKind,
    api_key: Option<String>,
    base_url: String,
    http: &HttpConfig,
) -> Result<ExaClient, ConfigError> {
    let key = api_key.ok_or(ConfigError::MissingCredential {
        provider: kind.as_str(),
        credential: "EXA_API_KEY",
    })?;
    Ok(ExaClient::with_http(base_url, key, http))
}

/// Builds the backend for a resolved configuration.
pub fn build_backend(config: &ProviderConfiguration) -> Result<Box<dyn ResearchBackend>, ConfigError> {
    Provider::from_config(config).build()
}
