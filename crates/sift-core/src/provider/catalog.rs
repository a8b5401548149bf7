//! Model listings with a static fallback per provider.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{ProviderConfiguration, ProviderKind};
use crate::llm::{GeminiClient, ModelInfo, ModelLister, OpenAIClient};

/// Cap applied to hosted chat provider listings, which run to hundreds.
const MAX_LISTED_MODELS: usize = 50;

const LOCAL_MODEL_DESCRIPTION: &str = "Locally running model";

/// Where a model listing came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    Live,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelListing {
    pub provider: ProviderKind,
    pub models: Vec<ModelInfo>,
    pub source: ModelSource,
    /// Why the fallback list was used.
    pub error: Option<String>,
}

impl ModelListing {
    fn fallback(provider: ProviderKind, error: impl Into<String>) -> Self {
        Self {
            provider,
            models: fallback_models(provider),
            source: ModelSource::Fallback,
            error: Some(error.into()),
        }
    }
}

/// Summary of the active provider selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub active_provider: String,
    pub has_credentials: bool,
}

/// Built-in models shown when a live listing is unavailable.
pub fn fallback_models(kind: ProviderKind) -> Vec<ModelInfo> {
    match kind {
        ProviderKind::NativeGrounded => vec![
            ModelInfo::new(
                "models/gemini-2.5-flash",
                "Gemini 2.5 Flash",
                "Fast and efficient model for most tasks",
            ),
            ModelInfo::new(
                "models/gemini-2.5-pro",
                "Gemini 2.5 Pro",
                "Most capable model for complex tasks",
            ),
            ModelInfo::new("models/gemini-2.0-flash", "Gemini 2.0 Flash", "Fast experimental model"),
            ModelInfo::new(
                "models/gemini-2.0-flash-exp",
                "Gemini 2.0 Flash (Experimental)",
                "Latest experimental flash model",
            ),
        ],
        ProviderKind::ExternalIndexChat => vec![
            ModelInfo::new(
                "anthropic/claude-3.5-sonnet",
                "Claude 3.5 Sonnet",
                "Anthropic's most capable model",
            ),
            ModelInfo::new(
                "anthropic/claude-3-haiku",
                "Claude 3 Haiku",
                "Fast and efficient Claude model",
            ),
            ModelInfo::new("openai/gpt-4o", "GPT-4o", "OpenAI's flagship model"),
            ModelInfo::new("openai/gpt-4o-mini", "GPT-4o Mini", "Fast and affordable GPT-4 variant"),
            ModelInfo::new(
                "google/gemini-pro-1.5",
                "Gemini Pro 1.5",
                "Google's advanced Gemini model",
            ),
            ModelInfo::new(
                "meta-llama/llama-3.1-70b-instruct",
                "Llama 3.1 70B",
                "Meta's open-source large model",
            ),
        ],
        ProviderKind::LocalInference => vec![ModelInfo::new(
            "gpt-3.5-turbo",
            "Local Model",
            "Currently loaded model on llama-server",
        )],
    }
}

/// Lists models through `lister`, falling back on error or an empty list.
pub async fn list_models(kind: ProviderKind, lister: &dyn ModelLister) -> ModelListing {
    let mut models = match lister.list_models().await {
        Ok(models) => models,
        Err(e) => {
            warn!(provider = kind.as_str(), error = %e, "Model listing failed, using fallback");
            return ModelListing::fallback(kind, e.to_string());
        }
    };

    if models.is_empty() {
        return ModelListing::fallback(kind, "No models found");
    }

    match kind {
        ProviderKind::ExternalIndexChat => models.truncate(MAX_LISTED_MODELS),
        ProviderKind::LocalInference => {
            for model in &mut models {
                model.display_name = model.id.clone();
                model.description = LOCAL_MODEL_DESCRIPTION.to_string();
            }
        }
        ProviderKind::NativeGrounded => {}
    }

    ModelListing {
        provider: kind,
        models,
        source: ModelSource::Live,
        error: None,
    }
}

/// Lists the models of the configured provider.
pub async fn list_available_models(config: &ProviderConfiguration) -> ModelListing {
    let kind = config.kind;
    if kind.requires_api_key() && config.api_key.is_none() {
        return ModelListing::fallback(kind, "No API key");
    }

    let key = config.api_key.clone().unwrap_or_default();
    let lister: Box<dyn ModelLister> = match kind {
        ProviderKind::NativeGrounded => {
            Box::new(GeminiClient::with_http(&config.base_url, key, &config.http))
        }
        ProviderKind::ExternalIndexChat | ProviderKind::LocalInference => {
            Box::new(OpenAIClient::with_http(&config.base_url, key, &config.http))
        }
    };
    list_models(kind, lister.as_ref()).await
}

pub fn provider_info(config: &ProviderConfiguration) -> ProviderInfo {
    ProviderInfo {
        active_provider: config.kind.as_str().to_string(),
        has_credentials: config.has_credentials(),
    }
}
