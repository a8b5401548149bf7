//! Provider abstraction over the three backend families.
//!
//! Every backend answers the same three questions for the research graph:
//! plain chat, JSON constrained by a schema, and a web search that comes
//! back as a summary citing short URLs. Search never fails outward; a broken
//! search becomes an empty, annotated [`WebSearchOutcome`].

mod catalog;
mod factory;
mod grounded;
mod indexed;

pub use catalog::{
    fallback_models, list_available_models, list_models, provider_info, ModelListing,
    ModelSource, ProviderInfo,
};
pub use factory::{build_backend, Provider};
pub use grounded::{grounded_outcome, GroundedBackend};
pub use indexed::IndexedChatBackend;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::citation::{CitationId, SourceRef};
use crate::config::ProviderKind;
use crate::llm::structured::{parse_structured, schema_for};
use crate::llm::LLMError;
use crate::search::{SearchTask, NO_RESULTS};

/// Result of one web research task.
#[derive(Debug, Clone, PartialEq)]
pub struct WebSearchOutcome {
    /// Summary text citing sources by short URL.
    pub summary: String,
    /// Sources introduced by this task.
    pub sources: Vec<(CitationId, SourceRef)>,
    /// Why the search degraded, if it did.
    pub error: Option<String>,
}

impl WebSearchOutcome {
    pub fn new(summary: impl Into<String>, sources: Vec<(CitationId, SourceRef)>) -> Self {
        Self {
            summary: summary.into(),
            sources,
            error: None,
        }
    }

    /// The empty result a failed search collapses into.
    pub fn degraded(error: impl Into<String>) -> Self {
        Self {
            summary: NO_RESULTS.to_string(),
            sources: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// An empty result with nothing to report.
    pub fn empty() -> Self {
        Self::new(NO_RESULTS, Vec::new())
    }
}

/// A configured backend the research graph runs against.
#[async_trait]
pub trait ResearchBackend: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Free-form completion.
    async fn chat(&self, model: &str, prompt: &str, temperature: f32) -> Result<String, LLMError>;

    /// Raw JSON text expected to match `schema`.
    ///
    /// Backends with native structured output constrain generation; the rest
    /// inject the schema into the prompt.
    async fn structured_text(
        &self,
        model: &str,
        prompt: &str,
        schema: &Value,
        temperature: f32,
    ) -> Result<String, LLMError>;

    /// Runs one web research task. Infallible: failures degrade.
    async fn web_search(&self, task: &SearchTask, result_limit: usize) -> WebSearchOutcome;
}

#[async_trait]
impl ResearchBackend for Box<dyn ResearchBackend> {
    fn kind(&self) -> ProviderKind {
        (**self).kind()
    }

    async fn chat(&self, model: &str, prompt: &str, temperature: f32) -> Result<String, LLMError> {
        (**self).chat(model, prompt, temperature).await
    }

    async fn structured_text(
        &self,
        model: &str,
        prompt: &str,
        schema: &Value,
        temperature: f32,
    ) -> Result<String, LLMError> {
        (**self).structured_text(model, prompt, schema, temperature).await
    }

    async fn web_search(&self, task: &SearchTask, result_limit: usize) -> WebSearchOutcome {
        (**self).web_search(task, result_limit).await
    }
}

/// Requests a value of `T` and decodes it, tolerating fenced JSON.
pub async fn structured_chat<T, B>(
    backend: &B,
    model: &str,
    prompt: &str,
    temperature: f32,
) -> Result<T, LLMError>
where
    T: JsonSchema + DeserializeOwned,
    B: ResearchBackend + ?Sized,
{
    let schema = schema_for::<T>();
    let raw = backend
        .structured_text(model, prompt, &schema, temperature)
        .await?;
    parse_structured(&raw)
}
