mod error;
mod gemini;
mod openai;
pub mod retry;
pub mod structured;

pub use error::LLMError;
pub use gemini::{GeminiClient, GroundedResponse};
pub use openai::OpenAIClient;
pub use retry::{with_retry, RetryPolicy, Retryable};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Trait for Large Language Model chat endpoints.
///
/// The model is chosen per call because one research run uses different
/// models for query generation, reflection and the final answer.
///
/// # Example
///
/// ```ignore
/// use sift_core::llm::{OpenAIClient, LLM};
///
/// let llm = OpenAIClient::openrouter("sk-...");
/// let text = llm.chat("anthropic/claude-3.5-sonnet", "Hello!", 0.0).await?;
/// ```
#[async_trait]
pub trait LLM: Send + Sync {
    /// Complete a single user prompt and return the reply text.
    async fn chat(&self, model: &str, prompt: &str, temperature: f32) -> Result<String, LLMError>;
}

/// Blanket implementation for boxed trait objects.
#[async_trait]
impl LLM for Box<dyn LLM> {
    async fn chat(&self, model: &str, prompt: &str, temperature: f32) -> Result<String, LLMError> {
        (**self).chat(model, prompt, temperature).await
    }
}

/// A model offered by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub display_name: String,
    pub description: String,
}

impl ModelInfo {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            description: description.into(),
        }
    }
}

/// Live model listing from a provider API.
#[async_trait]
pub trait ModelLister: Send + Sync {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, LLMError>;
}
