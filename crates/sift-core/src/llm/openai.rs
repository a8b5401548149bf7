use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{with_retry, LLMError, ModelInfo, ModelLister, RetryPolicy, LLM};
use crate::config::{HttpConfig, DEFAULT_LOCAL_URL, DEFAULT_OPENROUTER_URL};

const DEFAULT_MAX_TOKENS: u32 = 4096;

/// OpenAI-compatible chat completions client.
///
/// Serves both the OpenRouter backend and local inference servers
/// (llama.cpp, vLLM, Ollama) since they speak the same protocol.
pub struct OpenAIClient {
    api_key: String,
    base_url: String,
    max_tokens: u32,
    retry: RetryPolicy,
    client: Client,
}

impl OpenAIClient {
    /// Creates a new OpenAI-compatible client.
    ///
    /// # Arguments
    /// * `base_url` - The API base URL (e.g., "https://openrouter.ai/api/v1")
    /// * `api_key` - The API key (can be empty for local servers)
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_http(base_url, api_key, &HttpConfig::default())
    }

    /// Creates a client with explicit timeout and retry settings.
    pub fn with_http(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        http: &HttpConfig,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            retry: RetryPolicy::from(http),
            client: Client::builder()
                .timeout(http.timeout())
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Creates a client for OpenRouter.
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new(DEFAULT_OPENROUTER_URL, api_key)
    }

    /// Creates a client for a local inference server.
    pub fn local() -> Self {
        Self::new(DEFAULT_LOCAL_URL, "")
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        // Only add authorization if api_key is not empty
        if self.api_key.is_empty() {
            req
        } else {
            req.header("authorization", format!("Bearer {}", self.api_key))
        }
    }

    async fn send_request(&self, request: &ChatRequest) -> Result<String, LLMError> {
        let url = format!("{}/chat/completions", self.base_url);

        let req = self
            .client
            .post(&url)
            .header("content-type", "application/json");

        let response = self.authorize(req).json(request).send().await?;

        let status = response.status();

        if status == 429 {
            return Err(LLMError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LLMError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        // Extract content from first choice
        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(content)
    }

    async fn fetch_models(&self) -> Result<Vec<ModelInfo>, LLMError> {
        let url = format!("{}/models", self.base_url);
        debug!(url = %url, "Fetching models from OpenAI-compatible endpoint");

        let response = self.authorize(self.client.get(&url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LLMError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        parse_models_response(&body)
    }
}

#[async_trait]
impl LLM for OpenAIClient {
    async fn chat(&self, model: &str, prompt: &str, temperature: f32) -> Result<String, LLMError> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
            max_tokens: Some(self.max_tokens),
            temperature: Some(temperature),
        };

        debug!(model, prompt_chars = prompt.len(), "Sending chat completion");
        with_retry(&self.retry, || self.send_request(&request)).await
    }
}

#[async_trait]
impl ModelLister for OpenAIClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, LLMError> {
        with_retry(&self.retry, || self.fetch_models()).await
    }
}

/// Parses a `/models` response, skipping embedding and vision-only models.
pub(crate) fn parse_models_response(body: &Value) -> Result<Vec<ModelInfo>, LLMError> {
    let data = body
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| LLMError::ParseError("Missing 'data' array in models response".into()))?;

    Ok(data
        .iter()
        .filter_map(|m| {
            let id = m.get("id")?.as_str()?;
            let lower = id.to_lowercase();
            if lower.contains("embed") || lower.contains("vision") {
                return None;
            }
            let display_name = m.get("name").and_then(|v| v.as_str()).unwrap_or(id);
            let description = m
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            Some(ModelInfo::new(id, display_name, description))
        })
        .collect())
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}
