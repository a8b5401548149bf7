//! Gemini client with native structured output and Google Search grounding.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{with_retry, LLMError, ModelInfo, ModelLister, RetryPolicy, LLM};
use crate::citation::{GroundingChunk, GroundingSupport};
use crate::config::{HttpConfig, DEFAULT_GOOGLE_URL};

/// Keywords excluding non-text models from live listings.
const EXCLUDED_MODEL_KEYWORDS: &[&str] = &["embedding", "tts", "image", "robotics", "computer-use"];

/// Gemini `generateContent` client.
///
/// Auth is via the `?key=` query parameter.
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
    client: Client,
}

/// Text of a grounded generation plus the evidence tying it to web sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroundedResponse {
    pub text: String,
    pub chunks: Vec<GroundingChunk>,
    pub supports: Vec<GroundingSupport>,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_http(DEFAULT_GOOGLE_URL, api_key, &HttpConfig::default())
    }

    pub fn with_http(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        http: &HttpConfig,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::from(http),
            client: Client::builder()
                .timeout(http.timeout())
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Runs a Google Search grounded generation at temperature 0.
    pub async fn grounded_search(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<GroundedResponse, LLMError> {
        let body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "tools": [{"google_search": {}}],
            "generationConfig": {"temperature": 0},
        });
        let response = with_retry(&self.retry, || self.generate_content(model, &body)).await?;
        parse_grounded_response(&response)
    }

    /// Generates JSON constrained by `schema` using native structured output.
    pub async fn generate_structured(
        &self,
        model: &str,
        prompt: &str,
        schema: &Value,
        temperature: f32,
    ) -> Result<String, LLMError> {
        let body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {
                "temperature": temperature,
                "responseMimeType": "application/json",
                "responseSchema": sanitize_schema(schema),
            },
        });
        let response = with_retry(&self.retry, || self.generate_content(model, &body)).await?;
        response_text(&response)
    }

    async fn generate_content(&self, model: &str, body: &Value) -> Result<Value, LLMError> {
        let model = model.strip_prefix("models/").unwrap_or(model);
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        debug!(model, "Sending Gemini generateContent");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;

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

        response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))
    }

    async fn fetch_models(&self) -> Result<Vec<ModelInfo>, LLMError> {
        let url = format!("{}/models", self.base_url);
        debug!("Fetching models from Gemini API");

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("pageSize", "1000")])
            .send()
            .await?;

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
impl LLM for GeminiClient {
    async fn chat(&self, model: &str, prompt: &str, temperature: f32) -> Result<String, LLMError> {
        let body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {"temperature": temperature},
        });
        let response = with_retry(&self.retry, || self.generate_content(model, &body)).await?;
        response_text(&response)
    }
}

#[async_trait]
impl ModelLister for GeminiClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, LLMError> {
        with_retry(&self.retry, || self.fetch_models()).await
    }
}

fn first_candidate(body: &Value) -> Result<&Value, LLMError> {
    body.get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| LLMError::ParseError("Missing 'candidates' in Gemini response".into()))
}

/// Concatenated text parts of the first candidate.
fn response_text(body: &Value) -> Result<String, LLMError> {
    let candidate = first_candidate(body)?;
    let text = candidate["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect::<String>()
        })
        .unwrap_or_default();
    Ok(text)
}

/// Parses text and grounding metadata from a `generateContent` response.
pub(crate) fn parse_grounded_response(body: &Value) -> Result<GroundedResponse, LLMError> {
    let text = response_text(body)?;
    let metadata = &first_candidate(body)?["groundingMetadata"];

    let chunks = metadata["groundingChunks"]
        .as_array()
        .map(|chunks| {
            chunks
                .iter()
                .map(|chunk| GroundingChunk {
                    uri: chunk["web"]["uri"].as_str().unwrap_or_default().to_string(),
                    title: chunk["web"]["title"].as_str().unwrap_or_default().to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let supports = metadata["groundingSupports"]
        .as_array()
        .map(|supports| {
            supports
                .iter()
                .map(|support| GroundingSupport {
                    start: support["segment"]["startIndex"].as_u64().map(|v| v as usize),
                    end: support["segment"]["endIndex"].as_u64().map(|v| v as usize),
                    chunk_indices: support["groundingChunkIndices"]
                        .as_array()
                        .map(|ix| {
                            ix.iter()
                                .filter_map(|i| i.as_u64().map(|v| v as usize))
                                .collect()
                        })
                        .unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(GroundedResponse {
        text,
        chunks,
        supports,
    })
}

/// Parses a `/models` listing, keeping text generation models.
pub(crate) fn parse_models_response(body: &Value) -> Result<Vec<ModelInfo>, LLMError> {
    let models = body
        .get("models")
        .and_then(|m| m.as_array())
        .ok_or_else(|| LLMError::ParseError("Missing 'models' array in Gemini response".into()))?;

    Ok(models
        .iter()
        .filter_map(|m| {
            let name = m.get("name")?.as_str()?;
            let lower = name.to_lowercase();

            let supports_generate = m["supportedGenerationMethods"]
                .as_array()
                .is_some_and(|methods| methods.iter().any(|x| x.as_str() == Some("generateContent")));
            let text_gemini = lower.contains("gemini")
                && !EXCLUDED_MODEL_KEYWORDS.iter().any(|k| lower.contains(k));
            if !supports_generate && !text_gemini {
                return None;
            }

            let display_name = match m.get("displayName").and_then(|d| d.as_str()) {
                Some(display) => display.to_string(),
                None => prettify_model_name(name),
            };
            let description = m["description"].as_str().unwrap_or_default();
            Some(ModelInfo::new(name, display_name, description))
        })
        .collect())
}

/// "models/gemini-2.5-flash" -> "Gemini 2.5 Flash"
fn prettify_model_name(name: &str) -> String {
    name.strip_prefix("models/")
        .unwrap_or(name)
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Recursively strip JSON Schema fields that Gemini's `responseSchema` rejects.
fn sanitize_schema(schema: &Value) -> Value {
    const ALLOWED_KEYS: &[&str] = &[
        "type",
        "description",
        "properties",
        "required",
        "enum",
        "items",
        "format",
        "nullable",
    ];

    match schema {
        Value::Object(map) => {
            let mut clean = Map::new();
            for (key, value) in map {
                if !ALLOWED_KEYS.contains(&key.as_str()) {
                    continue;
                }
                let cleaned = match key.as_str() {
                    "properties" => match value {
                        Value::Object(props) => Value::Object(
                            props
                                .iter()
                                .map(|(k, v)| (k.clone(), sanitize_schema(v)))
                                .collect(),
                        ),
                        other => other.clone(),
                    },
                    "items" => sanitize_schema(value),
                    _ => value.clone(),
                };
                clean.insert(key.clone(), cleaned);
            }
            Value::Object(clean)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = GeminiClient::new("test-key");
        assert_eq!(client.base_url, DEFAULT_GOOGLE_URL);
        assert_eq!(client.retry, RetryPolicy::default());
    }

    #[test]
    fn test_parse_grounded_response() {
        let body = json!({
            "candidates": [{
                "content": {"parts": [{"text": "Rust 1.0 "}, {"text": "shipped in 2015."}]},
                "groundingMetadata": {
                    "groundingChunks": [
                        {"web": {"uri": "https://a.example/1", "title": "rust-lang.org"}},
                        {"web": {"uri": "https://b.example/2", "title": "wikipedia.org"}}
                    ],
                    "groundingSupports": [
                        {"segment": {"endIndex": 9, "text": "Rust 1.0 "}, "groundingChunkIndices": [0]},
                        {"segment": {"startIndex": 9, "endIndex": 25}, "groundingChunkIndices": [1, 0]}
                    ]
                }
            }]
        });

        let parsed = parse_grounded_response(&body).unwrap();
        assert_eq!(parsed.text, "Rust 1.0 shipped in 2015.");
        assert_eq!(parsed.chunks.len(), 2);
        assert_eq!(parsed.chunks[1].title, "wikipedia.org");
        assert_eq!(parsed.supports[0].start, None);
        assert_eq!(parsed.supports[0].end, Some(9));
        assert_eq!(parsed.supports[1].chunk_indices, vec![1, 0]);
    }

    #[test]
    fn test_parse_response_without_grounding() {
        let body = json!({"candidates": [{"content": {"parts": [{"text": "hi"}]}}]});
        let parsed = parse_grounded_response(&body).unwrap();
        assert_eq!(parsed.text, "hi");
        assert!(parsed.chunks.is_empty());
        assert!(parsed.supports.is_empty());
    }

    #[test]
    fn test_missing_candidates() {
        assert!(matches!(
            parse_grounded_response(&json!({})),
            Err(LLMError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_models_filters_non_text() {
        let body = json!({
            "models": [
                {"name": "models/gemini-2.5-flash", "displayName": "Gemini 2.5 Flash",
                 "supportedGenerationMethods": ["generateContent"]},
                {"name": "models/text-embedding-004", "supportedGenerationMethods": ["embedContent"]},
                {"name": "models/gemini-2.5-flash-preview-tts", "supportedGenerationMethods": []},
                {"name": "models/gemini-2.0-flash"}
            ]
        });
        let models = parse_models_response(&body).unwrap();
        let ids: Vec<_> = models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["models/gemini-2.5-flash", "models/gemini-2.0-flash"]);
        assert_eq!(models[1].display_name, "Gemini 2.0 Flash");
    }

    #[test]
    fn test_sanitize_schema_drops_unsupported_keys() {
        let schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "title": "Reflection",
            "type": "object",
            "properties": {
                "follow_up_queries": {"type": "array", "items": {"type": "string", "title": "q"}}
            },
            "required": ["follow_up_queries"]
        });
        let clean = sanitize_schema(&schema);
        assert!(clean.get("$schema").is_none());
        assert!(clean.get("title").is_none());
        assert_eq!(clean["required"], json!(["follow_up_queries"]));
        assert!(clean["properties"]["follow_up_queries"]["items"].get("title").is_none());
    }
}
