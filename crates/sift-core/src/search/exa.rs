use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::{SearchError, SearchIndex, SearchResult};
use crate::config::{HttpConfig, DEFAULT_EXA_URL, DEFAULT_RESULT_CONTENT_CHARS};
use crate::llm::{with_retry, RetryPolicy};

/// Exa search client (`POST /search` with contents).
pub struct ExaClient {
    api_key: String,
    base_url: String,
    client: Client,
    retry: RetryPolicy,
}

impl ExaClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_http(DEFAULT_EXA_URL, api_key, &HttpConfig::default())
    }

    pub fn with_http(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        http: &HttpConfig,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(http.timeout())
                .build()
                .unwrap_or_else(|_| Client::new()),
            retry: RetryPolicy::from(http),
        }
    }

    async fn post_search(&self, body: &Value) -> Result<Value, SearchError> {
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))
    }
}

#[async_trait]
impl SearchIndex for ExaClient {
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<SearchResult>, SearchError> {
        let body = json!({
            "query": query,
            "numResults": num_results,
            "type": "auto",
            "contents": {
                "text": {"maxCharacters": DEFAULT_RESULT_CONTENT_CHARS},
                "highlights": true,
            },
        });

        debug!(query, num_results, "Searching Exa");
        let payload = with_retry(&self.retry, || self.post_search(&body)).await?;

        normalize_exa_results(&payload)
    }
}

/// Converts an Exa `/search` payload into [`SearchResult`]s.
///
/// Highlights are preferred as content; otherwise page text is used, cut to
/// a bounded number of characters. Rows without a URL are dropped.
pub fn normalize_exa_results(payload: &Value) -> Result<Vec<SearchResult>, SearchError> {
    let rows = payload
        .get("results")
        .and_then(|v| v.as_array())
        .ok_or_else(|| SearchError::Parse("missing results array".to_string()))?;

    let mut results = Vec::with_capacity(rows.len());
    for row in rows {
        let url = row
            .get("url")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .trim()
            .to_string();
        if url.is_empty() {
            continue;
        }

        let title = row
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let highlights: Vec<&str> = row
            .get("highlights")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|h| h.as_str()).collect())
            .unwrap_or_default();

        let content = if !highlights.is_empty() {
            highlights.join(" ")
        } else {
            row.get("text")
                .and_then(|v| v.as_str())
                .map(|t| t.chars().take(DEFAULT_RESULT_CONTENT_CHARS).collect())
                .unwrap_or_default()
        };

        results.push(SearchResult {
            title,
            url,
            content,
            relevance_score: row.get("score").and_then(|v| v.as_f64()),
        });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_trims_base_url() {
        let client = ExaClient::with_http("https://exa.example/", "k", &HttpConfig::default());
        assert_eq!(client.base_url, "https://exa.example");
        assert_eq!(ExaClient::new("k").base_url, DEFAULT_EXA_URL);
        assert_eq!(client.retry, RetryPolicy::default());
    }

    #[test]
    fn test_normalize_prefers_highlights() {
        let payload = json!({
            "results": [
                {"title": "Rust", "url": "https://rust-lang.org", "text": "full text",
                 "highlights": ["fast", "safe"], "score": 0.9},
                {"title": null, "url": "https://example.com", "text": "only text"},
                {"title": "no url", "url": "  "}
            ]
        });

        let results = normalize_exa_results(&payload).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "fast safe");
        assert_eq!(results[0].relevance_score, Some(0.9));
        assert_eq!(results[1].title, "");
        assert_eq!(results[1].content, "only text");
        assert_eq!(results[1].relevance_score, None);
    }

    #[test]
    fn test_normalize_truncates_text() {
        let long = "é".repeat(DEFAULT_RESULT_CONTENT_CHARS + 10);
        let payload = json!({"results": [{"url": "https://a", "text": long}]});
        let results = normalize_exa_results(&payload).unwrap();
        assert_eq!(results[0].content.chars().count(), DEFAULT_RESULT_CONTENT_CHARS);
    }

    #[test]
    fn test_normalize_missing_results() {
        assert!(matches!(
            normalize_exa_results(&json!({"error": "bad key"})),
            Err(SearchError::Parse(_))
        ));
    }
}
