use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::{ResearchBackend, WebSearchOutcome};
use crate::citation::{
    get_citations, insert_citation_markers, resolve_urls, CitationId, ShortUrlMinter, SourceRef,
};
use crate::config::{ProviderKind, GROUNDED_SHORT_URL_BASE};
use crate::llm::{GeminiClient, GroundedResponse, LLMError, LLM};
use crate::research::prompts::{build_web_search_prompt, current_date};
use crate::search::SearchTask;

/// Gemini backend: search and citation evidence come from the model itself.
pub struct GroundedBackend {
    client: GeminiClient,
    search_model: String,
    minter: ShortUrlMinter,
}

impl GroundedBackend {
    /// `search_model` runs the grounded searches.
    pub fn new(client: GeminiClient, search_model: impl Into<String>) -> Self {
        Self {
            client,
            search_model: search_model.into(),
            minter: ShortUrlMinter::new(GROUNDED_SHORT_URL_BASE),
        }
    }
}

#[async_trait]
impl ResearchBackend for GroundedBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::NativeGrounded
    }

    async fn chat(&self, model: &str, prompt: &str, temperature: f32) -> Result<String, LLMError> {
        self.client.chat(model, prompt, temperature).await
    }

    async fn structured_text(
        &self,
        model: &str,
        prompt: &str,
        schema: &Value,
        temperature: f32,
    ) -> Result<String, LLMError> {
        self.client
            .generate_structured(model, prompt, schema, temperature)
            .await
    }

    async fn web_search(&self, task: &SearchTask, _result_limit: usize) -> WebSearchOutcome {
        let prompt = build_web_search_prompt(&task.query, &current_date());

        match self.client.grounded_search(&self.search_model, &prompt).await {
            Ok(response) => grounded_outcome(&response, task.task_id, &self.minter),
            Err(e) => {
                warn!(task_id = task.task_id, query = %task.query, error = %e, "Grounded search failed");
                WebSearchOutcome::degraded(e.to_string())
            }
        }
    }
}

/// Turns a grounded generation into summary text with citation markers.
///
/// Sources are the distinct cited chunks, ordered by citation id.
pub fn grounded_outcome(
    response: &GroundedResponse,
    task_id: usize,
    minter: &ShortUrlMinter,
) -> WebSearchOutcome {
    let resolved = resolve_urls(&response.chunks, task_id, minter);
    let citations = get_citations(&response.supports, &response.chunks, &resolved);
    let summary = insert_citation_markers(&response.text, &citations);

    let mut sources: Vec<(CitationId, SourceRef)> = citations
        .into_iter()
        .flat_map(|c| c.segments)
        .map(|s| (s.id, s.source))
        .collect();
    sources.sort_by_key(|(id, _)| *id);
    sources.dedup_by_key(|(id, _)| *id);

    debug!(task_id, sources = sources.len(), "Grounded search complete");
    WebSearchOutcome::new(summary, sources)
}
