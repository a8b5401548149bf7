use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::{ResearchBackend, WebSearchOutcome};
use crate::citation::ShortUrlMinter;
use crate::config::{ProviderKind, INDEX_SHORT_URL_BASE};
use crate::llm::structured::with_schema_instructions;
use crate::llm::{LLMError, LLM};
use crate::research::prompts::build_search_summary_prompt;
use crate::search::{format_results_for_llm, SearchIndex, SearchTask};

/// A chat model paired with an external search index.
///
/// Used for both the hosted chat provider and local inference; the two
/// differ only in endpoint and credentials.
pub struct IndexedChatBackend<L, S> {
    llm: L,
    index: S,
    kind: ProviderKind,
    search_model: String,
    minter: ShortUrlMinter,
}

impl<L: LLM, S: SearchIndex> IndexedChatBackend<L, S> {
    /// `search_model` summarizes search results.
    pub fn new(kind: ProviderKind, llm: L, index: S, search_model: impl Into<String>) -> Self {
        Self {
            llm,
            index,
            kind,
            search_model: search_model.into(),
            minter: ShortUrlMinter::new(INDEX_SHORT_URL_BASE),
        }
    }
}

#[async_trait]
impl<L: LLM, S: SearchIndex> ResearchBackend for IndexedChatBackend<L, S> {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn chat(&self, model: &str, prompt: &str, temperature: f32) -> Result<String, LLMError> {
        self.llm.chat(model, prompt, temperature).await
    }

    async fn structured_text(
        &self,
        model: &str,
        prompt: &str,
        schema: &Value,
        temperature: f32,
    ) -> Result<String, LLMError> {
        let prompt = with_schema_instructions(prompt, schema);
        self.llm.chat(model, &prompt, temperature).await
    }

    async fn web_search(&self, task: &SearchTask, result_limit: usize) -> WebSearchOutcome {
        let results = match self.index.search(&task.query, result_limit).await {
            Ok(results) => results,
            Err(e) => {
                warn!(task_id = task.task_id, query = %task.query, error = %e, "Search index failed");
                return WebSearchOutcome::degraded(e.to_string());
            }
        };

        if results.is_empty() {
            debug!(task_id = task.task_id, "Search returned no results");
            return WebSearchOutcome::empty();
        }

        let (formatted, sources) = format_results_for_llm(&results, task.task_id, &self.minter);
        let prompt = build_search_summary_prompt(&task.query, &formatted);

        match self.llm.chat(&self.search_model, &prompt, 0.0).await {
            Ok(summary) => WebSearchOutcome::new(summary, sources),
            Err(e) => {
                // The formatted results still cite short URLs, so they can stand in.
                warn!(task_id = task.task_id, error = %e, "Search summarization failed");
                WebSearchOutcome {
                    summary: formatted,
                    sources,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
