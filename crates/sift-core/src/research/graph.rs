//! The research control loop.
//!
//! `generate_query -> {web_research}* -> reflection -> (web_research | finalize_answer)`
//!
//! Each wave of searches runs concurrently and is joined before reflection
//! sees its results. Nodes return [`StateUpdate`]s which are merged in task
//! order, so the final state does not depend on network completion order.

use futures::future::join_all;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::prompts::{
    build_answer_prompt, build_query_prompt, build_reflection_prompt, current_date,
};
use super::schemas::{Reflection, SearchQueryList};
use super::state::{Message, ResearchState, Role, StateUpdate};
use crate::citation::resolve_citations;
use crate::config::{ConfigError, ModelNames, ProviderConfiguration, ResearchConfig};
use crate::provider::{build_backend, structured_chat, ResearchBackend};
use crate::search::SearchTask;

const QUERY_TEMPERATURE: f32 = 1.0;
const REFLECTION_TEMPERATURE: f32 = 1.0;
const ANSWER_TEMPERATURE: f32 = 0.0;

/// Progress events emitted while a run is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum ResearchProgress {
    GeneratingQueries,
    QueriesGenerated(Vec<String>),
    Searching { task_id: usize, query: String },
    SearchCompleted { task_id: usize, sources: usize },
    Reflecting { loop_count: usize },
    Reflected {
        is_sufficient: bool,
        follow_up_queries: Vec<String>,
    },
    Finalizing,
    Completed,
}

#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("Conversation has no user message")]
    EmptyConversation,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Per-run overrides of the configured research settings.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub initial_search_query_count: Option<usize>,
    pub max_research_loops: Option<usize>,
    /// Replaces the reflection and answer models for this run.
    pub reasoning_model: Option<String>,
}

/// Where the loop goes after reflection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Finalize,
    Continue(Vec<SearchTask>),
}

/// Routing decision after reflection.
///
/// Finalizes when research is sufficient, the loop bound is reached or
/// there is nothing left to search; otherwise dispatches the follow-up
/// queries with task ids continuing after the queries already run.
pub fn evaluate_research(state: &ResearchState, max_research_loops: usize) -> Route {
    if state.is_sufficient
        || state.research_loop_count >= max_research_loops
        || state.follow_up_queries.is_empty()
    {
        return Route::Finalize;
    }

    Route::Continue(
        state
            .follow_up_queries
            .iter()
            .enumerate()
            .map(|(idx, query)| SearchTask::new(query.clone(), state.number_of_ran_queries + idx))
            .collect(),
    )
}

/// Drives a research run against one backend.
pub struct ResearchGraph<B> {
    backend: B,
    models: ModelNames,
    research: ResearchConfig,
    progress_tx: Option<mpsc::UnboundedSender<ResearchProgress>>,
}

impl ResearchGraph<Box<dyn ResearchBackend>> {
    /// Builds the backend for `config` and wraps it in a graph.
    ///
    /// Missing credentials surface here, before any request is made.
    pub fn from_configuration(
        config: &ProviderConfiguration,
        research: ResearchConfig,
    ) -> Result<Self, ResearchError> {
        let backend = build_backend(config)?;
        Ok(Self::new(backend, config.models.clone(), research))
    }
}

impl<B: ResearchBackend> ResearchGraph<B> {
    pub fn new(backend: B, models: ModelNames, research: ResearchConfig) -> Self {
        Self {
            backend,
            models,
            research,
            progress_tx: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Attaches a progress channel.
    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<ResearchProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    fn send_progress(&self, progress: ResearchProgress) {
        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(progress);
        }
    }

    /// Runs the loop to completion and returns the final state.
    ///
    /// The answer is the last conversation turn; `sources_gathered` then holds
    /// exactly the sources the answer cites.
    pub async fn run(
        &self,
        conversation: Vec<Message>,
        options: RunOptions,
    ) -> Result<ResearchState, ResearchError> {
        if !conversation
            .iter()
            .any(|m| m.role == Role::User && !m.content.trim().is_empty())
        {
            return Err(ResearchError::EmptyConversation);
        }

        let run_id = Uuid::new_v4();
        let span = info_span!("research_run", %run_id, provider = self.backend.kind().as_str());
        self.run_loop(ResearchState::new(conversation), options)
            .instrument(span)
            .await
    }

    async fn run_loop(
        &self,
        mut state: ResearchState,
        options: RunOptions,
    ) -> Result<ResearchState, ResearchError> {
        let query_count = options
            .initial_search_query_count
            .unwrap_or(self.research.number_of_initial_queries)
            .max(1);
        let max_loops = options
            .max_research_loops
            .unwrap_or(self.research.max_research_loops)
            .max(1);
        let reflection_model = options
            .reasoning_model
            .clone()
            .unwrap_or_else(|| self.models.reflection.clone());
        let answer_model = options
            .reasoning_model
            .unwrap_or_else(|| self.models.answer.clone());

        let queries = self.generate_query(&state, query_count).await;
        let mut tasks: Vec<SearchTask> = queries
            .into_iter()
            .enumerate()
            .map(|(idx, query)| SearchTask::new(query, idx))
            .collect();

        loop {
            for update in self.fan_out(&tasks).await {
                state.apply(update);
            }

            let update = self.reflection(&state, &reflection_model).await;
            state.apply(update);

            match evaluate_research(&state, max_loops) {
                Route::Finalize => break,
                Route::Continue(next) => {
                    info!(loop_count = state.research_loop_count, tasks = next.len(), "Continuing research");
                    tasks = next;
                }
            }
        }

        let update = self.finalize_answer(&state, &answer_model).await;
        state.apply(update);

        info!(
            loops = state.research_loop_count,
            queries = state.search_queries.len(),
            sources = state.sources_gathered.len(),
            "Research complete"
        );
        self.send_progress(ResearchProgress::Completed);
        Ok(state)
    }

    /// Produces at least one query; the topic itself if generation fails.
    async fn generate_query(&self, state: &ResearchState, count: usize) -> Vec<String> {
        self.send_progress(ResearchProgress::GeneratingQueries);

        let topic = state.research_topic();
        let prompt = build_query_prompt(&topic, count, &current_date());
        let model = &self.models.query_generator;

        let mut queries = match structured_chat::<SearchQueryList, _>(
            &self.backend,
            model,
            &prompt,
            QUERY_TEMPERATURE,
        )
        .await
        {
            Ok(list) => {
                debug!(rationale = %list.rationale, "Queries generated");
                distinct_queries(list.query)
            }
            Err(e) => {
                warn!(error = %e, "Query generation failed, searching the topic directly");
                Vec::new()
            }
        };

        queries.truncate(count);
        if queries.is_empty() {
            queries.push(topic.trim().to_string());
        }

        info!(count = queries.len(), "Generated search queries");
        self.send_progress(ResearchProgress::QueriesGenerated(queries.clone()));
        queries
    }

    /// Runs one wave of searches and waits for all of them.
    async fn fan_out(&self, tasks: &[SearchTask]) -> Vec<StateUpdate> {
        join_all(tasks.iter().map(|task| self.web_research(task))).await
    }

    async fn web_research(&self, task: &SearchTask) -> StateUpdate {
        self.send_progress(ResearchProgress::Searching {
            task_id: task.task_id,
            query: task.query.clone(),
        });

        let outcome = self
            .backend
            .web_search(task, self.research.search_results_per_query)
            .await;

        debug!(
            task_id = task.task_id,
            sources = outcome.sources.len(),
            summary_len = outcome.summary.len(),
            "Search task finished"
        );
        self.send_progress(ResearchProgress::SearchCompleted {
            task_id: task.task_id,
            sources: outcome.sources.len(),
        });

        StateUpdate {
            search_queries: vec![task.query.clone()],
            sources: outcome.sources,
            research_results: vec![outcome.summary],
            errors: outcome
                .error
                .map(|e| format!("search task {}: {}", task.task_id, e))
                .into_iter()
                .collect(),
            ..Default::default()
        }
    }

    async fn reflection(&self, state: &ResearchState, model: &str) -> StateUpdate {
        let loop_count = state.research_loop_count + 1;
        self.send_progress(ResearchProgress::Reflecting { loop_count });

        let summaries = state.research_results.join("\n\n---\n\n");
        let prompt = build_reflection_prompt(&state.research_topic(), &summaries, &current_date());

        let mut errors = Vec::new();
        let reflection = match structured_chat::<Reflection, _>(
            &self.backend,
            model,
            &prompt,
            REFLECTION_TEMPERATURE,
        )
        .await
        {
            Ok(reflection) => reflection,
            Err(e) => {
                warn!(error = %e, "Reflection failed, finalizing with current research");
                errors.push(format!("reflection: {e}"));
                Reflection::inconclusive()
            }
        };

        let follow_up_queries = distinct_queries(reflection.follow_up_queries);
        info!(
            loop_count,
            is_sufficient = reflection.is_sufficient,
            follow_ups = follow_up_queries.len(),
            "Reflection complete"
        );
        self.send_progress(ResearchProgress::Reflected {
            is_sufficient: reflection.is_sufficient,
            follow_up_queries: follow_up_queries.clone(),
        });

        StateUpdate {
            errors,
            research_loop_count: Some(loop_count),
            is_sufficient: Some(reflection.is_sufficient),
            knowledge_gap: Some(reflection.knowledge_gap),
            follow_up_queries: Some(follow_up_queries),
            number_of_ran_queries: Some(state.search_queries.len()),
            ..Default::default()
        }
    }

    /// Writes the answer and swaps cited short URLs for canonical ones.
    async fn finalize_answer(&self, state: &ResearchState, model: &str) -> StateUpdate {
        self.send_progress(ResearchProgress::Finalizing);

        let summaries = state.research_results.join("\n---\n\n");
        let prompt = build_answer_prompt(&state.research_topic(), &summaries, &current_date());

        let mut errors = Vec::new();
        let draft = match self.backend.chat(model, &prompt, ANSWER_TEMPERATURE).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Answer generation failed, returning research summaries");
                errors.push(format!("finalize: {e}"));
                summaries
            }
        };

        let (answer, used) = resolve_citations(&draft, state.sources_gathered.values());
        debug!(cited = used.len(), gathered = state.sources_gathered.len(), "Citations resolved");

        StateUpdate {
            messages: vec![Message::assistant(answer)],
            errors,
            cited_sources: Some(state.cited_subset(&used)),
            ..Default::default()
        }
    }
}

/// Trims queries and drops blanks and repeats, keeping the first occurrence.
fn distinct_queries(queries: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(queries.len());
    for query in queries {
        let query = query.trim();
        if !query.is_empty() && !out.iter().any(|q| q == query) {
            out.push(query.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_after_reflection(sufficient: bool, loops: usize, follow_ups: &[&str]) -> ResearchState {
        ResearchState {
            is_sufficient: sufficient,
            research_loop_count: loops,
            follow_up_queries: follow_ups.iter().map(|q| q.to_string()).collect(),
            number_of_ran_queries: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_route_continues_with_offset_ids() {
        let state = state_after_reflection(false, 1, &["a", "b"]);
        assert_eq!(
            evaluate_research(&state, 2),
            Route::Continue(vec![SearchTask::new("a", 3), SearchTask::new("b", 4)])
        );
    }

    #[test]
    fn test_route_finalizes() {
        assert_eq!(evaluate_research(&state_after_reflection(true, 1, &["a"]), 5), Route::Finalize);
        assert_eq!(evaluate_research(&state_after_reflection(false, 2, &["a"]), 2), Route::Finalize);
        assert_eq!(evaluate_research(&state_after_reflection(false, 1, &[]), 5), Route::Finalize);
    }

    #[test]
    fn test_distinct_queries() {
        let queries = vec![" a ".to_string(), "".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(distinct_queries(queries), vec!["a", "b"]);
    }
}
