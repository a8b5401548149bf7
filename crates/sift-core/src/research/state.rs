use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::citation::{CitationId, SourceRef};

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The research topic of a conversation.
///
/// A single message is the topic itself; longer conversations are flattened
/// into a `User:`/`Assistant:` transcript.
pub fn research_topic(conversation: &[Message]) -> String {
    if let [only] = conversation {
        return only.content.clone();
    }

    conversation
        .iter()
        .map(|m| match m.role {
            Role::User => format!("User: {}\n", m.content),
            Role::Assistant => format!("Assistant: {}\n", m.content),
        })
        .collect()
}

/// State threaded through every node of a research run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResearchState {
    pub conversation: Vec<Message>,
    /// Every query that has been searched, across loops.
    pub search_queries: Vec<String>,
    /// Gathered sources. Append-only until finalize keeps only cited ones.
    pub sources_gathered: BTreeMap<CitationId, SourceRef>,
    /// One summary per completed search task.
    pub research_results: Vec<String>,
    pub research_loop_count: usize,
    pub is_sufficient: bool,
    pub knowledge_gap: String,
    pub follow_up_queries: Vec<String>,
    /// Queries run before the current wave; offsets the next task ids.
    pub number_of_ran_queries: usize,
    /// Annotations for failures that were absorbed during the run.
    pub errors: Vec<String>,
}

/// A node's contribution to [`ResearchState`].
///
/// Vec fields are accumulators and append; `Option` fields are scalars and
/// replace the current value when set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub messages: Vec<Message>,
    pub search_queries: Vec<String>,
    pub sources: Vec<(CitationId, SourceRef)>,
    pub research_results: Vec<String>,
    pub errors: Vec<String>,

    pub research_loop_count: Option<usize>,
    pub is_sufficient: Option<bool>,
    pub knowledge_gap: Option<String>,
    pub follow_up_queries: Option<Vec<String>>,
    pub number_of_ran_queries: Option<usize>,
    /// Replaces the gathered sources wholesale.
    pub cited_sources: Option<BTreeMap<CitationId, SourceRef>>,
}

impl ResearchState {
    pub fn new(conversation: Vec<Message>) -> Self {
        Self {
            conversation,
            ..Default::default()
        }
    }

    pub fn research_topic(&self) -> String {
        research_topic(&self.conversation)
    }

    /// Merges a node's update.
    pub fn apply(&mut self, update: StateUpdate) {
        self.conversation.extend(update.messages);
        self.search_queries.extend(update.search_queries);
        self.sources_gathered.extend(update.sources);
        self.research_results.extend(update.research_results);
        self.errors.extend(update.errors);

        if let Some(count) = update.research_loop_count {
            self.research_loop_count = count;
        }
        if let Some(sufficient) = update.is_sufficient {
            self.is_sufficient = sufficient;
        }
        if let Some(gap) = update.knowledge_gap {
            self.knowledge_gap = gap;
        }
        if let Some(queries) = update.follow_up_queries {
            self.follow_up_queries = queries;
        }
        if let Some(ran) = update.number_of_ran_queries {
            self.number_of_ran_queries = ran;
        }
        if let Some(sources) = update.cited_sources {
            self.sources_gathered = sources;
        }
    }

    /// The answer, once finalize has run.
    pub fn final_answer(&self) -> Option<&str> {
        self.conversation
            .last()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    /// Gathered sources whose short URL is in `used`.
    pub(crate) fn cited_subset(&self, used: &[SourceRef]) -> BTreeMap<CitationId, SourceRef> {
        let used: HashSet<&str> = used.iter().map(|s| s.short_url.as_str()).collect();
        self.sources_gathered
            .iter()
            .filter(|(_, s)| used.contains(s.short_url.as_str()))
            .map(|(id, s)| (*id, s.clone()))
            .collect()
    }
}
