pub mod citation;
pub mod config;
pub mod llm;
pub mod provider;
pub mod research;
pub mod search;

pub use citation::{CitationId, SourceRef};
pub use config::{Config, ConfigError, ProviderConfiguration, ProviderKind};
pub use provider::{build_backend, ResearchBackend, WebSearchOutcome};
pub use research::{Message, ResearchGraph, ResearchProgress, ResearchState, RunOptions};
pub use search::{SearchResult, SearchTask};
