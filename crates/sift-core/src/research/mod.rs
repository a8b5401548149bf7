mod graph;
pub mod prompts;
mod schemas;
mod state;

pub use graph::{
    evaluate_research, ResearchError, ResearchGraph, ResearchProgress, Route, RunOptions,
};
pub use schemas::{Reflection, SearchQueryList};
pub use state::{research_topic, Message, ResearchState, Role, StateUpdate};
