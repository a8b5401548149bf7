use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Search queries generated from the user's question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchQueryList {
    /// A list of search queries to be used for web research.
    pub query: Vec<String>,
    /// A brief explanation of why these queries are relevant to the research topic.
    #[serde(default)]
    pub rationale: String,
}

/// Judgment on whether the gathered research answers the question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Reflection {
    /// Whether the provided summaries are sufficient to answer the user's question.
    pub is_sufficient: bool,
    /// A description of what information is missing or needs clarification.
    #[serde(default)]
    pub knowledge_gap: String,
    /// A list of follow-up queries to address the knowledge gap.
    #[serde(default)]
    pub follow_up_queries: Vec<String>,
}

impl Reflection {
    /// The verdict used when reflection itself fails: stop searching.
    pub(crate) fn inconclusive() -> Self {
        Self {
            is_sufficient: false,
            knowledge_gap: String::new(),
            follow_up_queries: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::structured::{parse_structured, schema_for};

    #[test]
    fn test_reflection_defaults_optional_fields() {
        let reflection: Reflection = parse_structured(r#"{"is_sufficient": true}"#).unwrap();
        assert!(reflection.is_sufficient);
        assert!(reflection.follow_up_queries.is_empty());
    }

    #[test]
    fn test_schema_names_fields() {
        let schema = schema_for::<SearchQueryList>();
        let properties = schema.get("properties").unwrap();
        assert!(properties.get("query").is_some());
        assert!(properties.get("rationale").is_some());
    }
}
