/// Today's date as written into prompts, e.g. "March 04, 2026".
pub fn current_date() -> String {
    chrono::Local::now().format("%B %d, %Y").to_string()
}

/// Prompt for turning the user's question into web search queries.
pub fn build_query_prompt(research_topic: &str, number_queries: usize, current_date: &str) -> String {
    format!(
        r#"You write web search queries for an automated research tool that reads and synthesizes search results.

## Guidelines

- Prefer a single query. Add more only when the question covers several distinct aspects that one query cannot reach.
- Each query targets one specific aspect of the question.
- Produce at most {number_queries} queries, all different from each other.
- Favour recent information. Today is {current_date}.

## Output

A JSON object with exactly two keys:
- "rationale": one or two sentences on why these queries cover the question
- "query": the list of search queries

## Question

{research_topic}"#
    )
}

/// Prompt for one grounded web search.
pub fn build_web_search_prompt(research_topic: &str, current_date: &str) -> String {
    format!(
        r#"Search the web for "{research_topic}" and write a verifiable summary of what you find.

- Today is {current_date}; prefer the most recent sources.
- Run several searches if needed to cover the topic.
- Keep track of which source supports which claim.
- Report only facts found in the search results. Do not invent anything."#
    )
}

/// Prompt for summarizing external index results with source references.
pub fn build_search_summary_prompt(research_topic: &str, formatted_results: &str) -> String {
    format!(
        r#"Summarize the search results below so that they answer the research topic.
Include the relevant facts, figures and insights, and cite each claim by the URL of the source it came from.

Research Topic: {research_topic}

Search Results:
{formatted_results}

Write a well-organized summary with source references:"#
    )
}

/// Prompt for judging whether the gathered summaries answer the question.
pub fn build_reflection_prompt(research_topic: &str, summaries: &str, current_date: &str) -> String {
    format!(
        r#"You are reviewing research gathered about "{research_topic}". Today is {current_date}.

## Task

- Decide whether the summaries answer the question well enough to write a complete answer.
- If they do not, name the missing knowledge and write follow-up search queries that would fill the gap.
- Follow-up queries must stand on their own and include the context a search engine needs.

## Output

A JSON object with exactly three keys:
- "is_sufficient": true or false
- "knowledge_gap": what is missing, or "" when sufficient
- "follow_up_queries": list of follow-up queries, or [] when sufficient

## Summaries

{summaries}"#
    )
}

/// Prompt for the final cited answer.
pub fn build_answer_prompt(research_topic: &str, summaries: &str, current_date: &str) -> String {
    format!(
        r#"Write a high-quality answer to the user's question using the research summaries below. Today is {current_date}.

## Instructions

- Base the answer only on the summaries; do not mention that you are working from summaries.
- Cite sources inline as Markdown links, reusing the exact URLs that appear in the summaries. Every cited URL must come from the summaries.
- Address the whole question, not just parts of it.

## Question

{research_topic}

## Summaries

{summaries}"#
    )
}
