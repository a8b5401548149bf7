use super::SearchResult;
use crate::citation::{label_from_title, CitationId, ShortUrlMinter, SourceRef};

/// Summary text used when a search produced nothing.
pub const NO_RESULTS: &str = "No search results found.";

/// Renders search results as prompt text, citing each one by short URL.
///
/// Returns the text and the sources it introduces, keyed by citation id.
pub fn format_results_for_llm(
    results: &[SearchResult],
    task_id: usize,
    minter: &ShortUrlMinter,
) -> (String, Vec<(CitationId, SourceRef)>) {
    if results.is_empty() {
        return (NO_RESULTS.to_string(), Vec::new());
    }

    let mut parts = Vec::with_capacity(results.len());
    let mut sources = Vec::with_capacity(results.len());

    for (index, result) in results.iter().enumerate() {
        let id = CitationId::new(task_id, index);
        let short_url = minter.mint(id);

        parts.push(format!(
            "\n### Source {}: {}\nURL: {}\n\n{}\n",
            index + 1,
            result.title,
            short_url,
            result.content
        ));

        sources.push((
            id,
            SourceRef {
                label: label_from_title(&result.title, index),
                short_url,
                canonical_url: result.url.clone(),
            },
        ));
    }

    (parts.join("\n---\n"), sources)
}
