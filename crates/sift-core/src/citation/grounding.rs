//! Grounding metadata to inline citation markers.

use std::collections::{BTreeMap, HashMap};

use super::{label_from_title, CitationId, ShortUrlMinter, SourceRef};

/// A web document the grounded model drew on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundingChunk {
    pub uri: String,
    pub title: String,
}

/// A span of generated text backed by one or more grounding chunks.
///
/// Offsets are UTF-8 byte offsets into the generated text, `[start, end)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundingSupport {
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub chunk_indices: Vec<usize>,
}

/// One source attached to a citation span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationSegment {
    pub id: CitationId,
    pub source: SourceRef,
}

/// A cited span of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub start: usize,
    pub end: usize,
    pub segments: Vec<CitationSegment>,
}

/// Maps every grounding URI to its citation id and short URL.
///
/// A URI seen several times keeps the index of its first occurrence.
pub fn resolve_urls(
    chunks: &[GroundingChunk],
    task_id: usize,
    minter: &ShortUrlMinter,
) -> HashMap<String, (CitationId, String)> {
    let mut resolved = HashMap::new();
    for (index, chunk) in chunks.iter().enumerate() {
        resolved.entry(chunk.uri.clone()).or_insert_with(|| {
            let id = CitationId::new(task_id, index);
            (id, minter.mint(id))
        });
    }
    resolved
}

/// Builds citations from grounding supports.
///
/// Supports without an end offset and chunk indices out of range are skipped.
pub fn get_citations(
    supports: &[GroundingSupport],
    chunks: &[GroundingChunk],
    resolved: &HashMap<String, (CitationId, String)>,
) -> Vec<Citation> {
    supports
        .iter()
        .filter_map(|support| {
            let end = support.end?;
            let segments: Vec<CitationSegment> = support
                .chunk_indices
                .iter()
                .filter_map(|&ix| {
                    let chunk = chunks.get(ix)?;
                    let (id, short_url) = resolved.get(&chunk.uri)?;
                    Some(CitationSegment {
                        id: *id,
                        source: SourceRef {
                            label: label_from_title(&chunk.title, id.index),
                            short_url: short_url.clone(),
                            canonical_url: chunk.uri.clone(),
                        },
                    })
                })
                .collect();

            if segments.is_empty() {
                return None;
            }

            Some(Citation {
                start: support.start.unwrap_or(0),
                end,
                segments,
            })
        })
        .collect()
}

/// Inserts ` [label](short_url)` markers at the end of every cited span.
///
/// Spans are processed by end offset, highest first, so insertions never
/// shift offsets that are still pending. Spans sharing an end offset produce
/// one insertion whose segments are ordered by source index and
/// de-duplicated, so duplicated grounding spans cite each source once.
pub fn insert_citation_markers(text: &str, citations: &[Citation]) -> String {
    let mut by_end: BTreeMap<usize, Vec<&CitationSegment>> = BTreeMap::new();
    for citation in citations {
        by_end
            .entry(char_boundary_at_or_before(text, citation.end))
            .or_default()
            .extend(citation.segments.iter());
    }

    let mut out = text.to_string();
    for (end, mut segments) in by_end.into_iter().rev() {
        segments.sort_by_key(|s| s.id);
        segments.dedup_by_key(|s| s.id);
        let marker: String = segments
            .iter()
            .map(|s| format!(" [{}]({})", s.source.label, s.source.short_url))
            .collect();
        out.insert_str(end, &marker);
    }
    out
}

fn char_boundary_at_or_before(text: &str, offset: usize) -> usize {
    let mut i = offset.min(text.len());
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(task: usize, index: usize, label: &str) -> CitationSegment {
        CitationSegment {
            id: CitationId::new(task, index),
            source: SourceRef {
                label: label.to_string(),
                short_url: format!("s/{task}-{index}"),
                canonical_url: format!("https://{label}.example"),
            },
        }
    }

    #[test]
    fn test_resolve_urls_first_occurrence_wins() {
        let chunks = vec![
            GroundingChunk { uri: "https://a".into(), title: "a.com".into() },
            GroundingChunk { uri: "https://b".into(), title: "b.com".into() },
            GroundingChunk { uri: "https://a".into(), title: "a.com".into() },
        ];
        let resolved = resolve_urls(&chunks, 7, &ShortUrlMinter::new("s"));
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved["https://a"], (CitationId::new(7, 0), "s/7-0".to_string()));
        assert_eq!(resolved["https://b"].1, "s/7-1");
    }

    #[test]
    fn test_get_citations_skips_unusable_supports() {
        let chunks = vec![GroundingChunk { uri: "https://a".into(), title: "a.com".into() }];
        let resolved = resolve_urls(&chunks, 0, &ShortUrlMinter::new("s"));
        let supports = vec![
            GroundingSupport { start: None, end: Some(3), chunk_indices: vec![0] },
            GroundingSupport { start: Some(0), end: None, chunk_indices: vec![0] },
            GroundingSupport { start: Some(0), end: Some(2), chunk_indices: vec![5] },
        ];
        let citations = get_citations(&supports, &chunks, &resolved);
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].start, 0);
        assert_eq!(citations[0].segments[0].source.label, "a");
    }

    #[test]
    fn test_same_boundary_sorted_by_source_index() {
        let citations = vec![
            Citation { start: 0, end: 2, segments: vec![segment(0, 2, "c")] },
            Citation { start: 1, end: 2, segments: vec![segment(0, 0, "a"), segment(0, 2, "c")] },
        ];
        let out = insert_citation_markers("ab", &citations);
        assert_eq!(out, "ab [a](s/0-0) [c](s/0-2)");
    }

    #[test]
    fn test_offsets_clamped_to_char_boundary() {
        let citations = vec![Citation { start: 0, end: 2, segments: vec![segment(0, 0, "x")] }];
        // 'é' occupies bytes 1..3; offset 2 moves down to 1.
        let out = insert_citation_markers("aé", &citations);
        assert_eq!(out, "a [x](s/0-0)é");

        let far = vec![Citation { start: 0, end: 99, segments: vec![segment(0, 0, "x")] }];
        assert_eq!(insert_citation_markers("ab", &far), "ab [x](s/0-0)");
    }
}
