use sift_core::citation::{
    get_citations, insert_citation_markers, resolve_citations, resolve_urls, Citation,
    CitationSegment, GroundingChunk, GroundingSupport, ShortUrlMinter,
};
use sift_core::{CitationId, SourceRef};

fn segment(index: usize, label: &str) -> CitationSegment {
    CitationSegment {
        id: CitationId::new(0, index),
        source: SourceRef {
            label: label.to_string(),
            short_url: format!("u{index}"),
            canonical_url: format!("https://{label}.example"),
        },
    }
}

fn span(start: usize, end: usize, segments: Vec<CitationSegment>) -> Citation {
    Citation {
        start,
        end,
        segments,
    }
}

#[test]
fn test_markers_follow_their_spans() {
    let citations = vec![
        span(0, 1, vec![segment(0, "X")]),
        span(1, 2, vec![segment(1, "Y")]),
    ];
    assert_eq!(insert_citation_markers("AB", &citations), "A [X](u0)B [Y](u1)");
}

#[test]
fn test_marker_order_does_not_depend_on_input_order() {
    let forward = vec![
        span(0, 1, vec![segment(0, "X")]),
        span(1, 2, vec![segment(1, "Y")]),
    ];
    let reversed: Vec<Citation> = forward.iter().rev().cloned().collect();
    assert_eq!(
        insert_citation_markers("AB", &forward),
        insert_citation_markers("AB", &reversed)
    );
}

#[test]
fn test_markers_never_corrupt_uncited_text() {
    let text = "The quick brown fox jumps over the lazy dog";
    let citations = vec![
        span(4, 9, vec![segment(0, "a")]),
        span(20, 25, vec![segment(1, "b")]),
        span(35, 43, vec![segment(2, "c")]),
    ];

    let marked = insert_citation_markers(text, &citations);
    let stripped = marked
        .replace(" [a](u0)", "")
        .replace(" [b](u1)", "")
        .replace(" [c](u2)", "");
    assert_eq!(stripped, text);
}

#[test]
fn test_shared_end_offset_sorted_and_deduplicated() {
    let citations = vec![
        span(0, 3, vec![segment(2, "c"), segment(0, "a")]),
        span(0, 3, vec![segment(0, "a")]),
    ];
    assert_eq!(insert_citation_markers("abc", &citations), "abc [a](u0) [c](u2)");
}

#[test]
fn test_offsets_inside_multibyte_characters_are_clamped() {
    // "é" is two bytes; offset 1 falls inside it.
    let citations = vec![span(0, 1, vec![segment(0, "x")]), span(0, 99, vec![segment(1, "y")])];
    assert_eq!(insert_citation_markers("é!", &citations), " [x](u0)é! [y](u1)");
}

#[test]
fn test_grounding_pipeline() {
    let chunks = vec![
        GroundingChunk {
            uri: "https://one.example".to_string(),
            title: "one.example".to_string(),
        },
        GroundingChunk {
            uri: "https://two.example".to_string(),
            title: "two.example".to_string(),
        },
        GroundingChunk {
            uri: "https://one.example".to_string(),
            title: "one.example".to_string(),
        },
    ];
    let supports = vec![
        GroundingSupport {
            start: Some(0),
            end: Some(4),
            chunk_indices: vec![2, 1],
        },
        GroundingSupport {
            start: None,
            end: None,
            chunk_indices: vec![0],
        },
        GroundingSupport {
            start: Some(0),
            end: Some(4),
            chunk_indices: vec![7],
        },
    ];

    let minter = ShortUrlMinter::new("https://short/id");
    let resolved = resolve_urls(&chunks, 5, &minter);
    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved["https://one.example"].1, "https://short/id/5-0");

    let citations = get_citations(&supports, &chunks, &resolved);
    assert_eq!(citations.len(), 1);
    assert_eq!(
        insert_citation_markers("Text", &citations),
        "Text [one](https://short/id/5-0) [two](https://short/id/5-1)"
    );
}

#[test]
fn test_finalize_keeps_only_cited_sources() {
    let s1 = SourceRef {
        label: "S1".to_string(),
        short_url: "u1".to_string(),
        canonical_url: "https://canonical/1".to_string(),
    };
    let s2 = SourceRef {
        label: "S2".to_string(),
        short_url: "u2".to_string(),
        canonical_url: "https://canonical/2".to_string(),
    };

    let (text, used) = resolve_citations("According to u1, yes.", [&s1, &s2]);
    assert_eq!(text, "According to https://canonical/1, yes.");
    assert_eq!(used, vec![s1]);
}

#[test]
fn test_short_urls_are_reproducible() {
    let chunks = vec![GroundingChunk {
        uri: "https://a".to_string(),
        title: String::new(),
    }];
    let minter = ShortUrlMinter::new("https://short/id");
    assert_eq!(resolve_urls(&chunks, 3, &minter), resolve_urls(&chunks, 3, &minter));
}
