//! Citation and URL resolution.
//!
//! Sources are cited during drafting through synthetic short URLs so that
//! models do not have to repeat long real URLs. Each short URL is derived
//! from the search task id and the result position, which keeps citations
//! reproducible across runs. At finalize time the short URLs that actually
//! appear in the answer are swapped back for their canonical URLs.

mod grounding;
mod resolve;

pub use grounding::{
    get_citations, insert_citation_markers, resolve_urls, Citation, CitationSegment,
    GroundingChunk, GroundingSupport,
};
pub use resolve::resolve_citations;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a gathered source: the search task and the result offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CitationId {
    pub task_id: usize,
    pub index: usize,
}

impl CitationId {
    pub fn new(task_id: usize, index: usize) -> Self {
        Self { task_id, index }
    }
}

impl fmt::Display for CitationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.task_id, self.index)
    }
}

/// A source collected during research.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Short human-readable label shown in citation markers.
    pub label: String,
    /// Synthetic placeholder URL used while drafting.
    pub short_url: String,
    /// The real URL.
    pub canonical_url: String,
}

/// Mints deterministic short URLs under a base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortUrlMinter {
    base: String,
}

impl ShortUrlMinter {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    /// `{base}/{task_id}-{index}`
    pub fn mint(&self, id: CitationId) -> String {
        format!("{}/{}", self.base, id)
    }
}

/// Derives a citation label from a page title: the text before the first dot.
///
/// `"wikipedia.org"` becomes `"wikipedia"`; empty titles get `"Source {n}"`
/// with a 1-based position.
pub fn label_from_title(title: &str, position: usize) -> String {
    let label = title.split('.').next().unwrap_or_default().trim();
    if label.is_empty() {
        format!("Source {}", position + 1)
    } else {
        label.to_string()
    }
}
