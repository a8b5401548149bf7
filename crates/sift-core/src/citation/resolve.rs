//! Finalize-time short URL resolution.

use super::SourceRef;

/// Replaces every cited short URL in `text` with its canonical URL.
///
/// Returns the rewritten text and the sources that were actually cited, in
/// the order given. Sources never mentioned are dropped, so the returned list
/// matches the in-text citations exactly.
pub fn resolve_citations<'a, I>(text: &str, sources: I) -> (String, Vec<SourceRef>)
where
    I: IntoIterator<Item = &'a SourceRef>,
{
    let mut resolved = text.to_string();
    let mut used = Vec::new();

    for source in sources {
        if let Some(rewritten) = replace_token(&resolved, &source.short_url, &source.canonical_url) {
            resolved = rewritten;
            used.push(source.clone());
        }
    }

    (resolved, used)
}

/// Replaces whole occurrences of `token`; an occurrence directly followed by
/// a digit belongs to a longer id (`.../1-1` inside `.../1-12`) and is kept.
///
/// Returns `None` when there was nothing to replace.
fn replace_token(text: &str, token: &str, replacement: &str) -> Option<String> {
    if token.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut found = false;

    while let Some(pos) = rest.find(token) {
        let after = &rest[pos + token.len()..];
        out.push_str(&rest[..pos]);
        if after.starts_with(|c: char| c.is_ascii_digit()) {
            out.push_str(token);
        } else {
            out.push_str(replacement);
            found = true;
        }
        rest = after;
    }
    out.push_str(rest);

    found.then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(short: &str, canonical: &str) -> SourceRef {
        SourceRef {
            label: short.to_string(),
            short_url: short.to_string(),
            canonical_url: canonical.to_string(),
        }
    }

    #[test]
    fn test_replaces_every_occurrence() {
        let sources = [source("s/0-0", "https://a.example")];
        let (text, used) = resolve_citations("x (s/0-0) y (s/0-0)", &sources);
        assert_eq!(text, "x (https://a.example) y (https://a.example)");
        assert_eq!(used.len(), 1);
    }

    #[test]
    fn test_prefix_ids_do_not_collide() {
        let sources = [source("s/1-1", "https://one"), source("s/1-12", "https://twelve")];
        let (text, used) = resolve_citations("see (s/1-12)", &sources);
        assert_eq!(text, "see (https://twelve)");
        assert_eq!(used, vec![sources[1].clone()]);
    }

    #[test]
    fn test_no_sources() {
        let (text, used) = resolve_citations("plain", std::iter::empty::<&SourceRef>());
        assert_eq!(text, "plain");
        assert!(used.is_empty());
    }
}
