//! Query-relevant preview text for search results.
//!
//! The body is split into sentences on `.`, `!` and `?`. Each sentence is
//! scored by how many distinct query tokens it contains (case-insensitive
//! substring match, no minimum token length). The best sentence wins; ties
//! and all-zero scores fall back to the earliest sentence.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Default maximum excerpt length in characters.
pub const DEFAULT_EXCERPT_CHARS: usize = 200;

const ELLIPSIS: &str = "...";

fn sentence_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+").expect("static regex"))
}

/// Pick the most relevant sentence of `content` for `query`.
///
/// The result is at most `max_length` characters. A sentence longer than
/// that is cut to `max_length - 3` characters followed by `...`. Content
/// with no sentences yields an empty string.
pub fn excerpt(content: &str, query: &str, max_length: usize) -> String {
    let sentences: Vec<&str> = sentence_boundary()
        .split(content)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let Some(&first) = sentences.first() else {
        return String::new();
    };

    let mut seen = HashSet::new();
    let tokens: Vec<String> = query
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|t| seen.insert(t.clone()))
        .collect();

    let mut best = first;
    let mut best_hits = 0usize;
    for sentence in &sentences {
        let lower = sentence.to_lowercase();
        let hits = tokens.iter().filter(|t| lower.contains(t.as_str())).count();
        if hits > best_hits {
            best = sentence;
            best_hits = hits;
        }
    }

    truncate_chars(best, max_length)
}

fn truncate_chars(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    if max_length <= ELLIPSIS.len() {
        return text.chars().take(max_length).collect();
    }
    let mut cut: String = text.chars().take(max_length - ELLIPSIS.len()).collect();
    cut.push_str(ELLIPSIS);
    cut
}
