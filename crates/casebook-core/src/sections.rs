//! Section filtering and size capping for full case retrieval.
//!
//! A header is a line whose trimmed form is one to six `#` followed by
//! whitespace and text. Selecting sections keeps each matching header line
//! and the lines under it, up to the next header of any level. Lines inside
//! fenced code blocks are never headers.

use regex::Regex;
use std::sync::OnceLock;

/// Approximate characters-per-token ratio used for the content cap.
pub const CHARS_PER_TOKEN: usize = 4;
/// Smallest accepted `max_tokens`.
pub const MIN_MAX_TOKENS: usize = 500;
/// Largest accepted `max_tokens`.
pub const MAX_MAX_TOKENS: usize = 16_000;
/// `max_tokens` used when the caller does not supply one.
pub const DEFAULT_MAX_TOKENS: usize = 8_000;

fn header_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#{1,6}\s+(.+)$").expect("static regex"))
}

/// Header text of `line`, if it is a markdown header.
pub fn header_text(line: &str) -> Option<&str> {
    header_line()
        .captures(line.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// True for a line that opens or closes a fenced code block.
fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// True when `header` and any of `wanted` contain one another, ignoring case.
fn header_matches(header: &str, wanted: &[String]) -> bool {
    let header = header.to_lowercase();
    wanted.iter().any(|w| header.contains(w.as_str()) || w.contains(header.as_str()))
}

/// Keep only the sections of `content` whose header matches one of `names`.
///
/// Returns `None` when no header matched, so callers can decide how to
/// fall back. Empty `names` entries are ignored.
pub fn filter_sections(content: &str, names: &[String]) -> Option<String> {
    let wanted: Vec<String> = names
        .iter()
        .map(|n| n.trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .collect();
    if wanted.is_empty() {
        return None;
    }

    let mut kept: Vec<&str> = Vec::new();
    let mut in_section = false;
    let mut matched_any = false;
    let mut in_fence = false;

    for line in content.lines() {
        if is_fence(line) {
            in_fence = !in_fence;
        } else if !in_fence {
            if let Some(header) = header_text(line) {
                in_section = header_matches(header, &wanted);
                matched_any |= in_section;
            }
        }
        if in_section {
            kept.push(line);
        }
    }

    if matched_any {
        Some(kept.join("\n").trim_end().to_string())
    } else {
        None
    }
}

/// Cap `content` at `max_tokens × 4` characters.
///
/// Returns the possibly-cut text and whether it was cut. A cut text ends
/// with a truncation marker.
pub fn truncate_to_tokens(content: &str, max_tokens: usize) -> (String, bool) {
    let max_chars = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    match content.char_indices().nth(max_chars) {
        None => (content.to_string(), false),
        Some((byte_pos, _)) => {
            let mut cut = content[..byte_pos].to_string();
            cut.push_str(&format!(
                "\n\n[Content truncated at ~{} tokens]",
                max_tokens
            ));
            (cut, true)
        }
    }
}
