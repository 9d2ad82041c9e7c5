//! Lexical scoring used as the fallback channel of hybrid search.
//!
//! # Scoring
//!
//! The query is split on whitespace, lowercased, and tokens of two
//! characters or fewer are dropped. Each surviving token contributes:
//!
//! | Signal | Points |
//! |--------|--------|
//! | token is a substring of the title | +3 |
//! | token is a substring of any tag | +2 |
//! | each occurrence in title + tags + content | +0.5 |
//!
//! Overlapping occurrences all count, so `"aaaa"` holds three occurrences
//! of `"aa"`. Scores are uncapped.

use crate::models::Document;

const TITLE_POINTS: f64 = 3.0;
const TAG_POINTS: f64 = 2.0;
const OCCURRENCE_POINTS: f64 = 0.5;
const MIN_TOKEN_CHARS: usize = 3;

/// Lowercased query tokens that take part in keyword scoring.
pub fn query_tokens(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .map(|t| t.to_lowercase())
        .collect()
}

/// Occurrences of `needle` in `haystack`, overlapping ones included.
fn count_occurrences(haystack: &str, needle: &str) -> usize {
    let Some(step) = needle.chars().next().map(char::len_utf8) else {
        return 0;
    };
    let mut count = 0;
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(needle) {
        count += 1;
        start += pos + step;
    }
    count
}

/// Keyword score of `doc` for pre-tokenized `tokens`.
pub fn score_tokens(tokens: &[String], doc: &Document) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }

    let title = doc.title.to_lowercase();
    let tags: Vec<String> = doc.tags.iter().map(|t| t.to_lowercase()).collect();
    let composite = format!("{} {} {}", doc.title, doc.tags.join(" "), doc.content).to_lowercase();

    tokens
        .iter()
        .map(|token| {
            let mut score = 0.0;
            if title.contains(token.as_str()) {
                score += TITLE_POINTS;
            }
            if tags.iter().any(|t| t.contains(token.as_str())) {
                score += TAG_POINTS;
            }
            score += count_occurrences(&composite, token) as f64 * OCCURRENCE_POINTS;
            score
        })
        .sum()
}

/// Keyword score of `doc` for a raw query string.
pub fn keyword_score(query: &str, doc: &Document) -> f64 {
    score_tokens(&query_tokens(query), doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::store::memory::tests::doc;

    #[test]
    fn test_tokens_drop_short_and_lowercase() {
        assert_eq!(query_tokens("Set up an API in Go quickly"), vec!["set", "api", "quickly"]);
        assert!(query_tokens("a an of").is_empty());
        assert!(query_tokens("   ").is_empty());
    }

    #[test]
    fn test_stripe_example() {
        let a = doc(
            "a",
            "Stripe Checkout",
            Category::Web,
            &["stripe", "web"],
            "Use Stripe for checkout. It is fast.",
        );
        let b = doc("b", "Auth Setup", Category::Backend, &["auth"], "Supabase handles auth.");

        // stripe: title 3 + tag 2 + 3 occurrences; checkout: title 3 + 2 occurrences
        let score_a = keyword_score("stripe checkout", &a);
        assert!((score_a - 10.5).abs() < 1e-9, "got {}", score_a);
        assert!(score_a >= 6.0);
        assert_eq!(keyword_score("stripe checkout", &b), 0.0);
    }

    #[test]
    fn test_more_occurrences_score_higher() {
        let base = doc("a", "Guide", Category::Tools, &[], "deploy once");
        let more = doc("a", "Guide", Category::Tools, &[], "deploy once. deploy twice");
        assert!(keyword_score("deploy", &more) > keyword_score("deploy", &base));
    }

    #[test]
    fn test_overlapping_occurrences_count() {
        let d = doc("a", "x", Category::Tools, &[], "aaaaaa");
        // "aaa" starts at offsets 0..=3, no title or tag hit
        assert_eq!(keyword_score("aaa", &d), 2.0);
        assert_eq!(count_occurrences("abab ab", "ab"), 3);
        assert_eq!(count_occurrences("éééé", "éé"), 3);
    }

    #[test]
    fn test_tag_substring_match() {
        let d = doc("a", "Guide", Category::Tools, &["react-native"], "");
        // tag hit 2 + one occurrence in composite
        assert!((keyword_score("native", &d) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_query_is_case_insensitive() {
        let d = doc("a", "Docker Compose", Category::Tools, &[], "");
        assert_eq!(keyword_score("DOCKER", &d), keyword_score("docker", &d));
    }
}
