//! Markdown case parsing.
//!
//! A case file starts with a YAML frontmatter block delimited by `---`
//! lines, followed by the markdown body:
//!
//! ```text
//! ---
//! id: stripe-checkout
//! title: Stripe Checkout
//! category: web
//! tags: [stripe, payments]
//! difficulty: intermediate
//! last_updated: 2024-05-01
//! ---
//! ## Install
//! ...
//! ```
//!
//! `category` may be omitted; the caller passes the category derived from
//! the file's directory, and [`Category::Tools`] is used when neither is
//! available.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::{CaseError, Result};
use crate::models::{Category, Difficulty, Document};

#[derive(Debug, Deserialize)]
struct RawFrontmatter {
    id: Option<serde_yaml::Value>,
    title: Option<String>,
    category: Option<String>,
    tags: Option<Vec<serde_yaml::Value>>,
    difficulty: Option<String>,
    last_updated: Option<serde_yaml::Value>,
    tested_versions: Option<BTreeMap<String, serde_yaml::Value>>,
    estimated_time: Option<serde_yaml::Value>,
    prerequisites: Option<Vec<serde_yaml::Value>>,
}

/// Split a markdown file into its raw frontmatter and body.
pub fn split_frontmatter(path: &str, text: &str) -> Result<(String, String)> {
    let normalized = text.replace("\r\n", "\n");
    let normalized = normalized.trim_start_matches('\u{feff}');
    let mut lines = normalized.lines();

    let first = lines.next().unwrap_or_default().trim();
    if first != "---" {
        return Err(CaseError::parse(
            path,
            "missing opening frontmatter delimiter (`---`)",
        ));
    }

    let mut frontmatter_lines = Vec::new();
    let mut found_end = false;
    for line in lines.by_ref() {
        if line.trim() == "---" {
            found_end = true;
            break;
        }
        frontmatter_lines.push(line);
    }

    if !found_end {
        return Err(CaseError::parse(
            path,
            "missing closing frontmatter delimiter (`---`)",
        ));
    }

    let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    Ok((frontmatter_lines.join("\n"), body))
}

/// Parse one case document.
///
/// `dir_category` is the category implied by the directory the file lives
/// in, used only when the frontmatter has no `category` key.
pub fn parse_case(path: &str, text: &str, dir_category: Option<Category>) -> Result<Document> {
    let (raw, content) = split_frontmatter(path, text)?;
    let fm: RawFrontmatter = serde_yaml::from_str(&raw)
        .map_err(|e| CaseError::parse(path, format!("invalid YAML frontmatter: {}", e)))?;

    let id = fm
        .id
        .as_ref()
        .and_then(scalar_to_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| missing(path, "id"))?;

    let title = fm
        .title
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| missing(path, "title"))?;

    let category = match fm.category {
        Some(raw) => raw
            .parse::<Category>()
            .map_err(|e| CaseError::parse(path, e.to_string()))?,
        None => dir_category.unwrap_or(Category::Tools),
    };

    let tags = fm
        .tags
        .ok_or_else(|| missing(path, "tags"))?
        .iter()
        .filter_map(scalar_to_string)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>();

    let difficulty = fm
        .difficulty
        .ok_or_else(|| missing(path, "difficulty"))?
        .parse::<Difficulty>()
        .map_err(|e| CaseError::parse(path, e.to_string()))?;

    let last_updated_raw = fm
        .last_updated
        .as_ref()
        .and_then(scalar_to_string)
        .ok_or_else(|| missing(path, "last_updated"))?;
    let last_updated = parse_date(&last_updated_raw).ok_or_else(|| {
        CaseError::parse(
            path,
            format!(
                "last_updated must be a YYYY-MM-DD date, got '{}'",
                last_updated_raw
            ),
        )
    })?;

    let tested_versions = fm.tested_versions.map(|versions| {
        versions
            .into_iter()
            .filter_map(|(name, v)| scalar_to_string(&v).map(|v| (name, v)))
            .collect::<BTreeMap<_, _>>()
    });

    let estimated_time = fm.estimated_time.as_ref().and_then(scalar_to_string);

    let prerequisites = fm
        .prerequisites
        .map(|items| items.iter().filter_map(scalar_to_string).collect::<Vec<_>>());

    Ok(Document {
        id,
        title,
        category,
        tags,
        difficulty,
        last_updated,
        tested_versions,
        estimated_time,
        prerequisites,
        content,
        source_path: path.to_string(),
    })
}

fn missing(path: &str, field: &str) -> CaseError {
    CaseError::parse(path, format!("missing required frontmatter field `{}`", field))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    // %m and %d also accept single digits; the format requires two.
    if s.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Render a YAML scalar as a string. Versions like `14.1` arrive as numbers.
fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
