//! Case directory loader.
//!
//! Walks `[cases].root`, applies the include/exclude globs and parses every
//! matching file. Files that cannot be read or parsed are skipped with a
//! warning and reported in [`LoadReport::skipped`]; they never abort the
//! load. Files are visited in file-name order so load order is stable.

use anyhow::{bail, Result};
use casebook_core::frontmatter::parse_case;
use casebook_core::{Category, Document};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::CasesConfig;

/// A file that was matched but not loaded.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Outcome of one pass over the case directory.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedFile>,
}

impl LoadReport {
    /// Loaded documents per category, in category order.
    pub fn counts_by_category(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for doc in &self.documents {
            *counts.entry(doc.category).or_insert(0) += 1;
        }
        counts
    }
}

pub fn load_cases(config: &CasesConfig) -> Result<LoadReport> {
    let root = &config.root;
    if !root.is_dir() {
        bail!("Case root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut report = LoadReport::default();

    let walker = WalkDir::new(root)
        .follow_links(config.follow_symlinks)
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                warn!(path = %rel_str, error = %e, "skipping unreadable case file");
                report.skipped.push(SkippedFile {
                    path: rel_str,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match parse_case(&rel_str, &text, category_from_path(relative)) {
            Ok(doc) => report.documents.push(doc),
            Err(e) => {
                warn!(path = %rel_str, error = %e, "skipping case file");
                report.skipped.push(SkippedFile {
                    path: rel_str,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        loaded = report.documents.len(),
        skipped = report.skipped.len(),
        root = %root.display(),
        "loaded cases"
    );
    Ok(report)
}

/// Category named by the nearest ancestor directory of `relative`, if any.
pub fn category_from_path(relative: &Path) -> Option<Category> {
    relative
        .parent()?
        .components()
        .rev()
        .find_map(|c| c.as_os_str().to_str()?.parse::<Category>().ok())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn case(id: &str, extra: &str) -> String {
        format!(
            "---\nid: {}\ntitle: Case {}\ntags: [one, two]\ndifficulty: beginner\nlast_updated: 2024-05-01\n{}---\n\nBody of {}.\n",
            id, id, extra, id
        )
    }

    fn cases_config(root: &Path) -> CasesConfig {
        CasesConfig {
            root: root.to_path_buf(),
            include_globs: vec!["**/*.md".to_string()],
            exclude_globs: vec!["drafts/**".to_string()],
            follow_symlinks: false,
        }
    }

    #[test]
    fn test_category_from_directory() {
        assert_eq!(category_from_path(Path::new("web/a.md")), Some(Category::Web));
        assert_eq!(
            category_from_path(Path::new("mobile/ios/a.md")),
            Some(Category::Mobile)
        );
        assert_eq!(
            category_from_path(Path::new("backend/web/a.md")),
            Some(Category::Web)
        );
        assert_eq!(category_from_path(Path::new("misc/a.md")), None);
        assert_eq!(category_from_path(Path::new("a.md")), None);
    }

    #[test]
    fn test_loads_sorted_and_skips_bad_files() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("web")).unwrap();
        fs::create_dir_all(root.join("backend")).unwrap();
        fs::create_dir_all(root.join("drafts")).unwrap();

        fs::write(root.join("web/b.md"), case("b", "")).unwrap();
        fs::write(root.join("web/a.md"), case("a", "")).unwrap();
        fs::write(root.join("backend/c.md"), case("c", "category: integrations\n")).unwrap();
        fs::write(root.join("backend/broken.md"), "no frontmatter here").unwrap();
        fs::write(root.join("drafts/d.md"), case("d", "")).unwrap();
        fs::write(root.join("web/notes.txt"), "ignored").unwrap();

        let report = load_cases(&cases_config(root)).unwrap();
        let ids: Vec<&str> = report.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        assert_eq!(report.documents[0].category, Category::Integrations);
        assert_eq!(report.documents[1].category, Category::Web);
        assert_eq!(report.documents[1].source_path, "web/a.md");

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path, "backend/broken.md");

        let counts = report.counts_by_category();
        assert_eq!(counts.get(&Category::Web), Some(&2));
        assert_eq!(counts.get(&Category::Integrations), Some(&1));
    }

    #[test]
    fn test_uncategorised_directory_falls_back_to_tools() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("misc")).unwrap();
        fs::write(tmp.path().join("misc/x.md"), case("x", "")).unwrap();

        let report = load_cases(&cases_config(tmp.path())).unwrap();
        assert_eq!(report.documents[0].category, Category::Tools);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let cfg = cases_config(&tmp.path().join("nope"));
        assert!(load_cases(&cfg).is_err());
    }
}
