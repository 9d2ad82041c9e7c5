use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn casebook_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("casebook");
    path
}

const STRIPE: &str = r#"---
id: stripe-checkout
title: Stripe Checkout Integration
tags: [stripe, payments, checkout]
difficulty: intermediate
last_updated: 2024-03-10
tested_versions:
  stripe: "14.2"
  next: "14.1"
estimated_time: 45 minutes
---

Stripe Checkout hosts the payment page for you. Create a session on the server and redirect.

## Installation

npm install stripe

## Troubleshooting

Webhook signatures fail when the raw body is parsed as JSON.
"#;

const EXPO: &str = r#"---
id: expo-push
title: Expo Push Notifications
tags: [expo, notifications]
difficulty: beginner
last_updated: 2024-01-20
---

Send push notifications from an Expo app. Register the device token first.
"#;

const RLS: &str = r#"---
id: supabase-rls
title: Supabase Row Level Security
category: backend
tags: [supabase, postgres, auth]
difficulty: advanced
last_updated: 2024-02-15
---

Row level security policies restrict which rows a session can read. Enable RLS on every table.
"#;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let cases = root.join("cases");
    fs::create_dir_all(cases.join("web")).unwrap();
    fs::create_dir_all(cases.join("mobile")).unwrap();
    fs::create_dir_all(cases.join("misc")).unwrap();
    fs::write(cases.join("web/stripe-checkout.md"), STRIPE).unwrap();
    fs::write(cases.join("mobile/expo-push.md"), EXPO).unwrap();
    fs::write(cases.join("misc/supabase-rls.md"), RLS).unwrap();
    fs::write(cases.join("README.txt"), "not a case").unwrap();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_content = format!(
        r#"[cases]
root = "{}/cases"

[search]
default_limit = 5

[embedding]
provider = "disabled"
"#,
        root.display()
    );
    let config_path = config_dir.join("casebook.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_casebook(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = casebook_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run casebook binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_check_reports_counts_per_category() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_casebook(&config, &["check"]);
    assert!(success, "check failed: {}", stderr);
    assert!(stdout.contains("Loaded 3 cases"), "{}", stdout);
    assert!(stdout.contains("mobile"));
    assert!(stdout.contains("backend"));
}

#[test]
fn test_check_fails_on_broken_file() {
    let (tmp, config) = setup_test_env();
    fs::write(
        tmp.path().join("cases/web/broken.md"),
        "---\ntitle: No id here\n---\nbody",
    )
    .unwrap();

    let (stdout, _stderr, success) = run_casebook(&config, &["check"]);
    assert!(!success);
    assert!(stdout.contains("Loaded 3 cases"), "{}", stdout);
    assert!(stdout.contains("broken.md"), "{}", stdout);
}

#[test]
fn test_list_and_filters() {
    let (_tmp, config) = setup_test_env();

    let (stdout, stderr, success) = run_casebook(&config, &["list"]);
    assert!(success, "list failed: {}", stderr);
    assert!(stdout.contains("stripe-checkout"));
    assert!(stdout.contains("expo-push"));
    assert!(stdout.contains("3 cases"));

    // frontmatter category wins over the misc/ directory
    let (stdout, _, success) = run_casebook(&config, &["list", "--category", "backend"]);
    assert!(success);
    assert!(stdout.contains("supabase-rls"));
    assert!(!stdout.contains("stripe-checkout"));

    let (stdout, _, success) = run_casebook(&config, &["list", "--tag", "NOTIF"]);
    assert!(success);
    assert!(stdout.contains("expo-push"));
    assert!(stdout.contains("1 cases"));
}

#[test]
fn test_keyword_search() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_casebook(&config, &["search", "stripe checkout"]);
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("1. ["), "{}", stdout);
    assert!(stdout.contains("id: stripe-checkout"));
    assert!(stdout.contains("excerpt: \"Stripe Checkout hosts the payment page for you\""));
    assert!(!stdout.contains("expo-push"));
}

#[test]
fn test_search_with_filters_and_no_results() {
    let (_tmp, config) = setup_test_env();

    let (stdout, _, success) = run_casebook(
        &config,
        &["search", "stripe", "--category", "mobile"],
    );
    assert!(success);
    assert!(stdout.contains("No results."));

    let (stdout, _, success) = run_casebook(
        &config,
        &["search", "security", "--difficulty", "advanced"],
    );
    assert!(success);
    assert!(stdout.contains("supabase-rls"));
}

#[test]
fn test_search_rejects_bad_parameters() {
    let (_tmp, config) = setup_test_env();

    let (_, stderr, success) = run_casebook(&config, &["search", "stripe", "--limit", "50"]);
    assert!(!success);
    assert!(stderr.contains("limit"), "{}", stderr);

    let (_, stderr, success) = run_casebook(&config, &["search", "stripe", "--category", "desktop"]);
    assert!(!success);
    assert!(stderr.contains("desktop"), "{}", stderr);

    let (_, _, success) = run_casebook(&config, &["search", "   "]);
    assert!(!success);
}

#[test]
fn test_get_full_and_sections() {
    let (_tmp, config) = setup_test_env();

    let (stdout, stderr, success) = run_casebook(&config, &["get", "stripe-checkout"]);
    assert!(success, "get failed: {}", stderr);
    assert!(stdout.contains("title:         Stripe Checkout Integration"));
    assert!(stdout.contains("category:      web"));
    assert!(stdout.contains("tested:        next 14.1, stripe 14.2"));
    assert!(stdout.contains("## Installation"));
    assert!(stdout.contains("## Troubleshooting"));

    let (stdout, _, success) = run_casebook(
        &config,
        &["get", "stripe-checkout", "--section", "troubleshoot"],
    );
    assert!(success);
    assert!(stdout.contains("## Troubleshooting"));
    assert!(!stdout.contains("npm install stripe"));
}

#[test]
fn test_get_not_found() {
    let (_tmp, config) = setup_test_env();
    let (_, stderr, success) = run_casebook(&config, &["get", "nonexistent"]);
    assert!(!success);
    assert!(stderr.contains("case not found: nonexistent"), "{}", stderr);
}

#[test]
fn test_get_rejects_small_max_tokens() {
    let (_tmp, config) = setup_test_env();
    let (_, stderr, success) =
        run_casebook(&config, &["get", "stripe-checkout", "--max-tokens", "100"]);
    assert!(!success);
    assert!(stderr.contains("maxTokens"), "{}", stderr);
}

#[test]
fn test_index_rebuild_requires_embeddings() {
    let (_tmp, config) = setup_test_env();
    let (_, stderr, success) = run_casebook(&config, &["index", "rebuild"]);
    assert!(!success);
    assert!(stderr.contains("embeddings are disabled"), "{}", stderr);
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_casebook(&tmp.path().join("nope.toml"), &["list"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"), "{}", stderr);
}
