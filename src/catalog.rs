//! `casebook check` and `casebook list`.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::loader::load_cases;
use crate::service::{CaseService, ListCasesParams};

/// Load the case library and report what was found.
///
/// Fails when any file was skipped, so the command can gate a CI job.
pub fn run_check(config: &Config) -> Result<()> {
    let report = load_cases(&config.cases)?;

    println!(
        "Loaded {} cases from {}",
        report.documents.len(),
        config.cases.root.display()
    );
    for (category, count) in report.counts_by_category() {
        println!("  {:<13} {}", category, count);
    }

    if report.skipped.is_empty() {
        return Ok(());
    }

    println!();
    println!("Skipped {} files:", report.skipped.len());
    for skipped in &report.skipped {
        println!("  {}: {}", skipped.path, skipped.reason);
    }
    bail!("{} case file(s) failed to load", report.skipped.len());
}

pub fn run_list(config: &Config, category: Option<String>, tag: Option<String>) -> Result<()> {
    let service = CaseService::keyword_only(config)?;
    let list = service.list_cases(&ListCasesParams { category, tag })?;

    if list.cases.is_empty() {
        println!("No cases.");
        return Ok(());
    }

    for case in &list.cases {
        println!(
            "{:<32} {:<13} {:<13} {}",
            case.id, case.category, case.difficulty, case.title
        );
    }
    println!();
    println!("{} cases", list.total);
    Ok(())
}
