//! `casebook search`: hybrid search from the command line.

use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::service::{CaseService, SearchCasesParams};

pub async fn run_search(
    config: &Config,
    query: &str,
    category: Option<String>,
    difficulty: Option<String>,
    limit: Option<i64>,
) -> Result<()> {
    let service = CaseService::from_config(config)?;

    // Nothing persists in the in-memory index between runs.
    if service.has_ephemeral_index() {
        info!("building in-memory vector index for this search");
        service.rebuild_index(false).await?;
    }

    let response = service
        .search_cases(&SearchCasesParams {
            query: query.to_string(),
            category,
            difficulty,
            limit,
        })
        .await?;

    if response.cases.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, case) in response.cases.iter().enumerate() {
        println!(
            "{}. [{:.2}] {} / {}",
            i + 1,
            case.relevance_score,
            case.category,
            case.title
        );
        println!("    id: {}", case.id);
        if !case.tags.is_empty() {
            println!("    tags: {}", case.tags.join(", "));
        }
        if !case.excerpt.is_empty() {
            println!("    excerpt: \"{}\"", case.excerpt);
        }
        println!();
    }

    Ok(())
}
