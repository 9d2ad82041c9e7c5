//! `casebook get`: print one case, optionally limited to some sections.

use anyhow::Result;

use crate::config::Config;
use crate::service::{CaseService, GetCaseParams};

pub fn run_get(
    config: &Config,
    id: &str,
    sections: Vec<String>,
    max_tokens: Option<i64>,
) -> Result<()> {
    let service = CaseService::keyword_only(config)?;
    let case = service.get_case(&GetCaseParams {
        id: id.to_string(),
        sections: (!sections.is_empty()).then_some(sections),
        max_tokens,
    })?;

    println!("--- Case ---");
    println!("id:            {}", case.id);
    println!("title:         {}", case.title);
    println!("category:      {}", case.category);
    println!("difficulty:    {}", case.difficulty);
    println!("tags:          {}", case.tags.join(", "));
    println!("last_updated:  {}", case.last_updated);
    if let Some(versions) = &case.tested_versions {
        let joined: Vec<String> = versions
            .iter()
            .map(|(name, version)| format!("{} {}", name, version))
            .collect();
        println!("tested:        {}", joined.join(", "));
    }
    if let Some(time) = &case.estimated_time {
        println!("estimated:     {}", time);
    }
    if let Some(prereqs) = &case.prerequisites {
        println!("prerequisites: {}", prereqs.join(", "));
    }
    println!("source:        {}", case.source_path);
    println!();

    println!("--- Content ---");
    println!("{}", case.content);
    if case.truncated {
        eprintln!("(content truncated; raise --max-tokens to see more)");
    }
    Ok(())
}
