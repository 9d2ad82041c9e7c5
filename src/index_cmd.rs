//! `casebook index rebuild` and `casebook index delete`.

use anyhow::Result;
use tracing::warn;

use crate::config::Config;
use crate::service::CaseService;

pub async fn run_index_rebuild(config: &Config, reset: bool) -> Result<()> {
    let service = CaseService::from_config(config)?;
    if service.has_ephemeral_index() {
        warn!("index.provider is \"memory\"; vectors are discarded when this command exits");
    }

    let report = service.rebuild_index(reset).await?;
    println!(
        "Indexed {} cases ({} failed) into {} index",
        report.indexed,
        report.failed,
        config.index.provider
    );
    Ok(())
}

pub async fn run_index_delete(config: &Config, id: &str) -> Result<()> {
    let service = CaseService::from_config(config)?;
    service.delete_from_index(id).await?;
    println!("Deleted vector for {}", id);
    Ok(())
}
