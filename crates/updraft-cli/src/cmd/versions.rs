//! Versions command

use anyhow::Result;
use updraft_core::FilterOptions;

use super::print_json;
use crate::service::Service;

/// List versions matching `options`, newest first
pub async fn versions(service: &Service, options: &FilterOptions) -> Result<()> {
    let versions = service.catalog().filter(options).await?;
    tracing::info!(count = versions.len(), "matched versions");
    print_json(&versions)
}
