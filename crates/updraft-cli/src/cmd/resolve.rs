//! Resolve command

use anyhow::Result;
use updraft_core::FilterOptions;

use super::print_json;
use crate::service::Service;

/// Show the newest version matching `options`
pub async fn resolve(service: &Service, options: &FilterOptions) -> Result<()> {
    let version = service.catalog().resolve(options).await?;
    print_json(&version)
}
