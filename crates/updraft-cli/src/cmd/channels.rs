//! Channels command

use anyhow::Result;

use super::print_json;
use crate::service::Service;

/// Print one summary per release channel
pub async fn channels(service: &Service) -> Result<()> {
    let channels = service.catalog().channels().await?;
    print_json(&channels)
}
