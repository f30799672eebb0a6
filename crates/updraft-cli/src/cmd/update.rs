//! Update command: answer an update check the way the update endpoints do.

use anyhow::Result;
use std::io::Write;
use updraft_core::resolver::ElectronUpdate;
use updraft_core::{UpdateCheck, UpdateQuery};
use updraft_schema::Platform;

use super::print_json;
use crate::UpdateFormat;
use crate::service::Service;

/// The file electron-updater requests for a platform.
pub fn electron_filename(platform: Platform, format: UpdateFormat) -> String {
    let suffix = match platform.family() {
        Platform::Osx => "-mac",
        Platform::Linux => "-linux",
        _ => "",
    };
    let ext = if format == UpdateFormat::ElectronJson { "json" } else { "yml" };
    format!("latest{suffix}.{ext}")
}

/// Check for an update and print the protocol response.
///
/// Prints nothing on stdout when the client is up to date.
pub async fn update(
    service: &Service,
    query: &UpdateQuery,
    format: UpdateFormat,
    filename: Option<&str>,
) -> Result<()> {
    let resolver = &service.resolver;
    let ctx = &service.ctx;

    let body: Option<Vec<u8>> = match format {
        UpdateFormat::Json => match resolver.squirrel(ctx, query).await? {
            UpdateCheck::Available(manifest) => {
                print_json(&manifest)?;
                None
            }
            UpdateCheck::UpToDate => return up_to_date(query),
        },
        UpdateFormat::ElectronJson | UpdateFormat::ElectronYaml => {
            let filename = match filename {
                Some(name) => name.to_string(),
                None => electron_filename(query.platform.parse()?, format),
            };
            match resolver.electron(ctx, query, &filename).await? {
                UpdateCheck::Available(ElectronUpdate::Json(manifest)) => {
                    print_json(&manifest)?;
                    None
                }
                UpdateCheck::Available(ElectronUpdate::Yaml(body)) => Some(body.to_vec()),
                UpdateCheck::UpToDate => return up_to_date(query),
            }
        }
        UpdateFormat::Releases => {
            let releases = resolver.releases(ctx, query).await?;
            tracing::debug!(content_length = releases.content_length, "RELEASES");
            Some(releases.body.to_vec())
        }
    };

    if let Some(body) = body {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&body)?;
        stdout.flush()?;
    }
    Ok(())
}

fn up_to_date(query: &UpdateQuery) -> Result<()> {
    eprintln!("{} is up to date", query.version);
    Ok(())
}
