//! Download command

use anyhow::{Context, Result};
use futures::StreamExt;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use updraft_core::AssetDelivery;
use updraft_core::resolver::{DownloadQuery, ResolvedDownload};

use crate::service::Service;

/// What to download: a platform build, or an exact file of a version.
#[derive(Debug, Clone)]
pub enum Target {
    Platform(DownloadQuery),
    File {
        tag: String,
        channel: String,
        filename: String,
    },
}

/// Resolve `target` and write the asset to `output` (stdout when `None`).
///
/// Backends that redirect (public GitHub assets) print the URL instead.
pub async fn download(service: &Service, target: &Target, output: Option<&Path>) -> Result<()> {
    let resolver = &service.resolver;
    let resolved = match target {
        Target::Platform(query) => resolver.download(&service.ctx, query).await?,
        Target::File {
            tag,
            channel,
            filename,
        } => {
            resolver
                .download_file(&service.ctx, tag, filename, Some(channel.as_str()))
                .await?
        }
    };

    let ResolvedDownload {
        tag,
        asset,
        delivery,
    } = resolved;
    eprintln!("{} ({}, {} bytes) from {tag}", asset.filename, asset.platform, asset.size);

    let written = match delivery {
        AssetDelivery::Redirect(url) => {
            println!("{url}");
            return Ok(());
        }
        AssetDelivery::Bytes { body, .. } => {
            let mut sink = open(output).await?;
            sink.write_all(&body).await?;
            sink.flush().await?;
            body.len() as u64
        }
        AssetDelivery::Stream { mut body, .. } => {
            let mut sink = open(output).await?;
            let mut written = 0u64;
            while let Some(chunk) = body.next().await {
                let chunk = chunk.with_context(|| format!("Failed to download {}", asset.filename))?;
                sink.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            sink.flush().await?;
            written
        }
    };

    tracing::info!(file = %asset.filename, bytes = written, "download complete");
    Ok(())
}

async fn open(output: Option<&Path>) -> Result<Box<dyn AsyncWrite + Unpin + Send>> {
    let sink: Box<dyn AsyncWrite + Unpin + Send> = match output {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };
    Ok(sink)
}
