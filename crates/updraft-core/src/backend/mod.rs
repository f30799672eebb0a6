//! Release backends: where raw releases and asset bytes come from.

/// GitHub Releases REST adapter.
pub mod github;
/// In-memory backend, loadable from a JSON file.
pub mod memory;

pub use github::GitHubBackend;
pub use memory::MemoryBackend;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::Url;
use updraft_schema::{Asset, RawRelease};

use crate::context::RequestContext;

/// How an asset should reach the client.
pub enum AssetDelivery {
    /// Send the client elsewhere (e.g. a public CDN URL).
    Redirect(Url),
    /// Serve these bytes.
    Bytes {
        body: Bytes,
        content_type: String,
    },
    /// Stream the body as it arrives from the backend.
    Stream {
        body: BoxStream<'static, Result<Bytes>>,
        content_type: String,
        content_length: Option<u64>,
    },
}

impl std::fmt::Debug for AssetDelivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redirect(url) => f.debug_tuple("Redirect").field(&url.as_str()).finish(),
            Self::Bytes { body, content_type } => f
                .debug_struct("Bytes")
                .field("len", &body.len())
                .field("content_type", content_type)
                .finish(),
            Self::Stream {
                content_type,
                content_length,
                ..
            } => f
                .debug_struct("Stream")
                .field("content_type", content_type)
                .field("content_length", content_length)
                .finish_non_exhaustive(),
        }
    }
}

/// A source of releases (e.g. GitHub, a static file).
#[async_trait]
pub trait ReleaseBackend: Send + Sync {
    /// Unique identifier for this backend instance (e.g. "github:owner/repo")
    fn key(&self) -> String;

    /// One-time setup. Called at most once per catalog, before anything else.
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Fetch every release, drafts included.
    async fn releases(&self) -> Result<Vec<RawRelease>>;

    /// Read the full contents of an asset.
    async fn read_asset(&self, asset: &Asset) -> Result<Bytes>;

    /// Decide how to deliver an asset to a client. Defaults to reading it inline.
    async fn serve_asset(&self, asset: &Asset, _ctx: &RequestContext) -> Result<AssetDelivery> {
        let body = self.read_asset(asset).await?;
        Ok(AssetDelivery::Bytes {
            body,
            content_type: asset.content_type.clone(),
        })
    }
}
