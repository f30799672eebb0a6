use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, StatusCode, Url, header};
use serde::Deserialize;
use updraft_schema::{Asset, AssetHandle, RawAsset, RawRelease};

use super::{AssetDelivery, ReleaseBackend};
use crate::context::RequestContext;
use crate::repo::GitHubRepo;

/// Public GitHub REST endpoint.
pub const GITHUB_API_URL: &str = "https://api.github.com";

const PER_PAGE: usize = 100;
/// GitHub stops listing releases after 1000 entries.
const MAX_PAGES: usize = 10;

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    #[serde(default)]
    draft: bool,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    body: Option<String>,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    id: u64,
    name: String,
    size: u64,
    content_type: String,
    #[serde(default)]
    download_count: u64,
    url: String,
    browser_download_url: String,
}

/// Releases of a GitHub repository, read through the REST API.
///
/// Without a token the repository must be public: asset handles are the
/// public download URLs and clients are redirected to them. With a token,
/// handles are API URLs and asset bytes are proxied.
#[derive(Debug, Clone)]
pub struct GitHubBackend {
    client: Client,
    repo: GitHubRepo,
    api_url: String,
    token: Option<String>,
    user_agent: String,
}

impl GitHubBackend {
    pub fn new(repo: GitHubRepo) -> Self {
        Self {
            client: Client::new(),
            repo,
            api_url: GITHUB_API_URL.to_string(),
            token: None,
            user_agent: crate::USER_AGENT.to_string(),
        }
    }

    /// Authenticate requests (required for private repositories).
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into()).filter(|t: &String| !t.is_empty());
        self
    }

    /// Point at another API root (GitHub Enterprise, test servers).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Identify requests as `user_agent` instead of [`crate::USER_AGENT`].
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn repo(&self) -> &GitHubRepo {
        &self.repo
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.request(url, "application/vnd.github+json")
    }

    fn request(&self, url: &str, accept: &str) -> RequestBuilder {
        let req = self
            .client
            .get(url)
            .header(header::USER_AGENT, &self.user_agent)
            .header(header::ACCEPT, accept);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn repo_url(&self) -> String {
        format!(
            "{}/repos/{}/{}",
            self.api_url,
            self.repo.owner(),
            self.repo.name()
        )
    }

    fn convert(&self, release: GithubRelease) -> RawRelease {
        let assets = release
            .assets
            .into_iter()
            .map(|a| RawAsset {
                id: a.id,
                name: a.name,
                size: a.size,
                content_type: a.content_type,
                download_count: a.download_count,
                handle: AssetHandle::new(if self.token.is_some() {
                    a.url
                } else {
                    a.browser_download_url
                }),
            })
            .collect();

        RawRelease {
            tag_name: release.tag_name,
            draft: release.draft,
            published_at: release.published_at.unwrap_or(release.created_at),
            notes: release.body.unwrap_or_default(),
            assets,
        }
    }

    async fn download(&self, asset: &Asset) -> Result<reqwest::Response> {
        self.request(asset.handle.as_str(), "application/octet-stream")
            .send()
            .await
            .with_context(|| format!("Failed to download {}", asset.filename))?
            .error_for_status()
            .with_context(|| format!("Failed to download {}", asset.filename))
    }
}

#[async_trait]
impl ReleaseBackend for GitHubBackend {
    fn key(&self) -> String {
        format!("github:{}", self.repo)
    }

    async fn init(&self) -> Result<()> {
        let resp = self
            .get(&self.repo_url())
            .send()
            .await
            .with_context(|| format!("Failed to reach GitHub for {}", self.repo))?;

        if resp.status() == StatusCode::NOT_FOUND {
            anyhow::bail!(
                "Repository {} not found (private repositories need a token)",
                self.repo
            );
        }
        resp.error_for_status()
            .with_context(|| format!("Repository {} is not accessible", self.repo))?;

        tracing::info!(repo = %self.repo, "GitHub backend ready");
        Ok(())
    }

    async fn releases(&self) -> Result<Vec<RawRelease>> {
        let mut releases = Vec::new();

        for page in 1..=MAX_PAGES {
            let url = format!(
                "{}/releases?per_page={PER_PAGE}&page={page}",
                self.repo_url()
            );
            let batch: Vec<GithubRelease> = self
                .get(&url)
                .send()
                .await?
                .error_for_status()
                .with_context(|| format!("Failed to list releases of {}", self.repo))?
                .json()
                .await
                .context("Failed to parse GitHub releases")?;

            let len = batch.len();
            releases.extend(batch.into_iter().map(|r| self.convert(r)));
            if len < PER_PAGE {
                break;
            }
        }

        tracing::debug!(repo = %self.repo, count = releases.len(), "fetched releases");
        Ok(releases)
    }

    async fn read_asset(&self, asset: &Asset) -> Result<Bytes> {
        let bytes = self.download(asset).await?.bytes().await?;
        Ok(bytes)
    }

    async fn serve_asset(&self, asset: &Asset, _ctx: &RequestContext) -> Result<AssetDelivery> {
        if self.token.is_none() {
            let url = Url::parse(asset.handle.as_str())
                .with_context(|| format!("Invalid download URL {}", asset.handle))?;
            return Ok(AssetDelivery::Redirect(url));
        }

        let resp = self.download(asset).await?;
        let content_length = resp.content_length();
        let body = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(anyhow::Error::from))
            .boxed();

        Ok(AssetDelivery::Stream {
            body,
            content_type: asset.content_type.clone(),
            content_length,
        })
    }
}
