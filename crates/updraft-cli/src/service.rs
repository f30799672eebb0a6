//! Wiring: build the backend, catalog and resolver from settings.

use anyhow::{Context, Result};
use std::sync::Arc;
use updraft_core::repo::GitHubRepo;
use updraft_core::{
    GitHubBackend, MemoryBackend, ReleaseBackend, RequestContext, UpdateResolver, VersionCatalog,
};

use crate::config::Config;

/// Everything a command needs to answer queries.
#[derive(Debug)]
pub struct Service {
    pub resolver: UpdateResolver,
    pub ctx: RequestContext,
}

impl Service {
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = backend(config)?;
        tracing::debug!(backend = %backend.key(), "using backend");

        let mut catalog = VersionCatalog::new(backend);
        if let Some(pattern) = &config.tag_filter {
            catalog = catalog.with_tag_filter(pattern)?;
        }

        let ctx = RequestContext::new(config.base_url())?;
        Ok(Self {
            resolver: UpdateResolver::new(catalog),
            ctx,
        })
    }

    pub fn catalog(&self) -> &VersionCatalog {
        self.resolver.catalog()
    }
}

fn backend(config: &Config) -> Result<Arc<dyn ReleaseBackend>> {
    if let Some(path) = &config.snapshot {
        return Ok(Arc::new(MemoryBackend::load(path)?));
    }

    let repo = config
        .repo
        .as_deref()
        .context("No repository configured (use --repo, UPDRAFT_REPO or `repo` in config.toml)")?;
    let repo = GitHubRepo::new(repo).map_err(anyhow::Error::msg)?;

    let mut github = GitHubBackend::new(repo).with_user_agent(crate::USER_AGENT);
    if let Some(token) = &config.token {
        github = github.with_token(token.clone());
    }
    if let Some(api_url) = &config.api_url {
        github = github.with_api_url(api_url.clone());
    }
    Ok(Arc::new(github))
}
