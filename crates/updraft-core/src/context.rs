//! Request context: where the service is mounted, for building absolute URLs.
//!
//! The service may sit behind a proxy under an arbitrary path prefix, so every
//! URL handed to a client is joined onto the mount point of the incoming
//! request rather than onto a hardcoded host.

use anyhow::{Context, Result, bail};
use reqwest::Url;

/// Route segments that mark the end of the mount prefix in a request path.
pub const ROUTE_SEGMENTS: &[&str] = &["update", "download", "api", "notes", "feed"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    base: Url,
}

impl RequestContext {
    /// Context for a service mounted at `base` (e.g. `https://host/updates/`).
    ///
    /// # Errors
    ///
    /// Returns an error if `base` is not an absolute http(s) URL.
    pub fn new(base: &str) -> Result<Self> {
        let url = Url::parse(base).with_context(|| format!("Invalid base URL '{base}'"))?;
        Self::from_url(url)
    }

    /// Context from a full request URL, cutting the path at the first route
    /// segment (`/updates/update/osx/1.0.0` is mounted at `/updates/`).
    ///
    /// # Errors
    ///
    /// Returns an error if `request_url` is not an absolute http(s) URL.
    pub fn from_request_url(request_url: &str) -> Result<Self> {
        let mut url = Url::parse(request_url)
            .with_context(|| format!("Invalid request URL '{request_url}'"))?;

        let segments: Vec<String> = url
            .path_segments()
            .map(|s| s.map(str::to_string).collect())
            .unwrap_or_default();
        let mount = segments
            .iter()
            .position(|s| ROUTE_SEGMENTS.contains(&s.as_str()))
            .map_or(&segments[..], |i| &segments[..i]);

        let path = format!("/{}", mount.join("/"));
        url.set_path(&path);
        Self::from_url(url)
    }

    fn from_url(mut url: Url) -> Result<Self> {
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            bail!("Base URL must be an absolute http(s) URL, got '{url}'");
        }
        url.set_query(None);
        url.set_fragment(None);
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self { base: url })
    }

    /// The mount point, always ending in `/`.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Absolute URL for `segments` below the mount point. Segments are
    /// percent-encoded individually.
    pub fn url_for(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Like [`url_for`](Self::url_for) with a `filetype` query parameter.
    pub fn url_with_filetype(&self, segments: &[&str], filetype: Option<&str>) -> Url {
        let mut url = self.url_for(segments);
        if let Some(filetype) = filetype {
            url.query_pairs_mut().append_pair("filetype", filetype);
        }
        url
    }
}
