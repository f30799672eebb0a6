use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use updraft_schema::{Asset, AssetHandle, RawRelease};

use super::ReleaseBackend;

/// Serialized form accepted by [`MemoryBackend::from_json`].
#[derive(Debug, Deserialize)]
struct Snapshot {
    releases: Vec<RawRelease>,
    /// Asset bodies keyed by handle, as UTF-8 text.
    #[serde(default)]
    contents: HashMap<String, String>,
}

/// Releases and asset bodies held in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    name: String,
    releases: Vec<RawRelease>,
    contents: HashMap<AssetHandle, Bytes>,
    init_calls: AtomicUsize,
    fetches: AtomicUsize,
}

impl MemoryBackend {
    pub fn new(name: impl Into<String>, releases: Vec<RawRelease>) -> Self {
        Self {
            name: name.into(),
            releases,
            ..Self::default()
        }
    }

    /// Attach the body served for `handle`.
    pub fn with_content(mut self, handle: AssetHandle, body: impl Into<Bytes>) -> Self {
        self.contents.insert(handle, body.into());
        self
    }

    /// Parse a snapshot: `{"releases": [...], "contents": {"<handle>": "<text>"}}`.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` does not match the snapshot layout.
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self> {
        let snapshot: Snapshot =
            serde_json::from_str(json).context("Failed to parse releases snapshot")?;
        let contents = snapshot
            .contents
            .into_iter()
            .map(|(handle, body)| (AssetHandle::new(handle), Bytes::from(body)))
            .collect();
        Ok(Self {
            contents,
            ..Self::new(name, snapshot.releases)
        })
    }

    /// Load a snapshot file written in the [`from_json`](Self::from_json) layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(path.display().to_string(), &json)
    }

    /// How many times [`ReleaseBackend::init`] ran.
    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    /// How many times [`ReleaseBackend::releases`] ran.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReleaseBackend for MemoryBackend {
    fn key(&self) -> String {
        format!("memory:{}", self.name)
    }

    async fn init(&self) -> Result<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        // Yield so concurrent callers really overlap with an in-flight init.
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn releases(&self) -> Result<Vec<RawRelease>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.releases.clone())
    }

    async fn read_asset(&self, asset: &Asset) -> Result<Bytes> {
        self.contents
            .get(&asset.handle)
            .cloned()
            .with_context(|| format!("No content stored for asset {}", asset.handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_json_and_read() {
        let json = r#"{
            "releases": [{
                "tag_name": "v1.0.0",
                "published_at": "2024-01-02T03:04:05Z",
                "assets": [{"id": 1, "name": "RELEASES", "size": 10, "handle": "h1"}]
            }],
            "contents": {"h1": "AAAA app-1.0.0-full.nupkg 10"}
        }"#;
        let backend = MemoryBackend::from_json("fixture", json).unwrap();
        let releases = backend.releases().await.unwrap();
        assert_eq!(releases.len(), 1);
        assert!(!releases[0].draft);
        assert_eq!(releases[0].assets[0].content_type, "application/octet-stream");

        let asset = Asset::classify(&releases[0].assets[0]).unwrap();
        let body = backend.read_asset(&asset).await.unwrap();
        assert_eq!(&body[..], b"AAAA app-1.0.0-full.nupkg 10");
        assert_eq!(backend.fetches(), 1);
    }

    #[tokio::test]
    async fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("releases.json");
        std::fs::write(
            &path,
            r#"{"releases": [{"tag_name": "v2.0.0", "published_at": "2024-01-02T03:04:05Z"}]}"#,
        )
        .unwrap();

        let backend = MemoryBackend::load(&path).unwrap();
        assert!(backend.key().ends_with("releases.json"));
        assert_eq!(backend.releases().await.unwrap()[0].tag_name, "v2.0.0");
        assert!(MemoryBackend::load(&dir.path().join("missing.json")).is_err());
    }

    #[tokio::test]
    async fn test_missing_content() {
        let backend = MemoryBackend::from_json(
            "fixture",
            r#"{"releases": [{"tag_name": "v1.0.0", "published_at": "2024-01-02T03:04:05Z",
                "assets": [{"id": 1, "name": "RELEASES", "size": 10, "handle": "h1"}]}]}"#,
        )
        .unwrap();
        let releases = backend.releases().await.unwrap();
        let asset = Asset::classify(&releases[0].assets[0]).unwrap();
        assert!(backend.read_asset(&asset).await.is_err());
    }
}
