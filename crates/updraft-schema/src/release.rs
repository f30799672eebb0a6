//! Release records: what a backend reports, and what the catalog derives from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::{self, Platform};

/// Channel assigned to versions whose tag carries no pre-release suffix.
pub const STABLE_CHANNEL: &str = "stable";

/// Channel wildcard accepted by queries: matches every channel.
pub const ANY_CHANNEL: &str = "*";

/// Opaque reference a backend uses to locate an asset's bytes
/// (an API URL, an object key, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetHandle(String);

impl AssetHandle {
    /// Wrap a backend-specific locator.
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Return the raw locator.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A release exactly as the backend reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRelease {
    /// Tag the release was published under (e.g. `v1.2.0-beta.1`).
    pub tag_name: String,
    /// Drafts are never served to clients.
    #[serde(default)]
    pub draft: bool,
    /// Publication time.
    pub published_at: DateTime<Utc>,
    /// Release notes (markdown, free text).
    #[serde(default)]
    pub notes: String,
    /// Attached files, in the order the backend lists them.
    #[serde(default)]
    pub assets: Vec<RawAsset>,
}

/// A file attached to a [`RawRelease`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAsset {
    /// Backend identifier of the asset.
    pub id: u64,
    /// File name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type reported by the backend.
    #[serde(default = "default_content_type")]
    pub content_type: String,
    /// Download counter, when the backend tracks one.
    #[serde(default)]
    pub download_count: u64,
    /// Locator used to fetch the bytes later.
    pub handle: AssetHandle,
}

fn default_content_type() -> String {
    "application/octet-stream".to_string()
}

/// A classified asset of a [`Version`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Backend identifier of the asset.
    pub id: u64,
    /// Platform the asset was classified as.
    #[serde(rename = "type")]
    pub platform: Platform,
    /// File name.
    pub filename: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type reported by the backend.
    pub content_type: String,
    /// Locator used to fetch the bytes.
    #[serde(rename = "backend_handle")]
    pub handle: AssetHandle,
}

impl Asset {
    /// Classify a raw asset; `None` when its name carries no platform hint.
    pub fn classify(raw: &RawAsset) -> Option<Self> {
        let platform = Platform::detect(&raw.name)?;
        Some(Self {
            id: raw.id,
            platform,
            filename: raw.name.clone(),
            size: raw.size,
            content_type: raw.content_type.clone(),
            handle: raw.handle.clone(),
        })
    }
}

/// A normalized, servable version of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// Full normalized version (e.g. `2.0.0-beta.1`).
    pub version: String,
    /// `version` without its pre-release suffix (e.g. `2.0.0`).
    pub tag: String,
    /// Release channel (`stable`, `beta`, ...). Never empty.
    pub channel: String,
    /// Release notes.
    pub notes: String,
    /// Publication time.
    pub published_at: DateTime<Utc>,
    /// Sum of the download counters of every asset of the release.
    pub download_count: u64,
    /// Classified assets, in release order.
    pub platforms: Vec<Asset>,
}

impl Version {
    /// Platforms this version ships assets for, in asset order.
    pub fn available_platforms(&self) -> Vec<Platform> {
        self.platforms.iter().map(|a| a.platform).collect()
    }

    /// Whether some asset of this version serves `platform`.
    pub fn supports(&self, platform: Platform) -> bool {
        platform::satisfies(platform, &self.available_platforms())
    }

    /// Best asset for `platform`, see [`platform::resolve`].
    pub fn resolve_asset(&self, platform: Platform, wanted: Option<&str>) -> Option<&Asset> {
        platform::resolve(self, platform, wanted)
    }

    /// Asset with exactly this file name.
    pub fn find_asset(&self, filename: &str) -> Option<&Asset> {
        self.platforms.iter().find(|a| a.filename == filename)
    }
}

/// Per-channel aggregate over a catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSummary {
    /// Tag of the most recently published version in the channel.
    pub latest: String,
    /// Number of versions in the channel.
    pub versions_count: usize,
    /// Publication time of `latest`.
    pub published_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str) -> RawAsset {
        RawAsset {
            id: 7,
            name: name.to_string(),
            size: 1024,
            content_type: default_content_type(),
            download_count: 3,
            handle: AssetHandle::new(format!("mem://{name}")),
        }
    }

    fn version(names: &[&str]) -> Version {
        Version {
            version: "1.0.0".to_string(),
            tag: "1.0.0".to_string(),
            channel: STABLE_CHANNEL.to_string(),
            notes: String::new(),
            published_at: DateTime::<Utc>::UNIX_EPOCH,
            download_count: 0,
            platforms: names.iter().filter_map(|n| Asset::classify(&raw(n))).collect(),
        }
    }

    #[test]
    fn test_classify_drops_unknown() {
        assert!(Asset::classify(&raw("SHA256SUMS.txt")).is_none());
        let asset = Asset::classify(&raw("app-darwin.dmg")).unwrap();
        assert_eq!(asset.platform, Platform::Osx64);
        assert_eq!(asset.handle.as_str(), "mem://app-darwin.dmg");
    }

    #[test]
    fn test_resolve_prefers_wanted_extension() {
        let v = version(&["app-mac.zip", "app-mac.dmg"]);
        assert_eq!(
            v.resolve_asset(Platform::Osx, None).unwrap().filename,
            "app-mac.dmg"
        );
        assert_eq!(
            v.resolve_asset(Platform::Osx, Some("zip")).unwrap().filename,
            "app-mac.zip"
        );
        assert!(v.resolve_asset(Platform::Windows, None).is_none());
    }

    #[test]
    fn test_resolve_prefers_specific_platform() {
        let v = version(&["app-linux.deb", "app-linux-x64.tar.gz"]);
        // linux_deb_32 sits two levels below linux, linux_64 only one.
        let picked = v.resolve_asset(Platform::Linux, None).unwrap();
        assert_eq!(picked.platform, Platform::LinuxDeb32);

        let picked = v.resolve_asset(Platform::Linux64, None).unwrap();
        assert_eq!(picked.filename, "app-linux-x64.tar.gz");
    }

    #[test]
    fn test_asset_serializes_type_field() {
        let v = version(&["app-darwin.dmg"]);
        let json = serde_json::to_value(&v.platforms[0]).unwrap();
        assert_eq!(json["type"], "osx_64");
        assert_eq!(json["backend_handle"], "mem://app-darwin.dmg");
    }
}
