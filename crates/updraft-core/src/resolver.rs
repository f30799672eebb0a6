//! Update resolution: turn a client's platform and version into a
//! protocol-specific answer (Squirrel JSON, electron-updater, Windows RELEASES)
//! and resolve download requests to backend assets.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use updraft_schema::{ANY_CHANNEL, Asset, Platform, Version, releases_file};

use crate::backend::AssetDelivery;
use crate::catalog::{FilterOptions, LATEST, VersionCatalog, parse_tag};
use crate::context::RequestContext;
use crate::error::{CatalogError, Result};

/// File name of the Squirrel.Windows package index.
pub const RELEASES_FILENAME: &str = "RELEASES";

/// What a client reports when asking for an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateQuery {
    /// Platform name as sent by the client (`osx`, `win32`, `linux_64`, ...).
    pub platform: String,
    /// The version the client currently runs.
    pub version: String,
    /// Channel to follow; every channel when `None`.
    pub channel: Option<String>,
}

impl UpdateQuery {
    pub fn new(platform: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            version: version.into(),
            channel: None,
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    fn channel(&self) -> &str {
        self.channel.as_deref().unwrap_or(ANY_CHANNEL)
    }
}

/// Outcome of an update check.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateCheck<T> {
    /// The client already runs the newest version.
    UpToDate,
    /// A newer version is available.
    Available(T),
}

impl<T> UpdateCheck<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> UpdateCheck<U> {
        match self {
            Self::UpToDate => UpdateCheck::UpToDate,
            Self::Available(value) => UpdateCheck::Available(f(value)),
        }
    }
}

/// Squirrel.Mac style update manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateManifest {
    pub url: String,
    pub name: String,
    pub notes: String,
    pub channel: String,
    pub pub_date: DateTime<Utc>,
}

/// electron-updater JSON manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectronManifest {
    pub version: String,
    pub release_date: DateTime<Utc>,
    pub url: String,
}

/// electron-updater answer, picked by the requested file extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElectronUpdate {
    Json(ElectronManifest),
    /// The release's own YAML file, passed through untouched.
    Yaml(Bytes),
}

/// A regenerated `RELEASES` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasesBody {
    pub body: Bytes,
    pub content_length: u64,
}

/// What a download request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadQuery {
    /// `latest` or a version range.
    pub tag: String,
    /// Channel `latest` is resolved on. An explicit tag matches any channel.
    pub channel: String,
    /// Explicit platform; inferred from `user_agent` when absent.
    pub platform: Option<String>,
    pub user_agent: Option<String>,
    /// Preferred file extension (`dmg`, `zip`, ...).
    pub filetype: Option<String>,
}

impl Default for DownloadQuery {
    fn default() -> Self {
        let options = FilterOptions::default();
        Self {
            tag: options.tag,
            channel: options.channel,
            platform: None,
            user_agent: None,
            filetype: None,
        }
    }
}

/// A download resolved to an asset, with the backend's delivery for it.
#[derive(Debug)]
pub struct ResolvedDownload {
    /// Tag of the version the asset belongs to.
    pub tag: String,
    pub asset: Asset,
    pub delivery: AssetDelivery,
}

/// Release notes of every version newer than `current`, newest first.
fn merge_notes(versions: &[Version], current: &str) -> String {
    let newer: Vec<&Version> = versions.iter().filter(|v| v.tag != current).collect();
    if newer.len() <= 1 {
        return versions.first().map(|v| v.notes.clone()).unwrap_or_default();
    }
    newer
        .iter()
        .map(|v| v.notes.trim())
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn extension_of(filename: &str) -> Option<&str> {
    filename.rsplit_once('.').map(|(_, ext)| ext)
}

/// Answers update checks and download requests from a [`VersionCatalog`].
#[derive(Debug)]
pub struct UpdateResolver {
    catalog: VersionCatalog,
}

impl UpdateResolver {
    pub fn new(catalog: VersionCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &VersionCatalog {
        &self.catalog
    }

    /// Versions at or above the client's version for its platform and
    /// channel, newest first, together with the client's bare tag.
    async fn candidates(&self, query: &UpdateQuery) -> Result<(Platform, String, Vec<Version>)> {
        let platform: Platform = query.platform.parse()?;
        let current = parse_tag(query.version.strip_prefix('v').unwrap_or(&query.version))?;
        let tag = format!("{}.{}.{}", current.major, current.minor, current.patch);

        let options = FilterOptions::default()
            .with_tag(format!(">={tag}"))
            .with_platform(platform.as_str())
            .with_channel(query.channel());
        let versions = self.catalog.filter(&options).await?;
        Ok((platform, tag, versions))
    }

    async fn check(&self, query: &UpdateQuery) -> Result<UpdateCheck<(Platform, String, Vec<Version>)>> {
        let (platform, tag, versions) = self.candidates(query).await?;
        match versions.first() {
            Some(latest) if latest.tag != tag => {
                tracing::info!(
                    platform = %platform,
                    current = %tag,
                    latest = %latest.tag,
                    "update available"
                );
                Ok(UpdateCheck::Available((platform, tag, versions)))
            }
            _ => {
                tracing::debug!(platform = %platform, current = %tag, "client is up to date");
                Ok(UpdateCheck::UpToDate)
            }
        }
    }

    fn download_url(ctx: &RequestContext, version: &Version, platform: Platform) -> String {
        ctx.url_with_filetype(
            &["download", "version", &version.tag, platform.as_str()],
            platform.update_filetype(),
        )
        .to_string()
    }

    /// Squirrel.Mac style check: a JSON manifest when an update exists.
    ///
    /// # Errors
    ///
    /// Fails on an unknown platform, a client version that is not semver, or
    /// any catalog error.
    pub async fn squirrel(
        &self,
        ctx: &RequestContext,
        query: &UpdateQuery,
    ) -> Result<UpdateCheck<UpdateManifest>> {
        Ok(self.check(query).await?.map(|(platform, tag, versions)| {
            let latest = &versions[0];
            UpdateManifest {
                url: Self::download_url(ctx, latest, platform),
                name: latest.tag.clone(),
                notes: merge_notes(&versions, &tag),
                channel: latest.channel.clone(),
                pub_date: latest.published_at,
            }
        }))
    }

    /// electron-updater check. `filename` is what the client asked for
    /// (`latest.json`, `latest-mac.yml`, ...): JSON requests get a generated
    /// manifest, YAML requests get the release's own file of that name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::AssetNotFound`] when the YAML file is not part
    /// of the release or the extension is neither JSON nor YAML, plus any
    /// [`squirrel`](Self::squirrel) error.
    pub async fn electron(
        &self,
        ctx: &RequestContext,
        query: &UpdateQuery,
        filename: &str,
    ) -> Result<UpdateCheck<ElectronUpdate>> {
        let (platform, _, versions) = match self.check(query).await? {
            UpdateCheck::UpToDate => return Ok(UpdateCheck::UpToDate),
            UpdateCheck::Available(found) => found,
        };
        let latest = &versions[0];

        match extension_of(filename).map(str::to_lowercase).as_deref() {
            Some("json") => Ok(UpdateCheck::Available(ElectronUpdate::Json(ElectronManifest {
                version: latest.version.clone(),
                release_date: latest.published_at,
                url: Self::download_url(ctx, latest, platform),
            }))),
            Some("yml" | "yaml") => {
                let asset = latest.find_asset(filename).ok_or_else(|| CatalogError::AssetNotFound {
                    tag: latest.tag.clone(),
                    filename: filename.to_string(),
                })?;
                let body = self.catalog.backend().read_asset(asset).await?;
                Ok(UpdateCheck::Available(ElectronUpdate::Yaml(body)))
            }
            _ => Err(CatalogError::AssetNotFound {
                tag: latest.tag.clone(),
                filename: filename.to_string(),
            }),
        }
    }

    /// Squirrel.Windows `RELEASES` file of the newest qualifying version, with
    /// every package pointed at this service's download route.
    ///
    /// Served even when the client is current: Squirrel.Windows compares the
    /// entries itself.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::VersionNotFound`] when no version qualifies,
    /// [`CatalogError::AssetNotFound`] when it has no `RELEASES` file, and
    /// [`CatalogError::MalformedReleasesFile`] when that file does not parse.
    pub async fn releases(&self, ctx: &RequestContext, query: &UpdateQuery) -> Result<ReleasesBody> {
        let (_, tag, versions) = self.candidates(query).await?;
        let latest = versions.first().ok_or_else(|| CatalogError::VersionNotFound {
            tag: format!(">={tag}"),
            channel: query.channel().to_string(),
            platform: query.platform.clone(),
        })?;
        let asset = latest
            .find_asset(RELEASES_FILENAME)
            .ok_or_else(|| CatalogError::AssetNotFound {
                tag: latest.tag.clone(),
                filename: RELEASES_FILENAME.to_string(),
            })?;

        let content = self.catalog.backend().read_asset(asset).await?;
        let mut entries = releases_file::parse(&String::from_utf8_lossy(&content))?;

        let channel = query.channel();
        for entry in &mut entries {
            let package = entry.package_name().to_string();
            let url = if channel == ANY_CHANNEL {
                ctx.url_for(&["download", &entry.semver, &package])
            } else {
                ctx.url_for(&["download", "channel", channel, &entry.semver, &package])
            };
            entry.filename = url.to_string();
        }

        let body = Bytes::from(releases_file::generate(&entries));
        tracing::debug!(tag = %latest.tag, entries = entries.len(), "rewrote RELEASES");
        Ok(ReleasesBody {
            content_length: body.len() as u64,
            body,
        })
    }

    /// Resolve a download for a platform (explicit or from the User-Agent).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::PlatformUndetected`] when no platform is given
    /// or inferable, [`CatalogError::AssetNotFound`] when the version has no
    /// asset for the platform, plus any catalog or backend error.
    pub async fn download(&self, ctx: &RequestContext, query: &DownloadQuery) -> Result<ResolvedDownload> {
        let platform = match (&query.platform, &query.user_agent) {
            (Some(name), _) => name.parse::<Platform>()?,
            (None, Some(ua)) => Platform::from_user_agent(ua).ok_or(CatalogError::PlatformUndetected)?,
            (None, None) => return Err(CatalogError::PlatformUndetected),
        };

        // An explicit tag names a release on whatever channel it was cut.
        let channel = if query.tag == LATEST {
            query.channel.as_str()
        } else {
            ANY_CHANNEL
        };
        let options = FilterOptions::default()
            .with_tag(query.tag.clone())
            .with_channel(channel)
            .with_platform(platform.as_str());
        let version = self.catalog.resolve(&options).await?;
        let asset = version
            .resolve_asset(platform, query.filetype.as_deref())
            .cloned()
            .ok_or_else(|| CatalogError::AssetNotFound {
                tag: version.tag.clone(),
                filename: format!("<{platform}>"),
            })?;

        self.deliver(ctx, version.tag, asset).await
    }

    /// Resolve a file by name, as referenced from a rewritten `RELEASES` file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::VersionNotFound`] when no version matches
    /// `tag`, [`CatalogError::AssetNotFound`] when none of them has
    /// `filename`, plus any backend error.
    pub async fn download_file(
        &self,
        ctx: &RequestContext,
        tag: &str,
        filename: &str,
        channel: Option<&str>,
    ) -> Result<ResolvedDownload> {
        // Catalog tags carry no pre-release suffix.
        let tag = if tag == LATEST {
            LATEST
        } else {
            let bare = tag.strip_prefix('v').unwrap_or(tag);
            bare.split('-').next().unwrap_or(bare)
        };
        let options = FilterOptions::default()
            .with_tag(tag)
            .with_channel(channel.unwrap_or(ANY_CHANNEL));

        let versions = self.catalog.filter(&options).await?;
        if versions.is_empty() {
            return Err(CatalogError::VersionNotFound {
                tag: tag.to_string(),
                channel: options.channel,
                platform: ANY_CHANNEL.to_string(),
            });
        }

        let (version, asset) = versions
            .iter()
            .find_map(|v| v.find_asset(filename).map(|a| (v, a.clone())))
            .ok_or_else(|| CatalogError::AssetNotFound {
                tag: tag.to_string(),
                filename: filename.to_string(),
            })?;

        self.deliver(ctx, version.tag.clone(), asset).await
    }

    async fn deliver(&self, ctx: &RequestContext, tag: String, asset: Asset) -> Result<ResolvedDownload> {
        tracing::info!(tag = %tag, file = %asset.filename, platform = %asset.platform, "serving asset");
        let delivery = self.catalog.backend().serve_asset(&asset, ctx).await?;
        Ok(ResolvedDownload { tag, asset, delivery })
    }
}
