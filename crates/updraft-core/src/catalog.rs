//! The version catalog: normalized, sorted versions built from backend releases.
//!
//! Nothing is cached between calls. Every [`VersionCatalog::list`] fetches the
//! releases again, so the catalog always reflects the backend; only backend
//! initialization is memoized (see [`InitGuard`]).

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use semver::VersionReq;
use updraft_schema::{ANY_CHANNEL, Asset, ChannelSummary, Platform, RawRelease, STABLE_CHANNEL, Version};

use crate::backend::ReleaseBackend;
use crate::error::{CatalogError, Result};
use crate::init::InitGuard;
use crate::tag::{TagFilter, extract_channel, normalize_tag};

/// Tag query selecting the newest version.
pub const LATEST: &str = "latest";

/// Criteria for [`VersionCatalog::filter`] and [`VersionCatalog::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    /// `latest`, or a version range (`>=1.2.0`, `^1.2`, `1.2`, `1.0.0 - 2.0.0`).
    pub tag: String,
    /// Free-form platform name (`osx`, `darwin`, `win32`, ...), if any.
    pub platform: Option<String>,
    /// Channel name, or `*` for every channel.
    pub channel: String,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            tag: LATEST.to_string(),
            platform: None,
            channel: STABLE_CHANNEL.to_string(),
        }
    }
}

impl FilterOptions {
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }
}

/// Build a [`Version`] from a raw release.
///
/// Drafts are skipped. With a filter, releases whose tag the filter does not
/// match, or matches without capturing a `version`, are skipped as well.
/// Assets whose platform cannot be detected are left out.
pub fn normalize_version(release: &RawRelease, filter: Option<&TagFilter>) -> Option<Version> {
    if release.draft {
        return None;
    }
    if let Some(filter) = filter {
        filter.extract(&release.tag_name)?;
    }

    let version = normalize_tag(&release.tag_name, filter);
    let tag = version.split('-').next().unwrap_or(&version).to_string();
    let channel = extract_channel(&release.tag_name, filter);

    Some(Version {
        tag,
        channel,
        notes: release.notes.clone(),
        published_at: release.published_at,
        download_count: release.assets.iter().map(|a| a.download_count).sum(),
        platforms: release.assets.iter().filter_map(Asset::classify).collect(),
        version,
    })
}

/// Parse a version tag for comparison.
///
/// # Errors
///
/// Returns [`CatalogError::ComparatorFailure`] if `tag` is not valid semver.
pub fn parse_tag(tag: &str) -> Result<semver::Version> {
    semver::Version::parse(tag).map_err(|e| CatalogError::comparator(tag, e))
}

/// Semver precedence: build metadata does not take part.
fn precedence(a: &semver::Version, b: &semver::Version) -> Ordering {
    a.major
        .cmp(&b.major)
        .then(a.minor.cmp(&b.minor))
        .then(a.patch.cmp(&b.patch))
        .then_with(|| a.pre.cmp(&b.pre))
}

/// Catalog order of two versions: `Less` when `a` is newer, i.e. sorts first.
///
/// # Errors
///
/// Returns [`CatalogError::ComparatorFailure`] if either tag is not valid semver.
pub fn compare_versions(a: &Version, b: &Version) -> Result<Ordering> {
    Ok(precedence(&parse_tag(&b.tag)?, &parse_tag(&a.tag)?))
}

/// A version range: matches when any of its `||` alternatives does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    alternatives: Vec<VersionReq>,
}

impl VersionRange {
    pub fn matches(&self, version: &semver::Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }
}

/// Parse a version range.
///
/// Accepted forms:
/// - a full bare version (`1.2.3`, `v1.2.3`) means exactly that version;
/// - a partial one is a wildcard on the missing parts (`1.2` is `1.2.x`);
/// - comparators separated by commas or whitespace (`>=1.0.0 <2.0.0`);
/// - an inclusive hyphen range (`1.0.0 - 2.0.0`);
/// - any of the above joined by `||`.
///
/// # Errors
///
/// Returns [`CatalogError::ComparatorFailure`] if the range cannot be parsed.
pub fn parse_range(expr: &str) -> Result<VersionRange> {
    let expr = expr.trim();
    let alternatives = expr
        .split("||")
        .map(|part| parse_alternative(part.trim()).map_err(|e| CatalogError::comparator(expr, e)))
        .collect::<Result<Vec<_>>>()?;
    Ok(VersionRange { alternatives })
}

fn strip_v(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

fn exact(major: u64, minor: Option<u64>, patch: Option<u64>, pre: semver::Prerelease) -> VersionReq {
    VersionReq {
        comparators: vec![semver::Comparator {
            op: semver::Op::Exact,
            major,
            minor,
            patch,
            pre,
        }],
    }
}

/// `1`, `1.2`, `v1.2` without an operator.
fn partial_version(expr: &str) -> Option<VersionReq> {
    let mut parts = strip_v(expr).split('.');
    let mut next = || parts.next().map(str::parse::<u64>).transpose().ok();
    let (major, minor, patch) = (next()??, next()?, next()?);
    if parts.next().is_some() {
        return None;
    }
    Some(exact(major, minor, patch, semver::Prerelease::EMPTY))
}

fn parse_alternative(expr: &str) -> std::result::Result<VersionReq, String> {
    if expr.is_empty() {
        return Err("empty range".to_string());
    }
    if let Ok(version) = semver::Version::parse(strip_v(expr)) {
        return Ok(exact(version.major, Some(version.minor), Some(version.patch), version.pre));
    }
    if let Some(req) = partial_version(expr) {
        return Ok(req);
    }

    let normalized = if let Some((low, high)) = expr.split_once(" - ") {
        format!(">={}, <={}", strip_v(low.trim()), strip_v(high.trim()))
    } else if expr.contains(',') {
        expr.to_string()
    } else {
        // Glue lone operators to their operand: ">= 1.0" -> ">=1.0".
        let mut parts: Vec<String> = Vec::new();
        let mut pending = String::new();
        for token in expr.split_whitespace() {
            if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
                pending.push_str(token);
            } else {
                parts.push(format!("{pending}{token}"));
                pending.clear();
            }
        }
        parts.join(", ")
    };

    VersionReq::parse(&normalized).map_err(|e| e.to_string())
}

/// Queryable view over a backend's releases.
pub struct VersionCatalog {
    backend: Arc<dyn ReleaseBackend>,
    filter: Option<TagFilter>,
    init: InitGuard,
}

impl std::fmt::Debug for VersionCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionCatalog")
            .field("backend", &self.backend.key())
            .field("filter", &self.filter.as_ref().map(TagFilter::as_str))
            .field("initialized", &self.init.is_initialized())
            .finish()
    }
}

impl VersionCatalog {
    pub fn new(backend: Arc<dyn ReleaseBackend>) -> Self {
        Self {
            backend,
            filter: None,
            init: InitGuard::new(),
        }
    }

    /// Only serve releases whose tag matches `pattern`, reading the version
    /// from its `version` group.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidTagFilter`] if the pattern is invalid.
    pub fn with_tag_filter(mut self, pattern: &str) -> Result<Self> {
        self.filter = Some(TagFilter::new(pattern)?);
        Ok(self)
    }

    pub fn backend(&self) -> &Arc<dyn ReleaseBackend> {
        &self.backend
    }

    pub fn tag_filter(&self) -> Option<&TagFilter> {
        self.filter.as_ref()
    }

    /// Initialize the backend now instead of on first use.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Backend`] if initialization failed.
    pub async fn prefetch(&self) -> Result<()> {
        self.init.ensure(self.backend.as_ref()).await
    }

    /// Every servable version, newest first. Equal tags keep backend order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Backend`] if the backend fails, or
    /// [`CatalogError::ComparatorFailure`] if a tag is not valid semver.
    pub async fn list(&self) -> Result<Vec<Version>> {
        self.init.ensure(self.backend.as_ref()).await?;
        let releases = self.backend.releases().await?;

        let mut keyed = releases
            .iter()
            .filter_map(|r| normalize_version(r, self.filter.as_ref()))
            .map(|v| parse_tag(&v.tag).map(|key| (key, v)))
            .collect::<Result<Vec<_>>>()?;
        // Stable sort: ties keep their relative order.
        keyed.sort_by(|(a, _), (b, _)| precedence(b, a));

        tracing::debug!(
            backend = %self.backend.key(),
            releases = releases.len(),
            versions = keyed.len(),
            "built version list"
        );
        Ok(keyed.into_iter().map(|(_, v)| v).collect())
    }

    /// Versions matching `options`, in [`list`](Self::list) order.
    ///
    /// # Errors
    ///
    /// Fails on an unknown platform, an unparseable range, or any
    /// [`list`](Self::list) error.
    pub async fn filter(&self, options: &FilterOptions) -> Result<Vec<Version>> {
        let platform = options
            .platform
            .as_deref()
            .map(str::parse::<Platform>)
            .transpose()?;
        let range = if options.tag == LATEST {
            None
        } else {
            Some(parse_range(&options.tag)?)
        };
        let channel = options.channel.to_lowercase();

        let mut matched = Vec::new();
        for version in self.list().await? {
            if channel != ANY_CHANNEL && version.channel != channel {
                continue;
            }
            if platform.is_some_and(|p| !version.supports(p)) {
                continue;
            }
            if let Some(range) = &range {
                if !range.matches(&parse_tag(&version.tag)?) {
                    continue;
                }
            }
            matched.push(version);
        }
        Ok(matched)
    }

    /// The first version matching `options`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::VersionNotFound`] if nothing matches, or any
    /// [`filter`](Self::filter) error.
    pub async fn resolve(&self, options: &FilterOptions) -> Result<Version> {
        self.filter(options)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::VersionNotFound {
                tag: options.tag.clone(),
                channel: options.channel.clone(),
                platform: options.platform.clone().unwrap_or_else(|| ANY_CHANNEL.to_string()),
            })
    }

    /// Per-channel summary of the current listing.
    ///
    /// # Errors
    ///
    /// Any [`list`](Self::list) error.
    pub async fn channels(&self) -> Result<BTreeMap<String, ChannelSummary>> {
        Ok(summarize_channels(&self.list().await?))
    }
}

/// Fold versions into one [`ChannelSummary`] per channel.
///
/// The first version seen seeds its channel; later ones take over `latest`
/// only when published strictly later.
pub fn summarize_channels(versions: &[Version]) -> BTreeMap<String, ChannelSummary> {
    let mut channels: BTreeMap<String, ChannelSummary> = BTreeMap::new();

    for version in versions {
        let summary = channels
            .entry(version.channel.clone())
            .or_insert_with(|| ChannelSummary {
                latest: version.tag.clone(),
                versions_count: 0,
                published_at: DateTime::<Utc>::UNIX_EPOCH,
            });

        if summary.versions_count == 0 || version.published_at > summary.published_at {
            summary.latest.clone_from(&version.tag);
            summary.published_at = version.published_at;
        }
        summary.versions_count += 1;
    }

    channels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use chrono::TimeZone;
    use updraft_schema::{AssetHandle, RawAsset};

    fn release(tag: &str, day: u32, assets: &[&str]) -> RawRelease {
        RawRelease {
            tag_name: tag.to_string(),
            draft: false,
            published_at: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap(),
            notes: format!("Notes for {tag}"),
            assets: assets
                .iter()
                .enumerate()
                .map(|(i, name)| RawAsset {
                    id: i as u64,
                    name: (*name).to_string(),
                    size: 100,
                    content_type: "application/octet-stream".to_string(),
                    download_count: 2,
                    handle: AssetHandle::new(format!("mem://{tag}/{name}")),
                })
                .collect(),
        }
    }

    fn catalog(releases: Vec<RawRelease>) -> VersionCatalog {
        VersionCatalog::new(Arc::new(MemoryBackend::new("test", releases)))
    }

    #[test]
    fn test_normalize_skips_drafts() {
        let mut r = release("v1.0.0", 1, &["app-darwin.dmg"]);
        r.draft = true;
        assert!(normalize_version(&r, None).is_none());
    }

    #[test]
    fn test_normalize_builds_version() {
        let r = release("v2.0.0-beta.1", 1, &["app-darwin.dmg", "SHA256SUMS"]);
        let v = normalize_version(&r, None).unwrap();
        assert_eq!(v.version, "2.0.0-beta.1");
        assert_eq!(v.tag, "2.0.0");
        assert_eq!(v.channel, "beta");
        assert_eq!(v.platforms.len(), 1);
        assert_eq!(v.download_count, 4);
    }

    #[test]
    fn test_normalize_with_filter() {
        let filter = TagFilter::new(r"^desktop-(?P<version>.+)$").unwrap();
        assert!(normalize_version(&release("cli-1.0.0", 1, &[]), Some(&filter)).is_none());

        let v = normalize_version(&release("desktop-1.2.0-rc.1", 1, &[]), Some(&filter)).unwrap();
        assert_eq!(v.version, "1.2.0-rc.1");
        assert_eq!(v.tag, "1.2.0");
        assert_eq!(v.channel, "rc");
    }

    #[test]
    fn test_compare_versions() {
        let a = normalize_version(&release("v1.10.0", 1, &[]), None).unwrap();
        let b = normalize_version(&release("v1.9.0", 1, &[]), None).unwrap();
        assert_eq!(compare_versions(&a, &b).unwrap(), Ordering::Less);
        assert_eq!(compare_versions(&b, &a).unwrap(), Ordering::Greater);
        assert_eq!(compare_versions(&a, &a).unwrap(), Ordering::Equal);

        let bad = normalize_version(&release("nightly", 1, &[]), None).unwrap();
        assert!(matches!(
            compare_versions(&a, &bad),
            Err(CatalogError::ComparatorFailure { .. })
        ));
    }

    #[test]
    fn test_parse_range() {
        let v = |s: &str| semver::Version::parse(s).unwrap();
        assert!(parse_range(">=1.2.0").unwrap().matches(&v("1.3.0")));
        assert!(!parse_range(">=1.2.0").unwrap().matches(&v("1.1.9")));
        assert!(parse_range("1.2.0").unwrap().matches(&v("1.2.0")));
        assert!(!parse_range("1.2.0").unwrap().matches(&v("1.2.1")));
        assert!(parse_range("v1.2.0").unwrap().matches(&v("1.2.0")));
        assert!(parse_range(">= 1.0.0 < 2.0.0").unwrap().matches(&v("1.5.0")));
        assert!(!parse_range(">=1.0.0 <2.0.0").unwrap().matches(&v("2.0.0")));
        assert!(matches!(
            parse_range("not-a-range"),
            Err(CatalogError::ComparatorFailure { .. })
        ));
    }

    #[test]
    fn test_parse_range_partial_versions() {
        let v = |s: &str| semver::Version::parse(s).unwrap();
        let minor = parse_range("1.2").unwrap();
        assert!(minor.matches(&v("1.2.0")));
        assert!(minor.matches(&v("1.2.5")));
        assert!(!minor.matches(&v("1.9.0")));

        let major = parse_range("v1").unwrap();
        assert!(major.matches(&v("1.9.0")));
        assert!(!major.matches(&v("2.0.0")));
        assert!(!major.matches(&v("0.9.0")));
    }

    #[test]
    fn test_parse_range_hyphen_and_union() {
        let v = |s: &str| semver::Version::parse(s).unwrap();
        let hyphen = parse_range("1.0.0 - 2.0.0").unwrap();
        assert!(hyphen.matches(&v("1.0.0")));
        assert!(hyphen.matches(&v("2.0.0")));
        assert!(!hyphen.matches(&v("2.0.1")));
        assert!(!hyphen.matches(&v("0.9.9")));

        let union = parse_range("<1.0.0 || >=2.0.0").unwrap();
        assert!(union.matches(&v("0.9.0")));
        assert!(union.matches(&v("2.1.0")));
        assert!(!union.matches(&v("1.5.0")));

        assert!(parse_range("1.0.0 ||").is_err());
    }

    #[test]
    fn test_summarize_channels() {
        let versions: Vec<Version> = [
            release("v2.0.0-beta.1", 5, &[]),
            release("v1.1.0", 3, &[]),
            release("v1.0.1", 4, &[]),
            release("v1.0.0", 1, &[]),
        ]
        .iter()
        .filter_map(|r| normalize_version(r, None))
        .collect();

        let channels = summarize_channels(&versions);
        assert_eq!(channels.len(), 2);
        assert_eq!(channels["beta"].versions_count, 1);
        assert_eq!(channels["stable"].versions_count, 3);
        // 1.0.1 was published after 1.1.0.
        assert_eq!(channels["stable"].latest, "1.0.1");
    }

    #[tokio::test]
    async fn test_list_sorts_newest_first() {
        let cat = catalog(vec![
            release("v1.0.0", 1, &["app-darwin.dmg"]),
            release("v2.0.0-beta.1", 2, &["app-darwin.dmg"]),
            release("v1.10.0", 3, &[]),
        ]);
        let tags: Vec<String> = cat.list().await.unwrap().into_iter().map(|v| v.tag).collect();
        assert_eq!(tags, ["2.0.0", "1.10.0", "1.0.0"]);
    }

    #[tokio::test]
    async fn test_list_is_stable_on_equal_tags() {
        let cat = catalog(vec![
            release("v1.0.0-beta.2", 2, &[]),
            release("v1.0.0", 3, &[]),
            release("v1.0.0-alpha", 1, &[]),
        ]);
        let versions: Vec<String> = cat
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.version)
            .collect();
        assert_eq!(versions, ["1.0.0-beta.2", "1.0.0", "1.0.0-alpha"]);
    }

    #[tokio::test]
    async fn test_list_fails_on_non_semver_tag() {
        let cat = catalog(vec![release("v1.0.0", 1, &[]), release("nightly", 2, &[])]);
        assert!(matches!(
            cat.list().await,
            Err(CatalogError::ComparatorFailure { value, .. }) if value == "nightly"
        ));
    }

    #[tokio::test]
    async fn test_resolve_not_found_carries_tag() {
        let cat = catalog(vec![release("v1.0.0", 1, &["app-darwin.dmg"])]);
        let err = cat
            .resolve(&FilterOptions::default().with_tag(">=5.0.0"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::VersionNotFound { ref tag, .. } if tag == ">=5.0.0"));
    }

    #[tokio::test]
    async fn test_filter_unknown_platform() {
        let cat = catalog(vec![release("v1.0.0", 1, &["app-darwin.dmg"])]);
        let err = cat
            .filter(&FilterOptions::default().with_platform("amiga"))
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::UnknownPlatform("amiga".to_string()));
    }
}
