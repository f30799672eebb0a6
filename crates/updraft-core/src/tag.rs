//! Tag normalization: turn a release tag into a version string and a channel.
//!
//! Tags are either plain (`v1.2.0`, `1.2.0-beta.1`) or matched by a
//! user-supplied [`TagFilter`] whose `version` group carries the version
//! (e.g. `^desktop-(?P<version>.+)$` for a monorepo tagging `desktop-1.2.0`).

use regex::Regex;
use updraft_schema::STABLE_CHANNEL;

use crate::error::{CatalogError, Result};

/// Capture group a tag filter must define.
pub const VERSION_GROUP: &str = "version";

/// A compiled tag filter with a `version` capture group.
#[derive(Debug, Clone)]
pub struct TagFilter {
    regex: Regex,
}

impl TagFilter {
    /// Compile `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidTagFilter`] if the pattern does not
    /// compile or has no named group `version`.
    pub fn new(pattern: &str) -> Result<Self> {
        let invalid = |reason: String| CatalogError::InvalidTagFilter {
            pattern: pattern.to_string(),
            reason,
        };

        let regex = Regex::new(pattern).map_err(|e| invalid(e.to_string()))?;
        if !regex.capture_names().flatten().any(|n| n == VERSION_GROUP) {
            return Err(invalid(format!(
                "missing named capture group '{VERSION_GROUP}'"
            )));
        }

        Ok(Self { regex })
    }

    /// The source pattern.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Whether the pattern matches `tag` anywhere.
    pub fn matches(&self, tag: &str) -> bool {
        self.regex.is_match(tag)
    }

    /// The `version` group of the first match, if it participated.
    pub fn extract<'t>(&self, tag: &'t str) -> Option<&'t str> {
        self.regex
            .captures(tag)?
            .name(VERSION_GROUP)
            .map(|m| m.as_str())
    }
}

/// Canonical version string for `tag`.
///
/// With a filter, the `version` group is returned; a tag the filter does not
/// match comes back unchanged. The catalog never reaches that case because it
/// drops non-matching releases first. Without a filter a single leading `v`
/// is stripped.
pub fn normalize_tag(tag: &str, filter: Option<&TagFilter>) -> String {
    match filter {
        Some(filter) => filter.extract(tag).unwrap_or(tag).to_string(),
        None => tag.strip_prefix('v').unwrap_or(tag).to_string(),
    }
}

/// Channel encoded in `tag`'s pre-release suffix, lowercased.
///
/// `1.0.0-beta.3` is on `beta`; a tag without a suffix, or one the filter
/// does not match, is on `stable`.
pub fn extract_channel(tag: &str, filter: Option<&TagFilter>) -> String {
    let version = match filter {
        Some(filter) => match filter.extract(tag) {
            Some(version) => version,
            None => return STABLE_CHANNEL.to_string(),
        },
        None => tag,
    };

    version
        .split_once('-')
        .and_then(|(_, suffix)| suffix.split(['.', '+']).next())
        .filter(|channel| !channel.is_empty())
        .map_or_else(|| STABLE_CHANNEL.to_string(), str::to_lowercase)
}
