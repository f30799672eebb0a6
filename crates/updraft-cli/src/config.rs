//! Settings file (`config.toml`) and its merge with the command line.
//!
//! ```toml
//! repo = "acme/desktop"
//! tag_filter = '^desktop-v(?P<version>.+)$'
//! base_url = "https://updates.acme.dev/"
//! log_level = "info"
//! ```

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::Cli;
use crate::paths;

/// Mount URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/";

/// Every setting is optional; later layers fill in what earlier ones leave out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub repo: Option<String>,
    pub token: Option<String>,
    pub api_url: Option<String>,
    pub tag_filter: Option<String>,
    pub base_url: Option<String>,
    pub snapshot: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl Config {
    /// Parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Load `explicit` if given (it must exist), else the default config
    /// file if there is one, else an empty config.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                bail!("Config file {} does not exist", path.display());
            }
            return Self::load(path);
        }
        match paths::config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Settings from `other` win over ours wherever `other` has them.
    #[must_use]
    pub fn overlay(self, other: Self) -> Self {
        Self {
            repo: other.repo.or(self.repo),
            token: other.token.or(self.token),
            api_url: other.api_url.or(self.api_url),
            tag_filter: other.tag_filter.or(self.tag_filter),
            base_url: other.base_url.or(self.base_url),
            snapshot: other.snapshot.or(self.snapshot),
            log_level: other.log_level.or(self.log_level),
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

impl From<&Cli> for Config {
    fn from(cli: &Cli) -> Self {
        Self {
            repo: cli.repo.clone(),
            token: cli.token.clone(),
            api_url: cli.api_url.clone(),
            tag_filter: cli.tag_filter.clone(),
            base_url: cli.base_url.clone(),
            snapshot: cli.snapshot.clone(),
            log_level: cli.log_level.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "repo = \"acme/app\"\ntag_filter = '^app-(?P<version>.+)$'\nlog_level = \"debug\""
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.repo.as_deref(), Some("acme/app"));
        assert_eq!(config.tag_filter.as_deref(), Some("^app-(?P<version>.+)$"));
        assert!(config.token.is_none());
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "repository = \"acme/app\"").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_overlay_prefers_command_line() {
        let file = Config {
            repo: Some("acme/app".to_string()),
            base_url: Some("https://file.example.com/".to_string()),
            ..Config::default()
        };
        let cli = Config {
            base_url: Some("https://cli.example.com/".to_string()),
            ..Config::default()
        };

        let merged = file.overlay(cli);
        assert_eq!(merged.repo.as_deref(), Some("acme/app"));
        assert_eq!(merged.base_url(), "https://cli.example.com/");
    }

    #[test]
    fn test_missing_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::discover(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
