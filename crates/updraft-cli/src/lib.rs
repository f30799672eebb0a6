//! updraft - update feeds for desktop apps
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Reads the releases of a GitHub repository (or a local JSON snapshot) and
//! answers the questions an update server answers: which versions exist,
//! whether a client on a given platform and version should update, and which
//! file to hand out for a download.
//!
//! # Configuration
//!
//! Settings come from, in order of precedence:
//!
//! ```text
//! 1. command line flags / environment (UPDRAFT_REPO, GITHUB_TOKEN, ...)
//! 2. config file (--config, $UPDRAFT_HOME/config.toml, <config dir>/updraft/config.toml)
//! 3. built-in defaults
//! ```

pub mod cmd;
pub mod config;
pub mod paths;
pub mod service;

/// User Agent sent to release backends, carrying the binary's own version
pub const USER_AGENT: &str = concat!("updraft/", env!("UPDRAFT_VERSION"));

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use updraft_core::FilterOptions;

#[derive(Debug, Parser)]
#[command(name = "updraft")]
#[command(author, version = env!("UPDRAFT_VERSION"), about = "updraft - update feeds for desktop apps")]
pub struct Cli {
    /// GitHub repository to read releases from (owner/repo)
    #[arg(long, global = true, env = "UPDRAFT_REPO")]
    pub repo: Option<String>,

    /// GitHub token (needed for private repositories)
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub API root
    #[arg(long, global = true, env = "UPDRAFT_API_URL")]
    pub api_url: Option<String>,

    /// Regex selecting release tags; its `version` group holds the version
    #[arg(long, global = true, env = "UPDRAFT_TAG_FILTER")]
    pub tag_filter: Option<String>,

    /// Public URL the service is mounted at, used to build download links
    #[arg(long, global = true, env = "UPDRAFT_BASE_URL")]
    pub base_url: Option<String>,

    /// Serve releases from a JSON snapshot instead of GitHub
    #[arg(long, global = true, env = "UPDRAFT_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Config file to read instead of the default location
    #[arg(long, global = true, env = "UPDRAFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter (e.g. `debug`, `updraft_core=trace`); defaults to RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Version selection shared by `versions`, `resolve` and `download`.
#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    /// `latest` or a semver range (e.g. `>=1.2.0`)
    #[arg(long, default_value = "latest")]
    pub tag: String,
    /// Only versions with assets for this platform
    #[arg(long)]
    pub platform: Option<String>,
    /// Release channel, or `*` for all
    #[arg(long, default_value = "stable")]
    pub channel: String,
}

impl From<FilterArgs> for FilterOptions {
    fn from(args: FilterArgs) -> Self {
        Self {
            tag: args.tag,
            platform: args.platform,
            channel: args.channel,
        }
    }
}

/// Update protocol to answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UpdateFormat {
    /// Squirrel.Mac JSON manifest
    Json,
    /// electron-updater JSON manifest
    ElectronJson,
    /// electron-updater YAML file from the release
    ElectronYaml,
    /// Squirrel.Windows RELEASES file
    Releases,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List versions, newest first
    Versions {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Summarize release channels
    Channels,
    /// Show the newest version matching a filter
    Resolve {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Check for an update as a client would
    Update {
        /// Client platform (osx, win32, linux_64, ...)
        #[arg(long)]
        platform: String,
        /// Version the client runs
        #[arg(long)]
        version: String,
        /// Channel to follow (all channels when omitted)
        #[arg(long)]
        channel: Option<String>,
        /// Response format
        #[arg(long, value_enum, default_value = "json")]
        format: UpdateFormat,
        /// File requested by electron-updater (defaults per platform)
        #[arg(long)]
        filename: Option<String>,
    },
    /// Resolve and fetch a download
    Download {
        #[command(flatten)]
        filter: FilterArgs,
        /// Infer the platform from this User-Agent when --platform is absent
        #[arg(long)]
        user_agent: Option<String>,
        /// Preferred file extension (dmg, zip, exe, ...)
        #[arg(long)]
        filetype: Option<String>,
        /// Download this exact file of the version instead
        #[arg(long, conflicts_with_all = ["filetype", "user_agent"])]
        filename: Option<String>,
        /// Write the file here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Parse a Squirrel.Windows RELEASES file
    ReleasesFile {
        /// Path to the RELEASES file
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_update_command() {
        let cli = Cli::try_parse_from([
            "updraft",
            "update",
            "--platform",
            "win32",
            "--version",
            "1.0.0",
            "--format",
            "electron-yaml",
        ])
        .unwrap();
        match cli.command {
            Commands::Update {
                platform, format, channel, ..
            } => {
                assert_eq!(platform, "win32");
                assert_eq!(format, UpdateFormat::ElectronYaml);
                assert!(channel.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_user_agent_reports_binary_version() {
        assert_eq!(USER_AGENT, format!("updraft/{}", env!("UPDRAFT_VERSION")));
        assert_ne!(USER_AGENT, updraft_core::USER_AGENT);
    }

    #[test]
    fn test_filter_defaults() {
        let cli = Cli::try_parse_from(["updraft", "versions"]).unwrap();
        let Commands::Versions { filter } = cli.command else {
            panic!("expected versions");
        };
        assert_eq!(FilterOptions::from(filter), FilterOptions::default());
    }

    #[test]
    fn test_filename_conflicts_with_filetype() {
        let res = Cli::try_parse_from([
            "updraft",
            "download",
            "--filename",
            "RELEASES",
            "--filetype",
            "zip",
        ]);
        assert!(res.is_err());
    }
}
