//! Shared types and wire formats for updraft.
//!
//! This crate has no I/O: it defines the release records exchanged between
//! backends, the catalog and clients, the [`Platform`] classifier, and the
//! Squirrel.Windows `RELEASES` codec.

pub mod platform;
pub mod release;
pub mod releases_file;

// Re-exports
pub use platform::{Platform, PlatformError};
pub use release::*;
pub use releases_file::{ReleaseEntry, ReleasesFileError};
