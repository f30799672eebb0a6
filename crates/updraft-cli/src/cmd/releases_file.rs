//! RELEASES file inspection

use anyhow::{Context, Result};
use std::path::Path;
use updraft_schema::releases_file;

use super::print_json;

/// Parse a Squirrel.Windows RELEASES file and print its entries
pub fn releases_file(path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let entries = releases_file::parse(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    print_json(&entries)
}
