pub mod channels;
pub mod download;
pub mod releases_file;
pub mod resolve;
pub mod update;
pub mod versions;

use anyhow::Result;
use serde::Serialize;

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
