//! Codec for the Squirrel.Windows `RELEASES` manifest.
//!
//! Each non-empty line is `<sha1> <filename> <size>`:
//!
//! ```text
//! 94689FEDE03FED7AB59C24337673A27837F0C3EC myapp-1.0.0-full.nupkg 1004502
//! 3a2eadd15dd984e4559f2b4d790ec8badaeb6a39 myapp-1.1.0-delta.nupkg 54206
//! ```
//!
//! Squirrel clients are strict about this layout, so [`generate`] emits
//! exactly three space-separated fields per line and nothing else.

use serde::{Deserialize, Serialize};

const BOM: char = '\u{feff}';

/// One package line of a `RELEASES` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseEntry {
    /// SHA-1 of the package, passed through untouched.
    pub sha1: String,
    /// Package file name, or an absolute URL once rewritten.
    pub filename: String,
    /// Package size in bytes.
    pub size: u64,
    /// Whether this is a delta package.
    pub is_delta: bool,
    /// Version embedded in the package file name.
    pub semver: String,
}

/// Errors raised while parsing a `RELEASES` file.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReleasesFileError {
    /// A line does not follow the `<sha1> <filename> <size>` layout.
    #[error("Malformed RELEASES line {line}: {reason}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },
}

impl ReleaseEntry {
    /// Build an entry, extracting the version from `filename`.
    ///
    /// Returns `None` when the file name is not a recognizable `.nupkg` name.
    pub fn new(sha1: impl Into<String>, filename: impl Into<String>, size: u64) -> Option<Self> {
        let filename = filename.into();
        let (semver, is_delta) = package_version(&filename)?;
        Some(Self {
            sha1: sha1.into(),
            filename,
            size,
            is_delta,
            semver,
        })
    }

    /// Bare package file name, even after `filename` was rewritten to a URL.
    pub fn package_name(&self) -> &str {
        package_name(&self.filename)
    }
}

fn package_name(filename: &str) -> &str {
    let without_query = filename.split(['?', '#']).next().unwrap_or(filename);
    without_query.rsplit('/').next().unwrap_or(without_query)
}

/// Split `<id>-<version>[-full|-delta].nupkg` into its version and delta flag.
fn package_version(filename: &str) -> Option<(String, bool)> {
    let name = package_name(filename);
    let lower = name.to_ascii_lowercase();

    let (suffix, is_delta) = if lower.ends_with("-full.nupkg") {
        ("-full.nupkg", false)
    } else if lower.ends_with("-delta.nupkg") {
        ("-delta.nupkg", true)
    } else if lower.ends_with(".nupkg") {
        (".nupkg", false)
    } else {
        return None;
    };
    let stem = &name[..name.len() - suffix.len()];

    // Package ids may contain dashes; the version starts at the first dash
    // followed by a digit.
    let start = stem
        .char_indices()
        .find(|(i, c)| {
            *c == '-'
                && stem[i + 1..]
                    .chars()
                    .next()
                    .is_some_and(|n| n.is_ascii_digit())
        })
        .map(|(i, _)| i + 1)?;

    Some((stem[start..].to_string(), is_delta))
}

/// Parse the contents of a `RELEASES` file.
///
/// Tolerates a UTF-8 BOM, CRLF line endings and blank lines.
///
/// # Errors
///
/// Returns [`ReleasesFileError::Malformed`] for a line without exactly three
/// fields, a non-numeric size, or a file name with no embedded version.
pub fn parse(text: &str) -> Result<Vec<ReleaseEntry>, ReleasesFileError> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let mut entries = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let malformed = |reason: String| ReleasesFileError::Malformed {
            line: idx + 1,
            reason,
        };

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [sha1, filename, size] = fields[..] else {
            return Err(malformed(format!(
                "expected 3 fields, found {}",
                fields.len()
            )));
        };
        let size = size
            .parse::<u64>()
            .map_err(|_| malformed(format!("invalid size '{size}'")))?;
        let entry = ReleaseEntry::new(sha1, filename, size)
            .ok_or_else(|| malformed(format!("no version in package name '{filename}'")))?;

        entries.push(entry);
    }

    Ok(entries)
}

/// Render entries back into `RELEASES` text, one line per entry, LF separated.
pub fn generate(entries: &[ReleaseEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{} {} {}", e.sha1, e.filename, e.size))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_line() {
        let entries = parse("ABCD1234 myapp-1.0.0-full.nupkg 1048576").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].sha1, "ABCD1234");
        assert_eq!(entries[0].semver, "1.0.0");
        assert_eq!(entries[0].size, 1_048_576);
        assert!(!entries[0].is_delta);
    }

    #[test]
    fn test_rewrite_filename_and_generate() {
        let mut entries = parse("ABCD1234 myapp-1.0.0-full.nupkg 1048576").unwrap();
        entries[0].filename = "https://host/download/1.0.0/myapp-1.0.0-full.nupkg".to_string();
        assert_eq!(
            generate(&entries),
            "ABCD1234 https://host/download/1.0.0/myapp-1.0.0-full.nupkg 1048576"
        );
        assert_eq!(entries[0].package_name(), "myapp-1.0.0-full.nupkg");
    }

    #[test]
    fn test_round_trip() {
        let text = "94689FEDE03FED7AB59C24337673A27837F0C3EC my-app-1.0.0-full.nupkg 1004502\n\
                    3a2eadd15dd984e4559f2b4d790ec8badaeb6a39 my-app-1.1.0-beta.2-delta.nupkg 54206\n";
        let entries = parse(text).unwrap();
        assert_eq!(entries[0].semver, "1.0.0");
        assert_eq!(entries[1].semver, "1.1.0-beta.2");
        assert!(entries[1].is_delta);
        assert_eq!(generate(&entries), text.trim_end());
    }

    #[test]
    fn test_parse_tolerates_bom_crlf_and_blank_lines() {
        let text = "\u{feff}AAAA app-2.0.0-full.nupkg 10\r\n\r\nBBBB app-2.0.1-delta.nupkg 5\r\n";
        let entries = parse(text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sha1, "AAAA");
        assert_eq!(entries[1].size, 5);
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        let err = parse("AAAA app-1.0.0-full.nupkg 10\nBBBB app-1.0.1-full.nupkg").unwrap_err();
        assert_eq!(
            err,
            ReleasesFileError::Malformed {
                line: 2,
                reason: "expected 3 fields, found 2".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_size_and_name() {
        assert!(parse("AAAA app-1.0.0-full.nupkg ten").is_err());
        assert!(parse("AAAA setup.exe 10").is_err());
    }
}
