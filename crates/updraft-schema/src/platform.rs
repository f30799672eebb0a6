//! Platform classification for release assets and update clients.
//!
//! Vendors name their assets inconsistently (`darwin`, `mac`, `osx`; `x64`,
//! `amd64`, `win64`), so classification is a keyword table over the lowercased
//! filename. Platforms form a partial order: a generic platform such as
//! [`Platform::Linux`] is satisfied by any of its descendants
//! ([`Platform::Linux64`], [`Platform::LinuxDeb64`], ...).

use std::cmp::Reverse;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::release::{Asset, Version};

/// Target platform of an asset or of an update client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    /// Any macOS build.
    #[serde(rename = "osx")]
    Osx,
    /// 32-bit macOS build.
    #[serde(rename = "osx_32")]
    Osx32,
    /// 64-bit Intel macOS build.
    #[serde(rename = "osx_64")]
    Osx64,
    /// Apple Silicon macOS build.
    #[serde(rename = "osx_arm64")]
    OsxArm64,
    /// Any Windows build.
    #[serde(rename = "windows")]
    Windows,
    /// 32-bit Windows build (also the Squirrel.Windows default).
    #[serde(rename = "windows_32")]
    Windows32,
    /// 64-bit Windows build.
    #[serde(rename = "windows_64")]
    Windows64,
    /// Any Linux build.
    #[serde(rename = "linux")]
    Linux,
    /// 32-bit Linux archive.
    #[serde(rename = "linux_32")]
    Linux32,
    /// 64-bit Linux archive.
    #[serde(rename = "linux_64")]
    Linux64,
    /// Any Debian package.
    #[serde(rename = "linux_deb")]
    LinuxDeb,
    /// 32-bit Debian package.
    #[serde(rename = "linux_deb_32")]
    LinuxDeb32,
    /// 64-bit Debian package.
    #[serde(rename = "linux_deb_64")]
    LinuxDeb64,
    /// Any RPM package.
    #[serde(rename = "linux_rpm")]
    LinuxRpm,
    /// 32-bit RPM package.
    #[serde(rename = "linux_rpm_32")]
    LinuxRpm32,
    /// 64-bit RPM package.
    #[serde(rename = "linux_rpm_64")]
    LinuxRpm64,
}

/// Errors raised while turning client input into a [`Platform`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// Nothing in the request identified a platform.
    #[error("Could not detect a platform from the request")]
    Undetected,

    /// The supplied platform name is not one we know.
    #[error("Unknown platform: {0}")]
    Unknown(String),
}

/// Extension order used to pick between assets of equal specificity.
pub const FILE_PREFERENCE: &[&str] = &[
    ".exe", ".dmg", ".deb", ".rpm", ".tgz", ".tar.gz", ".zip", ".nupkg",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Osx,
    Windows,
    Linux,
    LinuxDeb,
    LinuxRpm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bits {
    X32,
    X64,
    Arm64,
}

const ALIASES: &[(&str, Platform)] = &[
    ("darwin", Platform::Osx),
    ("mac", Platform::Osx),
    ("macos", Platform::Osx),
    ("osx64", Platform::Osx64),
    ("darwin_64", Platform::Osx64),
    ("mac_64", Platform::Osx64),
    ("macos_64", Platform::Osx64),
    ("darwin_arm64", Platform::OsxArm64),
    ("mac_arm64", Platform::OsxArm64),
    ("macos_arm64", Platform::OsxArm64),
    ("win", Platform::Windows),
    ("win32", Platform::Windows32),
    ("win64", Platform::Windows64),
    ("linux32", Platform::Linux32),
    ("linux64", Platform::Linux64),
    ("deb", Platform::LinuxDeb),
    ("debian", Platform::LinuxDeb),
    ("ubuntu", Platform::LinuxDeb),
    ("rpm", Platform::LinuxRpm),
    ("fedora", Platform::LinuxRpm),
];

impl Platform {
    /// Every platform, generic ones first within each family.
    pub const ALL: [Platform; 16] = [
        Self::Osx,
        Self::Osx32,
        Self::Osx64,
        Self::OsxArm64,
        Self::Windows,
        Self::Windows32,
        Self::Windows64,
        Self::Linux,
        Self::Linux32,
        Self::Linux64,
        Self::LinuxDeb,
        Self::LinuxDeb32,
        Self::LinuxDeb64,
        Self::LinuxRpm,
        Self::LinuxRpm32,
        Self::LinuxRpm64,
    ];

    /// Canonical identifier, as used in download URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Osx => "osx",
            Self::Osx32 => "osx_32",
            Self::Osx64 => "osx_64",
            Self::OsxArm64 => "osx_arm64",
            Self::Windows => "windows",
            Self::Windows32 => "windows_32",
            Self::Windows64 => "windows_64",
            Self::Linux => "linux",
            Self::Linux32 => "linux_32",
            Self::Linux64 => "linux_64",
            Self::LinuxDeb => "linux_deb",
            Self::LinuxDeb32 => "linux_deb_32",
            Self::LinuxDeb64 => "linux_deb_64",
            Self::LinuxRpm => "linux_rpm",
            Self::LinuxRpm32 => "linux_rpm_32",
            Self::LinuxRpm64 => "linux_rpm_64",
        }
    }

    /// The next more generic platform, if any.
    pub fn parent(&self) -> Option<Platform> {
        match self {
            Self::Osx32 | Self::Osx64 | Self::OsxArm64 => Some(Self::Osx),
            Self::Windows32 | Self::Windows64 => Some(Self::Windows),
            Self::Linux32 | Self::Linux64 | Self::LinuxDeb | Self::LinuxRpm => Some(Self::Linux),
            Self::LinuxDeb32 | Self::LinuxDeb64 => Some(Self::LinuxDeb),
            Self::LinuxRpm32 | Self::LinuxRpm64 => Some(Self::LinuxRpm),
            Self::Osx | Self::Windows | Self::Linux => None,
        }
    }

    /// This platform followed by each of its ancestors, most specific first.
    pub fn ancestors(self) -> impl Iterator<Item = Platform> {
        std::iter::successors(Some(self), Platform::parent)
    }

    /// How many ancestors this platform has; larger is more specific.
    pub fn specificity(&self) -> usize {
        self.ancestors().count() - 1
    }

    /// The root of this platform's family (`osx`, `windows` or `linux`).
    pub fn family(&self) -> Platform {
        self.ancestors().last().unwrap_or(*self)
    }

    /// Whether an asset built for `available` can serve a request for `self`.
    ///
    /// True when `available` is `self` or one of its descendants.
    pub fn is_satisfied_by(self, available: Platform) -> bool {
        available.ancestors().any(|p| p == self)
    }

    /// File type the Squirrel / electron updaters download for this family.
    pub fn update_filetype(&self) -> Option<&'static str> {
        match self.family() {
            Self::Osx => Some("zip"),
            Self::Windows => Some("exe"),
            _ => None,
        }
    }

    /// Classify an asset filename.
    ///
    /// Returns `None` for files that carry no platform hint at all (checksums,
    /// source tarballs with unknown names, ...).
    #[allow(clippy::case_sensitive_file_extension_comparisons)]
    pub fn detect(filename: &str) -> Option<Platform> {
        let name = filename.to_lowercase();

        // Squirrel.Windows manifests and packages, plus the electron-updater
        // windows manifest.
        if name == "releases" || name.ends_with(".nupkg") || name == "latest.yml" {
            return Some(Self::Windows32);
        }

        let mut family = None;
        if name.contains("win") || name.ends_with(".exe") || name.ends_with(".msi") {
            family = Some(Family::Windows);
        }
        if name.contains("linux")
            || name.contains("ubuntu")
            || name.ends_with(".deb")
            || name.ends_with(".rpm")
            || name.ends_with(".tgz")
            || name.ends_with(".tar.gz")
            || name.ends_with(".appimage")
        {
            family = Some(if name.contains("linux_deb") || name.ends_with(".deb") {
                Family::LinuxDeb
            } else if name.contains("linux_rpm") || name.ends_with(".rpm") {
                Family::LinuxRpm
            } else {
                Family::Linux
            });
        }
        // Checked last: "darwin" contains "win".
        if name.contains("mac")
            || name.contains("osx")
            || name.contains("darwin")
            || name.ends_with(".dmg")
        {
            family = Some(Family::Osx);
        }

        Some(compose(family?, bits(&name)))
    }

    /// Infer a client platform from an HTTP `User-Agent` header.
    pub fn from_user_agent(user_agent: &str) -> Option<Platform> {
        let ua = user_agent.to_lowercase();

        if ua.contains("mac os x") || ua.contains("macintosh") || ua.contains("darwin") {
            Some(Self::Osx)
        } else if ua.contains("windows") {
            if ua.contains("win64") || ua.contains("wow64") || ua.contains("x64") {
                Some(Self::Windows64)
            } else {
                Some(Self::Windows32)
            }
        } else if ua.contains("linux") {
            if ua.contains("x86_64") || ua.contains("amd64") {
                Some(Self::Linux64)
            } else if ua.contains("i686") || ua.contains("i386") {
                Some(Self::Linux32)
            } else {
                Some(Self::Linux)
            }
        } else {
            None
        }
    }
}

fn bits(name: &str) -> Option<Bits> {
    if name.contains("arm64") || name.contains("aarch64") {
        return Some(Bits::Arm64);
    }

    // Match whole tokens so version numbers like "1.6.4" don't read as 64-bit.
    let tokens: Vec<&str> = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    let has = |candidates: &[&str]| tokens.iter().any(|t| candidates.contains(t));

    if name.contains("x86_64") || has(&["x64", "amd64", "win64", "linux64", "osx64", "64", "64bit"]) {
        Some(Bits::X64)
    } else if has(&["ia32", "i386", "i686", "x86", "win32", "linux32", "32", "32bit"]) {
        Some(Bits::X32)
    } else {
        None
    }
}

fn compose(family: Family, bits: Option<Bits>) -> Platform {
    match (family, bits) {
        (Family::Osx, Some(Bits::Arm64)) => Platform::OsxArm64,
        (Family::Osx, Some(Bits::X32)) => Platform::Osx32,
        (Family::Osx, _) => Platform::Osx64,
        // No dedicated ARM variants outside macOS: fall back to the family.
        (Family::Windows, Some(Bits::Arm64)) => Platform::Windows,
        (Family::Windows, Some(Bits::X64)) => Platform::Windows64,
        (Family::Windows, _) => Platform::Windows32,
        (Family::Linux, Some(Bits::Arm64)) => Platform::Linux,
        (Family::Linux, Some(Bits::X64)) => Platform::Linux64,
        (Family::Linux, _) => Platform::Linux32,
        (Family::LinuxDeb, Some(Bits::Arm64)) => Platform::LinuxDeb,
        (Family::LinuxDeb, Some(Bits::X64)) => Platform::LinuxDeb64,
        (Family::LinuxDeb, _) => Platform::LinuxDeb32,
        (Family::LinuxRpm, Some(Bits::Arm64)) => Platform::LinuxRpm,
        (Family::LinuxRpm, Some(Bits::X64)) => Platform::LinuxRpm64,
        (Family::LinuxRpm, _) => Platform::LinuxRpm32,
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('-', "_");
        if key.is_empty() {
            return Err(PlatformError::Undetected);
        }

        Self::ALL
            .iter()
            .find(|p| p.as_str() == key)
            .copied()
            .or_else(|| {
                ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == key)
                    .map(|(_, p)| *p)
            })
            .ok_or_else(|| PlatformError::Unknown(s.to_string()))
    }
}

/// True when any platform in `available` satisfies `requested`.
pub fn satisfies(requested: Platform, available: &[Platform]) -> bool {
    available.iter().any(|p| requested.is_satisfied_by(*p))
}

/// Lowercased extension of `filename` including the dot; `.tar.gz` is kept whole.
pub fn file_extension(filename: &str) -> Option<String> {
    let lower = filename.to_lowercase();
    if lower.ends_with(".tar.gz") {
        return Some(".tar.gz".to_string());
    }
    Path::new(&lower)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
}

/// Pick the asset of `version` that best serves `platform`.
///
/// More specific platforms win (`osx_64` over `osx`), then the `wanted`
/// extension, then [`FILE_PREFERENCE`], then the asset order of the release.
pub fn resolve<'a>(
    version: &'a Version,
    platform: Platform,
    wanted: Option<&str>,
) -> Option<&'a Asset> {
    let wanted = wanted.map(|w| {
        let w = w.to_lowercase();
        if w.starts_with('.') { w } else { format!(".{w}") }
    });

    let rank = |asset: &Asset| -> usize {
        let Some(ext) = file_extension(&asset.filename) else {
            return FILE_PREFERENCE.len() + 1;
        };
        if wanted.as_deref() == Some(ext.as_str()) {
            return 0;
        }
        FILE_PREFERENCE
            .iter()
            .position(|p| *p == ext)
            .map_or(FILE_PREFERENCE.len() + 1, |i| i + 1)
    };

    version
        .platforms
        .iter()
        .enumerate()
        .filter(|(_, a)| platform.is_satisfied_by(a.platform))
        .min_by_key(|(i, a)| (Reverse(a.platform.specificity()), rank(*a), *i))
        .map(|(_, a)| a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_common_names() {
        assert_eq!(Platform::detect("app-darwin.dmg"), Some(Platform::Osx64));
        assert_eq!(Platform::detect("App-1.2.0-mac.zip"), Some(Platform::Osx64));
        assert_eq!(Platform::detect("app-osx-arm64.zip"), Some(Platform::OsxArm64));
        assert_eq!(Platform::detect("Setup.exe"), Some(Platform::Windows32));
        assert_eq!(Platform::detect("app-win32-x64.zip"), Some(Platform::Windows64));
        assert_eq!(Platform::detect("RELEASES"), Some(Platform::Windows32));
        assert_eq!(
            Platform::detect("myapp-1.0.0-full.nupkg"),
            Some(Platform::Windows32)
        );
        assert_eq!(Platform::detect("app_1.0.0_amd64.deb"), Some(Platform::LinuxDeb64));
        assert_eq!(Platform::detect("app-1.0.0.i386.rpm"), Some(Platform::LinuxRpm32));
        assert_eq!(Platform::detect("app-linux-x86_64.tar.gz"), Some(Platform::Linux64));
    }

    #[test]
    fn test_detect_ignores_version_digits() {
        // "1.6.4" must not be read as a 64-bit marker.
        assert_eq!(Platform::detect("app-1.6.4-win.exe"), Some(Platform::Windows32));
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(Platform::detect("checksums.txt"), None);
        assert_eq!(Platform::detect("latest-unknown.json"), None);
    }

    #[test]
    fn test_partial_order() {
        assert!(Platform::Linux.is_satisfied_by(Platform::Linux64));
        assert!(Platform::Linux.is_satisfied_by(Platform::LinuxDeb64));
        assert!(Platform::LinuxDeb.is_satisfied_by(Platform::LinuxDeb32));
        assert!(Platform::Osx.is_satisfied_by(Platform::Osx64));
        assert!(Platform::Osx64.is_satisfied_by(Platform::Osx64));

        assert!(!Platform::Linux64.is_satisfied_by(Platform::Linux));
        assert!(!Platform::LinuxRpm.is_satisfied_by(Platform::LinuxDeb64));
        assert!(!Platform::Windows.is_satisfied_by(Platform::Osx64));

        assert!(satisfies(Platform::Windows, &[Platform::Osx64, Platform::Windows32]));
        assert!(!satisfies(Platform::Windows64, &[Platform::Windows32]));
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("osx".parse::<Platform>(), Ok(Platform::Osx));
        assert_eq!("darwin".parse::<Platform>(), Ok(Platform::Osx));
        assert_eq!("win32".parse::<Platform>(), Ok(Platform::Windows32));
        assert_eq!("linux-deb-64".parse::<Platform>(), Ok(Platform::LinuxDeb64));
        assert_eq!(
            "beos".parse::<Platform>(),
            Err(PlatformError::Unknown("beos".to_string()))
        );
        assert_eq!("".parse::<Platform>(), Err(PlatformError::Undetected));
    }

    #[test]
    fn test_user_agent() {
        let mac = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";
        assert_eq!(Platform::from_user_agent(mac), Some(Platform::Osx));

        let win = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";
        assert_eq!(Platform::from_user_agent(win), Some(Platform::Windows64));

        assert_eq!(Platform::from_user_agent("curl/8.4.0"), None);
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("a.TAR.GZ").as_deref(), Some(".tar.gz"));
        assert_eq!(file_extension("Setup.exe").as_deref(), Some(".exe"));
        assert_eq!(file_extension("RELEASES"), None);
    }
}
