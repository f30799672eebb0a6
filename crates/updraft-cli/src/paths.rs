use std::path::PathBuf;

/// Returns the updraft configuration directory, or None if no config directory can be resolved.
///
/// `UPDRAFT_HOME` takes precedence over the platform config dir.
pub fn try_updraft_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("UPDRAFT_HOME") {
        return Some(PathBuf::from(val));
    }
    dirs::config_dir().map(|d| d.join("updraft"))
}

/// Default config file: `<updraft home>/config.toml`
pub fn config_path() -> Option<PathBuf> {
    try_updraft_home().map(|home| home.join("config.toml"))
}
