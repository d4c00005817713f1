//! XDG Base Directory utilities.

use std::path::PathBuf;

/// Application directory name below the XDG base directories
pub const APP_DIR: &str = "veap-watch";

/// Get XDG config home directory
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise defaults to `$HOME/.config`
pub fn config_home() -> Option<PathBuf> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config_home.is_empty() {
            return Some(PathBuf::from(xdg_config_home));
        }
    }

    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config"))
}

/// Path of the global configuration file
///
/// Returns `$XDG_CONFIG_HOME/veap-watch/config.toml`
pub fn global_config_path() -> Option<PathBuf> {
    config_home().map(|dir| dir.join(APP_DIR).join("config.toml"))
}
