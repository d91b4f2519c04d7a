//! XDG Base Directory paths for mentor.
//!
//! Embedders get the same locations on every platform: config in
//! `~/.config/mentor`, data (databases) in `~/.local/share/mentor`.

use std::path::PathBuf;

const APP_DIR: &str = "mentor";

/// Get the mentor config directory.
///
/// Returns `$XDG_CONFIG_HOME/mentor` if set, otherwise `~/.config/mentor`.
///
/// # Examples
///
/// ```
/// use mentor_paths::config_dir;
///
/// let config = config_dir();
/// let analytics_config = config.join("analytics.toml");
/// ```
pub fn config_dir() -> PathBuf {
    resolve("XDG_CONFIG_HOME", ".config")
}

/// Get the mentor data directory.
///
/// Returns `$XDG_DATA_HOME/mentor` if set, otherwise `~/.local/share/mentor`.
/// Embedded learner databases live below this directory.
///
/// # Examples
///
/// ```
/// use mentor_paths::data_dir;
///
/// let data = data_dir();
/// let db = data.join("analytics");
/// ```
pub fn data_dir() -> PathBuf {
    resolve("XDG_DATA_HOME", ".local/share")
}

/// Default location of the analytics config file.
pub fn analytics_config_file() -> PathBuf {
    config_dir().join("analytics.toml")
}

fn resolve(xdg_var: &str, home_relative: &str) -> PathBuf {
    if let Ok(xdg) = std::env::var(xdg_var)
        && !xdg.is_empty()
    {
        PathBuf::from(xdg).join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(home_relative).join(APP_DIR)
    } else {
        PathBuf::from(home_relative).join(APP_DIR)
    }
}
