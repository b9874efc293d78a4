//! Standard locations of the configuration file

use std::path::PathBuf;

/// File name of the main configuration inside [`default_config_dir`]
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Per-user configuration directory
///
/// Returns: `{config_dir}/soundpad` (e.g. `~/.config/soundpad` on Linux),
/// or `./soundpad` if the platform reports no config directory.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("soundpad")
}

/// Returns: `{config_dir}/soundpad/config.yaml`
pub fn default_config_path() -> PathBuf {
    default_config_dir().join(CONFIG_FILE_NAME)
}
