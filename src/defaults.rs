//! Default values for mirror-hook configuration.
//!
//! This module provides centralized default values used by the settings
//! loader and the CLI, ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Git binary used when none is configured.
pub const DEFAULT_GIT_COMMAND: &str = "git";

/// Repositories are synchronized one after another unless configured otherwise.
pub const DEFAULT_JOBS: usize = 1;

/// Returns the default settings file location.
///
/// Uses the platform-appropriate configuration directory:
/// - Linux: `~/.config/mirror-hook/config.yaml` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/mirror-hook/config.yaml`
/// - Windows: `{FOLDERID_RoamingAppData}\mirror-hook\config.yaml`
///
/// Falls back to `.mirror-hook.yaml` in the current directory if the
/// platform configuration directory cannot be determined.
///
/// This can be overridden by the `--config` CLI flag or the
/// `MIRROR_HOOK_CONFIG` environment variable.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("mirror-hook").join("config.yaml"))
        .unwrap_or_else(|| PathBuf::from(".mirror-hook.yaml"))
}

pub fn default_git_command() -> String {
    DEFAULT_GIT_COMMAND.to_string()
}
