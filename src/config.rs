//! # Settings
//!
//! The knobs the synchronization core reads from the host's settings store:
//!
//! ```yaml
//! git_command: /usr/bin/git      # default: git
//! credentials: "bot:ghp_token"   # injected into http(s) clone URLs
//! base_dir: /srv/mirrors         # relocate http(s) mirrors under here
//! command_timeout_secs: 600      # default: no timeout
//! jobs: 4                        # default: 1 (sequential)
//! ```
//!
//! Every field is optional. Blank strings count as unset, mirroring how a
//! settings form submits an emptied text field.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::{default_config_path, default_git_command, DEFAULT_JOBS};
use crate::error::{Error, Result};

/// Synchronization settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Name or path of the git executable.
    pub git_command: String,
    /// `user:token` style credential injected into http(s) clone URLs.
    pub credentials: Option<String>,
    /// Directory http(s) mirrors are relocated under.
    pub base_dir: Option<String>,
    /// Upper bound for each git subprocess, in seconds.
    pub command_timeout_secs: Option<u64>,
    /// Number of repositories synchronized concurrently.
    pub jobs: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            git_command: default_git_command(),
            credentials: None,
            base_dir: None,
            command_timeout_secs: None,
            jobs: DEFAULT_JOBS,
        }
    }
}

impl Settings {
    /// Parses settings from a YAML string. An empty document yields defaults.
    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(yaml).map_err(|e| Error::ConfigParse {
            message: e.to_string(),
            hint: Some(
                "Known keys: git_command, credentials, base_dir, command_timeout_secs, jobs"
                    .to_string(),
            ),
        })?;
        Ok(settings.normalized())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigParse {
            message: format!("Failed to read settings {}: {}", path.display(), e),
            hint: None,
        })?;
        Self::parse(&content)
    }

    /// Loads settings from `path`, or from the default location.
    ///
    /// A missing file at the default location is not an error; a missing
    /// file that was asked for explicitly is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = default_config_path();
                if path.is_file() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Folds blank values into their unset form.
    pub fn normalized(mut self) -> Self {
        self.credentials = self.credentials.filter(|c| !c.trim().is_empty());
        self.base_dir = self.base_dir.filter(|b| !b.trim().is_empty());
        if self.git_command.trim().is_empty() {
            self.git_command = default_git_command();
        }
        self.jobs = self.jobs.max(1);
        self
    }

    pub fn credentials(&self) -> Option<&str> {
        self.credentials.as_deref()
    }

    pub fn base_dir(&self) -> Option<&str> {
        self.base_dir.as_deref()
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
