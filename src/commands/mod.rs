//! # CLI Command Implementations
//!
//! Each subcommand of `mirror-hook` lives in its own file with an `Args`
//! struct derived using `clap` and an `execute` function that calls into the
//! `mirror_hook` library.
//!
//! `sync` and `resolve` describe a delivery the same way, so their shared
//! options live in [`DeliveryArgs`] here and are flattened into both.

pub mod completions;
pub mod resolve;
pub mod sync;

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use mirror_hook::request::{PROJECT_ID_PARAM, REPOSITORY_ID_PARAM};
use mirror_hook::{Settings, SyncRequest};

/// Options describing one delivery and the settings it runs under.
#[derive(Args, Debug, Clone)]
pub struct DeliveryArgs {
    /// Registry file listing projects and their repositories
    #[arg(short, long, value_name = "PATH", env = "MIRROR_HOOK_REGISTRY")]
    pub registry: PathBuf,

    /// Notification payload (JSON); use '-' to read stdin
    #[arg(short, long, value_name = "PATH")]
    pub payload: Option<PathBuf>,

    /// Project identifier, overriding the payload's repository name
    #[arg(long, value_name = "ID")]
    pub project_id: Option<String>,

    /// Only synchronize the repository with this identifier
    #[arg(long, value_name = "ID")]
    pub repository_id: Option<String>,

    /// Settings file (defaults to the user config directory)
    #[arg(short, long, value_name = "PATH", env = "MIRROR_HOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Git executable
    #[arg(long, value_name = "PATH", env = "MIRROR_HOOK_GIT")]
    pub git_bin: Option<String>,

    /// Credential inserted into http(s) clone URLs, e.g. 'user:token'
    #[arg(long, value_name = "CREDENTIAL", env = "MIRROR_HOOK_CREDENTIALS", hide_env_values = true)]
    pub credentials: Option<String>,

    /// Directory mirrors of http(s) remotes are placed under
    #[arg(long, value_name = "PATH", env = "MIRROR_HOOK_BASE_DIR")]
    pub base_dir: Option<String>,
}

impl DeliveryArgs {
    /// Settings from the settings file, with command-line values on top.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(git) = &self.git_bin {
            settings.git_command = git.clone();
        }
        if let Some(credentials) = &self.credentials {
            settings.credentials = Some(credentials.clone());
        }
        if let Some(base_dir) = &self.base_dir {
            settings.base_dir = Some(base_dir.clone());
        }
        Ok(settings.normalized())
    }

    /// The delivery: the payload (an empty object when none is given) plus
    /// the selector parameters.
    pub fn request(&self) -> Result<SyncRequest> {
        let body = match &self.payload {
            None => "{}".to_string(),
            Some(path) if path.as_os_str() == "-" => {
                let mut body = String::new();
                io::stdin()
                    .read_to_string(&mut body)
                    .context("Failed to read payload from stdin")?;
                body
            }
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("Failed to read payload {}", path.display()))?,
        };

        let mut params = HashMap::new();
        if let Some(project_id) = &self.project_id {
            params.insert(PROJECT_ID_PARAM.to_string(), project_id.clone());
        }
        if let Some(repository_id) = &self.repository_id {
            params.insert(REPOSITORY_ID_PARAM.to_string(), repository_id.clone());
        }
        Ok(SyncRequest::from_json(&body, params)?)
    }
}
