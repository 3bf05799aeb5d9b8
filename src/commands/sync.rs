//! # Sync Command Implementation
//!
//! Runs one delivery against the mirrors on this machine: resolves the
//! targeted repositories from the registry file, clones or fetches each
//! mirror, saves relocated root paths back to the registry and triggers the
//! changeset indexer.
//!
//! One line per repository is printed to stdout:
//!
//! ```text
//! ok      acme/main  /srv/mirrors/acme/acme.git  (412.3ms)
//! FAILED  acme/docs  /srv/mirrors/acme/docs.git  fetch failed: fatal: repository not found
//! ```
//!
//! The command exits non-zero if the delivery could not be resolved or any
//! repository failed.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use mirror_hook::indexer::{ChangesetIndexer, CommandIndexer, LogIndexer};
use mirror_hook::logging::Logger;
use mirror_hook::mirror::SyncOutcome;
use mirror_hook::process::{ProcessRunner, SystemRunner};
use mirror_hook::registry::{FileRegistry, Registry};
use mirror_hook::UpdateOrchestrator;

use super::DeliveryArgs;

/// Synchronize the mirrors a push notification targets
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub delivery: DeliveryArgs,

    /// Kill a git command after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Number of repositories synchronized at once
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Command run after each successful sync, e.g. 'reindex {project} {identifier}'
    #[arg(long, value_name = "CMD", env = "MIRROR_HOOK_INDEX_COMMAND")]
    pub index_command: Option<String>,
}

/// Execute the sync command
pub fn execute(args: SyncArgs, logger: Logger) -> Result<()> {
    let mut settings = args.delivery.settings()?;
    if let Some(timeout) = args.timeout {
        settings.command_timeout_secs = Some(timeout);
    }
    if let Some(jobs) = args.jobs {
        settings.jobs = jobs;
    }
    let request = args.delivery.request()?;

    let registry: Arc<dyn Registry> = Arc::new(FileRegistry::open(&args.delivery.registry)?);
    let runner: Arc<dyn ProcessRunner> = Arc::new(
        SystemRunner::new(logger.clone()).with_timeout(settings.command_timeout()),
    );
    let indexer: Arc<dyn ChangesetIndexer> = match &args.index_command {
        Some(template) => Arc::new(CommandIndexer::from_template(template, runner.clone())?),
        None => Arc::new(LogIndexer::new(logger.clone())),
    };

    let orchestrator = UpdateOrchestrator::new(registry, indexer, settings)
        .with_logger(logger)
        .with_runner(runner);
    let report = orchestrator.run(&request)?;

    for outcome in &report.outcomes {
        println!("{}", format_outcome(outcome));
    }

    let failed = report.failures().count();
    if failed > 0 {
        anyhow::bail!(
            "{} of {} repositories failed to synchronize (registry: {})",
            failed,
            report.outcomes.len(),
            args.delivery.registry.display()
        );
    }
    Ok(())
}

fn format_outcome(outcome: &SyncOutcome) -> String {
    let name = format!("{}/{}", outcome.project, outcome.repository);
    match outcome.failure {
        None => format!(
            "ok      {}  {}  ({}ms)",
            name,
            outcome.local_path,
            outcome.elapsed_millis()
        ),
        Some(reason) => {
            let mut line = format!("FAILED  {}  {}  {}", name, outcome.local_path, reason);
            if let Some(detail) = &outcome.detail {
                line.push_str(": ");
                line.push_str(detail);
            }
            line
        }
    }
}
