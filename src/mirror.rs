//! # Mirror Synchronization
//!
//! Brings one repository's local bare mirror up to date with its remote.
//! Each call walks the same sequence, stopping at the first failing step:
//!
//! 1. **Locate**: rewrite the remote URL into a clone URL and mirror path
//!    (see [`crate::location`]).
//! 2. **Ensure directory**: `mkdir -p <path>`.
//! 3. **Detect**: the mirror counts as initialized iff `<path>/HEAD` exists.
//!    This check runs on every call, which is what makes repeated deliveries
//!    for the same repository safe.
//! 4. **Clone** (uninitialized mirrors only): `git clone --bare <url> .`.
//! 5. **Fetch**: `git fetch origin`, then
//!    `git fetch --prune origin +refs/heads/*:refs/heads/*`. Only the first
//!    fetch gates success; the pruning fetch is best effort.
//! 6. **Persist relocation**: when the mirror lives under the configured
//!    base directory, the record's root path is updated and saved before
//!    indexing.
//! 7. **Index**: hand the record to the changeset indexer.
//!
//! A failing step never raises. It is recorded as the [`FailureReason`] of
//! the returned [`SyncOutcome`], so the caller can carry on with the next
//! repository.

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::config::Settings;
use crate::indexer::ChangesetIndexer;
use crate::location::{rewrite, EffectiveLocation};
use crate::locks::PathLocks;
use crate::logging::Logger;
use crate::process::{CommandOutput, CommandSpec, ProcessRunner};
use crate::registry::{Registry, RepositoryRecord};

/// File whose presence marks an initialized bare repository.
pub const INITIALIZED_MARKER: &str = "HEAD";

/// Refspec mirroring every remote branch onto a local branch of the same name.
pub const HEADS_REFSPEC: &str = "+refs/heads/*:refs/heads/*";

/// Why a repository could not be synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// `mkdir -p` on the mirror path failed.
    DirectoryCreation,
    /// The initial bare clone failed.
    Clone,
    /// `git fetch origin` failed.
    Fetch,
    /// Saving the relocated root path to the registry failed.
    Persistence,
    /// The changeset indexer reported an error.
    Indexing,
    /// The delivery was cancelled before this repository started.
    Cancelled,
}

/// Coarse grouping of [`FailureReason`]s for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    /// The mirror could not be set up (directory or clone).
    Setup,
    /// The mirror exists but could not be updated.
    Fetch,
    /// The mirror was updated but the registry or indexer failed.
    Registry,
    Cancelled,
}

impl FailureReason {
    pub fn category(self) -> FailureCategory {
        match self {
            FailureReason::DirectoryCreation | FailureReason::Clone => FailureCategory::Setup,
            FailureReason::Fetch => FailureCategory::Fetch,
            FailureReason::Persistence | FailureReason::Indexing => FailureCategory::Registry,
            FailureReason::Cancelled => FailureCategory::Cancelled,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::DirectoryCreation => "directory creation failed",
            FailureReason::Clone => "clone failed",
            FailureReason::Fetch => "fetch failed",
            FailureReason::Persistence => "saving relocated path failed",
            FailureReason::Indexing => "changeset indexing failed",
            FailureReason::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of synchronizing one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub repository: String,
    pub project: String,
    pub success: bool,
    /// Wall-clock time spent on the whole sequence.
    pub elapsed: Duration,
    pub failure: Option<FailureReason>,
    /// Last line of output or error message behind `failure`, redacted.
    pub detail: Option<String>,
    /// Mirror directory that was (or would have been) synchronized.
    pub local_path: String,
    /// True if this call performed the initial clone.
    pub cloned: bool,
    /// True if the mirror lives under the configured base directory.
    pub relocated: bool,
}

impl SyncOutcome {
    fn pending(record: &RepositoryRecord, location: &EffectiveLocation) -> Self {
        Self {
            repository: record.identifier.clone(),
            project: record.project.clone(),
            success: false,
            elapsed: Duration::ZERO,
            failure: None,
            detail: None,
            local_path: location.local_path.clone(),
            cloned: false,
            relocated: location.relocated,
        }
    }

    /// An outcome for a repository that was never started.
    pub fn cancelled(record: &RepositoryRecord) -> Self {
        Self {
            repository: record.identifier.clone(),
            project: record.project.clone(),
            success: false,
            elapsed: Duration::ZERO,
            failure: Some(FailureReason::Cancelled),
            detail: None,
            local_path: String::new(),
            cloned: false,
            relocated: false,
        }
    }

    /// Elapsed time in milliseconds, rounded to one decimal.
    pub fn elapsed_millis(&self) -> f64 {
        (self.elapsed.as_secs_f64() * 10_000.0).round() / 10.0
    }
}

/// A failed step: the reason plus whatever explains it.
#[derive(Debug)]
struct StepFailure {
    reason: FailureReason,
    detail: String,
}

type StepResult<T> = std::result::Result<T, StepFailure>;

/// What the successful sequence did.
struct Progress {
    cloned: bool,
}

/// Runs the clone-or-fetch sequence for single repositories.
pub struct MirrorSynchronizer<'a> {
    runner: &'a dyn ProcessRunner,
    registry: &'a dyn Registry,
    indexer: &'a dyn ChangesetIndexer,
    settings: &'a Settings,
    locks: Option<&'a PathLocks>,
    logger: Logger,
}

impl<'a> MirrorSynchronizer<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        registry: &'a dyn Registry,
        indexer: &'a dyn ChangesetIndexer,
        settings: &'a Settings,
    ) -> Self {
        Self {
            runner,
            registry,
            indexer,
            settings,
            locks: None,
            logger: Logger::default(),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Serializes synchronizations that share a mirror path.
    pub fn with_locks(mut self, locks: &'a PathLocks) -> Self {
        self.locks = Some(locks);
        self
    }

    /// Computes where `record` is cloned from and mirrored to.
    pub fn locate(&self, record: &RepositoryRecord) -> EffectiveLocation {
        rewrite(
            &record.url,
            self.settings.credentials(),
            self.settings.base_dir(),
        )
    }

    /// Synchronizes one repository.
    pub fn sync(&self, record: &RepositoryRecord) -> SyncOutcome {
        let started = Instant::now();
        let location = self.locate(record);
        let mut outcome = SyncOutcome::pending(record, &location);

        let result = {
            let _guard = self.locks.map(|locks| locks.acquire(&location.local_path));
            self.run_steps(record, &location)
        };

        match result {
            Ok(progress) => {
                outcome.success = true;
                outcome.cloned = progress.cloned;
            }
            Err(failure) => {
                outcome.failure = Some(failure.reason);
                outcome.detail = Some(failure.detail);
            }
        }
        outcome.elapsed = started.elapsed();
        outcome
    }

    fn run_steps(&self, record: &RepositoryRecord, location: &EffectiveLocation) -> StepResult<Progress> {
        let path = location.local_path.as_str();

        self.ensure_directory(path)?;

        let cloned = if is_initialized(path) {
            self.logger
                .debug(format_args!("Repository at {} had been cloned", path));
            false
        } else {
            self.clone_bare(location)?;
            true
        };

        self.fetch(path)?;
        self.logger
            .debug(format_args!("Mirror {} is up to date", path));

        let record = self.persist_relocation(record, location)?;
        self.indexer
            .fetch_changesets(&record)
            .map_err(|e| StepFailure {
                reason: FailureReason::Indexing,
                detail: e.to_string(),
            })?;

        Ok(Progress { cloned })
    }

    fn ensure_directory(&self, path: &str) -> StepResult<()> {
        let command = CommandSpec::new("mkdir").args(["-p", path]);
        self.step(&command, FailureReason::DirectoryCreation)
    }

    fn clone_bare(&self, location: &EffectiveLocation) -> StepResult<()> {
        let command = self
            .git(["clone", "--bare", location.clone_url.as_str(), "."])
            .current_dir(&location.local_path);
        self.step(&command, FailureReason::Clone)
    }

    fn fetch(&self, path: &str) -> StepResult<()> {
        let command = self.git(["fetch", "origin"]).current_dir(path);
        self.step(&command, FailureReason::Fetch)?;

        // Best effort: a failed prune leaves stale branches, not a broken mirror.
        let prune = self
            .git(["fetch", "--prune", "origin", HEADS_REFSPEC])
            .current_dir(path);
        self.runner.run(&prune);
        Ok(())
    }

    fn persist_relocation(
        &self,
        record: &RepositoryRecord,
        location: &EffectiveLocation,
    ) -> StepResult<RepositoryRecord> {
        if !location.relocated {
            return Ok(record.clone());
        }

        let mut updated = record.clone();
        updated.root_url = location.local_path.clone();
        self.registry
            .save_repository(&updated)
            .map_err(|e| StepFailure {
                reason: FailureReason::Persistence,
                detail: e.to_string(),
            })?;
        self.logger.debug(format_args!(
            "Root path of {} set to {}",
            updated.identifier, updated.root_url
        ));
        Ok(updated)
    }

    fn git<const N: usize>(&self, args: [&str; N]) -> CommandSpec {
        let command = CommandSpec::new(self.settings.git_command.clone()).args(args);
        match self.settings.credentials() {
            Some(credential) => command.secret(credential),
            None => command,
        }
    }

    fn step(&self, command: &CommandSpec, reason: FailureReason) -> StepResult<()> {
        let output = self.runner.run(command);
        if output.success {
            return Ok(());
        }
        Err(StepFailure {
            reason,
            detail: describe_failure(command, &output),
        })
    }
}

/// True if `path` already holds an initialized bare repository.
pub fn is_initialized(path: &str) -> bool {
    Path::new(path).join(INITIALIZED_MARKER).exists()
}

fn describe_failure(command: &CommandSpec, output: &CommandOutput) -> String {
    let last = output
        .lines
        .iter()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(|line| command.redact(line));
    match (output.timed_out, last) {
        (true, _) => format!("'{}' timed out", command),
        (false, Some(line)) => format!("'{}': {}", command, line),
        (false, None) => match output.status {
            Some(code) => format!("'{}' exited with status {}", command, code),
            None => format!("'{}' did not run", command),
        },
    }
}
