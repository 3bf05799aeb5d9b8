//! # Update Orchestration
//!
//! [`UpdateOrchestrator`] is the entry point the webhook endpoint calls for
//! each delivery. It resolves the targeted repositories, synchronizes each of
//! them, and logs one timing line per repository whether it succeeded or not.
//!
//! Resolution errors ([`Error::NotFound`](crate::error::Error::NotFound),
//! [`Error::InvalidState`](crate::error::Error::InvalidState)) abort the
//! delivery. A repository that fails to synchronize does not: its failure is
//! recorded in the [`UpdateReport`] and the next repository is attempted.
//!
//! By default repositories are processed one at a time, in resolution order.
//! With `jobs > 1` they run on a `rayon` pool of that size; repositories that
//! resolve to the same mirror directory are still serialized through a
//! shared [`PathLocks`] table.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use crate::config::Settings;
use crate::error::Result;
use crate::indexer::ChangesetIndexer;
use crate::locks::PathLocks;
use crate::logging::Logger;
use crate::mirror::{MirrorSynchronizer, SyncOutcome};
use crate::process::{ProcessRunner, SystemRunner};
use crate::registry::{Registry, RepositoryRecord};
use crate::request::SyncRequest;
use crate::resolver::RepositoryResolver;

/// Per-repository outcomes of one delivery, in resolution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub outcomes: Vec<SyncOutcome>,
}

impl UpdateReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &SyncOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }

    pub fn successes(&self) -> impl Iterator<Item = &SyncOutcome> {
        self.outcomes.iter().filter(|o| o.success)
    }
}

/// Synchronizes every repository a delivery targets.
pub struct UpdateOrchestrator {
    registry: Arc<dyn Registry>,
    indexer: Arc<dyn ChangesetIndexer>,
    runner: Option<Arc<dyn ProcessRunner>>,
    settings: Settings,
    logger: Logger,
    locks: PathLocks,
    cancel: Option<Arc<AtomicBool>>,
}

impl UpdateOrchestrator {
    /// Creates an orchestrator that spawns real processes and logs nowhere.
    pub fn new(
        registry: Arc<dyn Registry>,
        indexer: Arc<dyn ChangesetIndexer>,
        settings: Settings,
    ) -> Self {
        Self {
            registry,
            indexer,
            runner: None,
            settings: settings.normalized(),
            logger: Logger::default(),
            locks: PathLocks::new(),
            cancel: None,
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Replaces the process runner. Without one, a [`SystemRunner`] using
    /// the configured timeout and this orchestrator's logger is used.
    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Once `flag` is set, repositories that have not started yet are
    /// skipped. A running clone or fetch is left to finish.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Resolves the repositories `request` targets without touching them.
    pub fn resolve(&self, request: &SyncRequest) -> Result<Vec<RepositoryRecord>> {
        RepositoryResolver::new(self.registry.as_ref(), self.logger.clone()).resolve(request)
    }

    /// Handles one delivery.
    pub fn run(&self, request: &SyncRequest) -> Result<UpdateReport> {
        let repositories = self.resolve(request)?;

        let runner: Arc<dyn ProcessRunner> = match &self.runner {
            Some(runner) => runner.clone(),
            None => Arc::new(
                SystemRunner::new(self.logger.clone())
                    .with_timeout(self.settings.command_timeout()),
            ),
        };
        let synchronizer = MirrorSynchronizer::new(
            runner.as_ref(),
            self.registry.as_ref(),
            self.indexer.as_ref(),
            &self.settings,
        )
        .with_logger(self.logger.clone())
        .with_locks(&self.locks);

        let outcomes = if self.settings.jobs > 1 && repositories.len() > 1 {
            self.run_parallel(&synchronizer, &repositories)
        } else {
            repositories
                .iter()
                .map(|record| self.sync_one(&synchronizer, record))
                .collect()
        };

        Ok(UpdateReport { outcomes })
    }

    fn run_parallel(
        &self,
        synchronizer: &MirrorSynchronizer<'_>,
        repositories: &[RepositoryRecord],
    ) -> Vec<SyncOutcome> {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.jobs)
            .build()
        {
            Ok(pool) => pool.install(|| {
                repositories
                    .par_iter()
                    .map(|record| self.sync_one(synchronizer, record))
                    .collect()
            }),
            Err(e) => {
                self.logger.warn(format_args!(
                    "Could not start {} sync workers ({}); synchronizing sequentially",
                    self.settings.jobs, e
                ));
                repositories
                    .iter()
                    .map(|record| self.sync_one(synchronizer, record))
                    .collect()
            }
        }
    }

    fn sync_one(&self, synchronizer: &MirrorSynchronizer<'_>, record: &RepositoryRecord) -> SyncOutcome {
        if self.is_cancelled() {
            self.logger.warn(format_args!(
                "Skipping repository {}: update cancelled",
                record.identifier
            ));
            return SyncOutcome::cancelled(record);
        }

        let started = Instant::now();
        let mut outcome = synchronizer.sync(record);
        outcome.elapsed = started.elapsed();

        self.logger.info(format_args!(
            "Repository updated: {} (Git: {}ms)",
            outcome.repository,
            outcome.elapsed_millis()
        ));
        if let Some(reason) = outcome.failure {
            self.logger.warn(format_args!(
                "Repository {} was not synchronized: {}{}",
                outcome.repository,
                reason,
                outcome
                    .detail
                    .as_ref()
                    .map(|d| format!(" ({})", d))
                    .unwrap_or_default()
            ));
        }
        outcome
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}
