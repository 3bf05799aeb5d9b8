//! Changeset indexer contract and the indexers bundled with the binary.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::logging::Logger;
use crate::process::{CommandSpec, ProcessRunner};
use crate::registry::RepositoryRecord;

/// Scans a freshly fetched mirror for new commits.
///
/// Implementations must be idempotent: the indexer is called after every
/// delivery, including ones that brought no new commits.
pub trait ChangesetIndexer: Send + Sync {
    fn fetch_changesets(&self, record: &RepositoryRecord) -> Result<()>;
}

/// Only logs that indexing was requested. Used when the host indexes on its
/// own schedule.
#[derive(Debug, Clone, Default)]
pub struct LogIndexer {
    logger: Logger,
}

impl LogIndexer {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl ChangesetIndexer for LogIndexer {
    fn fetch_changesets(&self, record: &RepositoryRecord) -> Result<()> {
        self.logger.info(format_args!(
            "Changeset indexing requested for {}/{} at {}",
            record.project, record.identifier, record.root_url
        ));
        Ok(())
    }
}

/// Runs an external command per repository.
///
/// Arguments may contain `{project}`, `{identifier}` and `{path}`
/// placeholders, replaced by the record's project, identifier and local
/// root path. The template is split on whitespace and never handed to a
/// shell.
pub struct CommandIndexer {
    program: String,
    args: Vec<String>,
    runner: Arc<dyn ProcessRunner>,
}

impl CommandIndexer {
    pub fn new(program: impl Into<String>, args: Vec<String>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            program: program.into(),
            args,
            runner,
        }
    }

    /// Builds an indexer from a command template such as
    /// `redmine-fetch {project} {identifier}`.
    pub fn from_template(template: &str, runner: Arc<dyn ProcessRunner>) -> Result<Self> {
        let mut words = template.split_whitespace().map(str::to_string);
        let program = words.next().ok_or_else(|| Error::ConfigParse {
            message: "Index command is empty".to_string(),
            hint: Some("Pass a program name, e.g. 'redmine-fetch {project}'".to_string()),
        })?;
        Ok(Self::new(program, words.collect(), runner))
    }

    fn command_for(&self, record: &RepositoryRecord) -> CommandSpec {
        let args = self.args.iter().map(|arg| {
            arg.replace("{project}", &record.project)
                .replace("{identifier}", &record.identifier)
                .replace("{path}", &record.root_url)
        });
        CommandSpec::new(self.program.clone()).args(args)
    }
}

impl ChangesetIndexer for CommandIndexer {
    fn fetch_changesets(&self, record: &RepositoryRecord) -> Result<()> {
        let command = self.command_for(record);
        let output = self.runner.run(&command);
        if output.success {
            return Ok(());
        }
        Err(Error::Indexer {
            repository: record.identifier.clone(),
            message: format!(
                "'{}' failed: {}",
                command,
                output.lines.last().map(String::as_str).unwrap_or("no output")
            ),
        })
    }
}
