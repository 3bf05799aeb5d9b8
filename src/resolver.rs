//! # Repository Resolution
//!
//! Turns a [`SyncRequest`] into the list of repositories to synchronize:
//!
//! 1. The project identifier comes from the `project_id` parameter, falling
//!    back to `repository.name` from the payload.
//! 2. The project is looked up in the registry, ignoring case.
//! 3. Only its git repositories are kept.
//! 4. A `repository_id` parameter narrows the list to that repository. A
//!    selector that matches nothing is logged and ignored, so a stale hook
//!    URL still updates the whole project.
//!
//! Failures in steps 1-3 abort the delivery before any subprocess runs.

use crate::error::{Error, Result};
use crate::logging::Logger;
use crate::registry::{Registry, RepositoryRecord};
use crate::request::SyncRequest;

pub struct RepositoryResolver<'a> {
    registry: &'a dyn Registry,
    logger: Logger,
}

impl<'a> RepositoryResolver<'a> {
    pub fn new(registry: &'a dyn Registry, logger: Logger) -> Self {
        Self { registry, logger }
    }

    /// Resolves the repositories targeted by `request`, in registry order.
    pub fn resolve(&self, request: &SyncRequest) -> Result<Vec<RepositoryRecord>> {
        let identifier = request
            .project_identifier()
            .ok_or_else(|| Error::not_found("Project identifier not specified"))?;

        let project = self.registry.find_project(&identifier)?.ok_or_else(|| {
            Error::not_found(format!("No project found with identifier '{}'", identifier))
        })?;

        let repositories: Vec<RepositoryRecord> = project
            .repositories
            .into_iter()
            .filter(RepositoryRecord::is_git)
            .collect();
        if repositories.is_empty() {
            return Err(Error::invalid_state(format!(
                "Project '{}' has no git repository",
                project.identifier
            )));
        }

        let Some(selector) = request.repository_id() else {
            return Ok(repositories);
        };

        match repositories.iter().find(|r| r.identifier == selector) {
            Some(selected) => Ok(vec![selected.clone()]),
            None => {
                self.logger.warn(format_args!(
                    "The repository '{}' isn't in the list of project '{}' repositories. Updating all repositories instead.",
                    selector, project.identifier
                ));
                Ok(repositories)
            }
        }
    }
}
