//! # Project and Repository Registry
//!
//! The registry is the store mapping project identifiers to the repositories
//! they track. It is owned by the host application; this crate only needs to
//! look projects up and to persist a repository's relocated root path, which
//! is captured by the [`Registry`] trait.
//!
//! Two implementations ship with the crate:
//!
//! - **`MemoryRegistry`**: an in-process registry, useful when the host keeps
//!   its own store and builds handles on demand, and in tests.
//! - **`FileRegistry`**: a YAML document on disk, rewritten atomically when a
//!   record changes. This is what the `mirror-hook` binary uses.
//!
//! ```yaml
//! projects:
//!   - identifier: acme
//!     repositories:
//!       - identifier: main
//!         scm: git
//!         url: https://github.com/acme/acme.git
//!         root_url: /srv/git/acme.git
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Version control system backing a repository record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScmKind {
    #[default]
    Git,
    Subversion,
    Mercurial,
    Bazaar,
    Cvs,
    Filesystem,
}

/// A repository tracked by a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Unique within the owning project; never rewritten.
    pub identifier: String,
    #[serde(default)]
    pub scm: ScmKind,
    /// Remote URL, or a local path for repositories that are not mirrored.
    #[serde(default)]
    pub url: String,
    /// Local root path the changeset indexer reads from.
    #[serde(default)]
    pub root_url: String,
    /// Identifier of the owning project. Derived from the document
    /// structure, so it is not serialized.
    #[serde(default, skip_serializing)]
    pub project: String,
}

impl RepositoryRecord {
    /// Creates a git repository record.
    pub fn git(identifier: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            scm: ScmKind::Git,
            url: url.into(),
            root_url: String::new(),
            project: String::new(),
        }
    }

    pub fn with_scm(mut self, scm: ScmKind) -> Self {
        self.scm = scm;
        self
    }

    pub fn with_root_url(mut self, root_url: impl Into<String>) -> Self {
        self.root_url = root_url.into();
        self
    }

    pub fn is_git(&self) -> bool {
        self.scm == ScmKind::Git
    }
}

/// A project and the repositories attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectHandle {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub repositories: Vec<RepositoryRecord>,
}

impl ProjectHandle {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: None,
            repositories: Vec::new(),
        }
    }

    /// Attaches `record` to this project.
    pub fn with_repository(mut self, mut record: RepositoryRecord) -> Self {
        record.project = self.identifier.clone();
        self.repositories.push(record);
        self
    }

    /// Re-derives the `project` field of every repository.
    fn link_repositories(&mut self) {
        for repository in &mut self.repositories {
            repository.project = self.identifier.clone();
        }
    }

    fn matches(&self, identifier: &str) -> bool {
        self.identifier.to_lowercase() == identifier.to_lowercase()
    }
}

/// Access to the host's project registry.
pub trait Registry: Send + Sync {
    /// Looks a project up by identifier, ignoring case.
    fn find_project(&self, identifier: &str) -> Result<Option<ProjectHandle>>;

    /// Persists `record`, matched by its project and identifier.
    fn save_repository(&self, record: &RepositoryRecord) -> Result<()>;
}

/// A registry held entirely in memory. Projects keep insertion order.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    projects: Mutex<Vec<ProjectHandle>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_projects(projects: Vec<ProjectHandle>) -> Self {
        let projects = projects
            .into_iter()
            .map(|mut project| {
                project.link_repositories();
                project
            })
            .collect();
        Self {
            projects: Mutex::new(projects),
        }
    }

    pub fn insert(&self, mut project: ProjectHandle) -> Result<()> {
        project.link_repositories();
        self.lock()?.push(project);
        Ok(())
    }

    /// A copy of every project, in insertion order.
    pub fn projects(&self) -> Result<Vec<ProjectHandle>> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<ProjectHandle>>> {
        self.projects.lock().map_err(|_| Error::LockPoisoned {
            context: "registry projects".to_string(),
        })
    }
}

impl Registry for MemoryRegistry {
    fn find_project(&self, identifier: &str) -> Result<Option<ProjectHandle>> {
        Ok(self.lock()?.iter().find(|p| p.matches(identifier)).cloned())
    }

    fn save_repository(&self, record: &RepositoryRecord) -> Result<()> {
        replace_record(&mut self.lock()?, record)
    }
}

/// Overwrites the stored copy of `record`, matched by project and identifier.
fn replace_record(projects: &mut [ProjectHandle], record: &RepositoryRecord) -> Result<()> {
    let slot = projects
        .iter_mut()
        .filter(|p| p.matches(&record.project))
        .flat_map(|p| p.repositories.iter_mut())
        .find(|r| r.identifier == record.identifier)
        .ok_or_else(|| Error::Registry {
            message: format!(
                "No repository '{}' in project '{}'",
                record.identifier, record.project
            ),
        })?;
    *slot = record.clone();
    Ok(())
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    projects: Vec<ProjectHandle>,
}

/// A registry stored as a YAML file.
///
/// The file is read once at open time. Every save rewrites the whole
/// document through a temporary file in the same directory, so a crash
/// mid-write never leaves a truncated registry behind. The in-memory copy
/// only changes once the file has been replaced, and saves are serialized
/// so concurrent relocations cannot overwrite each other.
#[derive(Debug)]
pub struct FileRegistry {
    path: PathBuf,
    inner: MemoryRegistry,
    saving: Mutex<()>,
}

impl FileRegistry {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = fs::read_to_string(&path).map_err(|e| Error::Registry {
            message: format!("Failed to read registry {}: {}", path.display(), e),
        })?;
        let document: RegistryDocument =
            serde_yaml::from_str(&content).map_err(|e| Error::ConfigParse {
                message: format!("Invalid registry {}: {}", path.display(), e),
                hint: Some(
                    "Expected a top-level 'projects' list of {identifier, repositories}"
                        .to_string(),
                ),
            })?;
        Ok(Self {
            path,
            inner: MemoryRegistry::from_projects(document.projects),
            saving: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn projects(&self) -> Result<Vec<ProjectHandle>> {
        self.inner.projects()
    }

    fn write(&self, projects: Vec<ProjectHandle>) -> Result<()> {
        let document = RegistryDocument { projects };
        let yaml = serde_yaml::to_string(&document)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut staged = tempfile::NamedTempFile::new_in(&dir)?;
        staged.write_all(yaml.as_bytes())?;
        staged.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl Registry for FileRegistry {
    fn find_project(&self, identifier: &str) -> Result<Option<ProjectHandle>> {
        self.inner.find_project(identifier)
    }

    fn save_repository(&self, record: &RepositoryRecord) -> Result<()> {
        let _saving = self.saving.lock().map_err(|_| Error::LockPoisoned {
            context: "registry file".to_string(),
        })?;
        let mut projects = self.inner.projects()?;
        replace_record(&mut projects, record)?;
        self.write(projects)?;
        self.inner.save_repository(record)
    }
}
