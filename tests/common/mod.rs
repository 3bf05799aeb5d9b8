//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_registry(registries::ACME);
//!     fixture.command().arg("resolve").arg("--project-id").arg("acme");
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::payloads;
    #[allow(unused_imports)]
    pub use super::registries;
    #[allow(unused_imports)]
    pub use super::should_skip_network_tests;
    pub use super::TestFixture;
}

/// Registry documents for testing.
#[allow(dead_code)]
pub mod registries {
    /// One project with two git repositories and one Mercurial repository.
    pub const ACME: &str = r#"
projects:
  - identifier: acme
    name: Acme Corp
    repositories:
      - identifier: main
        url: https://github.com/acme/acme.git
      - identifier: docs
        url: https://github.com/acme/docs.git
      - identifier: legacy
        scm: mercurial
        url: https://hg.acme.test/legacy
"#;

    /// A project without any git repository.
    pub const NO_GIT: &str = r#"
projects:
  - identifier: attic
    repositories:
      - identifier: old
        scm: subversion
        url: svn://svn.acme.test/trunk
"#;

    /// Not a registry document at all.
    pub const INVALID: &str = "projects: [unclosed";
}

/// Push notification payloads for testing.
#[allow(dead_code)]
pub mod payloads {
    pub const ACME_PUSH: &str = r#"{"ref": "refs/heads/main", "repository": {"name": "acme", "full_name": "acme/acme"}}"#;

    pub const UNKNOWN_PUSH: &str = r#"{"repository": {"name": "nobody"}}"#;

    pub const NO_REPOSITORY: &str = r#"{"zen": "Keep it logically awesome."}"#;
}

/// Check if network tests should be skipped.
///
/// Returns `true` if the `SKIP_NETWORK_TESTS` environment variable is set.
#[allow(dead_code)]
pub fn should_skip_network_tests() -> bool {
    std::env::var("SKIP_NETWORK_TESTS").is_ok()
}

/// A temporary directory holding a registry file, an empty settings file and
/// optionally a fake git executable.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("config.yaml")
            .write_str("")
            .expect("Failed to write settings file");
        Self { temp_dir }
    }

    /// Writes `registry.yaml` with the given content.
    pub fn with_registry(self, content: &str) -> Self {
        self.temp_dir
            .child("registry.yaml")
            .write_str(content)
            .expect("Failed to write registry");
        self
    }

    /// Writes the settings file with the given content.
    #[allow(dead_code)]
    pub fn with_settings(self, content: &str) -> Self {
        self.temp_dir
            .child("config.yaml")
            .write_str(content)
            .expect("Failed to write settings file");
        self
    }

    /// Add a file with the given path and content.
    #[allow(dead_code)]
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Installs `bin/git`, a shell script that appends `<cwd> <args>` to
    /// `git.log`, creates `HEAD` on clone and fails fetches run in a
    /// directory whose path contains `$FAKE_GIT_FAIL_FETCH`.
    #[cfg(unix)]
    #[allow(dead_code)]
    pub fn with_fake_git(self) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let script = format!(
            r#"#!/bin/sh
echo "$PWD $*" >> "{log}"
case "$1" in
  clone)
    echo "ref: refs/heads/main" > HEAD
    ;;
  fetch)
    if [ -n "$FAKE_GIT_FAIL_FETCH" ]; then
      case "$PWD" in
        *"$FAKE_GIT_FAIL_FETCH"*)
          echo "fatal: could not read from remote repository" >&2
          exit 128
          ;;
      esac
    fi
    ;;
esac
exit 0
"#,
            log = self.git_log().display()
        );
        let git = self.temp_dir.child("bin/git");
        git.write_str(&script).expect("Failed to write fake git");
        std::fs::set_permissions(git.path(), std::fs::Permissions::from_mode(0o755))
            .expect("Failed to mark fake git executable");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn registry_path(&self) -> PathBuf {
        self.path().join("registry.yaml")
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.yaml")
    }

    #[allow(dead_code)]
    pub fn git_path(&self) -> PathBuf {
        self.path().join("bin").join("git")
    }

    #[allow(dead_code)]
    pub fn git_log(&self) -> PathBuf {
        self.path().join("git.log")
    }

    /// Lines the fake git appended so far.
    #[allow(dead_code)]
    pub fn git_calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.git_log())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[allow(dead_code)]
    pub fn mirrors_dir(&self) -> PathBuf {
        self.path().join("mirrors")
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// A `mirror-hook` command running in the fixture directory, pointed at
    /// its registry and settings files and isolated from the caller's
    /// environment.
    pub fn command(&self, subcommand: &str) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("mirror-hook");
        cmd.current_dir(self.path())
            .env_remove("MIRROR_HOOK_REGISTRY")
            .env_remove("MIRROR_HOOK_GIT")
            .env_remove("MIRROR_HOOK_CREDENTIALS")
            .env_remove("MIRROR_HOOK_BASE_DIR")
            .env_remove("MIRROR_HOOK_INDEX_COMMAND")
            .env_remove("MIRROR_HOOK_LOG")
            .env_remove("FAKE_GIT_FAIL_FETCH")
            .arg(subcommand)
            .arg("--registry")
            .arg(self.registry_path())
            .arg("--config")
            .arg(self.config_path());
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_writes_empty_settings() {
        let fixture = TestFixture::new();
        assert!(fixture.config_path().exists());
    }

    #[test]
    fn test_registries_are_valid_yaml() {
        for registry in [registries::ACME, registries::NO_GIT] {
            serde_yaml::from_str::<serde_yaml::Value>(registry)
                .expect("Registry should be valid YAML");
        }
        assert!(serde_yaml::from_str::<serde_yaml::Value>(registries::INVALID).is_err());
    }
}
