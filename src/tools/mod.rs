//! External tools invoked during a release
//!
//! - package manager: upgrades one dependency at a time
//! - version bump script: rewrites the version, or reports what it would do

pub mod executor;
pub mod mock;

pub use executor::ProcessRunner;
pub use mock::MockToolRunner;

use std::fmt;

use crate::error::Result;

/// Package manager used for dependency upgrades
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Npm,
    Yarn,
}

impl PackageManager {
    /// Yarn when the alternate package manager is requested, npm otherwise
    pub fn select(use_alternate: bool) -> Self {
        if use_alternate {
            PackageManager::Yarn
        } else {
            PackageManager::Npm
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs the package-upgrade and version-bump commands
///
/// Success is a zero exit status. Failures carry the captured output.
pub trait ToolRunner {
    /// Upgrade a single dependency
    ///
    /// Fails with [crate::error::ReleaseError::DependencyUpgrade] naming it.
    fn upgrade_dependency(&self, dependency: &str, manager: PackageManager) -> Result<()>;

    /// Bump the project version, returning the tool's output
    ///
    /// With `dry_run` the tool must not rewrite any file. Fails with
    /// [crate::error::ReleaseError::VersionBump].
    fn bump_version(&self, dry_run: bool) -> Result<String>;
}
