use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::{ReleaseError, Result};
use crate::tools::{PackageManager, ToolRunner};

/// Tool runner that records calls instead of spawning processes
#[derive(Default)]
pub struct MockToolRunner {
    failing_dependencies: HashSet<String>,
    fail_bump: bool,
    upgrades: Mutex<Vec<(String, PackageManager)>>,
    bumps: Mutex<Vec<bool>>,
}

impl MockToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the upgrade of `dependency` fail
    pub fn failing_upgrade(mut self, dependency: impl Into<String>) -> Self {
        self.failing_dependencies.insert(dependency.into());
        self
    }

    /// Make the version bump fail
    pub fn failing_bump(mut self) -> Self {
        self.fail_bump = true;
        self
    }

    /// Attempted upgrades in call order, failed ones included
    pub fn upgrades(&self) -> Vec<(String, PackageManager)> {
        self.upgrades
            .lock()
            .map(|u| u.clone())
            .unwrap_or_default()
    }

    /// The `dry_run` flag of every bump call
    pub fn bumps(&self) -> Vec<bool> {
        self.bumps.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

impl ToolRunner for MockToolRunner {
    fn upgrade_dependency(&self, dependency: &str, manager: PackageManager) -> Result<()> {
        if let Ok(mut upgrades) = self.upgrades.lock() {
            upgrades.push((dependency.to_string(), manager));
        }

        if self.failing_dependencies.contains(dependency) {
            return Err(ReleaseError::DependencyUpgrade {
                dependency: dependency.to_string(),
                message: format!("{} upgrade exited with code 1", manager),
            });
        }
        Ok(())
    }

    fn bump_version(&self, dry_run: bool) -> Result<String> {
        if let Ok(mut bumps) = self.bumps.lock() {
            bumps.push(dry_run);
        }

        if self.fail_bump {
            return Err(ReleaseError::version_bump("semver exited with code 1"));
        }
        Ok(if dry_run {
            "would bump 1.4.0 -> 1.5.0".to_string()
        } else {
            "v1.5.0".to_string()
        })
    }
}
