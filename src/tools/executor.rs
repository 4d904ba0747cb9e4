use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::CommandsConfig;
use crate::error::{ReleaseError, Result};
use crate::tools::{PackageManager, ToolRunner};

/// Runs the configured commands as child processes in the project directory
pub struct ProcessRunner {
    workdir: PathBuf,
    commands: CommandsConfig,
}

impl ProcessRunner {
    pub fn new(workdir: impl Into<PathBuf>, commands: CommandsConfig) -> Self {
        ProcessRunner {
            workdir: workdir.into(),
            commands,
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Execute `command` followed by `extra_args`
    ///
    /// Blocks until the process exits. A non-zero exit code is an error
    /// carrying stdout and stderr.
    fn execute(&self, command: &[String], extra_args: &[&str]) -> std::result::Result<String, String> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| "no command configured".to_string())?;

        log::debug!(
            "running `{} {} {}` in {}",
            program,
            args.join(" "),
            extra_args.join(" "),
            self.workdir.display()
        );

        let output = Command::new(program)
            .args(args)
            .args(extra_args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| format!("Failed to execute {}: {}", program, e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "{} failed with exit code {}\nStdout: {}\nStderr: {}",
                program,
                output.status.code().unwrap_or(-1),
                stdout,
                stderr.trim()
            ));
        }

        Ok(stdout)
    }
}

impl ToolRunner for ProcessRunner {
    fn upgrade_dependency(&self, dependency: &str, manager: PackageManager) -> Result<()> {
        let command = match manager {
            PackageManager::Npm => &self.commands.npm_upgrade,
            PackageManager::Yarn => &self.commands.yarn_upgrade,
        };

        self.execute(command, &[dependency])
            .map(|_| ())
            .map_err(|message| ReleaseError::DependencyUpgrade {
                dependency: dependency.to_string(),
                message,
            })
    }

    fn bump_version(&self, dry_run: bool) -> Result<String> {
        let extra: Vec<&str> = if dry_run {
            vec![self.commands.dry_run_arg.as_str()]
        } else {
            Vec::new()
        };

        self.execute(&self.commands.version_bump, &extra)
            .map_err(ReleaseError::VersionBump)
    }
}
