//! Release workflow orchestration
//!
//! Runs the release state machine:
//!
//! ```text
//! Verifying -> Updating -> (DependencyUpgrade)? -> Staging -> VersionBump
//!           -> (Pushing | DryRunRollback)
//! ```
//!
//! Verification failures surface directly. Once the starting branch has been
//! recorded, every failure goes through a rollback to that branch before
//! it is returned, and a dry run always ends there too.

use std::cell::Cell;
use std::fmt;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use regex::Regex;

use crate::boundary::BoundaryWarning;
use crate::config::{RunConfig, Settings};
use crate::domain::{choose_remote, ReleaseBranchName, RemoteChoice, RepoSnapshot};
use crate::error::{ReleaseError, Result};
use crate::git::{PullOutcome, Repository};
use crate::manifest::{list_owned_dependencies, DependencySet, Manifest, MANIFEST_FILE};
use crate::tools::{PackageManager, ToolRunner};
use crate::ui::{format_dependencies, ProgressSink};

/// Choice offered alongside the dependencies to upgrade nothing
pub const NONE_CHOICE: &str = "none";

/// States of a release run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Verifying,
    Updating,
    DependencyUpgrade,
    Staging,
    VersionBump,
    Pushing,
    DryRunRollback,
    Rollback,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Verifying => "verifying",
            Stage::Updating => "updating",
            Stage::DependencyUpgrade => "dependency upgrade",
            Stage::Staging => "staging",
            Stage::VersionBump => "version bump",
            Stage::Pushing => "pushing",
            Stage::DryRunRollback => "dry run rollback",
            Stage::Rollback => "rollback",
        };
        f.write_str(name)
    }
}

/// Terminal result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The release branch is on the remote
    Pushed {
        branch: String,
        remote: String,
        /// Text the remote sent back during the push
        response: String,
        /// First link found in `response`
        pull_request_url: Option<String>,
    },
    /// Every step ran and the repository was restored
    DryRunComplete { branch: String },
}

/// Drives one release run against a repository.
///
/// All effects go through the injected repository, tool runner and sink,
/// so the state machine itself is deterministic.
pub struct ReleaseOrchestrator<'a> {
    repo: &'a dyn Repository,
    tools: &'a dyn ToolRunner,
    sink: &'a dyn ProgressSink,
    settings: &'a Settings,
    config: RunConfig,
    workdir: PathBuf,
    today: NaiveDate,
    staged: Cell<bool>,
}

impl<'a> ReleaseOrchestrator<'a> {
    pub fn new(
        repo: &'a dyn Repository,
        tools: &'a dyn ToolRunner,
        sink: &'a dyn ProgressSink,
        settings: &'a Settings,
        config: RunConfig,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        ReleaseOrchestrator {
            repo,
            tools,
            sink,
            settings,
            config,
            workdir: workdir.into(),
            today: Local::now().date_naive(),
            staged: Cell::new(false),
        }
    }

    /// Use a fixed date for the release branch name
    pub fn on_date(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// The branch this run creates
    pub fn release_branch(&self) -> ReleaseBranchName {
        ReleaseBranchName::with_prefix(&self.settings.branches.prefix, self.today)
    }

    /// Run the workflow to completion
    pub fn run(&self) -> Result<RunOutcome> {
        self.staged.set(false);
        let (release_branch, snapshot) = self.verify()?;
        log::debug!(
            "snapshot taken: branch '{}', remote '{}'",
            snapshot.initial_branch,
            snapshot.remote
        );

        match self.execute(&release_branch, &snapshot) {
            Ok(outcome @ RunOutcome::DryRunComplete { .. }) => {
                self.enter(Stage::DryRunRollback);
                self.rollback(
                    "Dry run complete. Restoring initial state",
                    &release_branch,
                    &snapshot,
                )
                .map_err(ReleaseError::restore_failed)?;
                Ok(outcome)
            }
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                self.enter(Stage::Rollback);
                let label = format!("Restoring {}", snapshot.initial_branch);
                match self.rollback(&label, &release_branch, &snapshot) {
                    Ok(()) => Err(error),
                    Err(cleanup) => Err(ReleaseError::with_failed_rollback(error, cleanup)),
                }
            }
        }
    }

    fn enter(&self, stage: Stage) {
        log::debug!("entering {} stage", stage);
    }

    /// Report an operation through the sink.
    fn step<T>(
        &self,
        label: &str,
        done: impl FnOnce(&T) -> String,
        op: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        self.sink.step_started(label);
        match op() {
            Ok(value) => {
                self.sink.step_succeeded(&done(&value));
                Ok(value)
            }
            Err(error) => {
                self.sink.step_failed(label, &error);
                Err(error)
            }
        }
    }

    /// Checks that must pass before anything is touched.
    fn verify(&self) -> Result<(ReleaseBranchName, RepoSnapshot)> {
        self.enter(Stage::Verifying);

        if !Manifest::exists_in(&self.workdir) {
            return Err(ReleaseError::precondition(format!(
                "Must be running in a Node.js project: no {} in {}",
                MANIFEST_FILE,
                self.workdir.display()
            )));
        }

        if !self.repo.is_repo() {
            return Err(ReleaseError::precondition("Must be running in a git repository"));
        }

        let release_branch = self.release_branch();
        self.step(
            "Verifying local branches",
            |_| format!("{} is available", release_branch),
            || {
                if self.repo.branch_exists(release_branch.as_str())? {
                    return Err(ReleaseError::BranchExists(release_branch.to_string()));
                }
                Ok(())
            },
        )?;

        let initial_branch = self.repo.current_branch()?;

        if self.repo.has_uncommitted_changes()? {
            self.sink.warn(&BoundaryWarning::UncommittedChanges {
                branch: initial_branch.clone(),
            });
            if !self.sink.confirm("Continue anyway?", false)? {
                return Err(ReleaseError::precondition(format!(
                    "'{}' has uncommitted changes",
                    initial_branch
                )));
            }
        }

        let remote = self.select_remote()?;

        Ok((
            release_branch,
            RepoSnapshot {
                initial_branch,
                remote,
            },
        ))
    }

    /// Pick the remote, preferring the configured one
    fn select_remote(&self) -> Result<String> {
        let token = &self.settings.organization.token;
        let candidates = self.repo.list_remotes(Some(token))?;

        if candidates.is_empty() {
            return Err(ReleaseError::NoRemote(format!(
                "no remote URL contains '{}'",
                token
            )));
        }

        match choose_remote(&candidates, &self.config.remote_name)? {
            RemoteChoice::Preferred(name) => Ok(name),
            RemoteChoice::Candidates(names) => {
                self.sink.warn(&BoundaryWarning::PreferredRemoteMissing {
                    preferred: self.config.remote_name.clone(),
                });
                self.sink
                    .select("Which remote should the release branch use?", &names)
            }
        }
    }

    fn execute(
        &self,
        release_branch: &ReleaseBranchName,
        snapshot: &RepoSnapshot,
    ) -> Result<RunOutcome> {
        self.update(snapshot)?;

        if self.config.upgrade_dependencies {
            self.upgrade_dependencies()?;
        }

        self.stage(release_branch)?;
        self.bump_version()?;

        if self.config.dry_run {
            return Ok(RunOutcome::DryRunComplete {
                branch: release_branch.to_string(),
            });
        }

        self.push(release_branch, snapshot)
    }

    fn update(&self, snapshot: &RepoSnapshot) -> Result<PullOutcome> {
        self.enter(Stage::Updating);
        let tracking = &self.settings.branches.tracking;
        let remote = &snapshot.remote;

        self.step(
            &format!("Getting the latest from {}", tracking),
            |outcome| match outcome {
                PullOutcome::UpToDate => format!("{} is up to date", tracking),
                PullOutcome::FastForwarded => format!("Fast-forwarded {}", tracking),
                PullOutcome::Rebased(n) => {
                    format!("Rebased {} local commit(s) onto {}/{}", n, remote, tracking)
                }
                PullOutcome::DryRun { remote_head } => format!(
                    "Dry run: {}/{} is at {}",
                    remote,
                    tracking,
                    &remote_head[..remote_head.len().min(7)]
                ),
            },
            || {
                self.repo
                    .checkout_and_rebase_pull(tracking, remote, self.config.dry_run)
                    .map_err(|e| match e {
                        e @ ReleaseError::Sync { .. } => e,
                        other => ReleaseError::Sync {
                            branch: tracking.clone(),
                            remote: remote.clone(),
                            message: other.to_string(),
                        },
                    })
            },
        )
    }

    fn upgrade_dependencies(&self) -> Result<()> {
        self.enter(Stage::DependencyUpgrade);
        let token = &self.settings.organization.token;

        let owned: DependencySet = self.step(
            "Checking for organization dependencies",
            |deps: &DependencySet| format!("Found {} organization dependencies", deps.len()),
            || list_owned_dependencies(&self.workdir, token),
        )?;

        if owned.is_empty() {
            log::debug!("no dependency source contains '{}'", token);
            self.sink.warn(&BoundaryWarning::NoOwnedDependencies {
                filter: token.clone(),
            });
            return Ok(());
        }

        self.sink
            .info(&format!("Found dependencies:\n{}", format_dependencies(&owned)));

        if !self
            .sink
            .confirm(&format!("Upgrade {} dependencies?", token), true)?
        {
            self.sink.info("Skipping dependency upgrades");
            return Ok(());
        }

        let mut choices: Vec<String> = owned.into_iter().collect();
        choices.push(NONE_CHOICE.to_string());

        let selected = self
            .sink
            .multi_select("Select the dependencies to upgrade", &choices)?;
        if selected.is_empty() || selected.iter().any(|s| s == NONE_CHOICE) {
            self.sink.info("No dependencies selected");
            return Ok(());
        }

        let manager = PackageManager::select(self.config.use_alternate_package_manager);
        for dependency in &selected {
            self.step(
                &format!("Upgrading {}", dependency),
                |_| format!("Upgraded {}", dependency),
                || {
                    self.tools
                        .upgrade_dependency(dependency, manager)
                        .map_err(|e| match e {
                            e @ ReleaseError::DependencyUpgrade { .. } => e,
                            other => ReleaseError::DependencyUpgrade {
                                dependency: dependency.clone(),
                                message: other.to_string(),
                            },
                        })
                },
            )?;
        }

        self.sink.info(&format!(
            "Successfully upgraded {} dependencies with {}",
            selected.len(),
            manager
        ));
        Ok(())
    }

    fn stage(&self, release_branch: &ReleaseBranchName) -> Result<()> {
        self.enter(Stage::Staging);

        self.step(
            &format!("Staging release branch {}", release_branch),
            |_| format!("Staged {}", release_branch),
            || {
                let exists = self
                    .repo
                    .branch_exists(release_branch.as_str())
                    .map_err(|e| ReleaseError::staging(e.to_string()))?;
                if exists {
                    return Err(ReleaseError::staging(format!(
                        "{} was created while the run was in progress",
                        release_branch
                    )));
                }

                self.staged.set(true);
                self.repo
                    .create_local_branch(release_branch.as_str())
                    .map_err(|e| ReleaseError::staging(e.to_string()))
            },
        )
    }

    fn bump_version(&self) -> Result<()> {
        self.enter(Stage::VersionBump);
        let before = self.manifest_version();

        let output = self.step(
            "Performing version bump",
            |_| "Version bumped".to_string(),
            || {
                self.tools
                    .bump_version(self.config.dry_run)
                    .map_err(|e| match e {
                        e @ ReleaseError::VersionBump(_) => e,
                        other => ReleaseError::version_bump(other.to_string()),
                    })
            },
        )?;
        if !output.is_empty() {
            log::debug!("version bump output: {}", output);
        }

        if let (Some(before), Some(after)) = (before, self.manifest_version()) {
            if before != after {
                self.sink.info(&format!("Version {} → {}", before, after));
            }
        }
        Ok(())
    }

    fn manifest_version(&self) -> Option<semver::Version> {
        Manifest::load(&self.workdir).ok()?.version()
    }

    fn push(
        &self,
        release_branch: &ReleaseBranchName,
        snapshot: &RepoSnapshot,
    ) -> Result<RunOutcome> {
        self.enter(Stage::Pushing);
        let remote = &snapshot.remote;

        let response = self.step(
            "Pushing release branch",
            |_| format!("Pushed {} to {}", release_branch, remote),
            || {
                self.repo
                    .push(release_branch.as_str(), remote)
                    .map_err(|e| match e {
                        e @ ReleaseError::Push { .. } => e,
                        other => ReleaseError::Push {
                            branch: release_branch.to_string(),
                            remote: remote.clone(),
                            message: other.to_string(),
                        },
                    })
            },
        )?;

        let pull_request_url = extract_url(&response);
        match &pull_request_url {
            Some(url) => {
                let branches = &self.settings.branches;
                for target in [&branches.production, &branches.tracking] {
                    self.sink.info(&format!(
                        "Open PR against {}: {}",
                        target,
                        pull_request_link(url, target)
                    ));
                }
            }
            None => self.sink.warn(&BoundaryWarning::NoPullRequestLink {
                remote: remote.clone(),
            }),
        }

        Ok(RunOutcome::Pushed {
            branch: release_branch.to_string(),
            remote: remote.clone(),
            response,
            pull_request_url,
        })
    }

    /// Put the repository back on the starting branch.
    ///
    /// Discards work tree changes and removes the release branch if this run
    /// created it.
    fn rollback(
        &self,
        label: &str,
        release_branch: &ReleaseBranchName,
        snapshot: &RepoSnapshot,
    ) -> Result<()> {
        let initial = &snapshot.initial_branch;

        self.step(
            label,
            |_| format!("Restored {}", initial),
            || {
                self.repo.hard_reset_and_checkout(initial)?;
                if self.staged.get() && self.repo.branch_exists(release_branch.as_str())? {
                    self.repo.delete_local_branch(release_branch.as_str())?;
                }
                Ok(())
            },
        )
    }
}

/// First http(s) URL in a remote response
pub fn extract_url(response: &str) -> Option<String> {
    let pattern = Regex::new(r"https?://[^\s]+").ok()?;
    pattern
        .find(response)
        .map(|m| m.as_str().trim_end_matches(&['.', ',', ')'][..]).to_string())
}

/// Link that opens a pull request from the pushed branch into `target`
pub fn pull_request_link(url: &str, target: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}targetBranch={}",
        url,
        separator,
        encode_component(&format!("refs/heads/{}", target))
    )
}

/// Percent-encode everything except unreserved URL characters
fn encode_component(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}
