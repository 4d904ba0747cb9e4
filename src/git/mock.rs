use crate::domain::RemoteInfo;
use crate::error::{ReleaseError, Result};
use crate::git::{PullOutcome, Repository};
use std::collections::{BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Operations a [MockRepository] can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockFailure {
    Pull,
    CreateBranch,
    DeleteBranch,
    Reset,
    Push,
}

#[derive(Debug, Default)]
struct MockState {
    is_repo: bool,
    branches: BTreeSet<String>,
    current: String,
    remotes: Vec<RemoteInfo>,
    dirty: bool,
    failures: HashSet<MockFailure>,
    pushed: Vec<(String, String)>,
    calls: Vec<String>,
}

/// Mock repository for testing without actual git operations
///
/// Keeps branches and HEAD in memory and records every call so tests can
/// assert on what the orchestrator did.
pub struct MockRepository {
    state: Mutex<MockState>,
}

impl MockRepository {
    /// Create a repository with a single `develop` branch checked out
    pub fn new() -> Self {
        let mut branches = BTreeSet::new();
        branches.insert("develop".to_string());

        MockRepository {
            state: Mutex::new(MockState {
                is_repo: true,
                branches,
                current: "develop".to_string(),
                ..MockState::default()
            }),
        }
    }

    /// A directory that is not under version control
    pub fn not_a_repo() -> Self {
        MockRepository {
            state: Mutex::new(MockState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the state from the assertions
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a local branch
    pub fn add_branch(&self, name: impl Into<String>) {
        self.state().branches.insert(name.into());
    }

    /// Point HEAD at an existing or new branch
    pub fn set_current(&self, name: impl Into<String>) {
        let name = name.into();
        let mut state = self.state();
        state.branches.insert(name.clone());
        state.current = name;
    }

    /// Add a remote with the same fetch and push URL
    pub fn add_remote(&self, name: impl Into<String>, url: impl Into<String>) {
        self.state().remotes.push(RemoteInfo::new(name, url));
    }

    pub fn set_dirty(&self, dirty: bool) {
        self.state().dirty = dirty;
    }

    /// Make an operation fail from now on
    pub fn fail_on(&self, failure: MockFailure) {
        self.state().failures.insert(failure);
    }

    pub fn current(&self) -> String {
        self.state().current.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.state().dirty
    }

    /// Pushed `(branch, remote)` pairs in order
    pub fn pushed(&self) -> Vec<(String, String)> {
        self.state().pushed.clone()
    }

    /// Every trait call, formatted as `operation(args)`
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Calls that change refs or the work tree
    pub fn mutations(&self) -> Vec<String> {
        const READ_ONLY: [&str; 6] = [
            "branch_exists",
            "list_branches",
            "current_branch",
            "has_uncommitted_changes",
            "list_remotes",
            "is_repo",
        ];

        self.calls()
            .into_iter()
            .filter(|call| !READ_ONLY.iter().any(|op| call.starts_with(op)))
            .collect()
    }

    fn record(&self, call: String) -> MutexGuard<'_, MockState> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }

    fn injected(failure: MockFailure) -> ReleaseError {
        ReleaseError::Git(git2::Error::from_str(&format!(
            "injected {:?} failure",
            failure
        )))
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn is_repo(&self) -> bool {
        self.record("is_repo()".to_string()).is_repo
    }

    fn branch_exists(&self, name: &str) -> Result<bool> {
        let state = self.record(format!("branch_exists({})", name));
        Ok(state.branches.contains(name))
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        let state = self.record("list_branches()".to_string());
        Ok(state.branches.iter().cloned().collect())
    }

    fn current_branch(&self) -> Result<String> {
        Ok(self.record("current_branch()".to_string()).current.clone())
    }

    fn has_uncommitted_changes(&self) -> Result<bool> {
        Ok(self.record("has_uncommitted_changes()".to_string()).dirty)
    }

    fn list_remotes(&self, filter: Option<&str>) -> Result<Vec<RemoteInfo>> {
        let state = self.record(format!("list_remotes({:?})", filter));
        let mut remotes: Vec<RemoteInfo> = state
            .remotes
            .iter()
            .filter(|r| filter.map_or(true, |token| r.matches(token)))
            .cloned()
            .collect();
        remotes.sort();
        Ok(remotes)
    }

    fn checkout_and_rebase_pull(
        &self,
        branch: &str,
        remote: &str,
        dry_run: bool,
    ) -> Result<PullOutcome> {
        let mut state = self.record(format!(
            "checkout_and_rebase_pull({}, {}, {})",
            branch, remote, dry_run
        ));

        if state.failures.contains(&MockFailure::Pull) {
            return Err(ReleaseError::Sync {
                branch: branch.to_string(),
                remote: remote.to_string(),
                message: "local and remote history have diverged".to_string(),
            });
        }

        if !state.remotes.iter().any(|r| r.name == remote) {
            return Err(ReleaseError::Sync {
                branch: branch.to_string(),
                remote: remote.to_string(),
                message: "Cannot find remote".to_string(),
            });
        }

        state.branches.insert(branch.to_string());
        state.current = branch.to_string();

        if dry_run {
            Ok(PullOutcome::DryRun {
                remote_head: "0".repeat(40),
            })
        } else {
            Ok(PullOutcome::UpToDate)
        }
    }

    fn create_local_branch(&self, name: &str) -> Result<()> {
        let mut state = self.record(format!("create_local_branch({})", name));

        if state.failures.contains(&MockFailure::CreateBranch) {
            return Err(Self::injected(MockFailure::CreateBranch));
        }
        if !state.branches.insert(name.to_string()) {
            return Err(ReleaseError::Git(git2::Error::from_str(&format!(
                "a branch named '{}' already exists",
                name
            ))));
        }

        state.current = name.to_string();
        Ok(())
    }

    fn delete_local_branch(&self, name: &str) -> Result<()> {
        let mut state = self.record(format!("delete_local_branch({})", name));

        if state.failures.contains(&MockFailure::DeleteBranch) {
            return Err(Self::injected(MockFailure::DeleteBranch));
        }
        if state.current == name {
            return Err(ReleaseError::Git(git2::Error::from_str(&format!(
                "cannot delete branch '{}' which is checked out",
                name
            ))));
        }
        if !state.branches.remove(name) {
            return Err(ReleaseError::Git(git2::Error::from_str(&format!(
                "branch '{}' not found",
                name
            ))));
        }

        Ok(())
    }

    fn hard_reset_and_checkout(&self, branch: &str) -> Result<()> {
        let mut state = self.record(format!("hard_reset_and_checkout({})", branch));

        if state.failures.contains(&MockFailure::Reset) {
            return Err(Self::injected(MockFailure::Reset));
        }
        if !state.branches.contains(branch) {
            return Err(ReleaseError::Git(git2::Error::from_str(&format!(
                "branch '{}' not found",
                branch
            ))));
        }

        state.dirty = false;
        state.current = branch.to_string();
        Ok(())
    }

    fn push(&self, branch: &str, remote: &str) -> Result<String> {
        let mut state = self.record(format!("push({}, {})", branch, remote));

        if state.failures.contains(&MockFailure::Push) {
            return Err(ReleaseError::Push {
                branch: branch.to_string(),
                remote: remote.to_string(),
                message: "rejected (non-fast-forward)".to_string(),
            });
        }

        state.pushed.push((branch.to_string(), remote.to_string()));
        let url = state
            .remotes
            .iter()
            .find(|r| r.name == remote)
            .map(|r| r.push_url.clone())
            .unwrap_or_default();

        Ok(format!(
            "Create pull request for {}:\n{}/pullrequestcreate?sourceRef={}",
            branch,
            url.trim_end_matches(".git"),
            branch.replace('/', "%2F")
        ))
    }
}
