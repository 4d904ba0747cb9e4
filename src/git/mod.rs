//! Version-control abstraction layer
//!
//! This module provides a trait-based abstraction over the git operations a
//! release run needs, allowing the orchestrator to be driven by either a real
//! repository or an in-memory mock.
//!
//! # Overview
//!
//! The primary abstraction is the [Repository] trait. The concrete
//! implementations are:
//!
//! - [repository::Git2Repository]: A real implementation using the `git2` crate
//! - [mock::MockRepository]: A mock implementation for testing
//!
//! Each operation maps to one git action and none of them retries.
//!
//! ```rust
//! # use cut_release::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> cut_release::Result<()> {
//! if !repo.branch_exists("release/7Mar24")? {
//!     repo.create_local_branch("release/7Mar24")?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::domain::RemoteInfo;
use crate::error::Result;

/// What a pull with rebase did to the local branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// Local branch already contained the remote head
    UpToDate,
    /// Local branch was moved forward to the remote head
    FastForwarded,
    /// Local commits were replayed on top of the remote head
    Rebased(usize),
    /// Remote was contacted but nothing local changed
    DryRun { remote_head: String },
}

/// Common version-control trait for abstraction
///
/// ## Thread Safety
///
/// All implementors must be `Send`. A run drives one repository from a
/// single thread, so `Sync` is not required.
///
/// ## Error Handling
///
/// Implementations map backend failures to the matching
/// [crate::error::ReleaseError] variant: pull failures become `Sync`,
/// push failures become `Push`.
pub trait Repository: Send {
    /// Whether the working directory is inside a git work tree
    fn is_repo(&self) -> bool;

    /// Whether a local branch with this name exists
    fn branch_exists(&self, name: &str) -> Result<bool>;

    /// Names of all local branches, sorted
    fn list_branches(&self) -> Result<Vec<String>>;

    /// Name of the branch HEAD points to
    fn current_branch(&self) -> Result<String>;

    /// Whether the work tree or index has uncommitted changes
    fn has_uncommitted_changes(&self) -> Result<bool>;

    /// Configured remotes, optionally limited to those whose URL contains `filter`
    ///
    /// Returned sorted by name.
    fn list_remotes(&self, filter: Option<&str>) -> Result<Vec<RemoteInfo>>;

    /// Check out `branch` and pull it from `remote` with rebase
    ///
    /// With `dry_run` the remote is only queried; refs and the work tree stay
    /// untouched.
    fn checkout_and_rebase_pull(&self, branch: &str, remote: &str, dry_run: bool)
        -> Result<PullOutcome>;

    /// Create `name` at HEAD and check it out
    fn create_local_branch(&self, name: &str) -> Result<()>;

    /// Force-delete a local branch
    fn delete_local_branch(&self, name: &str) -> Result<()>;

    /// Discard all work tree changes, then check out `branch`
    fn hard_reset_and_checkout(&self, branch: &str) -> Result<()>;

    /// Push `branch` to `remote`, returning the text the remote sent back
    fn push(&self, branch: &str, remote: &str) -> Result<String>;
}
