use std::fmt;

/// Non-fatal conditions met during a release run.
/// These are reported to the user and never abort the run by themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// Tracked files are modified and a rollback would discard them
    UncommittedChanges { branch: String },
    /// Dependency upgrades were requested but nothing matches the organization
    NoOwnedDependencies { filter: String },
    /// The requested remote is not configured for the organization
    PreferredRemoteMissing { preferred: String },
    /// The push succeeded but the remote response held no link
    NoPullRequestLink { remote: String },
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::UncommittedChanges { branch } => write!(
                f,
                "Branch '{}' has uncommitted changes; they are discarded if the run rolls back",
                branch
            ),
            BoundaryWarning::NoOwnedDependencies { filter } => {
                write!(f, "No dependencies found from '{}'", filter)
            }
            BoundaryWarning::PreferredRemoteMissing { preferred } => write!(
                f,
                "Remote '{}' is not configured for the organization",
                preferred
            ),
            BoundaryWarning::NoPullRequestLink { remote } => write!(
                f,
                "Remote '{}' did not return a pull request link",
                remote
            ),
        }
    }
}
