use thiserror::Error;

/// Unified error type for release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Branch '{0}' already exists. Please delete it and try again")]
    BranchExists(String),

    #[error("No usable remote: {0}")]
    NoRemote(String),

    #[error("Failed to update '{branch}' from '{remote}': {message}")]
    Sync {
        branch: String,
        remote: String,
        message: String,
    },

    #[error("Could not upgrade {dependency}: {message}")]
    DependencyUpgrade { dependency: String, message: String },

    #[error("Failed to stage release branch: {0}")]
    Staging(String),

    #[error("Version bump failed: {0}")]
    VersionBump(String),

    #[error("Failed to push '{branch}' to '{remote}': {message}")]
    Push {
        branch: String,
        remote: String,
        message: String,
    },

    #[error("Could not parse manifest: {0}")]
    ManifestParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not restore the initial state: {0}")]
    RestoreFailed(Box<ReleaseError>),

    #[error("{primary} (rollback also failed: {cleanup})")]
    Rollback {
        primary: Box<ReleaseError>,
        cleanup: Box<ReleaseError>,
    },
}

/// Convenience type alias for Results in cut-release
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a precondition error with context
    pub fn precondition(msg: impl Into<String>) -> Self {
        ReleaseError::Precondition(msg.into())
    }

    /// Create a staging error with context
    pub fn staging(msg: impl Into<String>) -> Self {
        ReleaseError::Staging(msg.into())
    }

    /// Create a version bump error with context
    pub fn version_bump(msg: impl Into<String>) -> Self {
        ReleaseError::VersionBump(msg.into())
    }

    /// Create a manifest error with context
    pub fn manifest(msg: impl Into<String>) -> Self {
        ReleaseError::ManifestParse(msg.into())
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a prompt error with context
    pub fn prompt(msg: impl Into<String>) -> Self {
        ReleaseError::Prompt(msg.into())
    }

    /// Wrap a failure whose cleanup also failed.
    pub fn with_failed_rollback(primary: ReleaseError, cleanup: ReleaseError) -> Self {
        ReleaseError::Rollback {
            primary: Box::new(primary),
            cleanup: Box::new(cleanup),
        }
    }

    /// Wrap a failure of the restore that ends a dry run.
    pub fn restore_failed(cause: ReleaseError) -> Self {
        ReleaseError::RestoreFailed(Box::new(cause))
    }

    /// The failure that ended the run, looking through a failed rollback.
    pub fn primary(&self) -> &ReleaseError {
        match self {
            ReleaseError::Rollback { primary, .. } => primary.primary(),
            other => other,
        }
    }

    /// Human readable name of the step that failed.
    pub fn step(&self) -> &'static str {
        match self.primary() {
            ReleaseError::Precondition(_)
            | ReleaseError::BranchExists(_)
            | ReleaseError::NoRemote(_) => "verify",
            ReleaseError::Sync { .. } => "update",
            ReleaseError::DependencyUpgrade { .. } | ReleaseError::ManifestParse(_) => {
                "upgrade dependencies"
            }
            ReleaseError::Staging(_) => "stage",
            ReleaseError::VersionBump(_) => "version bump",
            ReleaseError::Push { .. } => "push",
            ReleaseError::Config(_) => "configure",
            ReleaseError::Prompt(_) => "prompt",
            ReleaseError::Git(_) | ReleaseError::Io(_) => "git",
            ReleaseError::RestoreFailed(_) | ReleaseError::Rollback { .. } => "rollback",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReleaseError::precondition("no package.json");
        assert_eq!(err.to_string(), "Precondition failed: no package.json");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ReleaseError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_dependency_upgrade_names_dependency() {
        let err = ReleaseError::DependencyUpgrade {
            dependency: "acme-lib".to_string(),
            message: "exit status 1".to_string(),
        };
        assert!(err.to_string().contains("acme-lib"));
        assert_eq!(err.step(), "upgrade dependencies");
    }

    #[test]
    fn test_failed_restore_names_rollback_step() {
        let err = ReleaseError::restore_failed(ReleaseError::Git(git2::Error::from_str(
            "cannot delete branch",
        )));
        assert_eq!(err.step(), "rollback");
        assert!(err.to_string().starts_with("Could not restore the initial state"));
        assert!(err.to_string().contains("cannot delete branch"));
    }

    #[test]
    fn test_failed_rollback_keeps_primary() {
        let err = ReleaseError::with_failed_rollback(
            ReleaseError::version_bump("semver script missing"),
            ReleaseError::staging("checkout failed"),
        );

        let msg = err.to_string();
        assert!(msg.starts_with("Version bump failed: semver script missing"));
        assert!(msg.contains("rollback also failed"));
        assert!(matches!(err.primary(), ReleaseError::VersionBump(_)));
        assert_eq!(err.step(), "version bump");
    }
}
