use crate::error::{ReleaseError, Result};

/// A configured remote with its URLs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RemoteInfo {
    pub name: String,
    pub fetch_url: String,
    pub push_url: String,
}

impl RemoteInfo {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        RemoteInfo {
            name: name.into(),
            fetch_url: url.clone(),
            push_url: url,
        }
    }

    /// Whether either URL belongs to the given organizational namespace.
    pub fn matches(&self, filter: &str) -> bool {
        self.fetch_url.contains(filter) || self.push_url.contains(filter)
    }
}

/// Repository state captured once verification passes.
///
/// Every abort after this point restores `initial_branch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSnapshot {
    pub initial_branch: String,
    pub remote: String,
}

/// Outcome of applying the remote preference to the candidate remotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteChoice {
    /// The preferred remote is configured for the namespace
    Preferred(String),
    /// The preferred remote is missing; the user picks one of these
    Candidates(Vec<String>),
}

/// Decide which remote to use from the namespace-filtered candidates.
pub fn choose_remote(candidates: &[RemoteInfo], preferred: &str) -> Result<RemoteChoice> {
    if candidates.is_empty() {
        return Err(ReleaseError::NoRemote(
            "no remote is configured for the organization".to_string(),
        ));
    }

    if candidates.iter().any(|r| r.name == preferred) {
        return Ok(RemoteChoice::Preferred(preferred.to_string()));
    }

    let mut names: Vec<String> = candidates.iter().map(|r| r.name.clone()).collect();
    names.sort();
    names.dedup();
    Ok(RemoteChoice::Candidates(names))
}
