//! Domain logic - pure rules independent of git and process execution

pub mod branch;
pub mod snapshot;

pub use branch::ReleaseBranchName;
pub use snapshot::{choose_remote, RemoteChoice, RemoteInfo, RepoSnapshot};
