use crate::domain::RemoteInfo;
use crate::error::{ReleaseError, Result};
use crate::git::PullOutcome;
use git2::build::CheckoutBuilder;
use git2::{
    BranchType, Cred, CredentialType, Direction, ErrorCode, FetchOptions, Oid, PushOptions,
    RemoteCallbacks, Repository as Git2Repo, ResetType, StatusOptions,
};
use std::path::{Path, PathBuf};

/// libgit2 keeps asking for credentials until one works; stop after this many.
const MAX_CREDENTIAL_ATTEMPTS: usize = 4;

/// Wrapper around git2::Repository with our trait interface
///
/// Opened once per run. When the directory is not inside a work tree the
/// wrapper still exists so that [super::Repository::is_repo] can answer.
pub struct Git2Repository {
    workdir: PathBuf,
    repo: Option<Git2Repo>,
}

impl Git2Repository {
    /// Discover the repository containing `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let workdir = path.as_ref().to_path_buf();
        let repo = match Git2Repo::discover(&workdir) {
            Ok(repo) if !repo.is_bare() => Some(repo),
            Ok(_) => {
                log::debug!("{} is a bare repository", workdir.display());
                None
            }
            Err(e) => {
                log::debug!("no git repository at {}: {}", workdir.display(), e);
                None
            }
        };

        Git2Repository { workdir, repo }
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| repo.path().to_path_buf());

        Git2Repository {
            workdir,
            repo: Some(repo),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn repo(&self) -> Result<&Git2Repo> {
        self.repo.as_ref().ok_or_else(|| {
            ReleaseError::precondition(format!(
                "{} is not inside a git work tree",
                self.workdir.display()
            ))
        })
    }

    fn checkout_branch(repo: &Git2Repo, branch: &str, force: bool) -> Result<()> {
        let refname = format!("refs/heads/{}", branch);
        let target = repo.revparse_single(&refname)?;

        let mut checkout = CheckoutBuilder::new();
        if force {
            checkout.force();
        } else {
            checkout.safe();
        }

        repo.checkout_tree(&target, Some(&mut checkout))?;
        repo.set_head(&refname)?;
        Ok(())
    }

    /// Ask the remote for the tip of `branch` without fetching anything.
    fn query_remote_head(remote: &mut git2::Remote<'_>, branch: &str) -> Result<Oid> {
        let wanted = format!("refs/heads/{}", branch);
        let mut connection = remote.connect_auth(Direction::Fetch, Some(remote_callbacks()), None)?;

        let head = connection
            .remote()
            .list()?
            .iter()
            .find(|head| head.name() == wanted)
            .map(|head| head.oid());

        head.ok_or_else(|| git2::Error::from_str(&format!("remote has no branch '{}'", branch)).into())
    }

    /// Replay the commits of HEAD on top of `upstream`.
    ///
    /// On conflicts the rebase is aborted so the branch is left as it was.
    fn rebase_onto(repo: &Git2Repo, upstream: Oid) -> std::result::Result<usize, git2::Error> {
        let upstream = repo.find_annotated_commit(upstream)?;
        let signature = repo.signature()?;
        let mut rebase = repo.rebase(None, Some(&upstream), None, None)?;
        let mut replayed = 0;

        loop {
            let step = rebase.next().map(|op| op.map(|_| ()));
            match step {
                None => break,
                Some(Err(e)) => {
                    let _ = rebase.abort();
                    return Err(e);
                }
                Some(Ok(())) => {}
            }

            if repo.index()?.has_conflicts() {
                let _ = rebase.abort();
                return Err(git2::Error::from_str(
                    "conflicts while rebasing, local branch left unchanged",
                ));
            }

            match rebase.commit(None, &signature, None) {
                Ok(_) => replayed += 1,
                // Patch already present upstream
                Err(e) if e.code() == ErrorCode::Applied => {}
                Err(e) => {
                    let _ = rebase.abort();
                    return Err(e);
                }
            }
        }

        rebase.finish(Some(&signature))?;
        Ok(replayed)
    }
}

/// Credentials for fetch and push.
///
/// Supports SSH keys from ~/.ssh/, the SSH agent and git credential helpers.
fn remote_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = 0;

    callbacks.credentials(move |url, username_from_url, allowed_types| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("authentication failed"));
        }

        let username = username_from_url.unwrap_or("git");

        if allowed_types.contains(CredentialType::SSH_KEY) {
            if let Some(home) = dirs::home_dir() {
                let key = ["id_ed25519", "id_rsa", "id_ecdsa"]
                    .iter()
                    .map(|name| home.join(".ssh").join(name))
                    .filter(|path| path.exists())
                    .nth(attempts - 1);

                if let Some(path) = key {
                    return Cred::ssh_key(username, None, &path, None);
                }
            }

            return Cred::ssh_key_from_agent(username);
        }

        if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
            let config = git2::Config::open_default()?;
            return Cred::credential_helper(&config, url, username_from_url);
        }

        Cred::default()
    });

    callbacks
}

impl super::Repository for Git2Repository {
    fn is_repo(&self) -> bool {
        self.repo.is_some()
    }

    fn branch_exists(&self, name: &str) -> Result<bool> {
        match self.repo()?.find_branch(name, BranchType::Local) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        for branch in self.repo()?.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    fn current_branch(&self) -> Result<String> {
        let head = self.repo()?.head()?;

        if !head.is_branch() {
            return Err(ReleaseError::precondition("HEAD is detached"));
        }

        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| ReleaseError::precondition("HEAD branch name is not valid UTF-8"))
    }

    fn has_uncommitted_changes(&self) -> Result<bool> {
        let mut options = StatusOptions::new();
        options.include_untracked(false).include_ignored(false);

        let statuses = self.repo()?.statuses(Some(&mut options))?;
        Ok(!statuses.is_empty())
    }

    fn list_remotes(&self, filter: Option<&str>) -> Result<Vec<RemoteInfo>> {
        let repo = self.repo()?;
        let mut remotes = Vec::new();

        for name in repo.remotes()?.iter().flatten() {
            let remote = repo.find_remote(name)?;
            let fetch_url = remote.url().unwrap_or_default().to_string();
            let push_url = remote
                .pushurl()
                .map(str::to_string)
                .unwrap_or_else(|| fetch_url.clone());

            let info = RemoteInfo {
                name: name.to_string(),
                fetch_url,
                push_url,
            };

            if filter.map_or(true, |token| info.matches(token)) {
                remotes.push(info);
            }
        }

        remotes.sort();
        Ok(remotes)
    }

    fn checkout_and_rebase_pull(
        &self,
        branch: &str,
        remote_name: &str,
        dry_run: bool,
    ) -> Result<PullOutcome> {
        let repo = self.repo()?;
        let sync = |message: String| ReleaseError::Sync {
            branch: branch.to_string(),
            remote: remote_name.to_string(),
            message,
        };

        let mut remote = repo
            .find_remote(remote_name)
            .map_err(|e| sync(format!("Cannot find remote: {}", e)))?;

        let local_exists = repo.find_branch(branch, BranchType::Local).is_ok();
        if local_exists {
            Self::checkout_branch(repo, branch, false)
                .map_err(|e| sync(format!("Checkout failed: {}", e)))?;
        }

        if dry_run {
            let remote_head = Self::query_remote_head(&mut remote, branch)
                .map_err(|e| sync(format!("Cannot reach remote: {}", e)))?;
            log::debug!("dry run: {}/{} is at {}", remote_name, branch, remote_head);

            return Ok(PullOutcome::DryRun {
                remote_head: remote_head.to_string(),
            });
        }

        let refspec = format!(
            "+refs/heads/{}:refs/remotes/{}/{}",
            branch, remote_name, branch
        );
        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks());
        remote
            .fetch(&[refspec.as_str()], Some(&mut fetch_options), None)
            .map_err(|e| sync(format!("Fetch failed: {}", e)))?;

        let tracking_ref = format!("refs/remotes/{}/{}", remote_name, branch);
        let remote_oid = repo
            .refname_to_id(&tracking_ref)
            .map_err(|_| sync(format!("remote has no branch '{}'", branch)))?;

        if !local_exists {
            let commit = repo.find_commit(remote_oid)?;
            repo.branch(branch, &commit, false)?;
            Self::checkout_branch(repo, branch, false)
                .map_err(|e| sync(format!("Checkout failed: {}", e)))?;
            return Ok(PullOutcome::FastForwarded);
        }

        let local_ref = format!("refs/heads/{}", branch);
        let local_oid = repo.refname_to_id(&local_ref)?;

        if local_oid == remote_oid || repo.graph_descendant_of(local_oid, remote_oid)? {
            return Ok(PullOutcome::UpToDate);
        }

        if repo.graph_descendant_of(remote_oid, local_oid)? {
            // Update the work tree against the old HEAD before moving the ref
            let target = repo.find_object(remote_oid, None)?;
            repo.checkout_tree(&target, Some(CheckoutBuilder::new().safe()))
                .map_err(|e| sync(format!("Fast-forward failed: {}", e)))?;
            repo.find_reference(&local_ref)?.set_target(
                remote_oid,
                &format!("pull: fast-forward to {}/{}", remote_name, branch),
            )?;
            return Ok(PullOutcome::FastForwarded);
        }

        let replayed =
            Self::rebase_onto(repo, remote_oid).map_err(|e| sync(format!("Rebase failed: {}", e)))?;
        Ok(PullOutcome::Rebased(replayed))
    }

    fn create_local_branch(&self, name: &str) -> Result<()> {
        let repo = self.repo()?;
        let head = repo.head()?.peel_to_commit()?;

        repo.branch(name, &head, false)?;
        // Same commit, so moving HEAD keeps the work tree as is
        repo.set_head(&format!("refs/heads/{}", name))?;
        Ok(())
    }

    fn delete_local_branch(&self, name: &str) -> Result<()> {
        let mut branch = self.repo()?.find_branch(name, BranchType::Local)?;
        branch.delete()?;
        Ok(())
    }

    fn hard_reset_and_checkout(&self, branch: &str) -> Result<()> {
        let repo = self.repo()?;
        let head = repo.head()?.peel_to_commit()?;

        repo.reset(head.as_object(), ResetType::Hard, None)?;
        Self::checkout_branch(repo, branch, true)
    }

    fn push(&self, branch: &str, remote_name: &str) -> Result<String> {
        let repo = self.repo()?;
        let push_error = |message: String| ReleaseError::Push {
            branch: branch.to_string(),
            remote: remote_name.to_string(),
            message,
        };

        let mut remote = repo
            .find_remote(remote_name)
            .map_err(|e| push_error(format!("Cannot find remote: {}", e)))?;
        let refspec = format!("refs/heads/{}:refs/heads/{}", branch, branch);

        let mut response = String::new();
        let mut rejection: Option<String> = None;
        {
            let mut callbacks = remote_callbacks();
            callbacks.sideband_progress(|data| {
                response.push_str(&String::from_utf8_lossy(data));
                true
            });
            callbacks.push_update_reference(|refname, status| {
                if let Some(status) = status {
                    rejection = Some(format!("{} rejected: {}", refname, status));
                }
                Ok(())
            });

            let mut push_options = PushOptions::new();
            push_options.remote_callbacks(callbacks);

            remote
                .push(&[refspec.as_str()], Some(&mut push_options))
                .map_err(|e| push_error(e.to_string()))?;
        }

        if let Some(reason) = rejection {
            return Err(push_error(reason));
        }

        Ok(response.trim().to_string())
    }
}
