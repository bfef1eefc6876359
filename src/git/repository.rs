use git2::{BranchType, Cred, CredentialType, FetchOptions, PushOptions, RemoteCallbacks};
use git2::{Repository as Git2Repo, Status, StatusOptions};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use crate::hooks::executor::run_command;
use crate::ui;

const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// Working copy wrapper.
///
/// Reads (status, remote URL, history) and network operations go through
/// `git2`; operations that rewrite the working tree (checkout, reset, commit,
/// merge, cherry-pick) run the `git` CLI so hooks and merge drivers behave
/// exactly as they do for the operator.
pub struct GitRepo {
    repo: Git2Repo,
    workdir: PathBuf,
    remote: String,
}

impl GitRepo {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P, remote: impl Into<String>) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| ReleaseError::config("Bare repositories are not supported"))?
            .to_path_buf();

        Ok(GitRepo {
            repo,
            workdir,
            remote: remote.into(),
        })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.workdir);
        run_command(&mut cmd, &format!("git {}", args.join(" ")))
    }

    fn find_remote(&self) -> Result<git2::Remote<'_>> {
        self.repo.find_remote(&self.remote).map_err(|e| {
            ReleaseError::config(format!("Remote '{}' not found: {}", self.remote, e))
        })
    }

    fn push_refspec(&self, refspec: &str, display: &str) -> Result<()> {
        ui::display_command(display);
        tracing::debug!(refspec, remote = %self.remote, "pushing");

        let mut remote = self.find_remote()?;
        let mut callbacks = remote_callbacks();
        callbacks.push_update_reference(|refname, status| match status {
            Some(message) => Err(git2::Error::from_str(&format!(
                "remote rejected {}: {}",
                refname, message
            ))),
            None => Ok(()),
        });

        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);

        remote
            .push(&[refspec], Some(&mut options))
            .map_err(|e| ReleaseError::ExternalCommandFailed {
                command: display.to_string(),
                code: e.raw_code(),
                output: e.message().to_string(),
            })
    }

    fn resolve_commit(&self, revision: &str) -> Result<git2::Oid> {
        let object = self.repo.revparse_single(revision).map_err(|e| {
            ReleaseError::config(format!("Cannot resolve revision '{}': {}", revision, e))
        })?;
        Ok(object.peel_to_commit()?.id())
    }
}

/// Credential callbacks for fetch and push.
///
/// Tries SSH keys from ~/.ssh, then the SSH agent, then the configured git
/// credential helper, then default credentials.
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
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let path = home.join(".ssh").join(key);
                    if path.exists() {
                        if let Ok(cred) = Cred::ssh_key(username, None, &path, None) {
                            return Ok(cred);
                        }
                    }
                }
            }

            if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }
        }

        if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
            if let Ok(config) = git2::Config::open_default() {
                if let Ok(cred) = Cred::credential_helper(&config, url, username_from_url) {
                    return Ok(cred);
                }
            }
        }

        Cred::default()
    });

    callbacks
}

fn status_code(status: Status) -> &'static str {
    if status.is_conflicted() {
        "UU"
    } else if status.is_wt_new() {
        "??"
    } else if status.is_index_new() {
        "A "
    } else if status.is_index_deleted() || status.is_wt_deleted() {
        " D"
    } else if status.is_index_renamed() || status.is_wt_renamed() {
        " R"
    } else {
        " M"
    }
}

impl Repository for GitRepo {
    fn local_changes(&self) -> Result<Vec<String>> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut options))?;
        Ok(statuses
            .iter()
            .filter(|entry| !entry.status().is_ignored())
            .map(|entry| {
                format!(
                    "{} {}",
                    status_code(entry.status()),
                    entry.path().unwrap_or("(non-utf8 path)")
                )
            })
            .collect())
    }

    fn remote_url(&self) -> Result<String> {
        let remote = self.find_remote()?;
        remote
            .url()
            .map(str::to_string)
            .ok_or_else(|| ReleaseError::config(format!("Remote '{}' has no URL", self.remote)))
    }

    fn fetch(&self) -> Result<()> {
        let display = format!("git fetch {}", self.remote);
        ui::display_command(&display);

        let mut remote = self.find_remote()?;
        let mut options = FetchOptions::new();
        options.remote_callbacks(remote_callbacks());

        // All branches into remote-tracking refs, plus tags.
        let refspec_heads = format!("+refs/heads/*:refs/remotes/{}/*", self.remote);
        let refspecs = [refspec_heads.as_str(), "+refs/tags/*:refs/tags/*"];
        remote
            .fetch(&refspecs, Some(&mut options), None)
            .map_err(|e| ReleaseError::ExternalCommandFailed {
                command: display,
                code: e.raw_code(),
                output: e.message().to_string(),
            })
    }

    fn create_branch(&self, branch: &str, start_point: &str) -> Result<()> {
        self.git(&["checkout", "-q", "-b", branch, "--no-track", start_point])
            .map(drop)
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        self.git(&["checkout", "-q", branch]).map(drop)
    }

    fn hard_reset(&self, target: &str) -> Result<()> {
        self.git(&["reset", "-q", "--hard", target]).map(drop)
    }

    fn commit_all(&self, message: &str) -> Result<()> {
        self.git(&["commit", "-q", "--allow-empty", "-am", message])
            .map(drop)
    }

    fn push_branch(&self, branch: &str) -> Result<()> {
        let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);
        self.push_refspec(&refspec, &format!("git push -u {} {}", self.remote, branch))?;

        let mut local = self.repo.find_branch(branch, BranchType::Local)?;
        let upstream = format!("{}/{}", self.remote, branch);
        local.set_upstream(Some(upstream.as_str()))?;
        Ok(())
    }

    fn create_tag(&self, tag: &str, target: &str) -> Result<()> {
        ui::display_command(&format!("git tag {} {}", tag, target));

        let oid = self.resolve_commit(target)?;
        let object = self.repo.find_object(oid, None)?;
        self.repo.tag_lightweight(tag, &object, false)?;
        Ok(())
    }

    fn push_tag(&self, tag: &str) -> Result<()> {
        let refspec = format!("refs/tags/{0}:refs/tags/{0}", tag);
        self.push_refspec(&refspec, &format!("git push {} {}", self.remote, tag))
    }

    fn merge(&self, source: &str, message: &str) -> Result<()> {
        self.git(&["merge", "-q", "--commit", "--no-ff", source, "-m", message])
            .map(drop)
    }

    fn cherry_pick(&self, sha: &str) -> Result<()> {
        self.git(&["cherry-pick", sha]).map(drop)
    }

    fn delete_remote_branch(&self, branch: &str) -> Result<()> {
        let refspec = format!(":refs/heads/{}", branch);
        self.push_refspec(&refspec, &format!("git push {} :{}", self.remote, branch))
    }

    fn commit_messages(&self, base: &str, head: &str) -> Result<Vec<String>> {
        let head_oid = self.resolve_commit(head)?;
        let base_oid = self.resolve_commit(base)?;

        let mut revwalk = self.repo.revwalk()?;
        revwalk.push(head_oid)?;
        revwalk.hide(base_oid)?;

        let mut messages = Vec::new();
        for oid_result in revwalk {
            let commit = self.repo.find_commit(oid_result?)?;
            messages.push(commit.message().unwrap_or_default().to_string());
        }

        tracing::debug!(base, head, count = messages.len(), "collected commit messages");
        Ok(messages)
    }
}
