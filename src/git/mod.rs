//! Version control abstraction layer
//!
//! This module provides a trait-based abstraction over the version control
//! operations the release workflow issues, so the workflow can run against a
//! real working copy or against a recording test double.
//!
//! - [repository::GitRepo]: the real implementation (`git2` plus the `git` CLI)
//! - [mock::MockRepository]: records every operation for ordering assertions
//!
//! Revisions passed to these operations are plain git revisions; remote
//! tracking refs are spelled `<remote>/<branch>` (see [crate::domain::remote_ref]).

pub mod mock;
pub mod repository;

pub use mock::{MockRepository, OperationLog};
pub use repository::GitRepo;

use crate::error::Result;

/// Named version control operations against the local working copy and its
/// configured remote.
///
/// Every mutating method is a single external step; any failure is returned as
/// an error and is fatal for the run.
pub trait Repository {
    /// Uncommitted or untracked changes, one line per path, empty when clean
    fn local_changes(&self) -> Result<Vec<String>>;

    /// URL of the configured remote
    fn remote_url(&self) -> Result<String>;

    /// Fetch all branches and tags from the remote
    fn fetch(&self) -> Result<()>;

    /// Create and check out `branch` at `start_point` without upstream tracking
    fn create_branch(&self, branch: &str, start_point: &str) -> Result<()>;

    fn checkout(&self, branch: &str) -> Result<()>;

    /// Reset the current branch and working tree to `target`, discarding drift
    fn hard_reset(&self, target: &str) -> Result<()>;

    /// Commit all tracked changes, creating a commit even when nothing changed
    fn commit_all(&self, message: &str) -> Result<()>;

    /// Push a local branch and set its upstream
    fn push_branch(&self, branch: &str) -> Result<()>;

    /// Create a lightweight tag at `target`
    fn create_tag(&self, tag: &str, target: &str) -> Result<()>;

    fn push_tag(&self, tag: &str) -> Result<()>;

    /// Merge `source` into the current branch with an explicit merge commit
    fn merge(&self, source: &str, message: &str) -> Result<()>;

    /// Cherry-pick a commit onto the current branch, conflicts are errors
    fn cherry_pick(&self, sha: &str) -> Result<()>;

    fn delete_remote_branch(&self, branch: &str) -> Result<()>;

    /// Full commit messages reachable from `head` but not from `base`
    fn commit_messages(&self, base: &str, head: &str) -> Result<Vec<String>>;
}
