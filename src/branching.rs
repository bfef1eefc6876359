//! Release and hotfix branch lifecycle
//!
//! One [BranchWorkflow] exists per release cycle. Every step is a single
//! version control operation and the first failure aborts the sequence; no
//! rollback is attempted, already pushed refs stay where they are.

use semver::Version;

use crate::config::GitConfig;
use crate::domain::{remote_ref, BranchTemplate};
use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use crate::hooks::{HookContext, HookRunner};
use crate::ui;

/// Lifecycle of the release branch handled by this run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchState {
    /// Not created by this run (it may already exist on the remote)
    None,
    Created,
    Merged,
    /// Creation started but failed part way
    Abandoned,
}

pub struct BranchWorkflow<'a> {
    repo: &'a dyn Repository,
    hooks: &'a dyn HookRunner,
    git: &'a GitConfig,
    version: Version,
    branch: String,
    state: BranchState,
}

impl<'a> BranchWorkflow<'a> {
    pub fn new(
        repo: &'a dyn Repository,
        hooks: &'a dyn HookRunner,
        git: &'a GitConfig,
        version: Version,
    ) -> Result<Self> {
        let branch = BranchTemplate::new(git.release_name.as_str())?.format(&version);
        Ok(BranchWorkflow {
            repo,
            hooks,
            git,
            version,
            branch,
            state: BranchState::None,
        })
    }

    pub fn branch_name(&self) -> &str {
        &self.branch
    }

    pub fn state(&self) -> BranchState {
        self.state
    }

    fn remote(&self, branch: &str) -> String {
        remote_ref(&self.git.remote, branch)
    }

    fn expect_state(&self, allowed: &[BranchState], action: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ReleaseError::branch_state(format!(
                "cannot {} {} while it is {:?}",
                action, self.branch, self.state
            )))
        }
    }

    /// Cut the release branch from `source`, set the version and push it.
    ///
    /// The caller checks the working tree is clean beforehand.
    pub fn create_release_branch(&mut self, source: &str, release_set: &str) -> Result<()> {
        self.create_from(source, &[], release_set, "Make release branch")
    }

    /// Cut a hotfix branch from the stable branch and cherry-pick `commit_shas`
    /// onto it in order. A conflicting cherry-pick aborts the run.
    pub fn create_hotfix_branch(
        &mut self,
        commit_shas: &[String],
        release_set: &str,
    ) -> Result<()> {
        let git = self.git;
        self.create_from(&git.master, commit_shas, release_set, "Make hotfix branch")
    }

    fn create_from(
        &mut self,
        source: &str,
        commit_shas: &[String],
        release_set: &str,
        title: &str,
    ) -> Result<()> {
        self.expect_state(&[BranchState::None], "create")?;
        ui::display_title(&format!("Running suite: {}", title));

        let result = self.run_creation(source, commit_shas, release_set);
        self.state = match result {
            Ok(()) => BranchState::Created,
            Err(_) => BranchState::Abandoned,
        };

        if result.is_ok() {
            ui::display_success(&format!("Created branch {}", self.branch));
        }
        result
    }

    fn run_creation(&self, source: &str, commit_shas: &[String], release_set: &str) -> Result<()> {
        self.repo.fetch()?;
        self.repo.create_branch(&self.branch, &self.remote(source))?;
        for sha in commit_shas {
            self.repo.cherry_pick(sha)?;
        }
        self.hooks
            .run(release_set, &HookContext::set_version(&self.version))?;
        // Allow-empty so the branch always carries its own release commit.
        self.repo.commit_all(&format!("Release {}", self.version))?;
        self.repo.push_branch(&self.branch)?;
        Ok(())
    }

    /// Tag the release branch tip, merge it into stable and delete it.
    ///
    /// The tag is created and pushed before the merge so it always marks the
    /// released commit, even when the merge itself fails.
    pub fn merge_release_to_stable(&mut self) -> Result<()> {
        self.expect_state(&[BranchState::None, BranchState::Created], "merge")?;

        let tag = self.version.to_string();
        let release_ref = self.remote(&self.branch);

        ui::display_title("Running suite: Create tag");
        self.repo.fetch()?;
        self.repo.create_tag(&tag, &release_ref)?;
        self.repo.push_tag(&tag)?;

        ui::display_title("Running suite: Merge release to master");
        self.merge_into(&release_ref, &self.git.master)?;
        self.repo.delete_remote_branch(&self.branch)?;

        self.state = BranchState::Merged;
        ui::display_success(&format!("Merged {} into {}", self.branch, self.git.master));
        Ok(())
    }

    /// Merge the stable branch back into the integration branch.
    pub fn merge_stable_to_develop(&self) -> Result<()> {
        ui::display_title("Running suite: Merge master to develop");
        self.repo.fetch()?;
        self.merge_into(&self.remote(&self.git.master), &self.git.base)?;
        ui::display_success(&format!("Merged {} into {}", self.git.master, self.git.base));
        Ok(())
    }

    /// Checkout `target`, reset it to its remote state, merge `source` with a
    /// merge commit and push.
    fn merge_into(&self, source: &str, target: &str) -> Result<()> {
        self.repo.checkout(target)?;
        self.repo.hard_reset(&self.remote(target))?;
        self.repo.merge(source, &format!("Merge {}", source))?;
        self.repo.push_branch(target)?;
        Ok(())
    }
}
