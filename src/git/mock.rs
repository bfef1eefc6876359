use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::error::{ReleaseError, Result};
use crate::git::Repository;

/// Ordered record of external operations, shareable between test doubles
pub type OperationLog = Arc<Mutex<Vec<String>>>;

/// Snapshot of the operations recorded so far
pub fn recorded(log: &OperationLog) -> Vec<String> {
    log.lock().map(|ops| ops.clone()).unwrap_or_default()
}

/// Mock repository for testing without actual git operations
///
/// Records every operation as a short line (`"fetch"`, `"cherry-pick abc123"`,
/// ...) and fails the first operation whose name was registered with
/// [MockRepository::fail_on].
pub struct MockRepository {
    log: OperationLog,
    changes: Vec<String>,
    remote_url: String,
    messages: Vec<String>,
    failing: HashSet<String>,
}

impl MockRepository {
    /// Create a new clean mock repository writing to `log`
    pub fn new(log: OperationLog) -> Self {
        MockRepository {
            log,
            changes: Vec::new(),
            remote_url: "git@github.com:acme/shop.git".to_string(),
            messages: Vec::new(),
            failing: HashSet::new(),
        }
    }

    /// Pretend the working tree has uncommitted changes
    pub fn with_changes(mut self, changes: &[&str]) -> Self {
        self.changes = changes.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Commit messages returned by `commit_messages`
    pub fn with_commit_messages(mut self, messages: &[&str]) -> Self {
        self.messages = messages.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_remote_url(mut self, url: &str) -> Self {
        self.remote_url = url.to_string();
        self
    }

    /// Make the named operation (e.g. `"cherry-pick"`) fail
    pub fn fail_on(mut self, operation: &str) -> Self {
        self.failing.insert(operation.to_string());
        self
    }

    fn record(&self, operation: &str, detail: String) -> Result<()> {
        let line = if detail.is_empty() {
            operation.to_string()
        } else {
            format!("{} {}", operation, detail)
        };

        if let Ok(mut ops) = self.log.lock() {
            ops.push(line.clone());
        }

        if self.failing.contains(operation) {
            return Err(ReleaseError::ExternalCommandFailed {
                command: line,
                code: 1,
                output: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

impl Repository for MockRepository {
    fn local_changes(&self) -> Result<Vec<String>> {
        Ok(self.changes.clone())
    }

    fn remote_url(&self) -> Result<String> {
        Ok(self.remote_url.clone())
    }

    fn fetch(&self) -> Result<()> {
        self.record("fetch", String::new())
    }

    fn create_branch(&self, branch: &str, start_point: &str) -> Result<()> {
        self.record("create-branch", format!("{} from {}", branch, start_point))
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        self.record("checkout", branch.to_string())
    }

    fn hard_reset(&self, target: &str) -> Result<()> {
        self.record("hard-reset", target.to_string())
    }

    fn commit_all(&self, message: &str) -> Result<()> {
        self.record("commit", message.to_string())
    }

    fn push_branch(&self, branch: &str) -> Result<()> {
        self.record("push", branch.to_string())
    }

    fn create_tag(&self, tag: &str, target: &str) -> Result<()> {
        self.record("tag", format!("{} at {}", tag, target))
    }

    fn push_tag(&self, tag: &str) -> Result<()> {
        self.record("push-tag", tag.to_string())
    }

    fn merge(&self, source: &str, _message: &str) -> Result<()> {
        self.record("merge", source.to_string())
    }

    fn cherry_pick(&self, sha: &str) -> Result<()> {
        self.record("cherry-pick", sha.to_string())
    }

    fn delete_remote_branch(&self, branch: &str) -> Result<()> {
        self.record("delete-remote-branch", branch.to_string())
    }

    fn commit_messages(&self, base: &str, head: &str) -> Result<Vec<String>> {
        self.record("log", format!("{}..{}", base, head))?;
        Ok(self.messages.clone())
    }
}
