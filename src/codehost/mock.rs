use std::collections::HashMap;
use std::sync::Mutex;

use crate::codehost::{CodeHost, PullRequest};
use crate::error::{ReleaseError, Result};

/// Code host backed by a fixed set of pull requests
#[derive(Default)]
pub struct InMemoryCodeHost {
    pulls: HashMap<u64, PullRequest>,
    requests: Mutex<Vec<u64>>,
}

impl InMemoryCodeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pull(mut self, number: u64, title: &str, merge_commit_sha: Option<&str>) -> Self {
        self.pulls.insert(
            number,
            PullRequest {
                number,
                title: title.to_string(),
                merge_commit_sha: merge_commit_sha.map(str::to_string),
            },
        );
        self
    }

    /// Pull request numbers looked up so far, in order
    pub fn requests(&self) -> Vec<u64> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl CodeHost for InMemoryCodeHost {
    fn pull_request(&self, number: u64) -> Result<PullRequest> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(number);
        }
        self.pulls
            .get(&number)
            .cloned()
            .ok_or_else(|| ReleaseError::code_host(format!("pull request #{} not found", number)))
    }
}
