use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

use crate::codehost::CodeHost;
use crate::config::GitConfig;
use crate::domain::{pull_request_reference, remote_ref, TaskKey, TaskPattern};
use crate::error::Result;
use crate::git::Repository;
use crate::ui;

/// Tasks and pull requests included in a release branch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationResult {
    /// Sorted, deduplicated task keys
    pub tasks: Vec<TaskKey>,
    /// Sorted pull request numbers no task key could be derived for
    pub unresolved_pull_requests: Vec<u64>,
}

/// Finds the tasks a release branch contains by scanning its commit log.
///
/// Only lines referencing a pull request (`#<digits>`) are considered. A task
/// key on the line itself wins; otherwise the pull request title is searched.
pub struct RelationDiscovery<'a> {
    repo: &'a dyn Repository,
    code_host: &'a dyn CodeHost,
    pattern: &'a TaskPattern,
    git: &'a GitConfig,
    titles: RefCell<HashMap<u64, Vec<TaskKey>>>,
}

impl<'a> RelationDiscovery<'a> {
    pub fn new(
        repo: &'a dyn Repository,
        code_host: &'a dyn CodeHost,
        pattern: &'a TaskPattern,
        git: &'a GitConfig,
    ) -> Self {
        RelationDiscovery {
            repo,
            code_host,
            pattern,
            git,
            titles: RefCell::new(HashMap::new()),
        }
    }

    /// Scan `origin/<master>..origin/<release_branch>`.
    pub fn discover(&self, release_branch: &str) -> Result<RelationResult> {
        ui::display_title(&format!("Searching for tasks in {}", release_branch));

        self.repo.fetch()?;
        let base = remote_ref(&self.git.remote, &self.git.master);
        let head = remote_ref(&self.git.remote, release_branch);
        let messages = self.repo.commit_messages(&base, &head)?;

        let lines: Vec<&str> = messages.iter().flat_map(|m| m.lines()).collect();
        self.scan(&lines)
    }

    /// Apply the discovery rules to individual commit message lines.
    pub fn scan(&self, lines: &[&str]) -> Result<RelationResult> {
        let mut tasks = BTreeSet::new();
        let mut unresolved = BTreeSet::new();

        for line in lines {
            let Some(number) = pull_request_reference(line) else {
                continue;
            };

            let mut keys = self.pattern.find_keys(line);
            if keys.is_empty() {
                keys = self.title_keys(number)?;
            }

            if keys.is_empty() {
                unresolved.insert(number);
            } else {
                tasks.extend(keys);
            }
        }

        tracing::debug!(
            tasks = tasks.len(),
            unresolved = unresolved.len(),
            "relation discovery done"
        );

        Ok(RelationResult {
            tasks: tasks.into_iter().collect(),
            unresolved_pull_requests: unresolved.into_iter().collect(),
        })
    }

    /// Task keys in a pull request title, looked up once per number
    fn title_keys(&self, number: u64) -> Result<Vec<TaskKey>> {
        if let Some(keys) = self.titles.borrow().get(&number) {
            return Ok(keys.clone());
        }

        let pull = self.code_host.pull_request(number)?;
        let keys = self.pattern.find_keys(&pull.title);
        tracing::debug!(number, title = %pull.title, found = keys.len(), "pull request title");

        self.titles.borrow_mut().insert(number, keys.clone());
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codehost::InMemoryCodeHost;
    use crate::git::mock::recorded;
    use crate::git::{MockRepository, OperationLog};

    fn pattern() -> TaskPattern {
        TaskPattern::new(r"PROJ-\d+").unwrap()
    }

    fn keys(result: &RelationResult) -> Vec<&str> {
        result.tasks.iter().map(TaskKey::as_str).collect()
    }

    #[test]
    fn test_lines_without_pull_request_are_ignored() {
        let log = OperationLog::default();
        let repo = MockRepository::new(log.clone())
            .with_commit_messages(&["PROJ-9 fix bug (#41)", "misc cleanup"]);
        let host = InMemoryCodeHost::new();
        let pattern = pattern();
        let git = GitConfig::default();

        let result = RelationDiscovery::new(&repo, &host, &pattern, &git)
            .discover("release-1.3.0")
            .unwrap();

        assert_eq!(keys(&result), vec!["PROJ-9"]);
        assert!(result.unresolved_pull_requests.is_empty());
        assert!(host.requests().is_empty());
        assert_eq!(
            recorded(&log),
            vec!["fetch", "log origin/master..origin/release-1.3.0"]
        );
    }

    #[test]
    fn test_keys_are_uppercased_and_deduplicated() {
        let host = InMemoryCodeHost::new();
        let pattern = pattern();
        let git = GitConfig::default();
        let repo = MockRepository::new(OperationLog::default());
        let discovery = RelationDiscovery::new(&repo, &host, &pattern, &git);

        let result = discovery
            .scan(&[
                "PROJ-12 did X (#5)",
                "proj-12 did X again",
                "proj-3 small fix (#6)",
                "Merge PROJ-12 follow-up (#7)",
            ])
            .unwrap();

        assert_eq!(keys(&result), vec!["PROJ-12", "PROJ-3"]);
    }

    #[test]
    fn test_pull_request_title_resolves_missing_key() {
        let host = InMemoryCodeHost::new()
            .with_pull(41, "PROJ-77: checkout page", None)
            .with_pull(42, "Bump dependencies", None);
        let pattern = pattern();
        let git = GitConfig::default();
        let repo = MockRepository::new(OperationLog::default());
        let discovery = RelationDiscovery::new(&repo, &host, &pattern, &git);

        let result = discovery
            .scan(&[
                "Merge pull request #41 from acme/feature",
                "Merge pull request #42 from acme/deps",
                "Revert \"Merge pull request #41\"",
            ])
            .unwrap();

        assert_eq!(keys(&result), vec!["PROJ-77"]);
        assert_eq!(result.unresolved_pull_requests, vec![42]);
        assert_eq!(host.requests(), vec![41, 42]);
    }

    #[test]
    fn test_multiline_messages_are_split() {
        let log = OperationLog::default();
        let repo = MockRepository::new(log)
            .with_commit_messages(&["Merge pull request #8 from acme/x\n\nPROJ-5 add search"]);
        let host = InMemoryCodeHost::new().with_pull(8, "no key here", None);
        let pattern = pattern();
        let git = GitConfig::default();

        let result = RelationDiscovery::new(&repo, &host, &pattern, &git)
            .discover("release-1.3.0")
            .unwrap();

        assert!(result.tasks.is_empty());
        assert_eq!(result.unresolved_pull_requests, vec![8]);
    }

    #[test]
    fn test_unknown_pull_request_is_an_error() {
        let host = InMemoryCodeHost::new();
        let pattern = pattern();
        let git = GitConfig::default();
        let repo = MockRepository::new(OperationLog::default());
        let discovery = RelationDiscovery::new(&repo, &host, &pattern, &git);

        assert!(discovery.scan(&["Merge pull request #99"]).is_err());
    }
}
