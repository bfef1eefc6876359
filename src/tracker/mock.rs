//! In-memory issue tracker for tests.
//!
//! Understands the three query shapes the workflow issues (release task by
//! summary, children linked in a status, unfinished tasks of a version) and
//! records every mutating call.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{ReleaseError, Result};
use crate::tracker::{Issue, IssueTracker, NewIssue, TrackerVersion, Transition};

#[derive(Default)]
struct State {
    issues: BTreeMap<String, Issue>,
    /// (parent, child)
    links: Vec<(String, String)>,
    /// (project, version)
    versions: Vec<(String, TrackerVersion)>,
    transitions: HashMap<String, Vec<Transition>>,
    next_id: u64,
    calls: Vec<String>,
    searches: Vec<String>,
}

#[derive(Default)]
pub struct InMemoryTracker {
    state: Mutex<State>,
    failing_links: HashSet<String>,
    failing_transitions: HashSet<String>,
}

fn quoted_values(text: &str) -> Vec<String> {
    Regex::new(r#""((?:[^"\\]|\\.)*)""#)
        .map(|re| {
            re.captures_iter(text)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().replace("\\\"", "\"").replace("\\\\", "\\"))
                .collect()
        })
        .unwrap_or_default()
}

fn clause(jql: &str, pattern: &str) -> Option<String> {
    Regex::new(pattern)
        .ok()?
        .captures(jql)?
        .get(1)
        .map(|m| m.as_str().to_string())
}

fn contains_ignore_case(values: &[String], value: &str) -> bool {
    values.iter().any(|v| v.eq_ignore_ascii_case(value))
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add an issue; the project is the key prefix.
    pub fn with_issue(self, key: &str, summary: &str, issue_type: &str, status: &str) -> Self {
        self.lock().issues.insert(
            key.to_string(),
            Issue {
                key: key.to_string(),
                summary: summary.to_string(),
                status: status.to_string(),
                issue_type: issue_type.to_string(),
                fix_versions: Vec::new(),
            },
        );
        self
    }

    pub fn with_version(self, project: &str, id: &str, name: &str, released: bool) -> Self {
        self.lock().versions.push((
            project.to_string(),
            TrackerVersion {
                id: id.to_string(),
                name: name.to_string(),
                released,
            },
        ));
        self
    }

    /// Attach an existing version to an issue's fix versions.
    pub fn with_fix_version(self, key: &str, version_id: &str) -> Self {
        {
            let mut state = self.lock();
            let version = state
                .versions
                .iter()
                .find(|(_, v)| v.id == version_id)
                .map(|(_, v)| v.clone());
            if let (Some(version), Some(issue)) = (version, state.issues.get_mut(key)) {
                issue.fix_versions.push(version);
            }
        }
        self
    }

    pub fn with_link(self, parent: &str, child: &str) -> Self {
        self.lock()
            .links
            .push((parent.to_string(), child.to_string()));
        self
    }

    pub fn with_transition(self, key: &str, id: &str, name: &str, to_status: &str) -> Self {
        self.lock()
            .transitions
            .entry(key.to_string())
            .or_default()
            .push(Transition {
                id: id.to_string(),
                name: name.to_string(),
                to_status: to_status.to_string(),
            });
        self
    }

    /// Make linking `child` fail.
    pub fn fail_link(mut self, child: &str) -> Self {
        self.failing_links.insert(child.to_string());
        self
    }

    /// Make transitioning `key` fail.
    pub fn fail_transition(mut self, key: &str) -> Self {
        self.failing_transitions.insert(key.to_string());
        self
    }

    /// Mutating calls so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Queries passed to `search_issues`, in order
    pub fn searches(&self) -> Vec<String> {
        self.lock().searches.clone()
    }

    /// Children linked to `parent`, sorted
    pub fn children_of(&self, parent: &str) -> Vec<String> {
        let mut children: Vec<String> = self
            .lock()
            .links
            .iter()
            .filter(|(p, _)| p == parent)
            .map(|(_, c)| c.clone())
            .collect();
        children.sort();
        children
    }

    pub fn status_of(&self, key: &str) -> Option<String> {
        self.lock().issues.get(key).map(|i| i.status.clone())
    }

    pub fn fix_versions_of(&self, key: &str) -> Vec<String> {
        self.lock()
            .issues
            .get(key)
            .map(|i| i.fix_versions.iter().map(|v| v.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn version(&self, name: &str) -> Option<TrackerVersion> {
        self.lock()
            .versions
            .iter()
            .find(|(_, v)| v.name == name)
            .map(|(_, v)| v.clone())
    }

    fn evaluate(state: &State, jql: &str) -> Vec<Issue> {
        let project = clause(jql, r#"project = "([^"]*)""#);
        let in_project = |issue: &Issue| match &project {
            Some(p) => issue.key.starts_with(&format!("{}-", p)),
            None => true,
        };

        if let Some(parent) = clause(jql, r#"linkedIssues\("([^"]*)""#) {
            let status = clause(jql, r#"status = "([^"]*)""#);
            return state
                .links
                .iter()
                .filter(|(p, _)| *p == parent)
                .filter_map(|(_, child)| state.issues.get(child))
                .filter(|issue| match &status {
                    Some(s) => issue.status.eq_ignore_ascii_case(s),
                    None => true,
                })
                .cloned()
                .collect();
        }

        if let Some(version) = clause(jql, r#"fixVersion = "([^"]*)""#) {
            let final_statuses = clause(jql, r"status NOT IN \(([^)]*)\)")
                .map(|list| quoted_values(&list))
                .unwrap_or_default();
            let skipped_types = clause(jql, r"type NOT IN \(([^)]*)\)")
                .map(|list| quoted_values(&list))
                .unwrap_or_default();
            return state
                .issues
                .values()
                .filter(|issue| in_project(issue))
                .filter(|issue| {
                    issue
                        .fix_versions
                        .iter()
                        .any(|v| v.name == version && !v.released)
                })
                .filter(|issue| !contains_ignore_case(&final_statuses, &issue.status))
                .filter(|issue| !contains_ignore_case(&skipped_types, &issue.issue_type))
                .cloned()
                .collect();
        }

        let summary = clause(jql, r#"summary ~ "((?:[^"\\]|\\.)*)""#)
            .map(|s| s.replace("\\\"", "\"").to_lowercase());
        let issue_type = clause(jql, r#"type = "([^"]*)""#);
        state
            .issues
            .values()
            .filter(|issue| in_project(issue))
            .filter(|issue| match &summary {
                Some(text) => issue.summary.to_lowercase().contains(text.as_str()),
                None => true,
            })
            .filter(|issue| match &issue_type {
                Some(t) => issue.issue_type.eq_ignore_ascii_case(t),
                None => true,
            })
            .cloned()
            .collect()
    }
}

fn not_found(key: &str) -> ReleaseError {
    ReleaseError::tracker(format!("issue {} does not exist", key))
}

impl IssueTracker for InMemoryTracker {
    fn search_issues(&self, jql: &str) -> Result<Vec<Issue>> {
        let mut state = self.lock();
        state.searches.push(jql.to_string());
        Ok(Self::evaluate(&state, jql))
    }

    fn issue(&self, key: &str) -> Result<Issue> {
        self.lock().issues.get(key).cloned().ok_or_else(|| not_found(key))
    }

    fn create_issue(&self, issue: &NewIssue) -> Result<String> {
        let mut state = self.lock();
        state.next_id += 1;
        let key = format!("{}-{}", issue.project, 100 + state.next_id);
        state.calls.push(format!("create-issue {} \"{}\"", key, issue.summary));
        state.issues.insert(
            key.clone(),
            Issue {
                key: key.clone(),
                summary: issue.summary.clone(),
                status: "Open".to_string(),
                issue_type: issue.issue_type.clone(),
                fix_versions: Vec::new(),
            },
        );
        Ok(key)
    }

    fn create_issue_link(&self, _link_type: &str, parent: &str, child: &str) -> Result<()> {
        if self.failing_links.contains(child) {
            return Err(ReleaseError::tracker(format!("cannot link {}", child)));
        }
        let mut state = self.lock();
        state.calls.push(format!("link {} -> {}", parent, child));
        if !state.links.iter().any(|(p, c)| p == parent && c == child) {
            state.links.push((parent.to_string(), child.to_string()));
        }
        Ok(())
    }

    fn project_versions(&self, project: &str) -> Result<Vec<TrackerVersion>> {
        Ok(self
            .lock()
            .versions
            .iter()
            .filter(|(p, _)| p == project)
            .map(|(_, v)| v.clone())
            .collect())
    }

    fn create_version(
        &self,
        project: &str,
        name: &str,
        start_date: NaiveDate,
    ) -> Result<TrackerVersion> {
        let mut state = self.lock();
        state.next_id += 1;
        let version = TrackerVersion {
            id: format!("v{}", state.next_id),
            name: name.to_string(),
            released: false,
        };
        state
            .calls
            .push(format!("create-version {} {}", name, start_date));
        state.versions.push((project.to_string(), version.clone()));
        Ok(version)
    }

    fn add_fix_version(&self, key: &str, version: &TrackerVersion) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(format!("fix-version {} {}", key, version.name));
        let issue = state.issues.get_mut(key).ok_or_else(|| not_found(key))?;
        if !issue.fix_versions.iter().any(|v| v.id == version.id) {
            issue.fix_versions.push(version.clone());
        }
        Ok(())
    }

    fn release_version(&self, version: &TrackerVersion, release_date: NaiveDate) -> Result<()> {
        let mut state = self.lock();
        state
            .calls
            .push(format!("release-version {} {}", version.name, release_date));
        for (_, v) in state.versions.iter_mut().filter(|(_, v)| v.id == version.id) {
            v.released = true;
        }
        for issue in state.issues.values_mut() {
            for v in issue.fix_versions.iter_mut().filter(|v| v.id == version.id) {
                v.released = true;
            }
        }
        Ok(())
    }

    fn transitions(&self, key: &str) -> Result<Vec<Transition>> {
        Ok(self.lock().transitions.get(key).cloned().unwrap_or_default())
    }

    fn transition_issue(&self, key: &str, transition_id: &str) -> Result<()> {
        if self.failing_transitions.contains(key) {
            return Err(ReleaseError::tracker(format!("cannot transition {}", key)));
        }
        let mut state = self.lock();
        let target = state
            .transitions
            .get(key)
            .and_then(|ts| ts.iter().find(|t| t.id == transition_id))
            .map(|t| t.to_status.clone())
            .ok_or_else(|| {
                ReleaseError::tracker(format!("{} has no transition {}", key, transition_id))
            })?;
        state.calls.push(format!("transition {} {}", key, target));
        let issue = state.issues.get_mut(key).ok_or_else(|| not_found(key))?;
        issue.status = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_search_is_fuzzy_and_scoped() {
        let tracker = InMemoryTracker::new()
            .with_issue("PROJ-1", "Backend release 1.3.0", "Task", "Open")
            .with_issue("PROJ-2", "Backend release 1.3.0 follow-up", "Task", "Open")
            .with_issue("PROJ-3", "Backend release 1.3.0", "Bug", "Open")
            .with_issue("OTHER-1", "Backend release 1.3.0", "Task", "Open");

        let found = tracker
            .search_issues(
                r#"project = "PROJ" AND summary ~ "backend release 1.3.0" AND type = "Task""#,
            )
            .unwrap();
        let keys: Vec<&str> = found.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["PROJ-1", "PROJ-2"]);
    }

    #[test]
    fn test_linked_issue_search_filters_status() {
        let tracker = InMemoryTracker::new()
            .with_issue("PROJ-1", "release", "Task", "Open")
            .with_issue("PROJ-2", "a", "Task", "To Deploy")
            .with_issue("PROJ-3", "b", "Task", "In Progress")
            .with_link("PROJ-1", "PROJ-2")
            .with_link("PROJ-1", "PROJ-3");

        let found = tracker
            .search_issues(
                r#"issue in linkedIssues("PROJ-1", "parent of") AND status = "To Deploy""#,
            )
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, "PROJ-2");
    }

    #[test]
    fn test_transition_moves_status() {
        let tracker = InMemoryTracker::new()
            .with_issue("PROJ-2", "a", "Task", "To Deploy")
            .with_transition("PROJ-2", "31", "Done", "Done");

        tracker.transition_issue("PROJ-2", "31").unwrap();
        assert_eq!(tracker.status_of("PROJ-2").as_deref(), Some("Done"));
        assert_eq!(tracker.calls(), vec!["transition PROJ-2 Done"]);
    }
}
