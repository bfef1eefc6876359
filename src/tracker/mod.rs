//! Issue tracker access and the release bookkeeping built on top of it
//!
//! - [IssueTracker]: the capability the workflow needs from the tracker
//! - [jira::JiraClient]: Jira REST implementation
//! - [mock::InMemoryTracker]: in-memory implementation for tests
//! - [linkage::IssueLinkage]: release task, child links and fix versions
//! - [transition::StatusTransition]: status changes when a release is finished

pub mod jira;
pub mod linkage;
pub mod mock;
pub mod transition;

pub use jira::JiraClient;
pub use linkage::{IssueLinkage, LinkReport, ReleaseTaskLookup};
pub use mock::InMemoryTracker;
pub use transition::{StatusTransition, TransitionReport};

use chrono::NaiveDate;

use crate::error::Result;

/// Tracker "version": a group of issues shipped together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerVersion {
    pub id: String,
    pub name: String,
    pub released: bool,
}

/// Issue fields the workflow reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub issue_type: String,
    pub fix_versions: Vec<TrackerVersion>,
}

/// Fields of an issue to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub project: String,
    pub summary: String,
    pub issue_type: String,
    pub component: Option<String>,
}

/// Workflow transition available on an issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub id: String,
    pub name: String,
    /// Status the transition leads to
    pub to_status: String,
}

impl Transition {
    /// Whether this transition leads to `status` (by transition or status name)
    pub fn leads_to(&self, status: &str) -> bool {
        self.name.eq_ignore_ascii_case(status) || self.to_status.eq_ignore_ascii_case(status)
    }
}

/// Issue tracker capability.
///
/// Implementations must tolerate concurrent calls touching distinct issues;
/// child links are created from a worker pool.
pub trait IssueTracker: Send + Sync {
    fn search_issues(&self, jql: &str) -> Result<Vec<Issue>>;

    fn issue(&self, key: &str) -> Result<Issue>;

    /// Create an issue and return its key
    fn create_issue(&self, issue: &NewIssue) -> Result<String>;

    /// Link `parent` to `child` with `link_type` (a type name or one of its
    /// descriptions, e.g. "parent of")
    fn create_issue_link(&self, link_type: &str, parent: &str, child: &str) -> Result<()>;

    fn project_versions(&self, project: &str) -> Result<Vec<TrackerVersion>>;

    fn create_version(
        &self,
        project: &str,
        name: &str,
        start_date: NaiveDate,
    ) -> Result<TrackerVersion>;

    /// Add `version` to the issue's fix versions, keeping existing ones
    fn add_fix_version(&self, key: &str, version: &TrackerVersion) -> Result<()>;

    fn release_version(&self, version: &TrackerVersion, release_date: NaiveDate) -> Result<()>;

    fn transitions(&self, key: &str) -> Result<Vec<Transition>>;

    fn transition_issue(&self, key: &str, transition_id: &str) -> Result<()>;
}

/// Quote a value for use inside a JQL string literal
pub fn jql_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Quote and comma-join values for a JQL `IN (...)` list
pub fn jql_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| jql_quote(v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Today's date in local time
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jql_quote_escapes() {
        assert_eq!(jql_quote("Backend release 1.3.0"), "\"Backend release 1.3.0\"");
        assert_eq!(jql_quote("say \"hi\""), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_jql_list() {
        let values = vec!["Done".to_string(), "Closed".to_string()];
        assert_eq!(jql_list(&values), "\"Done\", \"Closed\"");
    }

    #[test]
    fn test_transition_leads_to() {
        let transition = Transition {
            id: "31".to_string(),
            name: "Deploy".to_string(),
            to_status: "Done".to_string(),
        };
        assert!(transition.leads_to("done"));
        assert!(transition.leads_to("DEPLOY"));
        assert!(!transition.leads_to("Closed"));
    }
}
