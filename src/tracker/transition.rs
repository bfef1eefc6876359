//! Status changes applied once a release is deployed.
//!
//! Every transition is guarded by the issue's current status; an issue in
//! any other status, or without a matching transition, is left untouched
//! and reported.

use crate::config::{JiraConfig, TransitionConfig};
use crate::diagnostics::Diagnostic;
use crate::domain::TaskKey;
use crate::error::Result;
use crate::tracker::{jql_quote, IssueTracker};
use crate::ui;

/// Outcome of a status transition pass
#[derive(Debug, Default, PartialEq)]
pub struct TransitionReport {
    pub transitioned: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl TransitionReport {
    fn skip(&mut self, diagnostic: Diagnostic) {
        ui::display_diagnostic(&diagnostic);
        self.diagnostics.push(diagnostic);
    }
}

pub struct StatusTransition<'a> {
    tracker: &'a dyn IssueTracker,
    transition: &'a TransitionConfig,
    link_type: &'a str,
}

impl<'a> StatusTransition<'a> {
    pub fn new(tracker: &'a dyn IssueTracker, jira: &'a JiraConfig) -> Self {
        StatusTransition {
            tracker,
            transition: &jira.transition,
            link_type: &jira.release_task.link_type,
        }
    }

    /// Move the release task from the release "from" status to the release
    /// "to" status.
    pub fn mark_release_task_done(&self, key: &TaskKey) -> Result<TransitionReport> {
        let from = &self.transition.release_from_status;
        let to = &self.transition.release_to_status;
        ui::display_title(&format!(
            "Transition release task \"{}\" from \"{}\" to \"{}\"",
            key, from, to
        ));

        let mut report = TransitionReport::default();
        let issue = self.tracker.issue(key.as_str())?;
        if !issue.status.eq_ignore_ascii_case(from) {
            report.skip(Diagnostic::StatusMismatch {
                key: issue.key,
                expected: from.clone(),
                actual: issue.status,
            });
            return Ok(report);
        }

        if let Some(diagnostic) = self.apply(key.as_str(), to)? {
            report.skip(diagnostic);
        } else {
            report.transitioned.push(key.to_string());
        }
        Ok(report)
    }

    /// Move every task linked to the release task and sitting in the child
    /// "from" status to the child "to" status. Each child is independent: a
    /// failed request is reported and the remaining children are still tried.
    pub fn mark_children_done(&self, key: &TaskKey) -> Result<TransitionReport> {
        let from = &self.transition.child_from_status;
        let to = &self.transition.child_to_status;
        ui::display_title(&format!(
            "Transition children of \"{}\" from \"{}\" to \"{}\"",
            key, from, to
        ));

        let jql = format!(
            "issue in linkedIssues({}, {}) AND status = {}",
            jql_quote(key.as_str()),
            jql_quote(self.link_type),
            jql_quote(from)
        );
        let children = self.tracker.search_issues(&jql)?;

        let mut report = TransitionReport::default();
        if children.is_empty() {
            report.skip(Diagnostic::NoTasksToTransition {
                release_task: key.to_string(),
                status: from.clone(),
            });
            return Ok(report);
        }

        for child in children {
            match self.apply(&child.key, to) {
                Ok(None) => report.transitioned.push(child.key),
                Ok(Some(diagnostic)) => report.skip(diagnostic),
                Err(e) => report.skip(Diagnostic::TransitionFailed {
                    key: child.key,
                    reason: e.to_string(),
                }),
            }
        }
        Ok(report)
    }

    /// Apply the transition leading to `status`, if the issue has one.
    fn apply(&self, key: &str, status: &str) -> Result<Option<Diagnostic>> {
        let transitions = self.tracker.transitions(key)?;
        let Some(transition) = transitions.iter().find(|t| t.leads_to(status)) else {
            return Ok(Some(Diagnostic::TransitionUnavailable {
                key: key.to_string(),
                status: status.to_string(),
            }));
        };

        self.tracker.transition_issue(key, &transition.id)?;
        ui::display_success(&format!(
            "Task {} has been transited to status \"{}\"",
            key, status
        ));
        Ok(None)
    }
}
