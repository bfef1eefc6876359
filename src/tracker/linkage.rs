//! Release task bookkeeping in the issue tracker.
//!
//! Finds or creates the release task, picks the tracker version the release
//! ships in, links discovered tasks to the release task and finally releases
//! the tracker versions once every included task is finished.

use rayon::prelude::*;
use semver::Version;

use crate::config::{JiraConfig, ReleaseTaskConfig, TransitionConfig};
use crate::diagnostics::Diagnostic;
use crate::domain::TaskKey;
use crate::error::{ReleaseError, Result};
use crate::tracker::{jql_list, jql_quote, today, IssueTracker, NewIssue, TrackerVersion};
use crate::ui::{self, Prompt};

/// Outcome of linking child tasks to the release task
#[derive(Debug, Default)]
pub struct LinkReport {
    pub linked: Vec<TaskKey>,
    /// One [ReleaseError::ChildLinkFailure] per child that could not be linked
    pub failures: Vec<ReleaseError>,
}

impl LinkReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.failures
            .iter()
            .filter_map(|failure| match failure {
                ReleaseError::ChildLinkFailure { child, reason, .. } => {
                    Some(Diagnostic::ChildLinkFailed {
                        child: child.clone(),
                        reason: reason.clone(),
                    })
                }
                _ => None,
            })
            .collect()
    }
}

/// Result of searching for the release task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseTaskLookup {
    Found(TaskKey),
    /// No task carries this summary yet
    Missing { summary: String },
}

pub struct IssueLinkage<'a> {
    tracker: &'a dyn IssueTracker,
    release_task: &'a ReleaseTaskConfig,
    transition: &'a TransitionConfig,
    link_workers: usize,
}

impl<'a> IssueLinkage<'a> {
    pub fn new(tracker: &'a dyn IssueTracker, jira: &'a JiraConfig, link_workers: usize) -> Self {
        IssueLinkage {
            tracker,
            release_task: &jira.release_task,
            transition: &jira.transition,
            link_workers: link_workers.max(1),
        }
    }

    /// Find the release task of `version` by summary, creating it when absent.
    ///
    /// More than one match is an error and nothing is created.
    pub fn get_or_create_release_task(&self, version: &Version) -> Result<TaskKey> {
        let lookup = self.find_release_task(version)?;
        self.ensure_release_task(lookup)
    }

    /// Search for the release task of `version` without changing anything.
    ///
    /// The tracker's text search is fuzzy, so only exact (case-insensitive)
    /// summary matches count.
    pub fn find_release_task(&self, version: &Version) -> Result<ReleaseTaskLookup> {
        ui::display_title("Searching for release task");

        let summary = self.release_task.summary(version);
        let jql = format!(
            "project = {} AND summary ~ {} AND type = {}",
            jql_quote(&self.release_task.project),
            jql_quote(&summary),
            jql_quote(&self.release_task.issue_type)
        );
        let found: Vec<String> = self
            .tracker
            .search_issues(&jql)?
            .into_iter()
            .filter(|issue| issue.summary.trim().eq_ignore_ascii_case(summary.trim()))
            .map(|issue| issue.key)
            .collect();

        match found.as_slice() {
            [] => Ok(ReleaseTaskLookup::Missing { summary }),
            [key] => {
                ui::display_success(&format!("Found release task: {}", key));
                Ok(ReleaseTaskLookup::Found(TaskKey::new(key)))
            }
            _ => Err(ReleaseError::AmbiguousReleaseTask {
                summary,
                keys: found,
            }),
        }
    }

    /// Return the found release task or create the missing one.
    pub fn ensure_release_task(&self, lookup: ReleaseTaskLookup) -> Result<TaskKey> {
        match lookup {
            ReleaseTaskLookup::Found(key) => Ok(key),
            ReleaseTaskLookup::Missing { summary } => {
                ui::display_diagnostic(&Diagnostic::ReleaseTaskNotFound {
                    summary: summary.clone(),
                });
                self.create_release_task(summary)
            }
        }
    }

    fn create_release_task(&self, summary: String) -> Result<TaskKey> {
        ui::display_title("Creating release task");
        let component = Some(self.release_task.component.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let key = self.tracker.create_issue(&NewIssue {
            project: self.release_task.project.clone(),
            summary,
            issue_type: self.release_task.issue_type.clone(),
            component,
        })?;
        ui::display_success(&format!("Created release task: {}", key));
        Ok(TaskKey::new(key))
    }

    /// Ask which tracker version the release ships in.
    ///
    /// Choices are `0` skip, `1` create a new version, `2..` one of the
    /// unreleased versions. An unanswered question means skip.
    pub fn select_or_create_version(
        &self,
        version: &Version,
        prompt: &dyn Prompt,
    ) -> Result<Option<TrackerVersion>> {
        ui::display_title("Searching for tracker release version");

        let unreleased: Vec<TrackerVersion> = self
            .tracker
            .project_versions(&self.release_task.project)?
            .into_iter()
            .filter(|v| !v.released)
            .collect();

        prompt.say("Tracker versions:");
        prompt.say("0) Skip");
        prompt.say("1) Create new");
        if !unreleased.is_empty() {
            prompt.say("or select existing one:");
        }
        for (idx, existing) in unreleased.iter().enumerate() {
            prompt.say(&format!("{}) {}", idx + 2, existing.name));
        }

        loop {
            let Some(answer) = prompt.ask("Choose which version to use for this release: ")? else {
                return Ok(None);
            };
            match answer.parse::<usize>() {
                Ok(0) => return Ok(None),
                Ok(1) => return self.create_version(version, prompt).map(Some),
                Ok(choice) if choice - 2 < unreleased.len() => {
                    let selected = unreleased[choice - 2].clone();
                    ui::display_status(&format!("Tracker version: {}", selected.name));
                    return Ok(Some(selected));
                }
                _ => prompt.say(&format!("Invalid choice '{}'", answer)),
            }
        }
    }

    fn create_version(&self, version: &Version, prompt: &dyn Prompt) -> Result<TrackerVersion> {
        let proposed = if version.patch > 0 { "Hotfix" } else { "Release" };
        let name = prompt
            .ask(&format!("Input new version name [{}]: ", proposed))?
            .filter(|answer| !answer.is_empty())
            .unwrap_or_else(|| proposed.to_string());

        let created = self
            .tracker
            .create_version(&self.release_task.project, &name, today())?;
        ui::display_success(&format!("Created tracker version: {}", created.name));
        Ok(created)
    }

    /// Link every child to the release task and add them to `version`.
    ///
    /// Children are linked from a bounded worker pool. A failing child is
    /// recorded in the report and does not stop the others; only failing to
    /// attach the version to the release task itself aborts.
    pub fn link_children(
        &self,
        release_task: &TaskKey,
        children: &[TaskKey],
        version: Option<&TrackerVersion>,
    ) -> Result<LinkReport> {
        ui::display_title(&format!(
            "Linking tasks found in release branch to release task ({})",
            release_task
        ));

        if let Some(version) = version {
            self.tracker.add_fix_version(release_task.as_str(), version)?;
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.link_workers)
            .build()
            .map_err(|e| ReleaseError::tracker(format!("cannot start link workers: {}", e)))?;

        let results: Vec<(TaskKey, Result<()>)> = pool.install(|| {
            children
                .par_iter()
                .map(|child| (child.clone(), self.link_child(release_task, child, version)))
                .collect()
        });

        let mut report = LinkReport::default();
        for (child, result) in results {
            match result {
                Ok(()) => {
                    ui::display_status(&format!("Linked {}", child));
                    report.linked.push(child);
                }
                Err(e) => {
                    tracing::debug!(%child, error = %e, "child link failed");
                    report.failures.push(ReleaseError::ChildLinkFailure {
                        parent: release_task.to_string(),
                        child: child.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        for diagnostic in report.diagnostics() {
            ui::display_diagnostic(&diagnostic);
        }
        Ok(report)
    }

    fn link_child(
        &self,
        parent: &TaskKey,
        child: &TaskKey,
        version: Option<&TrackerVersion>,
    ) -> Result<()> {
        self.tracker
            .create_issue_link(&self.release_task.link_type, parent.as_str(), child.as_str())?;
        if let Some(version) = version {
            self.tracker.add_fix_version(child.as_str(), version)?;
        }
        Ok(())
    }

    /// Release every tracker version attached to the release task whose
    /// tasks are all finished. Versions already released or still holding
    /// unfinished tasks are skipped with a diagnostic.
    pub fn release_version(&self, release_task: &TaskKey) -> Result<Vec<Diagnostic>> {
        ui::display_title(&format!(
            "Releasing tracker versions of release task {}",
            release_task
        ));

        let issue = self.tracker.issue(release_task.as_str())?;
        let mut diagnostics = Vec::new();

        for version in &issue.fix_versions {
            if version.released {
                diagnostics.push(Diagnostic::VersionAlreadyReleased {
                    version: version.name.clone(),
                });
                continue;
            }

            // The release task carries the version too but is not one of its tasks.
            let unfinished: Vec<String> = self
                .tracker
                .search_issues(&self.unfinished_query(version))?
                .into_iter()
                .map(|i| i.key)
                .filter(|key| key != release_task.as_str())
                .collect();
            if !unfinished.is_empty() {
                diagnostics.push(Diagnostic::VersionHasUnfinishedTasks {
                    version: version.name.clone(),
                    keys: unfinished,
                });
                continue;
            }

            self.tracker.release_version(version, today())?;
            ui::display_success(&format!("Released tracker version \"{}\"", version.name));
        }

        for diagnostic in &diagnostics {
            ui::display_diagnostic(diagnostic);
        }
        Ok(diagnostics)
    }

    fn unfinished_query(&self, version: &TrackerVersion) -> String {
        let project = jql_quote(&self.release_task.project);
        let mut jql = format!(
            "project = {} AND fixVersion = {} AND fixVersion in unreleasedVersions({})",
            project,
            jql_quote(&version.name),
            project
        );
        if !self.transition.child_final_statuses.is_empty() {
            jql.push_str(&format!(
                " AND status NOT IN ({})",
                jql_list(&self.transition.child_final_statuses)
            ));
        }
        if !self.transition.child_task_types_to_skip.is_empty() {
            jql.push_str(&format!(
                " AND type NOT IN ({})",
                jql_list(&self.transition.child_task_types_to_skip)
            ));
        }
        jql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::InMemoryTracker;
    use crate::ui::ScriptedPrompt;

    fn jira() -> JiraConfig {
        let mut jira = JiraConfig::default();
        jira.release_task.project = "PROJ".to_string();
        jira.release_task.component = "Backend".to_string();
        jira
    }

    fn keys(values: &[&str]) -> Vec<TaskKey> {
        values.iter().map(TaskKey::new).collect()
    }

    #[test]
    fn test_release_task_created_when_missing() {
        let tracker = InMemoryTracker::new();
        let jira = jira();
        let linkage = IssueLinkage::new(&tracker, &jira, 5);

        let key = linkage
            .get_or_create_release_task(&Version::new(1, 3, 0))
            .unwrap();

        assert_eq!(key.as_str(), "PROJ-101");
        assert_eq!(
            tracker.calls(),
            vec!["create-issue PROJ-101 \"Backend release 1.3.0\""]
        );
    }

    #[test]
    fn test_find_release_task_does_not_create() {
        let tracker = InMemoryTracker::new();
        let jira = jira();
        let linkage = IssueLinkage::new(&tracker, &jira, 5);

        let lookup = linkage.find_release_task(&Version::new(1, 3, 0)).unwrap();

        assert_eq!(
            lookup,
            ReleaseTaskLookup::Missing {
                summary: "Backend release 1.3.0".to_string()
            }
        );
        assert!(tracker.calls().is_empty());

        let key = linkage.ensure_release_task(lookup).unwrap();
        assert_eq!(key.as_str(), "PROJ-101");
    }

    #[test]
    fn test_single_match_is_reused() {
        let tracker = InMemoryTracker::new()
            .with_issue("PROJ-7", "Backend release 1.3.0", "Task", "Open")
            .with_issue("PROJ-8", "Backend release 1.3.0 notes", "Task", "Open");
        let jira = jira();
        let linkage = IssueLinkage::new(&tracker, &jira, 5);

        let key = linkage
            .get_or_create_release_task(&Version::new(1, 3, 0))
            .unwrap();

        assert_eq!(key.as_str(), "PROJ-7");
        assert!(tracker.calls().is_empty());
    }

    #[test]
    fn test_duplicate_release_tasks_are_ambiguous() {
        let tracker = InMemoryTracker::new()
            .with_issue("PROJ-7", "Backend release 1.3.0", "Task", "Open")
            .with_issue("PROJ-9", "backend release 1.3.0", "Task", "Open");
        let jira = jira();
        let linkage = IssueLinkage::new(&tracker, &jira, 5);

        let err = linkage
            .get_or_create_release_task(&Version::new(1, 3, 0))
            .unwrap_err();

        match err {
            ReleaseError::AmbiguousReleaseTask { keys, .. } => {
                assert_eq!(keys, vec!["PROJ-7", "PROJ-9"])
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(tracker.calls().is_empty());
    }

    #[test]
    fn test_select_existing_version() {
        let tracker = InMemoryTracker::new()
            .with_version("PROJ", "10", "Old", true)
            .with_version("PROJ", "11", "Sprint 42", false);
        let jira = jira();
        let linkage = IssueLinkage::new(&tracker, &jira, 5);
        let prompt = ScriptedPrompt::new(&["7", "2"]);

        let selected = linkage
            .select_or_create_version(&Version::new(1, 3, 0), &prompt)
            .unwrap();

        assert_eq!(selected.map(|v| v.name), Some("Sprint 42".to_string()));
        assert_eq!(prompt.asked().len(), 2);
    }

    #[test]
    fn test_create_version_proposes_hotfix_name() {
        let tracker = InMemoryTracker::new();
        let jira = jira();
        let linkage = IssueLinkage::new(&tracker, &jira, 5);
        let prompt = ScriptedPrompt::new(&["1", ""]);

        let created = linkage
            .select_or_create_version(&Version::new(1, 2, 1), &prompt)
            .unwrap()
            .unwrap();

        assert_eq!(created.name, "Hotfix");
        assert_eq!(prompt.asked()[1], "Input new version name [Hotfix]: ");
        assert!(tracker.version("Hotfix").is_some());
    }

    #[test]
    fn test_skip_and_no_input_select_nothing() {
        let tracker = InMemoryTracker::new().with_version("PROJ", "11", "Sprint 42", false);
        let jira = jira();
        let linkage = IssueLinkage::new(&tracker, &jira, 5);

        let skipped = linkage
            .select_or_create_version(&Version::new(1, 3, 0), &ScriptedPrompt::new(&["0"]))
            .unwrap();
        let unanswered = linkage
            .select_or_create_version(&Version::new(1, 3, 0), &ScriptedPrompt::new(&[]))
            .unwrap();

        assert_eq!(skipped, None);
        assert_eq!(unanswered, None);
        assert!(tracker.calls().is_empty());
    }

    #[test]
    fn test_link_children_adds_fix_versions() {
        let tracker = InMemoryTracker::new()
            .with_issue("PROJ-1", "Backend release 1.3.0", "Task", "Open")
            .with_issue("PROJ-9", "fix bug", "Task", "To Deploy")
            .with_issue("PROJ-12", "feature", "Task", "To Deploy")
            .with_version("PROJ", "11", "Sprint 42", false);
        let jira = jira();
        let linkage = IssueLinkage::new(&tracker, &jira, 2);
        let version = tracker.version("Sprint 42");

        let report = linkage
            .link_children(
                &TaskKey::new("PROJ-1"),
                &keys(&["PROJ-12", "PROJ-9"]),
                version.as_ref(),
            )
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.linked, keys(&["PROJ-12", "PROJ-9"]));
        assert_eq!(tracker.children_of("PROJ-1"), vec!["PROJ-12", "PROJ-9"]);
        for key in ["PROJ-1", "PROJ-9", "PROJ-12"] {
            assert_eq!(tracker.fix_versions_of(key), vec!["Sprint 42"]);
        }
    }

    #[test]
    fn test_one_failing_child_does_not_block_others() {
        let tracker = InMemoryTracker::new()
            .with_issue("PROJ-1", "Backend release 1.3.0", "Task", "Open")
            .with_issue("PROJ-2", "a", "Task", "To Deploy")
            .with_issue("PROJ-3", "b", "Task", "To Deploy")
            .with_issue("PROJ-4", "c", "Task", "To Deploy")
            .fail_link("PROJ-3");
        let jira = jira();
        let linkage = IssueLinkage::new(&tracker, &jira, 5);

        let report = linkage
            .link_children(&TaskKey::new("PROJ-1"), &keys(&["PROJ-2", "PROJ-3", "PROJ-4"]), None)
            .unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.linked, keys(&["PROJ-2", "PROJ-4"]));
        assert_eq!(tracker.children_of("PROJ-1"), vec!["PROJ-2", "PROJ-4"]);
        let diagnostics = report.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(
            &diagnostics[0],
            Diagnostic::ChildLinkFailed { child, .. } if child == "PROJ-3"
        ));
    }

    #[test]
    fn test_release_version_checks_unfinished_tasks() {
        let tracker = InMemoryTracker::new()
            .with_version("PROJ", "10", "Done batch", false)
            .with_version("PROJ", "11", "Open batch", false)
            .with_version("PROJ", "12", "Shipped", true)
            .with_issue("PROJ-1", "Backend release 1.3.0", "Task", "Release Merged")
            .with_issue("PROJ-2", "a", "Task", "Done")
            .with_issue("PROJ-3", "b", "Task", "In Progress")
            .with_issue("PROJ-4", "c", "Story", "In Progress")
            .with_fix_version("PROJ-1", "10")
            .with_fix_version("PROJ-1", "11")
            .with_fix_version("PROJ-1", "12")
            .with_fix_version("PROJ-2", "10")
            .with_fix_version("PROJ-4", "10")
            .with_fix_version("PROJ-3", "11");
        let jira = jira();
        let linkage = IssueLinkage::new(&tracker, &jira, 5);

        let diagnostics = linkage.release_version(&TaskKey::new("PROJ-1")).unwrap();

        assert!(tracker.version("Done batch").unwrap().released);
        assert!(!tracker.version("Open batch").unwrap().released);
        assert_eq!(
            diagnostics,
            vec![
                Diagnostic::VersionHasUnfinishedTasks {
                    version: "Open batch".to_string(),
                    keys: vec!["PROJ-3".to_string()],
                },
                Diagnostic::VersionAlreadyReleased {
                    version: "Shipped".to_string(),
                },
            ]
        );
    }
}
