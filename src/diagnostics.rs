use std::fmt;

/// Non-fatal conditions met while running the workflow.
/// These are reported to the user and collected into the run report.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Pull requests referenced in the release branch without any task key
    UnresolvedPullRequests { numbers: Vec<u64> },
    /// No release task matched the search, a new one is created
    ReleaseTaskNotFound { summary: String },
    /// Linking one child task failed, the others were still linked
    ChildLinkFailed { child: String, reason: String },
    /// Tracker version grouping was already released
    VersionAlreadyReleased { version: String },
    /// Tracker version still has tasks outside the final statuses
    VersionHasUnfinishedTasks { version: String, keys: Vec<String> },
    /// Issue is not in the status a transition starts from
    StatusMismatch {
        key: String,
        expected: String,
        actual: String,
    },
    /// Issue has no transition leading to the wanted status
    TransitionUnavailable { key: String, status: String },
    /// Transition request for one child failed, the others were still attempted
    TransitionFailed { key: String, reason: String },
    /// No linked task is waiting in the child "from" status
    NoTasksToTransition { release_task: String, status: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnresolvedPullRequests { numbers } => {
                let list: Vec<String> = numbers.iter().map(|n| n.to_string()).collect();
                write!(f, "Pull requests without tasks: {}", list.join(", "))
            }
            Diagnostic::ReleaseTaskNotFound { summary } => {
                write!(f, "Did not find existing release task \"{}\"", summary)
            }
            Diagnostic::ChildLinkFailed { child, reason } => {
                write!(f, "Could not link {}: {}", child, reason)
            }
            Diagnostic::VersionAlreadyReleased { version } => {
                write!(f, "Version \"{}\" is already released", version)
            }
            Diagnostic::VersionHasUnfinishedTasks { version, keys } => {
                write!(
                    f,
                    "Can't release version \"{}\", it has unfinished tasks: {}",
                    version,
                    keys.join(", ")
                )
            }
            Diagnostic::StatusMismatch {
                key,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Issue {} is in status \"{}\", expected \"{}\"",
                    key, actual, expected
                )
            }
            Diagnostic::TransitionUnavailable { key, status } => {
                write!(
                    f,
                    "Issue \"{}\" does not have transition to status \"{}\"",
                    key, status
                )
            }
            Diagnostic::TransitionFailed { key, reason } => {
                write!(f, "Could not transition {}: {}", key, reason)
            }
            Diagnostic::NoTasksToTransition {
                release_task,
                status,
            } => {
                write!(
                    f,
                    "Did not find any task linked to {} in status \"{}\"",
                    release_task, status
                )
            }
        }
    }
}

impl Diagnostic {
    /// Whether this condition means the run needs human follow-up
    pub fn needs_follow_up(&self) -> bool {
        matches!(
            self,
            Diagnostic::UnresolvedPullRequests { .. } | Diagnostic::ChildLinkFailed { .. }
        )
    }
}
