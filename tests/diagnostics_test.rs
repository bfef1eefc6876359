// tests/diagnostics_test.rs
use release_tool::diagnostics::Diagnostic;

#[test]
fn test_unresolved_pull_requests_message() {
    let diagnostic = Diagnostic::UnresolvedPullRequests {
        numbers: vec![41, 42],
    };
    assert_eq!(diagnostic.to_string(), "Pull requests without tasks: 41, 42");
    assert!(diagnostic.needs_follow_up());
}

#[test]
fn test_child_link_failure_needs_follow_up() {
    let diagnostic = Diagnostic::ChildLinkFailed {
        child: "PROJ-6".to_string(),
        reason: "Issue tracker error: 404".to_string(),
    };
    assert!(diagnostic.to_string().contains("PROJ-6"));
    assert!(diagnostic.needs_follow_up());
}

#[test]
fn test_skipped_version_release_is_informational() {
    let diagnostic = Diagnostic::VersionHasUnfinishedTasks {
        version: "Sprint 42".to_string(),
        keys: vec!["PROJ-3".to_string(), "PROJ-4".to_string()],
    };
    assert_eq!(
        diagnostic.to_string(),
        "Can't release version \"Sprint 42\", it has unfinished tasks: PROJ-3, PROJ-4"
    );
    assert!(!diagnostic.needs_follow_up());
}

#[test]
fn test_status_mismatch_message() {
    let diagnostic = Diagnostic::StatusMismatch {
        key: "PROJ-1".to_string(),
        expected: "On Production".to_string(),
        actual: "In Progress".to_string(),
    };
    assert_eq!(
        diagnostic.to_string(),
        "Issue PROJ-1 is in status \"In Progress\", expected \"On Production\""
    );
    assert!(!diagnostic.needs_follow_up());
}

#[test]
fn test_transition_diagnostics_are_informational() {
    let unavailable = Diagnostic::TransitionUnavailable {
        key: "PROJ-4".to_string(),
        status: "Done".to_string(),
    };
    let nothing = Diagnostic::NoTasksToTransition {
        release_task: "PROJ-1".to_string(),
        status: "To Deploy".to_string(),
    };
    assert!(unavailable.to_string().contains("does not have transition"));
    assert!(nothing.to_string().contains("PROJ-1"));
    assert!(!unavailable.needs_follow_up());
    assert!(!nothing.needs_follow_up());
}
