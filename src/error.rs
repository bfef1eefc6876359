use thiserror::Error;

/// Unified error type for release-tool operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Invalid version format: {0}")]
    InvalidVersionFormat(String),

    #[error("Your repo has changes, commit or stash them:\n{0}")]
    DirtyWorkingTree(String),

    #[error("Command `{command}` failed with exit code {code}\n{output}")]
    ExternalCommandFailed {
        command: String,
        code: i32,
        output: String,
    },

    #[error("Release task \"{summary}\" has no unique name, found issues: {}", .keys.join(", "))]
    AmbiguousReleaseTask { summary: String, keys: Vec<String> },

    #[error("Missing required input: {0}")]
    MissingRequiredInput(String),

    #[error("Did not find related tasks in {0}")]
    NoRelatedTasksFound(String),

    #[error("Failed to link {child} to {parent}: {reason}")]
    ChildLinkFailure {
        parent: String,
        child: String,
        reason: String,
    },

    #[error("Invalid branch state: {0}")]
    InvalidBranchState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Hook error: {0}")]
    Hook(String),

    #[error("Issue tracker error: {0}")]
    Tracker(String),

    #[error("Code host error: {0}")]
    CodeHost(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in release-tool
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a version format error with context
    pub fn version(msg: impl Into<String>) -> Self {
        ReleaseError::InvalidVersionFormat(msg.into())
    }

    /// Create a missing input error with context
    pub fn missing(msg: impl Into<String>) -> Self {
        ReleaseError::MissingRequiredInput(msg.into())
    }

    pub fn hook(msg: impl Into<String>) -> Self {
        ReleaseError::Hook(msg.into())
    }

    pub fn tracker(msg: impl Into<String>) -> Self {
        ReleaseError::Tracker(msg.into())
    }

    pub fn code_host(msg: impl Into<String>) -> Self {
        ReleaseError::CodeHost(msg.into())
    }

    pub fn branch_state(msg: impl Into<String>) -> Self {
        ReleaseError::InvalidBranchState(msg.into())
    }

    /// True for errors raised before any external system was touched
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ReleaseError::DirtyWorkingTree(_)
                | ReleaseError::MissingRequiredInput(_)
                | ReleaseError::AmbiguousReleaseTask { .. }
                | ReleaseError::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReleaseError::config("test config issue");
        assert_eq!(err.to_string(), "Configuration error: test config issue");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ReleaseError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_ambiguous_release_task_lists_keys() {
        let err = ReleaseError::AmbiguousReleaseTask {
            summary: "Backend release 1.3.0".to_string(),
            keys: vec!["REL-1".to_string(), "REL-7".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Backend release 1.3.0"));
        assert!(msg.contains("REL-1, REL-7"));
    }

    #[test]
    fn test_external_command_failed_carries_output() {
        let err = ReleaseError::ExternalCommandFailed {
            command: "git cherry-pick abc123".to_string(),
            code: 1,
            output: "CONFLICT (content)".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("git cherry-pick abc123"));
        assert!(msg.contains("exit code 1"));
        assert!(msg.contains("CONFLICT"));
    }

    #[test]
    fn test_precondition_classification() {
        assert!(ReleaseError::DirtyWorkingTree(" M src/lib.rs".to_string()).is_precondition());
        assert!(ReleaseError::missing("release task").is_precondition());
        assert!(!ReleaseError::tracker("boom").is_precondition());
        assert!(!ReleaseError::version("x").is_precondition());
    }

    #[test]
    fn test_error_messages_are_descriptive() {
        let error_pairs = vec![
            (ReleaseError::config("x"), "Configuration error"),
            (ReleaseError::version("x"), "Invalid version format"),
            (ReleaseError::missing("x"), "Missing required input"),
            (ReleaseError::hook("x"), "Hook error"),
            (ReleaseError::tracker("x"), "Issue tracker error"),
            (ReleaseError::code_host("x"), "Code host error"),
            (ReleaseError::branch_state("x"), "Invalid branch state"),
        ];

        for (err, expected_prefix) in error_pairs {
            let msg = err.to_string();
            assert!(
                msg.starts_with(expected_prefix),
                "Error message should start with '{}', but got '{}'",
                expected_prefix,
                msg
            );
        }
    }
}
