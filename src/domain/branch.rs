use semver::Version;

use crate::error::{ReleaseError, Result};

/// Release branch naming template (e.g., "release-{version}")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchTemplate {
    pub pattern: String,
}

impl BranchTemplate {
    /// Create a template, it must contain the `{version}` placeholder
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if !pattern.contains("{version}") {
            return Err(ReleaseError::config(format!(
                "Release branch template '{}' must contain {{version}} placeholder",
                pattern
            )));
        }
        Ok(BranchTemplate { pattern })
    }

    /// Format a version according to the template
    /// Example: pattern="release-{version}", version=1.2.3 -> "release-1.2.3"
    pub fn format(&self, version: &Version) -> String {
        self.pattern.replace("{version}", &version.to_string())
    }
}

/// Remote-tracking revision of a branch, e.g. `origin/master`
pub fn remote_ref(remote: &str, branch: &str) -> String {
    format!("{}/{}", remote, branch)
}
