//! Code hosting platform access
//!
//! Only pull request lookups are needed: titles to find task keys and merge
//! commits to cherry-pick into hotfix branches.

pub mod github;
pub mod mock;

pub use github::GitHubClient;
pub use mock::InMemoryCodeHost;

use regex::Regex;
use std::sync::OnceLock;

use crate::error::Result;

/// Pull request fields the workflow reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    /// Commit created when the pull request was merged, if it was
    pub merge_commit_sha: Option<String>,
}

pub trait CodeHost {
    fn pull_request(&self, number: u64) -> Result<PullRequest>;
}

fn slug_regex() -> &'static Regex {
    static SLUG_RE: OnceLock<Regex> = OnceLock::new();
    SLUG_RE.get_or_init(|| {
        Regex::new(r"[/:]([\w.-]+/[\w.-]+?)(?:\.git)?/?$").expect("static slug pattern")
    })
}

/// `owner/repo` of a remote URL (ssh or https form)
///
/// ```ignore
/// assert_eq!(repository_slug("git@github.com:acme/shop.git"), Some("acme/shop".into()));
/// ```
pub fn repository_slug(remote_url: &str) -> Option<String> {
    slug_regex()
        .captures(remote_url.trim())
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_from_ssh_remote() {
        assert_eq!(
            repository_slug("git@github.com:acme/shop-api.git"),
            Some("acme/shop-api".to_string())
        );
    }

    #[test]
    fn test_slug_from_https_remote() {
        assert_eq!(
            repository_slug("https://github.com/acme/shop.git"),
            Some("acme/shop".to_string())
        );
        assert_eq!(
            repository_slug("https://github.com/acme/shop"),
            Some("acme/shop".to_string())
        );
    }

    #[test]
    fn test_slug_keeps_dots_in_name() {
        assert_eq!(
            repository_slug("git@github.com:acme/shop.web.git"),
            Some("acme/shop.web".to_string())
        );
    }

    #[test]
    fn test_slug_rejects_garbage() {
        assert_eq!(repository_slug("not a url"), None);
    }
}
