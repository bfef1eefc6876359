use regex::{Regex, RegexBuilder};
use std::fmt;
use std::sync::OnceLock;

use crate::error::Result;

/// Issue tracker task identifier, always uppercase (e.g. `PROJ-12`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskKey(String);

impl TaskKey {
    /// Create a task key, normalising it to uppercase
    pub fn new(key: impl AsRef<str>) -> Self {
        TaskKey(key.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TaskKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Configurable task key pattern, matched case-insensitively.
///
/// When the pattern has a capture group the first group is the key,
/// otherwise the whole match is (e.g. `(PROJ-\d+)\s` yields `PROJ-12`).
#[derive(Debug, Clone)]
pub struct TaskPattern {
    regex: Regex,
}

impl TaskPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(TaskPattern { regex })
    }

    /// All task keys found in `text`, uppercased, in order of appearance.
    pub fn find_keys(&self, text: &str) -> Vec<TaskKey> {
        let grouped = self.regex.captures_len() > 1;
        self.regex
            .captures_iter(text)
            .filter_map(|captures| {
                let found = if grouped {
                    captures.get(1)
                } else {
                    captures.get(0)
                };
                found.map(|m| TaskKey::new(m.as_str()))
            })
            .filter(|key| !key.as_str().is_empty())
            .collect()
    }
}

fn pull_request_regex() -> &'static Regex {
    static PR_RE: OnceLock<Regex> = OnceLock::new();
    PR_RE.get_or_init(|| Regex::new(r"#(\d+)").expect("static pull request pattern"))
}

/// First pull request reference (`#<digits>`) in a commit message line.
pub fn pull_request_reference(line: &str) -> Option<u64> {
    pull_request_regex()
        .captures(line)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_key_is_uppercased() {
        assert_eq!(TaskKey::new("proj-12").as_str(), "PROJ-12");
        assert_eq!(TaskKey::new(" Proj-3 ").to_string(), "PROJ-3");
    }

    #[test]
    fn test_find_keys_case_insensitive() {
        let pattern = TaskPattern::new(r"PROJ-\d+").unwrap();
        let keys = pattern.find_keys("proj-12 and PROJ-7 (#5)");
        assert_eq!(keys, vec![TaskKey::new("PROJ-12"), TaskKey::new("PROJ-7")]);
    }

    #[test]
    fn test_find_keys_uses_first_group() {
        let pattern = TaskPattern::new(r"(PROJ-\d+)\s").unwrap();
        assert_eq!(pattern.find_keys("PROJ-9 fix bug"), vec![TaskKey::new("PROJ-9")]);
        assert!(pattern.find_keys("PROJ-9").is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        assert!(TaskPattern::new("PROJ-(").is_err());
    }

    #[test]
    fn test_pull_request_reference() {
        assert_eq!(pull_request_reference("Merge pull request #41 from x/y"), Some(41));
        assert_eq!(pull_request_reference("PROJ-9 fix bug (#41) (#42)"), Some(41));
        assert_eq!(pull_request_reference("misc cleanup"), None);
        assert_eq!(pull_request_reference("issue # 4"), None);
    }
}
