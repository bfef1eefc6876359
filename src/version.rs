use semver::Version;

use crate::error::{ReleaseError, Result};
use crate::hooks::{HookContext, HookRunner};
use crate::ui::Prompt;

/// Represents the type of semantic version bump to apply.
///
/// Release branches bump minor, hotfix branches bump patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionBump {
    Minor,
    Patch,
}

/// Parses a semantic version, tolerating surrounding whitespace and a `v` prefix.
///
/// # Example
/// ```ignore
/// assert_eq!(parse_version("1.2.3\n").unwrap(), Version::new(1, 2, 3));
/// assert!(parse_version("1.2").is_err());
/// ```
pub fn parse_version(text: &str) -> Result<Version> {
    let clean = text.trim();
    let clean = clean
        .strip_prefix('v')
        .or_else(|| clean.strip_prefix('V'))
        .unwrap_or(clean);

    Version::parse(clean).map_err(|e| {
        ReleaseError::version(format!("'{}' is not a semantic version: {}", text.trim(), e))
    })
}

/// Bumps a version according to the specified bump type.
///
/// - **Minor**: minor += 1, patch = 0
/// - **Patch**: patch += 1
///
/// Pre-release and build metadata are dropped.
pub fn bump_version(version: &Version, bump_type: VersionBump) -> Version {
    match bump_type {
        VersionBump::Minor => Version::new(version.major, version.minor + 1, 0),
        VersionBump::Patch => Version::new(version.major, version.minor, version.patch + 1),
    }
}

/// Determines the version the current run operates on.
///
/// The current version comes from the project's get-version hook; the
/// proposal can be overridden interactively.
pub struct VersionResolver<'a> {
    hooks: &'a dyn HookRunner,
    get_version: &'a str,
    prompt: &'a dyn Prompt,
}

impl<'a> VersionResolver<'a> {
    pub fn new(hooks: &'a dyn HookRunner, get_version: &'a str, prompt: &'a dyn Prompt) -> Self {
        VersionResolver {
            hooks,
            get_version,
            prompt,
        }
    }

    /// The version reported by the get-version hook
    pub fn current(&self) -> Result<Version> {
        let output = self.hooks.run(self.get_version, &HookContext::get_version())?;
        parse_version(&output)
    }

    /// Resolve the version for this run.
    ///
    /// With `allow_interactive` the proposal is confirmed: an empty answer
    /// accepts it, anything else must parse as a version or the question is
    /// repeated. Running out of input is `MissingRequiredInput`.
    pub fn resolve(
        &self,
        requires_release_bump: bool,
        requires_hotfix_bump: bool,
        allow_interactive: bool,
    ) -> Result<Version> {
        let current = self.current()?;
        tracing::debug!(%current, "current version from hook");

        let mut proposed = current;
        if requires_release_bump {
            proposed = bump_version(&proposed, VersionBump::Minor);
        }
        if requires_hotfix_bump {
            proposed = bump_version(&proposed, VersionBump::Patch);
        }

        if !allow_interactive {
            return Ok(proposed);
        }

        self.confirm(&proposed)
    }

    fn confirm(&self, proposed: &Version) -> Result<Version> {
        let question = format!("Input version to use [{}]: ", proposed);
        loop {
            let answer = self.prompt.ask(&question)?.ok_or_else(|| {
                ReleaseError::missing(format!(
                    "no input available to confirm version {} (use --noinput to accept it)",
                    proposed
                ))
            })?;

            if answer.is_empty() {
                return Ok(proposed.clone());
            }

            match parse_version(&answer) {
                Ok(version) => return Ok(version),
                Err(e) => self.prompt.say(&e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::OperationLog;
    use crate::hooks::MockHooks;
    use crate::ui::{NoInput, ScriptedPrompt};

    fn hooks_reporting(version: &str) -> MockHooks {
        MockHooks::new(OperationLog::default()).with_output("cat VERSION", version)
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("1.2.3\n").unwrap(), Version::new(1, 2, 3));
        assert_eq!(parse_version("v0.9.0").unwrap(), Version::new(0, 9, 0));
        assert!(matches!(
            parse_version("1.2"),
            Err(ReleaseError::InvalidVersionFormat(_))
        ));
    }

    #[test]
    fn test_bump_minor_resets_patch() {
        let bumped = bump_version(&Version::new(1, 2, 3), VersionBump::Minor);
        assert_eq!(bumped, Version::new(1, 3, 0));
    }

    #[test]
    fn test_bump_minor_is_always_greater() {
        for (major, minor, patch) in [(0, 0, 0), (1, 2, 3), (4, 99, 17), (10, 0, 1)] {
            let current = Version::new(major, minor, patch);
            let bumped = bump_version(&current, VersionBump::Minor);
            assert!(bumped > current, "{} should be > {}", bumped, current);
            assert_eq!(bumped.patch, 0);
        }
    }

    #[test]
    fn test_bump_patch() {
        let bumped = bump_version(&Version::new(1, 2, 0), VersionBump::Patch);
        assert_eq!(bumped, Version::new(1, 2, 1));
    }

    #[test]
    fn test_bump_drops_prerelease() {
        let current = Version::parse("1.2.3-rc.1").unwrap();
        assert_eq!(
            bump_version(&current, VersionBump::Patch).to_string(),
            "1.2.4"
        );
    }

    #[test]
    fn test_resolve_without_interaction() {
        let hooks = hooks_reporting("1.2.0\n");
        let resolver = VersionResolver::new(&hooks, "cat VERSION", &NoInput);

        assert_eq!(resolver.resolve(true, false, false).unwrap(), Version::new(1, 3, 0));
        assert_eq!(resolver.resolve(false, true, false).unwrap(), Version::new(1, 2, 1));
        assert_eq!(resolver.resolve(false, false, false).unwrap(), Version::new(1, 2, 0));
    }

    #[test]
    fn test_empty_answer_accepts_proposal() {
        let hooks = hooks_reporting("1.2.0");
        let prompt = ScriptedPrompt::new(&[""]);
        let resolver = VersionResolver::new(&hooks, "cat VERSION", &prompt);

        assert_eq!(resolver.resolve(false, true, true).unwrap(), Version::new(1, 2, 1));
        assert_eq!(prompt.asked(), vec!["Input version to use [1.2.1]: "]);
    }

    #[test]
    fn test_invalid_answer_repeats_question() {
        let hooks = hooks_reporting("1.2.0");
        let prompt = ScriptedPrompt::new(&["one point three", "1.2", "1.5.0"]);
        let resolver = VersionResolver::new(&hooks, "cat VERSION", &prompt);

        assert_eq!(resolver.resolve(true, false, true).unwrap(), Version::new(1, 5, 0));
        assert_eq!(prompt.asked().len(), 3);
    }

    #[test]
    fn test_exhausted_input_is_missing_input() {
        let hooks = hooks_reporting("1.2.0");
        let prompt = ScriptedPrompt::new(&["garbage"]);
        let resolver = VersionResolver::new(&hooks, "cat VERSION", &prompt);

        let err = resolver.resolve(true, false, true).unwrap_err();
        assert!(matches!(err, ReleaseError::MissingRequiredInput(_)));
    }

    #[test]
    fn test_unparsable_hook_output() {
        let hooks = hooks_reporting("not a version");
        let resolver = VersionResolver::new(&hooks, "cat VERSION", &NoInput);

        let err = resolver.resolve(false, false, false).unwrap_err();
        assert!(matches!(err, ReleaseError::InvalidVersionFormat(_)));
    }
}
