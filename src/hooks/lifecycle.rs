use regex::Regex;
use semver::Version;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{ReleaseError, Result};

/// Hooks the project being released provides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookType {
    GetVersion,
    SetVersion,
}

impl HookType {
    /// Get the hook name as a string
    pub fn name(&self) -> &'static str {
        match self {
            HookType::GetVersion => "get-version",
            HookType::SetVersion => "set-version",
        }
    }
}

/// Named parameters passed to a hook
#[derive(Debug, Clone)]
pub struct HookContext {
    pub hook_type: HookType,
    /// Target version, present for `set-version`
    pub version: Option<Version>,
}

impl HookContext {
    pub fn get_version() -> Self {
        HookContext {
            hook_type: HookType::GetVersion,
            version: None,
        }
    }

    pub fn set_version(version: &Version) -> Self {
        HookContext {
            hook_type: HookType::SetVersion,
            version: Some(version.clone()),
        }
    }

    /// Parameters available as `{name}` placeholders in the hook template
    pub fn params(&self) -> HashMap<&'static str, String> {
        let mut params = HashMap::new();
        if let Some(ref version) = self.version {
            params.insert("version", version.to_string());
        }
        params
    }

    /// Convert context to environment variables for the hook process
    ///
    /// Maps context fields to RELEASE_TOOL_* environment variables
    pub fn to_env_vars(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert(
            "RELEASE_TOOL_HOOK".to_string(),
            self.hook_type.name().to_string(),
        );
        if let Some(ref version) = self.version {
            env.insert("RELEASE_TOOL_VERSION".to_string(), version.to_string());
        }
        env
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("static placeholder pattern"))
}

/// Interpolates `{name}` placeholders of a hook template.
///
/// A placeholder without a matching parameter is an error, the command is
/// never run half-formatted.
pub fn format_template(template: &str, context: &HookContext) -> Result<String> {
    let params = context.params();
    let mut missing = Vec::new();

    let formatted = placeholder_regex().replace_all(template, |captures: &regex::Captures| {
        let name = &captures[1];
        match params.get(name) {
            Some(value) => value.clone(),
            None => {
                missing.push(name.to_string());
                captures[0].to_string()
            }
        }
    });

    if !missing.is_empty() {
        return Err(ReleaseError::hook(format!(
            "Cannot format {} hook `{}`: unknown parameter(s) {}",
            context.hook_type.name(),
            template,
            missing.join(", ")
        )));
    }

    Ok(formatted.into_owned())
}
