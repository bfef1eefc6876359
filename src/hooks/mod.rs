//! Version hooks supplied by the project being released
//!
//! - get-version: prints the currently deployed version
//! - set-version: writes the target version into versioned files

pub mod executor;
pub mod lifecycle;
pub mod mock;

pub use executor::ShellHooks;
pub use lifecycle::{format_template, HookContext, HookType};
pub use mock::MockHooks;

use crate::error::Result;

/// Capability to run a hook template with named parameters.
///
/// The workflow never depends on shell semantics directly; implementations
/// decide how the formatted command is executed.
pub trait HookRunner: Send + Sync {
    /// Run `template` formatted with `context`, returning its output
    fn run(&self, template: &str, context: &HookContext) -> Result<String>;
}
