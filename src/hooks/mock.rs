use std::collections::HashMap;

use crate::error::{ReleaseError, Result};
use crate::git::OperationLog;
use crate::hooks::{format_template, HookContext, HookRunner};

/// Hook runner for tests
///
/// Records `hook <formatted command>` into the shared operation log and
/// answers with canned output per template.
pub struct MockHooks {
    log: OperationLog,
    outputs: HashMap<String, String>,
    failing: Vec<String>,
}

impl MockHooks {
    pub fn new(log: OperationLog) -> Self {
        MockHooks {
            log,
            outputs: HashMap::new(),
            failing: Vec::new(),
        }
    }

    /// Output returned when `template` runs
    pub fn with_output(mut self, template: &str, output: &str) -> Self {
        self.outputs.insert(template.to_string(), output.to_string());
        self
    }

    /// Make `template` exit non-zero
    pub fn fail_on(mut self, template: &str) -> Self {
        self.failing.push(template.to_string());
        self
    }
}

impl HookRunner for MockHooks {
    fn run(&self, template: &str, context: &HookContext) -> Result<String> {
        let command = format_template(template, context)?;
        if let Ok(mut ops) = self.log.lock() {
            ops.push(format!("hook {}", command));
        }

        if self.failing.iter().any(|t| t == template) {
            return Err(ReleaseError::ExternalCommandFailed {
                command,
                code: 1,
                output: "simulated hook failure".to_string(),
            });
        }

        Ok(self.outputs.get(template).cloned().unwrap_or_default())
    }
}
