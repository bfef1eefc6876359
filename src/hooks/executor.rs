use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{ReleaseError, Result};
use crate::hooks::{format_template, HookContext, HookRunner};
use crate::ui;

/// Runs a prepared command, returning stdout.
///
/// Any non-zero exit is `ExternalCommandFailed` carrying the combined output.
pub(crate) fn run_command(cmd: &mut Command, command_line: &str) -> Result<String> {
    ui::display_command(command_line);
    tracing::debug!(command = command_line, "running external command");

    let output = cmd.output().map_err(|e| ReleaseError::ExternalCommandFailed {
        command: command_line.to_string(),
        code: -1,
        output: e.to_string(),
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReleaseError::ExternalCommandFailed {
            command: command_line.to_string(),
            code: output.status.code().unwrap_or(-1),
            output: format!("{}{}", stdout, stderr).trim_end().to_string(),
        });
    }

    Ok(stdout)
}

/// Executes hook templates through `sh -c` in the repository directory
pub struct ShellHooks {
    workdir: PathBuf,
}

impl ShellHooks {
    pub fn new(workdir: impl AsRef<Path>) -> Self {
        ShellHooks {
            workdir: workdir.as_ref().to_path_buf(),
        }
    }
}

impl HookRunner for ShellHooks {
    fn run(&self, template: &str, context: &HookContext) -> Result<String> {
        let command_line = format_template(template, context)?;

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&command_line).current_dir(&self.workdir);
        for (key, value) in context.to_env_vars() {
            cmd.env(key, value);
        }

        run_command(&mut cmd, &command_line)
    }
}
