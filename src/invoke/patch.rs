use super::{log_output, render_command, ToolError, ToolOutput};
use crate::logging::LogConfig;
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

/// Leading path components stripped from patch headers.
pub const STRIP_COMPONENTS: u32 = 1;

/// Context lines the tool may ignore when placing a hunk. Always zero: a
/// hunk lands on its exact context or not at all.
pub const FUZZ: u32 = 0;

/// Runs the `patch` executable.
#[derive(Debug, Clone)]
pub struct PatchInvoker {
    program: String,
    log: LogConfig,
}

impl Default for PatchInvoker {
    fn default() -> Self {
        Self::new("patch", LogConfig::default())
    }
}

impl PatchInvoker {
    pub fn new(program: impl Into<String>, log: LogConfig) -> Self {
        Self {
            program: program.into(),
            log,
        }
    }

    fn args(&self, target: &Path, reverse: bool) -> Vec<String> {
        let mut args = vec![format!("-p{STRIP_COMPONENTS}"), format!("-F{FUZZ}")];
        if reverse {
            args.push("-R".to_string());
        }
        args.push("-d".to_string());
        args.push(target.to_string_lossy().into_owned());
        args
    }

    /// Feed `patch` to the tool on stdin and collect its output.
    ///
    /// A non-zero exit is not an error here; it is classified by the caller.
    pub fn apply(&self, target: &Path, patch: &Path, reverse: bool) -> Result<ToolOutput, ToolError> {
        let input = File::open(patch).map_err(|source| ToolError::OpenPatch {
            path: patch.to_path_buf(),
            source,
        })?;

        let args = self.args(target, reverse);
        tracing::debug!(
            command = %render_command(&self.program, &args),
            patch = %patch.display(),
            "running patch"
        );

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::from(input))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| ToolError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let output = ToolOutput::from(output);
        log_output(&self.log, &self.program, &output);
        Ok(output)
    }

    pub fn revert(&self, target: &Path, patch: &Path) -> Result<ToolOutput, ToolError> {
        self.apply(target, patch, true)
    }
}
