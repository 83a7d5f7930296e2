use super::{log_output, render_command, ToolError, ToolOutput};
use crate::logging::LogConfig;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Exit status `diff` uses for trouble (as opposed to 0/1 for same/different).
const DIFF_TROUBLE: i32 = 2;

/// Runs the `diff` executable in unified, recursive, new-file mode.
#[derive(Debug, Clone)]
pub struct DiffInvoker {
    program: String,
    log: LogConfig,
}

impl Default for DiffInvoker {
    fn default() -> Self {
        Self::new("diff", LogConfig::default())
    }
}

impl DiffInvoker {
    pub fn new(program: impl Into<String>, log: LogConfig) -> Self {
        Self {
            program: program.into(),
            log,
        }
    }

    /// Unified diff of `a` against `b`.
    ///
    /// Returns `Ok(None)` when the tool reports trouble or is killed; an
    /// empty string when the trees are identical.
    pub fn diff(&self, a: &Path, b: &Path, exclude: &[String]) -> Result<Option<String>, ToolError> {
        let (cwd, left, right) = operands(a, b);

        let mut args = vec!["-updrN".to_string()];
        for pattern in exclude {
            args.push("-x".to_string());
            args.push(pattern.clone());
        }
        args.push(left.to_string_lossy().into_owned());
        args.push(right.to_string_lossy().into_owned());
        tracing::debug!(command = %render_command(&self.program, &args), "running diff");

        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &cwd {
            cmd.current_dir(cwd);
        }

        let output = cmd.output().map_err(|source| ToolError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        let signaled = output.status.code().is_none();
        let output = ToolOutput::from(output);
        log_output(&self.log, &self.program, &output);

        if signaled || output.status == DIFF_TROUBLE {
            tracing::warn!(
                status = output.status,
                stderr = output.stderr.trim(),
                "diff reported trouble"
            );
            return Ok(None);
        }
        Ok(Some(output.stdout))
    }
}

/// Pick a working directory and operands so headers read `a/...` / `b/...`.
///
/// Patches regenerated from the diff are applied with one leading component
/// stripped, so each operand must be exactly one component below the
/// working directory. Trees without a shared parent are passed as given.
fn operands(a: &Path, b: &Path) -> (Option<PathBuf>, PathBuf, PathBuf) {
    match (a.parent(), b.parent(), a.file_name(), b.file_name()) {
        (Some(pa), Some(pb), Some(na), Some(nb)) if pa == pb => {
            let cwd = if pa.as_os_str().is_empty() {
                None
            } else {
                Some(pa.to_path_buf())
            };
            (cwd, PathBuf::from(na), PathBuf::from(nb))
        }
        _ => (None, a.to_path_buf(), b.to_path_buf()),
    }
}
