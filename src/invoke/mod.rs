//! External tool integration.
//!
//! Patch application and tree diffing are delegated to the system `patch`
//! and `diff` executables. [`ExternalTools`] is the seam the orchestrator
//! talks to; [`SystemTools`] binds it to real processes.
//!
//! # Example
//!
//! ```no_run
//! use patchiman::invoke::{ExternalTools, SystemTools};
//! use patchiman::outcome::classify;
//! use std::path::Path;
//!
//! let tools = SystemTools::default();
//! let output = tools.apply(Path::new("b"), Path::new("fix.patch"), false).unwrap();
//! println!("{}", classify(output.status, &output.stdout, &output.stderr));
//! ```

pub mod diff;
pub mod patch;

pub use diff::DiffInvoker;
pub use patch::PatchInvoker;

use crate::config::ToolConfig;
use crate::logging::LogConfig;
use std::path::{Path, PathBuf};
use std::process::Output;
use thiserror::Error;

/// Exit status reported when the tool was killed by a signal.
pub const SIGNALED_STATUS: i32 = -1;

/// Fully collected result of one external invocation.
///
/// stdout and stderr are kept apart; classification depends on it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn new(status: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

impl From<Output> for ToolOutput {
    fn from(output: Output) -> Self {
        Self {
            status: output.status.code().unwrap_or(SIGNALED_STATUS),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open patch {path}: {source}")]
    OpenPatch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Patch and diff capabilities used by the orchestrator.
pub trait ExternalTools {
    /// Apply `patch` inside `target` with `-p1` stripping and zero fuzz.
    fn apply(&self, target: &Path, patch: &Path, reverse: bool) -> Result<ToolOutput, ToolError>;

    /// Recursive unified diff of two trees.
    ///
    /// `Ok(None)` means the diff tool reported a hard error. An empty string
    /// means the trees are identical.
    fn diff(&self, a: &Path, b: &Path, exclude: &[String]) -> Result<Option<String>, ToolError>;

    fn revert(&self, target: &Path, patch: &Path) -> Result<ToolOutput, ToolError> {
        self.apply(target, patch, true)
    }
}

/// [`ExternalTools`] backed by real executables.
#[derive(Debug, Clone, Default)]
pub struct SystemTools {
    patch: PatchInvoker,
    diff: DiffInvoker,
}

impl SystemTools {
    pub fn new(patch: PatchInvoker, diff: DiffInvoker) -> Self {
        Self { patch, diff }
    }

    pub fn from_config(config: &ToolConfig, log: LogConfig) -> Self {
        Self::new(
            PatchInvoker::new(&config.tools.patch, log),
            DiffInvoker::new(&config.tools.diff, log),
        )
    }
}

impl ExternalTools for SystemTools {
    fn apply(&self, target: &Path, patch: &Path, reverse: bool) -> Result<ToolOutput, ToolError> {
        self.patch.apply(target, patch, reverse)
    }

    fn diff(&self, a: &Path, b: &Path, exclude: &[String]) -> Result<Option<String>, ToolError> {
        self.diff.diff(a, b, exclude)
    }

    fn revert(&self, target: &Path, patch: &Path) -> Result<ToolOutput, ToolError> {
        self.patch.revert(target, patch)
    }
}

/// Render a command line for logs, program name upper-cased.
fn render_command(program: &str, args: &[String]) -> String {
    let mut rendered = program.to_uppercase();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(arg);
    }
    rendered
}

fn log_output(log: &LogConfig, program: &str, output: &ToolOutput) {
    if log.logs_tool_output() {
        tracing::trace!(
            program,
            status = output.status,
            stdout = output.stdout.trim(),
            stderr = output.stderr.trim(),
            "tool finished"
        );
    } else {
        tracing::debug!(program, status = output.status, "tool finished");
    }
}
