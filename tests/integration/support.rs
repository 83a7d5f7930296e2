//! Shared fixtures: project trees and a scripted stand-in for patch/diff.

use patchiman::invoke::{ExternalTools, ToolError, ToolOutput};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const CLEAN_STDOUT: &str = "patching file {file}\n";
pub const OFFSET_STDOUT: &str = "patching file {file}\nHunk #1 succeeded at 12 (offset 3 lines).\n";
pub const FAILED_STDOUT: &str = "patching file {file}\nHunk #1 FAILED at 10.\n\
1 out of 1 hunk FAILED -- saving rejects to file {file}.rej\n";
pub const MISSING_STDOUT: &str = "can't find file to patch at input line 3\n\
Perhaps you used the wrong -p or --strip option?\n\
No file to patch.  Skipping patch.\n\
1 out of 1 hunk ignored\n";

pub fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Small project with a couple of files.
pub fn project(root: &Path) -> PathBuf {
    let src = root.join("project");
    write(&src.join("README"), "demo\n");
    write(&src.join("src/main.c"), "int main() { return 0; }\n");
    src
}

/// Sorted relative path -> contents for every file below `root`.
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

/// What the fake tool does when a patch is applied.
#[derive(Clone, Debug)]
pub struct Step {
    pub output: ToolOutput,
    /// Files written into the target (relative path, contents).
    pub writes: Vec<(String, String)>,
}

impl Step {
    fn with_stdout(status: i32, template: &str, file: &str) -> Self {
        Self {
            output: ToolOutput::new(status, template.replace("{file}", file), ""),
            writes: Vec::new(),
        }
    }

    pub fn applied(file: &str, contents: &str) -> Self {
        Self::with_stdout(0, CLEAN_STDOUT, file).writing(file, contents)
    }

    pub fn offset(file: &str, contents: &str) -> Self {
        Self::with_stdout(0, OFFSET_STDOUT, file).writing(file, contents)
    }

    pub fn hunk_failed(file: &str) -> Self {
        Self::with_stdout(1, FAILED_STDOUT, file)
    }

    pub fn file_not_found() -> Self {
        Self::with_stdout(1, MISSING_STDOUT, "")
    }

    pub fn writing(mut self, file: &str, contents: &str) -> Self {
        self.writes.push((file.to_string(), contents.to_string()));
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Apply {
        target: PathBuf,
        patch: PathBuf,
        reverse: bool,
    },
    Diff {
        a: PathBuf,
        b: PathBuf,
    },
}

/// Scripted [`ExternalTools`]: each patch path maps to a fixed [`Step`].
/// `diff` renders every file that differs as a pseudo unified diff.
#[derive(Default)]
pub struct ScriptedTools {
    forward: HashMap<PathBuf, Step>,
    reverse: HashMap<PathBuf, ToolOutput>,
    diff_fails: bool,
    diff_missing: bool,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, patch: &Path, step: Step) -> Self {
        self.forward.insert(patch.to_path_buf(), step);
        self
    }

    pub fn on_revert(mut self, patch: &Path, output: ToolOutput) -> Self {
        self.reverse.insert(patch.to_path_buf(), output);
        self
    }

    pub fn failing_diff(mut self) -> Self {
        self.diff_fails = true;
        self
    }

    /// `diff` behaves as if the executable could not be started.
    pub fn missing_diff(mut self) -> Self {
        self.diff_missing = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Patches applied forward, in call order.
    pub fn forward_applies(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Apply {
                    target,
                    patch,
                    reverse: false,
                } => Some((target, patch)),
                _ => None,
            })
            .collect()
    }
}

impl ExternalTools for ScriptedTools {
    fn apply(&self, target: &Path, patch: &Path, reverse: bool) -> Result<ToolOutput, ToolError> {
        self.calls.borrow_mut().push(Call::Apply {
            target: target.to_path_buf(),
            patch: patch.to_path_buf(),
            reverse,
        });

        if reverse {
            return Ok(self
                .reverse
                .get(patch)
                .cloned()
                .unwrap_or_else(|| ToolOutput::new(0, CLEAN_STDOUT, "")));
        }

        let step = self
            .forward
            .get(patch)
            .unwrap_or_else(|| panic!("no script for {}", patch.display()));
        for (file, contents) in &step.writes {
            write(&target.join(file), contents);
        }
        Ok(step.output.clone())
    }

    fn diff(&self, a: &Path, b: &Path, exclude: &[String]) -> Result<Option<String>, ToolError> {
        self.calls.borrow_mut().push(Call::Diff {
            a: a.to_path_buf(),
            b: b.to_path_buf(),
        });
        if self.diff_missing {
            return Err(ToolError::Spawn {
                program: "diff".to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file or directory"),
            });
        }
        if self.diff_fails {
            return Ok(None);
        }

        let excluded = |path: &Path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            exclude
                .iter()
                .filter_map(|p| p.strip_prefix('*'))
                .any(|suffix| name.ends_with(suffix))
        };

        let before = snapshot(a);
        let after = snapshot(b);
        let mut out = String::new();
        for (path, contents) in &after {
            if excluded(path) || before.get(path) == Some(contents) {
                continue;
            }
            out.push_str(&format!(
                "--- a/{0}\n+++ b/{0}\n@@ -0,0 +1 @@\n+{1}",
                path.display(),
                String::from_utf8_lossy(contents)
            ));
        }
        Ok(Some(out))
    }
}
