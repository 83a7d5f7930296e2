//! Patch lifecycle: apply, dehunk and revert.
//!
//! Patches are processed strictly in the order given (reversed for revert),
//! one external invocation at a time. Every invocation is classified into a
//! [`PatchOutcome`], and the outcome alone decides what happens next:
//!
//! - **apply**: a failure is counted and the target is redeployed from the
//!   clean tree, so each patch is tried against a known state.
//! - **dehunk**: a partially applied patch is regenerated as a diff between
//!   a baseline (clean plus every patch accepted so far) and the target.
//!   The target is redeployed at the end of the run; dehunk changes patch
//!   files, never the project tree.
//! - **revert**: runs against the live project and stops at the first
//!   failure.

use crate::config::{Dehunk, ToolConfig, DEFAULT_CLEAN_DIR, DEFAULT_TARGET_DIR};
use crate::error::{Error, Result};
use crate::invoke::{ExternalTools, SystemTools, ToolOutput};
use crate::logging::LogConfig;
use crate::outcome::{classify, is_success, needs_dehunk, PatchOutcome};
use crate::staging::{copy_tree, scoped, StagingPair};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// What happened to one patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub patch: PathBuf,
    pub outcome: PatchOutcome,
    /// The patch file was rewritten by dehunk.
    pub rewritten: bool,
}

impl PatchReport {
    pub fn new(patch: impl Into<PathBuf>, outcome: PatchOutcome) -> Self {
        Self {
            patch: patch.into(),
            outcome,
            rewritten: false,
        }
    }

    fn rewritten(mut self) -> Self {
        self.rewritten = true;
        self
    }
}

/// Receives a report as soon as each patch has been handled.
pub trait Reporter {
    fn report(&mut self, report: &PatchReport);
}

impl Reporter for Vec<PatchReport> {
    fn report(&mut self, report: &PatchReport) {
        self.push(report.clone());
    }
}

/// Drives the external tools through the patch lifecycle.
#[derive(Debug, Clone)]
pub struct Orchestrator<T> {
    tools: T,
    log: LogConfig,
    dehunk: Dehunk,
}

impl Orchestrator<SystemTools> {
    pub fn from_config(config: &ToolConfig, log: LogConfig) -> Self {
        Self::new(SystemTools::from_config(config, log), log).with_dehunk(config.dehunk.clone())
    }
}

impl<T: ExternalTools> Orchestrator<T> {
    pub fn new(tools: T, log: LogConfig) -> Self {
        Self {
            tools,
            log,
            dehunk: Dehunk::default(),
        }
    }

    pub fn with_dehunk(mut self, dehunk: Dehunk) -> Self {
        self.dehunk = dehunk;
        self
    }

    pub fn tools(&self) -> &T {
        &self.tools
    }

    /// Try each patch on the target tree. Returns the number of failures.
    ///
    /// After a failure the target is redeployed from clean and the patches
    /// accepted so far are replayed, so the next patch meets exactly the
    /// verified sequence.
    pub fn apply(
        &self,
        pair: &StagingPair,
        patches: &[PathBuf],
        reporter: &mut dyn Reporter,
    ) -> Result<usize> {
        let mut failures = 0;
        let mut accepted: Vec<PathBuf> = Vec::new();
        for patch in patches {
            let outcome = self.run(pair.target(), patch)?;
            reporter.report(&PatchReport::new(patch, outcome));
            if is_success(outcome) {
                accepted.push(patch.clone());
            } else {
                failures += 1;
                self.restore(pair, &mut accepted)?;
            }
        }
        tracing::info!(total = patches.len(), failures, "apply finished");
        Ok(failures)
    }

    /// Redeploy the target and replay `accepted` onto it.
    ///
    /// If a replay does not succeed the target is left as a plain copy of
    /// clean and `accepted` is emptied.
    fn restore(&self, pair: &StagingPair, accepted: &mut Vec<PathBuf>) -> Result<()> {
        pair.redeploy()?;
        let mut stale = None;
        for patch in accepted.iter() {
            let outcome = self.run(pair.target(), patch)?;
            if !is_success(outcome) {
                stale = Some((patch.clone(), outcome));
                break;
            }
        }
        if let Some((patch, outcome)) = stale {
            tracing::warn!(
                patch = %patch.display(),
                %outcome,
                "accepted patch no longer replays, falling back to clean tree"
            );
            pair.redeploy()?;
            accepted.clear();
        }
        Ok(())
    }

    /// Rewrite partially applying patches down to the hunks still needed.
    ///
    /// Returns the number of patches that failed to apply. A failure to
    /// regenerate a patch, including a tool that cannot be started, aborts
    /// the run with [`Error::Dehunk`]. The target tree is redeployed on every
    /// exit path.
    pub fn dehunk(
        &self,
        pair: &StagingPair,
        patches: &[PathBuf],
        reporter: &mut dyn Reporter,
    ) -> Result<usize> {
        let result = self.dehunk_all(pair, patches, reporter);
        let reset = pair.redeploy();
        let failures = result?;
        reset?;
        tracing::info!(total = patches.len(), failures, "dehunk finished");
        Ok(failures)
    }

    fn dehunk_all(
        &self,
        pair: &StagingPair,
        patches: &[PathBuf],
        reporter: &mut dyn Reporter,
    ) -> Result<usize> {
        let mut failures = 0;
        let mut applied_so_far: Vec<PathBuf> = Vec::new();

        for patch in patches {
            let outcome = self.run(pair.target(), patch)?;
            match outcome {
                outcome if needs_dehunk(outcome) => {
                    self.backup(patch)?;
                    let regenerated = match self.regenerate(pair, &applied_so_far) {
                        Ok(regenerated) => regenerated,
                        Err(Error::Tool(err)) => {
                            tracing::warn!(
                                patch = %patch.display(),
                                error = %err,
                                "cannot regenerate patch"
                            );
                            None
                        }
                        Err(err) => return Err(err),
                    };
                    let Some(reduced) = regenerated else {
                        reporter.report(&PatchReport::new(patch, outcome));
                        return Err(Error::Dehunk {
                            patch: patch.clone(),
                            failures,
                        });
                    };
                    atomic_write(patch, reduced.as_bytes()).map_err(|source| {
                        Error::PatchWrite {
                            path: patch.clone(),
                            source,
                        }
                    })?;
                    tracing::info!(patch = %patch.display(), "dehunked");
                    reporter.report(&PatchReport::new(patch, outcome).rewritten());
                    applied_so_far.push(patch.clone());
                }
                PatchOutcome::Applied => {
                    tracing::info!(patch = %patch.display(), "no hunks to drop, skipping");
                    reporter.report(&PatchReport::new(patch, outcome));
                    applied_so_far.push(patch.clone());
                }
                _ => {
                    reporter.report(&PatchReport::new(patch, outcome));
                    failures += 1;
                    applied_so_far.clear();
                    pair.redeploy()?;
                }
            }
        }
        Ok(failures)
    }

    /// Undo patches on the live project, last one first.
    ///
    /// Stops at the first patch that does not revert cleanly; earlier patches
    /// are left untouched.
    pub fn revert(
        &self,
        project: &Path,
        patches: &[PathBuf],
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        for patch in patches.iter().rev() {
            tracing::info!(patch = %patch.display(), "reverting");
            let output = self.tools.revert(project, patch)?;
            let outcome = self.classify_output(patch, &output);
            reporter.report(&PatchReport::new(patch, outcome));
            if !is_success(outcome) {
                return Err(Error::Revert {
                    patch: patch.clone(),
                    outcome,
                });
            }
        }
        Ok(())
    }

    fn run(&self, target: &Path, patch: &Path) -> Result<PatchOutcome> {
        let output = self.tools.apply(target, patch, false)?;
        Ok(self.classify_output(patch, &output))
    }

    fn classify_output(&self, patch: &Path, output: &ToolOutput) -> PatchOutcome {
        let outcome = classify(output.status, &output.stdout, &output.stderr);
        if outcome == PatchOutcome::UnknownError {
            // Unrecognized wording is a gap in the classifier's phrase set.
            tracing::warn!(
                patch = %patch.display(),
                status = output.status,
                stdout = output.stdout.trim(),
                stderr = output.stderr.trim(),
                "unrecognized patch diagnostics"
            );
        } else if self.log.logs_tool_output() {
            tracing::trace!(patch = %patch.display(), %outcome, "classified");
        }
        outcome
    }

    fn backup(&self, patch: &Path) -> Result<()> {
        let mut backup = patch.as_os_str().to_owned();
        backup.push(&self.dehunk.backup_suffix);
        let backup = PathBuf::from(backup);
        fs::copy(patch, &backup).map_err(|source| Error::PatchWrite {
            path: backup.clone(),
            source,
        })?;
        tracing::debug!(backup = %backup.display(), "kept original patch");
        Ok(())
    }

    /// Diff the current target against clean plus `accepted` patches.
    ///
    /// Both trees are staged side by side in an ephemeral root so the
    /// resulting headers strip with `-p1`. `Ok(None)` means the patch could
    /// not be regenerated.
    fn regenerate(&self, pair: &StagingPair, accepted: &[PathBuf]) -> Result<Option<String>> {
        scoped(|root| -> Result<Option<String>> {
            let baseline = root.join(DEFAULT_CLEAN_DIR);
            let snapshot = root.join(DEFAULT_TARGET_DIR);
            copy_tree(pair.clean(), &baseline)?;

            for earlier in accepted {
                let outcome = self.run(&baseline, earlier)?;
                if !is_success(outcome) {
                    tracing::warn!(
                        patch = %earlier.display(),
                        %outcome,
                        "accepted patch no longer applies to the baseline"
                    );
                    return Ok(None);
                }
            }

            copy_tree(pair.target(), &snapshot)?;
            Ok(self.tools.diff(&baseline, &snapshot, &self.dehunk.exclude)?)
        })
    }
}

/// Atomic file write: tempfile + fsync + rename, keeping the permissions of
/// the file being replaced. A symlinked path is written through to its
/// target.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let resolved = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let path = resolved.as_path();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path).map(|m| m.permissions()).ok();

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    if let Some(permissions) = permissions {
        temp.as_file().set_permissions(permissions)?;
    }
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
