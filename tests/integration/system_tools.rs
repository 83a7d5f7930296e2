//! End-to-end checks against the real `patch` and `diff` executables.
//!
//! Skipped when either tool is not installed.

use crate::support::write;
use patchiman::config::Staging;
use patchiman::invoke::{ExternalTools, SystemTools};
use patchiman::orchestrator::{Orchestrator, PatchReport};
use patchiman::outcome::{classify, PatchOutcome};
use patchiman::staging::StagingPair;
use patchiman::LogConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn tools_available() -> bool {
    ["patch", "diff"].iter().all(|tool| {
        Command::new(tool)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    })
}

macro_rules! require_tools {
    () => {
        if !tools_available() {
            eprintln!("skipping: patch/diff not installed");
            return;
        }
    };
}

fn numbered_lines() -> String {
    (1..=12).map(|n| format!("line{n}\n")).collect()
}

/// Change line 2; hunk recorded at its true position.
const CLEAN_PATCH: &str = "\
--- a/file.txt
+++ b/file.txt
@@ -1,3 +1,3 @@
 line1
-line2
+LINE2
 line3
";

/// Change line 9; hunk recorded 3 lines too early.
const OFFSET_PATCH: &str = "\
--- a/file.txt
+++ b/file.txt
@@ -5,3 +5,3 @@
 line8
-line9
+LINE9
 line10
";

struct Fixture {
    dir: TempDir,
    pair: StagingPair,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("project");
        write(&src.join("file.txt"), &numbered_lines());
        let pair = StagingPair::create(&src, dir.path(), &Staging::default()).unwrap();
        Self { dir, pair }
    }

    fn patch(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        write(&path, contents);
        path
    }
}

fn outcome_of(tools: &SystemTools, target: &Path, patch: &Path) -> PatchOutcome {
    let out = tools.apply(target, patch, false).unwrap();
    classify(out.status, &out.stdout, &out.stderr)
}

#[test]
fn real_patch_outcomes() {
    require_tools!();
    let fx = Fixture::new();
    let tools = SystemTools::default();

    let clean = fx.patch("clean.patch", CLEAN_PATCH);
    assert_eq!(outcome_of(&tools, fx.pair.target(), &clean), PatchOutcome::Applied);

    let offset = fx.patch("offset.patch", OFFSET_PATCH);
    assert_eq!(
        outcome_of(&tools, fx.pair.target(), &offset),
        PatchOutcome::PartiallyApplied
    );

    let garbage = fx.patch("garbage.patch", "this is not a patch\n");
    assert_eq!(
        outcome_of(&tools, fx.pair.target(), &garbage),
        PatchOutcome::MalformedInput
    );
}

#[test]
fn real_revert_undoes_patch() {
    require_tools!();
    let fx = Fixture::new();
    let tools = SystemTools::default();
    let clean = fx.patch("clean.patch", CLEAN_PATCH);

    assert_eq!(outcome_of(&tools, fx.pair.target(), &clean), PatchOutcome::Applied);
    let out = tools.revert(fx.pair.target(), &clean).unwrap();
    assert_eq!(
        classify(out.status, &out.stdout, &out.stderr),
        PatchOutcome::Applied
    );
    assert_eq!(
        fs::read_to_string(fx.pair.target().join("file.txt")).unwrap(),
        numbered_lines()
    );
}

#[test]
fn real_diff_of_identical_trees_is_empty() {
    require_tools!();
    let fx = Fixture::new();
    let diff = SystemTools::default()
        .diff(fx.pair.clean(), fx.pair.target(), &[])
        .unwrap();
    assert_eq!(diff.as_deref(), Some(""));
}

#[test]
fn real_diff_treats_missing_tree_as_empty() {
    require_tools!();
    let fx = Fixture::new();
    let diff = SystemTools::default()
        .diff(fx.pair.clean(), &fx.dir.path().join("nowhere"), &[])
        .unwrap()
        .unwrap();
    assert!(diff.contains("-line1"), "{diff}");
}

#[test]
fn real_diff_hard_error_is_none() {
    require_tools!();
    let dir = TempDir::new().unwrap();
    let diff = SystemTools::default()
        .diff(&dir.path().join("nox"), &dir.path().join("noy"), &[])
        .unwrap();
    assert_eq!(diff, None);
}

#[test]
fn real_dehunk_produces_a_patch_that_applies_cleanly() {
    require_tools!();
    let fx = Fixture::new();
    let clean = fx.patch("clean.patch", CLEAN_PATCH);
    let offset = fx.patch("offset.patch", OFFSET_PATCH);
    let orchestrator = Orchestrator::new(SystemTools::default(), LogConfig::default());

    let mut reports: Vec<PatchReport> = Vec::new();
    let failures = orchestrator
        .dehunk(&fx.pair, &[clean.clone(), offset.clone()], &mut reports)
        .unwrap();
    assert_eq!(failures, 0);
    assert!(reports[1].rewritten);

    let reduced = fs::read_to_string(&offset).unwrap();
    assert!(reduced.contains("+LINE9"), "{reduced}");
    assert!(!reduced.contains("+LINE2"), "{reduced}");
    assert!(!reduced.contains(".orig"), "{reduced}");
    assert_eq!(
        fs::read_to_string(fx.dir.path().join("offset.patch.orig")).unwrap(),
        OFFSET_PATCH
    );
    assert_eq!(fs::read_to_string(&clean).unwrap(), CLEAN_PATCH);

    // Reapplied on the clean tree after the accepted patch, it lands exactly.
    let mut reports: Vec<PatchReport> = Vec::new();
    let failures = orchestrator
        .apply(&fx.pair, &[clean, offset], &mut reports)
        .unwrap();
    assert_eq!(failures, 0);
    let outcomes: Vec<_> = reports.iter().map(|r| r.outcome).collect();
    assert_eq!(outcomes, vec![PatchOutcome::Applied, PatchOutcome::Applied]);
}
