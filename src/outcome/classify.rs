//! Classification of raw patch tool diagnostics.
//!
//! The patch tool reports what happened as free text. Its exit status alone
//! is not enough: a multi-file patch can partially land before failing, and a
//! patch that is already present looks exactly like a reversed one. The
//! classifier therefore matches a fixed set of diagnostic phrases emitted by
//! GNU patch. The phrase set is versioned by [`PHRASE_SET_VERSION`]; a new
//! phrase is a classifier change plus a fixture in the tests below.

use super::PatchOutcome;
use regex::Regex;
use std::sync::LazyLock;

/// Tool release whose wording the phrase set below is pinned to.
pub const PHRASE_SET_VERSION: &str = "GNU patch 2.7";

/// Prefix of every fatal diagnostic on stderr.
const FATAL_MARKER: &str = "patch: ****";
const ONLY_GARBAGE: &str = "Only garbage was found in the patch input.";
const MALFORMED: &str = "malformed patch at";
const UNEXPECTED_EOF: &str = "unexpected end of file in patch";
const ASSUME_REVERSE: &str = "Assume -R";
const FILE_NOT_FOUND: &str = "can't find file to patch";

static HUNK_SUCCEEDED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Hunk\s*#\d+\s*succeeded").expect("hunk succeeded pattern is valid")
});

static HUNK_FAILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Hunk\s*#\d+\s*FAILED").expect("hunk failed pattern is valid")
});

// Two or more "patching ..." lines, each optionally followed by a
// "Hunk #N succeeded" line: the tool touched several files before failing.
static MULTI_FILE_PROGRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(patching\s*.*\n(Hunk\s*#\d+\s*succeeded.*\n)?){2,}")
        .expect("multi-file progress pattern is valid")
});

/// Map one patch tool invocation to its outcome.
///
/// Pure and total: first matching rule wins, [`PatchOutcome::UnknownError`]
/// catches everything else.
pub fn classify(exit_status: i32, stdout: &str, stderr: &str) -> PatchOutcome {
    if exit_status == 0 {
        return if HUNK_SUCCEEDED.is_match(stdout) {
            PatchOutcome::PartiallyApplied
        } else {
            PatchOutcome::Applied
        };
    }

    if stderr.contains(FATAL_MARKER) {
        return if stderr.contains(ONLY_GARBAGE) || stderr.contains(MALFORMED) {
            PatchOutcome::MalformedInput
        } else if stderr.contains(UNEXPECTED_EOF) {
            PatchOutcome::TruncatedInput
        } else {
            PatchOutcome::UnknownError
        };
    }

    let multi_file_progress = MULTI_FILE_PROGRESS.is_match(stdout);
    let any_hunk_failed = HUNK_FAILED.is_match(stdout);

    if stdout.contains(ASSUME_REVERSE) {
        if multi_file_progress {
            PatchOutcome::HunkFailed
        } else {
            PatchOutcome::AlreadyApplied
        }
    } else if stdout.contains(FILE_NOT_FOUND) {
        if multi_file_progress {
            PatchOutcome::HunkFailed
        } else {
            PatchOutcome::FileNotFound
        }
    } else if any_hunk_failed || multi_file_progress {
        PatchOutcome::HunkFailed
    } else {
        PatchOutcome::UnknownError
    }
}
