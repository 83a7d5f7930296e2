//! Patch application outcomes.
//!
//! A run of the external patch tool produces exactly one [`PatchOutcome`].
//! The enum carries no behavior of its own: classification lives in
//! [`classify`] and the success/reason table lives in [`policy`].

pub mod classify;
pub mod policy;

pub use classify::{classify, PHRASE_SET_VERSION};
pub use policy::{failure_reason, is_success, needs_dehunk};

use std::fmt;

/// Classified result of one patch tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use = "PatchOutcome should be checked for success/failure"]
pub enum PatchOutcome {
    /// Every hunk applied at its recorded location.
    Applied,
    /// The tool detected the patch as reversed, i.e. already present.
    AlreadyApplied,
    /// Every hunk applied, at least one at an adjusted offset.
    PartiallyApplied,
    /// One or more hunks could not be located.
    HunkFailed,
    /// The input is not a recognizable patch.
    MalformedInput,
    /// A file addressed by the patch does not exist.
    FileNotFound,
    /// The patch body ended in the middle of a hunk.
    TruncatedInput,
    /// Anything the classifier does not recognize.
    UnknownError,
}

impl PatchOutcome {
    /// All outcomes, in declaration order.
    pub const ALL: [PatchOutcome; 8] = [
        PatchOutcome::Applied,
        PatchOutcome::AlreadyApplied,
        PatchOutcome::PartiallyApplied,
        PatchOutcome::HunkFailed,
        PatchOutcome::MalformedInput,
        PatchOutcome::FileNotFound,
        PatchOutcome::TruncatedInput,
        PatchOutcome::UnknownError,
    ];
}

impl fmt::Display for PatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatchOutcome::Applied => "applied",
            PatchOutcome::AlreadyApplied => "already applied",
            PatchOutcome::PartiallyApplied => "partially applied",
            PatchOutcome::HunkFailed => "hunk failed",
            PatchOutcome::MalformedInput => "malformed input",
            PatchOutcome::FileNotFound => "file not found",
            PatchOutcome::TruncatedInput => "truncated input",
            PatchOutcome::UnknownError => "unknown error",
        };
        f.write_str(name)
    }
}
