//! What each outcome means for the caller.

use super::PatchOutcome;

/// Whether the target tree holds at least the intended changes.
///
/// Every other outcome leaves the target untrustworthy; it must be
/// redeployed from the clean tree before the next patch.
pub fn is_success(outcome: PatchOutcome) -> bool {
    matches!(
        outcome,
        PatchOutcome::Applied | PatchOutcome::PartiallyApplied
    )
}

/// Whether the patch should be rewritten by `dehunk`.
pub fn needs_dehunk(outcome: PatchOutcome) -> bool {
    outcome == PatchOutcome::PartiallyApplied
}

/// Operator-facing reason for an unsuccessful outcome.
pub fn failure_reason(outcome: PatchOutcome) -> Option<&'static str> {
    match outcome {
        PatchOutcome::Applied | PatchOutcome::PartiallyApplied => None,
        PatchOutcome::AlreadyApplied => Some("Already applied"),
        PatchOutcome::HunkFailed => Some("Hunk failed"),
        PatchOutcome::MalformedInput => Some("Invalid format"),
        PatchOutcome::FileNotFound => Some("Can't find file to patch"),
        PatchOutcome::TruncatedInput => Some("Unexpected end of patch"),
        PatchOutcome::UnknownError => Some("Error"),
    }
}
