use crate::config::ConfigError;
use crate::invoke::ToolError;
use crate::outcome::PatchOutcome;
use crate::staging::StagingError;
use crate::storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

/// `errno` for a missing file or directory.
pub const ENOENT: i32 = 2;

/// Conditions that abort the current command.
///
/// Per-patch failures during apply and dehunk are not errors; they are
/// counted in the run summary.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to dehunk {patch}")]
    Dehunk { patch: PathBuf, failures: usize },

    #[error("failed to revert {patch} ({outcome})")]
    Revert {
        patch: PathBuf,
        outcome: PatchOutcome,
    },

    #[error("failed to rewrite {path}: {source}")]
    PatchWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Staging(StagingError::MissingDirectory(_)) => ENOENT,
            // Never report success for an aborted dehunk.
            Error::Dehunk { failures, .. } => clamp_exit(*failures).max(1),
            _ => 1,
        }
    }
}

/// Failure count as an exit status. Saturates at 255 so a large count can
/// never wrap around to 0.
pub fn clamp_exit(failures: usize) -> i32 {
    i32::from(u8::try_from(failures).unwrap_or(u8::MAX))
}

pub type Result<T> = std::result::Result<T, Error>;
