//! Patchiman: manage a set of unified-diff patches against a project tree.
//!
//! Patches are trial-applied inside a staging pair of directories, the raw
//! output of the external `patch` tool is classified into a fixed outcome
//! taxonomy, and the outcome drives what happens next: redeploy the target
//! after a failure, or regenerate ("dehunk") a patch that only partially
//! matched.
//!
//! # Architecture
//!
//! - [`outcome`]: pure classification of tool diagnostics.
//! - [`invoke`]: the `patch` / `diff` executables behind [`ExternalTools`].
//! - [`staging`]: clean/target directory pair and ephemeral staging roots.
//! - [`orchestrator`]: apply, dehunk and revert over an ordered patch list.
//! - [`storage`]: original/postponed/committed bookkeeping.
//!
//! # Example
//!
//! ```no_run
//! use patchiman::{LogConfig, Orchestrator, PatchReport, StagingPair, ToolConfig};
//! use std::path::{Path, PathBuf};
//!
//! let config = ToolConfig::default();
//! let pair = StagingPair::open(Path::new("."), &config.staging).unwrap();
//! let orchestrator = Orchestrator::from_config(&config, LogConfig::default());
//!
//! let mut reports: Vec<PatchReport> = Vec::new();
//! let failures = orchestrator
//!     .apply(&pair, &[PathBuf::from("fix.patch")], &mut reports)
//!     .unwrap();
//! println!("{failures} patch(es) failed");
//! ```

pub mod config;
pub mod error;
pub mod invoke;
pub mod logging;
pub mod orchestrator;
pub mod outcome;
pub mod staging;
pub mod storage;

// Re-exports
pub use config::{load_for_directory, ConfigError, ToolConfig};
pub use error::{Error, Result};
pub use invoke::{ExternalTools, SystemTools, ToolError, ToolOutput};
pub use logging::{LogConfig, LogLevel};
pub use orchestrator::{Orchestrator, PatchReport, Reporter};
pub use outcome::{classify, failure_reason, is_success, PatchOutcome};
pub use staging::{StagingError, StagingPair};
pub use storage::{StorageCategory, StorageError};
