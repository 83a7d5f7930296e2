//! Logging configuration.
//!
//! Verbosity is an explicit [`LogConfig`] value built once from the CLI and
//! handed to the collaborators that need it. The library only emits `tracing`
//! events; installing a subscriber is the binary's job.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Verbosity levels, from quietest to loudest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Warnings and errors only.
    #[default]
    Warning,
    /// Per-patch progress.
    Info,
    /// External command lines.
    Command,
    /// Raw stdout/stderr of external commands.
    ToolOutput,
}

impl LogLevel {
    /// Map a repeated `-v` count to a level, saturating at the loudest.
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => LogLevel::Warning,
            1 => LogLevel::Info,
            2 => LogLevel::Command,
            _ => LogLevel::ToolOutput,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            LogLevel::Warning => "warn",
            LogLevel::Info => "info",
            LogLevel::Command => "debug",
            LogLevel::ToolOutput => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogConfig {
    pub level: LogLevel,
}

impl LogConfig {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    pub fn from_verbosity(count: u8) -> Self {
        Self::new(LogLevel::from_verbosity(count))
    }

    /// Whether raw tool output should be captured into the log.
    pub fn logs_tool_output(&self) -> bool {
        self.level >= LogLevel::ToolOutput
    }

    /// Filter for this config. `RUST_LOG` wins when set.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("patchiman={}", self.level.directive())))
    }

    /// Install a stderr subscriber for this config.
    ///
    /// Output: stderr, compact format.
    pub fn init(&self) {
        // A subscriber may already be installed (tests); keep the first one.
        let _ = tracing_subscriber::registry()
            .with(self.filter())
            .with(fmt::layer().with_writer(std::io::stderr).compact())
            .try_init();
    }
}
