use serde::Deserialize;
use std::fmt;

/// Default clean tree directory name.
pub const DEFAULT_CLEAN_DIR: &str = "a";
/// Default target tree directory name.
pub const DEFAULT_TARGET_DIR: &str = "b";

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    #[serde(default)]
    pub tools: Tools,
    #[serde(default)]
    pub staging: Staging,
    #[serde(default)]
    pub dehunk: Dehunk,
}

/// External executables.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Tools {
    #[serde(default = "default_patch")]
    pub patch: String,
    #[serde(default = "default_diff")]
    pub diff: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            patch: default_patch(),
            diff: default_diff(),
        }
    }
}

/// Directory names of the staging pair, relative to the staging root.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Staging {
    #[serde(default = "default_clean")]
    pub clean: String,
    #[serde(default = "default_target")]
    pub target: String,
}

impl Default for Staging {
    fn default() -> Self {
        Self {
            clean: default_clean(),
            target: default_target(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Dehunk {
    /// Appended to a patch path to keep the pre-dehunk copy.
    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,
    /// Glob patterns excluded when regenerating a patch.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for Dehunk {
    fn default() -> Self {
        Self {
            backup_suffix: default_backup_suffix(),
            exclude: default_exclude(),
        }
    }
}

fn default_patch() -> String {
    "patch".to_string()
}

fn default_diff() -> String {
    "diff".to_string()
}

fn default_clean() -> String {
    DEFAULT_CLEAN_DIR.to_string()
}

fn default_target() -> String {
    DEFAULT_TARGET_DIR.to_string()
}

fn default_backup_suffix() -> String {
    ".orig".to_string()
}

fn default_exclude() -> Vec<String> {
    vec!["*.orig".to_string()]
}

impl ToolConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.tools.patch.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "tools.patch",
            });
        }
        if self.tools.diff.trim().is_empty() {
            issues.push(ValidationIssue::MissingField { field: "tools.diff" });
        }

        for (field, name) in [
            ("staging.clean", &self.staging.clean),
            ("staging.target", &self.staging.target),
        ] {
            if name.trim().is_empty() {
                issues.push(ValidationIssue::MissingField { field });
            } else if name.contains(['/', '\\']) || name == "." || name == ".." {
                issues.push(ValidationIssue::InvalidValue {
                    field,
                    message: format!("`{name}` must be a plain directory name"),
                });
            }
        }

        if !self.staging.clean.is_empty() && self.staging.clean == self.staging.target {
            issues.push(ValidationIssue::InvalidCombo {
                message: "staging.clean and staging.target must differ".to_string(),
            });
        }

        if self.dehunk.backup_suffix.is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "dehunk.backup_suffix",
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.issues.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", rendered.join("; "))
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingField { field: &'static str },
    InvalidValue { field: &'static str, message: String },
    InvalidCombo { message: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => write!(f, "missing `{field}`"),
            ValidationIssue::InvalidValue { field, message } => {
                write!(f, "invalid `{field}`: {message}")
            }
            ValidationIssue::InvalidCombo { message } => write!(f, "{message}"),
        }
    }
}
