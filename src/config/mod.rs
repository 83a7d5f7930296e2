pub mod loader;
pub mod schema;

pub use loader::{load_for_directory, load_from_path, load_from_str, ConfigError, CONFIG_FILE_NAME};
pub use schema::{
    Dehunk, Staging, ToolConfig, Tools, ValidationError, ValidationIssue, DEFAULT_CLEAN_DIR,
    DEFAULT_TARGET_DIR,
};
