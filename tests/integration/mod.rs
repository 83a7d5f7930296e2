//! Integration tests for the patch lifecycle.

mod support;
mod system_tools;
