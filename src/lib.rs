//! Brisk - a YAML-based task runner
//!
//! Tasks, their positional arguments and their options are declared in a
//! `brisk.yml` file. Before a task runs, every option it needs is resolved in
//! declaration order (command line, then environment, then the first matching
//! default) and substituted into the configuration.

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod interp;
pub mod runner;

// Re-export commonly used types
pub use error::{BriskError, Result};

/// Current version of Brisk
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
