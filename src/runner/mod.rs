//! Task execution engine
//!
//! This module handles the execution of tasks, including command running,
//! conditional logic, and sub-task dispatch.

pub mod command;
pub mod context;
pub mod task;
pub mod when;

// Re-export main types
pub use command::*;
pub use context::*;
pub use task::*;
pub use when::*;
