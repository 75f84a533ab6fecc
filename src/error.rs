//! Error types for Brisk

use std::io;
use thiserror::Error;

/// Result type alias for Brisk operations
pub type Result<T> = std::result::Result<T, BriskError>;

/// Main error type for Brisk
#[derive(Error, Debug)]
pub enum BriskError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Variable interpolation errors
    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Configuration parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid option '{name}' in {scope}: {reason}")]
    InvalidOption {
        scope: String,
        name: String,
        reason: String,
    },

    #[error("Argument and option '{0}' must have unique names within a task")]
    DuplicateNames(String),

    #[error("Task '{0}' is not defined")]
    TaskNotFound(String),

    #[error("Invalid run item in task '{task}': {reason}")]
    InvalidRun { task: String, reason: String },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Option '{option}' is required by task '{task}' but is not defined")]
    OptionNotDefined { option: String, task: String },
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command failed with exit code {0:?}")]
    CommandFailed(Option<i32>),

    #[error("Failed to launch '{command}': {error}")]
    Spawn { command: String, error: String },

    #[error("Failed condition: {0}")]
    FailedCondition(String),

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    #[error("Task '{0}' is already running")]
    Recursion(String),

    #[error("Task '{0}' is not defined")]
    UnknownTask(String),

    #[error("Output of '{0}' is not valid UTF-8")]
    InvalidOutput(String),
}

/// Variable resolution and interpolation errors
#[derive(Error, Debug)]
pub enum InterpolationError {
    #[error("Task '{task}' takes {expected} argument(s) but {passed} were passed")]
    ArgumentCount {
        task: String,
        expected: usize,
        passed: usize,
    },

    #[error("No value passed for required option: {0}")]
    MissingRequired(String),

    #[error("Option '{option}' depends on '{dependency}', which is declared after it")]
    OutOfOrder { option: String, dependency: String },

    #[error("Variable '{0}' was already resolved")]
    AlreadyBound(String),

    #[error("Could not evaluate condition for option '{option}': {source}")]
    Condition {
        option: String,
        #[source]
        source: ExecutionError,
    },

    #[error("Could not compute value for option '{option}': {source}")]
    DefaultCommand {
        option: String,
        #[source]
        source: ExecutionError,
    },
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

/// Specialized result type for interpolation operations
pub type InterpolationResult<T> = std::result::Result<T, InterpolationError>;

/// Helper function to determine if an error represents a failed condition
/// (which should be treated as a skip, not a hard error)
pub fn is_failed_condition(err: &ExecutionError) -> bool {
    matches!(err, ExecutionError::FailedCondition(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_condition_is_recoverable() {
        assert!(is_failed_condition(&ExecutionError::FailedCondition(
            "os".to_string()
        )));
        assert!(!is_failed_condition(&ExecutionError::InvalidCondition(
            "empty".to_string()
        )));
        assert!(!is_failed_condition(&ExecutionError::CommandFailed(Some(1))));
    }

    #[test]
    fn test_wrapped_command_error_names_option() {
        let err = InterpolationError::DefaultCommand {
            option: "version".to_string(),
            source: ExecutionError::CommandFailed(Some(2)),
        };
        let message = err.to_string();
        assert!(message.contains("version"));
        assert!(message.contains("Some(2)"));
    }
}
