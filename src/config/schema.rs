//! Configuration validation
//!
//! This module provides validation logic for configuration files. Every option
//! definition is checked here once, before any value is resolved.

use crate::config::types::{Config, Run, Task, TaskOption};
use crate::error::{ConfigError, ConfigResult};
use std::collections::HashSet;

/// Validate a complete configuration
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    for (name, option) in &config.options {
        validate_option("global options", name, option)?;
    }

    // Validate each task
    for (name, task) in &config.tasks {
        validate_task(name, task)?;
    }

    // Check for circular dependencies between tasks
    detect_circular_task_dependencies(config)?;

    Ok(())
}

/// Validate a single task
pub fn validate_task(name: &str, task: &Task) -> ConfigResult<()> {
    // Check for duplicate names between args and options
    for arg_name in task.args.keys() {
        if task.options.contains_key(arg_name) {
            return Err(ConfigError::DuplicateNames(arg_name.clone()));
        }
    }

    for arg in task.args.values() {
        validate_value_type(&arg.arg_type)?;
    }

    for run in task.run.iter().chain(task.finally.iter()) {
        validate_run(name, run)?;
    }

    let scope = format!("task '{}'", name);
    for (opt_name, option) in &task.options {
        validate_option(&scope, opt_name, option)?;
    }

    Ok(())
}

/// A run item either runs commands or sub-tasks, never both
fn validate_run(task_name: &str, run: &Run) -> ConfigResult<()> {
    let Run::Complex(item) = run else {
        return Ok(());
    };

    if !item.command.is_empty() && !item.task.is_empty() {
        let commands: Vec<&str> = item.command.iter().map(|cmd| cmd.exec()).collect();
        return Err(ConfigError::InvalidRun {
            task: task_name.to_string(),
            reason: format!(
                "command ({}) and subtask ({}) are both defined",
                commands.join(", "),
                item.task.join(", ")
            ),
        });
    }

    Ok(())
}

/// Validate one option definition
pub fn validate_option(scope: &str, name: &str, option: &TaskOption) -> ConfigResult<()> {
    let invalid = |reason: String| ConfigError::InvalidOption {
        scope: scope.to_string(),
        name: name.to_string(),
        reason,
    };

    if let Some(short) = &option.short {
        if short.chars().count() > 1 {
            return Err(invalid(format!(
                "short name \"{}\" cannot exceed one character",
                short
            )));
        }
    }

    if option.private && option.required {
        return Err(invalid(
            "option cannot be both private and required".to_string(),
        ));
    }

    if option.private {
        if let Some(env) = option.environment() {
            return Err(invalid(format!(
                "environment variable \"{}\" defined for private option",
                env
            )));
        }
    }

    if option.required && !option.default.is_empty() {
        return Err(invalid(
            "default value defined for required option".to_string(),
        ));
    }

    validate_value_type(&option.option_type)
        .map_err(|e| invalid(e.to_string()))?;

    Ok(())
}

/// Validate an option or argument type string
fn validate_value_type(value_type: &str) -> ConfigResult<()> {
    match value_type {
        "string" | "bool" | "boolean" | "int" | "integer" | "float" => Ok(()),
        _ => Err(ConfigError::Invalid(format!(
            "Invalid type: {}. Must be one of: string, bool, int, float",
            value_type
        ))),
    }
}

/// Detect circular dependencies in task subtask relationships
fn detect_circular_task_dependencies(config: &Config) -> ConfigResult<()> {
    let mut visited = HashSet::new();
    for task_name in config.tasks.keys() {
        let mut stack = Vec::new();
        check_task_cycle(config, task_name, &mut visited, &mut stack)?;
    }
    Ok(())
}

/// Recursively check for cycles in task dependencies
fn check_task_cycle(
    config: &Config,
    task_name: &str,
    visited: &mut HashSet<String>,
    stack: &mut Vec<String>,
) -> ConfigResult<()> {
    // Check if we've found a cycle
    if stack.iter().any(|name| name == task_name) {
        stack.push(task_name.to_string());
        return Err(ConfigError::CircularDependency(stack.join(" -> ")));
    }

    // Skip if already fully processed
    if visited.contains(task_name) {
        return Ok(());
    }

    let task = config
        .tasks
        .get(task_name)
        .ok_or_else(|| ConfigError::TaskNotFound(task_name.to_string()))?;

    stack.push(task_name.to_string());

    for subtask_name in task.sub_tasks() {
        check_task_cycle(config, subtask_name, visited, stack)?;
    }

    // Remove from stack and mark as visited
    stack.pop();
    visited.insert(task_name.to_string());

    Ok(())
}
