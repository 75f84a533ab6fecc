//! Dependency discovery for a task invocation
//!
//! Works out which positional arguments and which options a task needs before
//! anything is resolved. Nothing here runs commands or reads the environment.

use crate::config::{Config, Task, TaskOption, When as WhenConfig};
use crate::error::{ConfigError, ConfigResult, Result};
use crate::interp::document::{Document, Scope};
use crate::runner::When;
use std::collections::HashSet;

/// Positional argument names declared directly on a task, in file order
pub fn declared_args(config: &Config, task_name: &str) -> ConfigResult<Vec<String>> {
    if task_name.is_empty() {
        return Ok(Vec::new());
    }

    let task = config
        .tasks
        .get(task_name)
        .ok_or_else(|| ConfigError::TaskNotFound(task_name.to_string()))?;

    Ok(task.args.keys().cloned().collect())
}

/// Find the definition of an option as seen from a task.
///
/// The task's own options win, then its sub-tasks depth-first in reference
/// order, then the global options.
pub fn find_option<'a>(
    config: &'a Config,
    task_name: &str,
    option_name: &str,
) -> Option<(Scope, &'a TaskOption)> {
    let mut seen = HashSet::new();
    find_in_task(config, task_name, option_name, &mut seen)
        .or_else(|| config.options.get(option_name).map(|opt| (Scope::Global, opt)))
}

fn find_in_task<'a>(
    config: &'a Config,
    task_name: &str,
    option_name: &str,
    seen: &mut HashSet<String>,
) -> Option<(Scope, &'a TaskOption)> {
    if !seen.insert(task_name.to_string()) {
        return None;
    }

    let task = config.tasks.get(task_name)?;
    if let Some(option) = task.options.get(option_name) {
        return Some((Scope::Task(task_name.to_string()), option));
    }

    for sub_task in task.sub_tasks() {
        if let Some(found) = find_in_task(config, sub_task, option_name, seen) {
            return Some(found);
        }
    }

    None
}

/// Option names that explicitly gate a list of conditions
pub fn when_dependencies(conditions: &[WhenConfig]) -> Vec<String> {
    conditions
        .iter()
        .flat_map(|when| When::from_config(when.clone()).dependencies())
        .collect()
}

/// Every option a task invocation needs, in declaration order.
///
/// The set covers the options of the task and of every sub-task it reaches,
/// the options their `when` clauses name, the options referenced by `${name}`
/// in their bodies, and, transitively, whatever those options depend on.
pub fn required_options(doc: &Document, config: &Config, task_name: &str) -> Result<Vec<String>> {
    if task_name.is_empty() {
        return Ok(Vec::new());
    }

    let (task_key, task) = config
        .tasks
        .get_key_value(task_name)
        .ok_or_else(|| ConfigError::TaskNotFound(task_name.to_string()))?;

    let mut visited = Vec::new();
    visit_tasks(config, task_key, &mut Vec::new(), &mut visited)?;

    let mut collector = Collector::new(config, task_name, task);

    for name in &visited {
        let Some(visited_task) = config.tasks.get(*name) else {
            continue;
        };

        for option_name in visited_task.options.keys() {
            collector.require(option_name, true)?;
        }

        for dependency in visited_task
            .run_conditions()
            .flat_map(|when| When::from_config(when.clone()).dependencies())
        {
            collector.require(&dependency, true)?;
        }

        for reference in doc.task_references(name) {
            collector.require(&reference, false)?;
        }
    }

    while let Some(option_name) = collector.pending.pop() {
        let Some((scope, option)) = find_option(config, task_name, &option_name) else {
            continue;
        };

        for candidate in &option.default {
            for dependency in when_dependencies(&candidate.when) {
                collector.require(&dependency, true)?;
            }
        }

        for reference in doc.option_references(&scope, &option_name) {
            collector.require(&reference, false)?;
        }
    }

    let mut ordered: Vec<String> = Vec::new();
    for name in declaration_order(config) {
        if collector.required.contains(name) && !ordered.iter().any(|seen| seen == name) {
            ordered.push(name.to_string());
        }
    }

    log::debug!("task '{}' requires options {:?}", task_name, ordered);
    Ok(ordered)
}

/// All option names in file order: global options first, then each task's
fn declaration_order(config: &Config) -> impl Iterator<Item = &str> {
    config
        .options
        .keys()
        .chain(config.tasks.values().flat_map(|task| task.options.keys()))
        .map(String::as_str)
}

/// Depth-first walk over a task and its sub-tasks
fn visit_tasks<'a>(
    config: &'a Config,
    task_name: &'a str,
    stack: &mut Vec<&'a str>,
    visited: &mut Vec<&'a str>,
) -> ConfigResult<()> {
    if stack.contains(&task_name) {
        let mut path: Vec<&str> = stack.clone();
        path.push(task_name);
        return Err(ConfigError::CircularDependency(path.join(" -> ")));
    }

    if visited.contains(&task_name) {
        return Ok(());
    }

    let task = config
        .tasks
        .get(task_name)
        .ok_or_else(|| ConfigError::TaskNotFound(task_name.to_string()))?;

    visited.push(task_name);
    stack.push(task_name);

    for sub_task in task.sub_tasks() {
        log::trace!("task '{}' includes '{}'", task_name, sub_task);
        visit_tasks(config, sub_task, stack, visited)?;
    }

    stack.pop();
    Ok(())
}

/// Accumulates the required set
struct Collector<'a> {
    config: &'a Config,
    task_name: &'a str,
    args: HashSet<&'a str>,
    required: HashSet<String>,
    pending: Vec<String>,
}

impl<'a> Collector<'a> {
    fn new(config: &'a Config, task_name: &'a str, task: &'a Task) -> Self {
        Collector {
            config,
            task_name,
            args: task.args.keys().map(String::as_str).collect(),
            required: HashSet::new(),
            pending: Vec::new(),
        }
    }

    /// Add `name` to the set.
    ///
    /// Explicit dependencies must name a visible option; `${name}` references
    /// that name nothing are left alone for the shell.
    fn require(&mut self, name: &str, explicit: bool) -> ConfigResult<()> {
        if self.args.contains(name) || self.required.contains(name) {
            return Ok(());
        }

        if find_option(self.config, self.task_name, name).is_none() {
            if explicit {
                return Err(ConfigError::OptionNotDefined {
                    option: name.to_string(),
                    task: self.task_name.to_string(),
                });
            }
            log::trace!("'${{{}}}' does not name an option, leaving it as text", name);
            return Ok(());
        }

        self.required.insert(name.to_string());
        self.pending.push(name.to_string());
        Ok(())
    }
}
