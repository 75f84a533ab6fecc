//! Task execution types and logic
//!
//! This module contains the runtime representation of tasks and execution logic.

use crate::config;
use crate::error::{ConfigResult, ExecutionError, ExecutionResult};
use crate::interp::unescape;
use crate::runner::{evaluate_when_list, execute_command, Context, Verbosity};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Runtime task representation
///
/// This differs from config::Task by including computed fields needed during execution
#[derive(Debug, Clone)]
pub struct Task {
    /// Task name
    pub name: String,

    /// Usage description
    pub usage: Option<String>,

    /// Longer description
    pub description: Option<String>,

    /// Whether this task is private
    pub private: bool,

    /// Whether this task should run quietly
    pub quiet: bool,

    /// Run items to execute
    pub run: Vec<Run>,

    /// Finally block
    pub finally: Vec<Run>,

    /// Resolved variable values for this task execution
    pub vars: HashMap<String, String>,
}

impl Task {
    /// Create a new task from configuration
    pub fn from_config(name: String, config: config::Task) -> ConfigResult<Self> {
        config::validate_task(&name, &config)?;

        Ok(Task {
            name,
            usage: config.usage,
            description: config.description,
            private: config.private,
            quiet: config.quiet,
            run: config.run.into_iter().map(Run::from_config).collect(),
            finally: config.finally.into_iter().map(Run::from_config).collect(),
            vars: HashMap::new(),
        })
    }

    /// Set the resolved variables this task runs with
    pub fn with_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.vars = vars;
        self
    }

    /// Execute the task in the given context
    pub fn execute(&self, ctx: &mut Context) -> ExecutionResult<()> {
        if ctx.is_task_in_stack(&self.name) {
            return Err(ExecutionError::Recursion(self.name.clone()));
        }

        ctx.push_task(self.name.clone());
        ctx.print_task_start(&self.name);

        let verbosity = ctx.verbosity;
        if self.quiet && verbosity > Verbosity::Quiet {
            ctx.verbosity = Verbosity::Quiet;
        }

        // Merge task vars into context
        for (key, value) in &self.vars {
            ctx.set_var(key.clone(), value.clone());
        }

        let mut result = self.execute_items(&self.run, ctx);

        // Always run finally blocks
        if !self.finally.is_empty() {
            ctx.print_debug("Running finally block...");
            let finally = self.execute_items(&self.finally, ctx);
            // A run failure takes priority over a finally failure
            if result.is_ok() {
                result = finally;
            }
        }

        ctx.verbosity = verbosity;
        ctx.pop_task();

        if result.is_ok() {
            ctx.print_task_complete(&self.name);
        }

        result
    }

    fn execute_items(&self, items: &[Run], ctx: &mut Context) -> ExecutionResult<()> {
        for run in items {
            self.execute_run_item(run, ctx)?;
        }
        Ok(())
    }

    /// Execute a single run item
    fn execute_run_item(&self, run: &Run, ctx: &mut Context) -> ExecutionResult<()> {
        if !run.when.is_empty() && !evaluate_when_list(&run.when, ctx)? {
            ctx.print_task_skip(&self.name, "when condition not met");
            return Ok(());
        }

        for cmd in &run.commands {
            execute_command(cmd, ctx)?;
        }

        for subtask in &run.subtasks {
            self.execute_subtask(subtask, ctx)?;
        }

        for (key, value) in &run.set_environment {
            let value = value.as_deref().map(unescape);
            log::debug!("set-environment {}={:?}", key, value);
            ctx.env.insert(key.clone(), value);
        }

        Ok(())
    }

    /// Execute a subtask from the context's task registry
    fn execute_subtask(&self, name: &str, ctx: &mut Context) -> ExecutionResult<()> {
        let tasks = Arc::clone(&ctx.tasks);
        let task = tasks
            .get(name)
            .ok_or_else(|| ExecutionError::UnknownTask(name.to_string()))?;

        log::debug!("task '{}' runs sub-task '{}'", self.name, name);
        task.execute(ctx)
    }
}

/// Build runtime tasks for every task in a configuration
pub fn task_registry(config: config::Config) -> ConfigResult<HashMap<String, Task>> {
    config
        .tasks
        .into_iter()
        .map(|(name, task)| Task::from_config(name.clone(), task).map(|task| (name, task)))
        .collect()
}

/// Runtime representation of a run item
#[derive(Debug, Clone, Default)]
pub struct Run {
    /// Conditions that must be met
    pub when: Vec<When>,

    /// Commands to execute
    pub commands: Vec<Command>,

    /// Subtasks to execute
    pub subtasks: Vec<String>,

    /// Environment variables to set
    pub set_environment: IndexMap<String, Option<String>>,
}

impl Run {
    /// Create from config
    pub fn from_config(config: config::Run) -> Self {
        match config {
            config::Run::SimpleCommand(cmd) => Run {
                commands: vec![Command::Simple(cmd)],
                ..Run::default()
            },
            config::Run::Complex(item) => Run {
                when: item.when.into_iter().map(When::from_config).collect(),
                commands: item
                    .command
                    .into_iter()
                    .map(Command::from_config)
                    .collect(),
                subtasks: item.task,
                set_environment: item.set_environment,
            },
        }
    }
}

/// Runtime representation of a command
#[derive(Debug, Clone)]
pub enum Command {
    /// Simple command string
    Simple(String),

    /// Complex command with options
    Complex {
        exec: String,
        print: String,
        quiet: bool,
        dir: Option<String>,
    },
}

impl Command {
    /// Create from config
    pub fn from_config(config: config::Command) -> Self {
        match config {
            config::Command::Simple(cmd) => Command::Simple(cmd),
            config::Command::Complex(detail) => Command::Complex {
                print: detail.print.clone().unwrap_or_else(|| detail.exec.clone()),
                exec: detail.exec,
                quiet: detail.quiet,
                dir: detail.dir,
            },
        }
    }

    /// Get the command to execute
    pub fn exec(&self) -> &str {
        match self {
            Command::Simple(cmd) => cmd,
            Command::Complex { exec, .. } => exec,
        }
    }

    /// Get what to print
    pub fn print(&self) -> &str {
        match self {
            Command::Simple(cmd) => cmd,
            Command::Complex { print, .. } => print,
        }
    }

    /// Check if this command is quiet
    pub fn is_quiet(&self) -> bool {
        match self {
            Command::Simple(_) => false,
            Command::Complex { quiet, .. } => *quiet,
        }
    }

    /// Get the working directory
    pub fn dir(&self) -> Option<&str> {
        match self {
            Command::Simple(_) => None,
            Command::Complex { dir, .. } => dir.as_deref(),
        }
    }
}

/// Runtime representation of a when clause: every condition must pass
#[derive(Debug, Clone, Default)]
pub struct When {
    pub conditions: Vec<WhenCondition>,
}

impl When {
    pub fn from_config(config: config::When) -> Self {
        let mut conditions = Vec::new();

        if let Some(comparison) = config.equal {
            conditions.extend(comparison_conditions(comparison, true));
        }
        if let Some(comparison) = config.not_equal {
            conditions.extend(comparison_conditions(comparison, false));
        }
        if let Some(opt) = config.option_set {
            conditions.push(WhenCondition::OptionSet(opt));
        }
        if let Some(opt) = config.option_not_set {
            conditions.push(WhenCondition::OptionNotSet(opt));
        }
        if let Some(os) = config.os {
            conditions.push(WhenCondition::Os(os.0));
        }
        if let Some(var) = config.env_set {
            conditions.push(WhenCondition::EnvSet(var));
        }
        if let Some(var) = config.env_not_set {
            conditions.push(WhenCondition::EnvNotSet(var));
        }
        if let Some(path) = config.exists {
            conditions.push(WhenCondition::Exists(path));
        }
        if let Some(path) = config.not_exists {
            conditions.push(WhenCondition::NotExists(path));
        }
        // Commands go last so cheaper checks can short-circuit them
        if let Some(cmd) = config.command {
            conditions.push(WhenCondition::Command(cmd));
        }

        When { conditions }
    }

    /// Option names this clause reads from the resolved pool
    pub fn dependencies(&self) -> Vec<String> {
        self.conditions
            .iter()
            .filter_map(|condition| match condition {
                WhenCondition::OptionEqual { name, .. }
                | WhenCondition::OptionNotEqual { name, .. }
                | WhenCondition::OptionSet(name)
                | WhenCondition::OptionNotSet(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

fn comparison_conditions(comparison: config::Comparison, equal: bool) -> Vec<WhenCondition> {
    match comparison {
        config::Comparison::Operands { left, right } if equal => {
            vec![WhenCondition::Equal { left, right }]
        }
        config::Comparison::Operands { left, right } => {
            vec![WhenCondition::NotEqual { left, right }]
        }
        config::Comparison::Options(options) => options
            .into_iter()
            .map(|(name, values)| {
                if equal {
                    WhenCondition::OptionEqual {
                        name,
                        values: values.0,
                    }
                } else {
                    WhenCondition::OptionNotEqual {
                        name,
                        values: values.0,
                    }
                }
            })
            .collect(),
    }
}

/// Types of when conditions
#[derive(Debug, Clone)]
pub enum WhenCondition {
    Equal { left: String, right: String },
    NotEqual { left: String, right: String },
    OptionEqual { name: String, values: Vec<String> },
    OptionNotEqual { name: String, values: Vec<String> },
    Command(String),
    Exists(String),
    NotExists(String),
    Os(Vec<String>),
    EnvSet(String),
    EnvNotSet(String),
    OptionSet(String),
    OptionNotSet(String),
}
