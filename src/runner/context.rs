//! Execution context for task running
//!
//! The context tracks all the state needed while options are resolved and
//! while tasks execute. Output settings travel with it rather than living in
//! global state.

use crate::runner::Task;
use colored::Colorize;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

/// Execution context that tracks state during task execution
#[derive(Debug, Clone)]
pub struct Context {
    /// Current working directory
    pub working_dir: PathBuf,

    /// Configuration file path
    pub config_path: Option<PathBuf>,

    /// Resolved variables (args and options)
    pub vars: HashMap<String, String>,

    /// Environment overrides from `set-environment` (`None` unsets)
    pub env: HashMap<String, Option<String>>,

    /// Custom interpreter (e.g., ["bash", "-c"])
    pub interpreter: Vec<String>,

    /// Tasks available as sub-tasks
    pub tasks: Arc<HashMap<String, Task>>,

    /// Stack of tasks being executed (for detecting recursion)
    pub task_stack: Vec<String>,

    /// Verbosity level
    pub verbosity: Verbosity,
}

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

impl Verbosity {
    /// The log level that matches this verbosity
    pub fn log_level(self) -> log::LevelFilter {
        match self {
            Verbosity::Silent => log::LevelFilter::Off,
            Verbosity::Quiet => log::LevelFilter::Error,
            Verbosity::Normal => log::LevelFilter::Warn,
            Verbosity::Verbose => log::LevelFilter::Debug,
        }
    }
}

impl Context {
    /// Create a new context with default settings
    pub fn new() -> Self {
        Context {
            working_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_path: None,
            vars: HashMap::new(),
            env: HashMap::new(),
            interpreter: vec!["sh".to_string(), "-c".to_string()],
            tasks: Arc::new(HashMap::new()),
            task_stack: Vec::new(),
            verbosity: Verbosity::Normal,
        }
    }

    /// Create a context with a specific working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    /// Set the configuration file path; commands run next to it
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            self.working_dir = dir.to_path_buf();
        }
        self.config_path = Some(path);
        self
    }

    /// Set variables
    pub fn with_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.vars = vars;
        self
    }

    /// Set the tasks that can be invoked as sub-tasks
    pub fn with_tasks(mut self, tasks: HashMap<String, Task>) -> Self {
        self.tasks = Arc::new(tasks);
        self
    }

    /// Set a single variable
    pub fn set_var(&mut self, key: String, value: String) {
        self.vars.insert(key, value);
    }

    /// Get a variable value
    pub fn get_var(&self, key: &str) -> Option<&String> {
        self.vars.get(key)
    }

    /// Look up an environment variable, honoring `set-environment` overrides
    pub fn env_var(&self, key: &str) -> Option<String> {
        match self.env.get(key) {
            Some(value) => value.clone(),
            None => env::var(key).ok(),
        }
    }

    /// Set the interpreter
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Set verbosity level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Push a task onto the execution stack
    pub fn push_task(&mut self, task_name: String) {
        self.task_stack.push(task_name);
    }

    /// Pop a task from the execution stack
    pub fn pop_task(&mut self) -> Option<String> {
        self.task_stack.pop()
    }

    /// Check if a task is in the execution stack (detect recursion)
    pub fn is_task_in_stack(&self, task_name: &str) -> bool {
        self.task_stack.iter().any(|t| t == task_name)
    }

    /// Get the current task name (top of stack)
    pub fn current_task(&self) -> Option<&String> {
        self.task_stack.last()
    }

    /// Print the command about to run
    pub fn print_command(&self, command: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{} {}", "[RUN]".cyan().bold(), command);
        }
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{} {}", "[INFO]".blue(), message);
        }
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        if self.verbosity >= Verbosity::Quiet {
            eprintln!("{} {}", "[ERROR]".red().bold(), message);
        }
    }

    /// Print debug message (only in verbose mode)
    pub fn print_debug(&self, message: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("{} {}", "[DEBUG]".yellow(), message);
        }
    }

    /// Print task start message
    pub fn print_task_start(&self, task_name: &str) {
        self.print_info(&format!("Running task: {}", task_name.bold()));
    }

    /// Print task complete message
    pub fn print_task_complete(&self, task_name: &str) {
        self.print_debug(&format!("Task completed: {}", task_name));
    }

    /// Print task skip message
    pub fn print_task_skip(&self, task_name: &str, reason: &str) {
        self.print_debug(&format!("Skipping task '{}': {}", task_name, reason));
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
