//! Core configuration types
//!
//! This module defines the data structures that represent a brisk.yml configuration file.
//! Every map keeps declaration order: later options may refer to earlier ones, so
//! the order in the file is part of the meaning of the file.

use indexmap::IndexMap;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Application name (optional)
    #[serde(default)]
    pub name: Option<String>,

    /// Application usage description (optional)
    #[serde(default)]
    pub usage: Option<String>,

    /// Global options, visible to every task
    #[serde(default)]
    pub options: IndexMap<String, TaskOption>,

    /// Tasks defined in the configuration
    #[serde(default)]
    pub tasks: IndexMap<String, Task>,

    /// Global interpreter to use for commands (e.g., ["sh", "-c"])
    #[serde(default)]
    pub interpreter: Option<Vec<String>>,
}

/// A task definition
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Task {
    /// Usage description for help text
    #[serde(default)]
    pub usage: Option<String>,

    /// Longer description for help text
    #[serde(default)]
    pub description: Option<String>,

    /// Whether this task is private (hidden from help)
    #[serde(default)]
    pub private: bool,

    /// Whether this task should run quietly
    #[serde(default)]
    pub quiet: bool,

    /// Positional arguments for the task, in the order they are passed
    #[serde(default)]
    pub args: IndexMap<String, Arg>,

    /// Named options (flags) scoped to the task
    #[serde(default)]
    pub options: IndexMap<String, TaskOption>,

    /// Run items to execute
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub run: Vec<Run>,

    /// Finally block - always executes, even on error
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub finally: Vec<Run>,
}

impl Task {
    /// Names of the sub-tasks this task invokes, in reference order
    pub fn sub_tasks(&self) -> impl Iterator<Item = &str> {
        self.run
            .iter()
            .chain(self.finally.iter())
            .filter_map(|run| match run {
                Run::SimpleCommand(_) => None,
                Run::Complex(item) => Some(item.task.iter().map(String::as_str)),
            })
            .flatten()
    }

    /// All `when` conditions attached to run and finally items
    pub fn run_conditions(&self) -> impl Iterator<Item = &When> {
        self.run
            .iter()
            .chain(self.finally.iter())
            .filter_map(|run| match run {
                Run::SimpleCommand(_) => None,
                Run::Complex(item) => Some(item.when.iter()),
            })
            .flatten()
    }
}

/// A run item - can be a command, subtask, or environment setter
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Run {
    /// Simple string command
    SimpleCommand(String),

    /// Complex run item with conditionals and multiple actions
    Complex(RunItem),
}

/// A complex run item with conditions and actions
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunItem {
    /// Conditions that must be met for this run item to execute
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub when: Vec<When>,

    /// Commands to execute
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub command: Vec<Command>,

    /// Subtasks to execute
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub task: Vec<String>,

    /// Environment variables to set (`null` unsets)
    #[serde(rename = "set-environment", default)]
    pub set_environment: IndexMap<String, Option<String>>,
}

/// A command to execute
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Simple string command
    Simple(String),

    /// Complex command with additional options
    Complex(CommandDetail),
}

impl Command {
    /// The command line to run
    pub fn exec(&self) -> &str {
        match self {
            Command::Simple(cmd) => cmd,
            Command::Complex(detail) => &detail.exec,
        }
    }
}

/// Detailed command specification
#[derive(Debug, Clone, Deserialize)]
pub struct CommandDetail {
    /// The command to execute
    pub exec: String,

    /// What to print when running (defaults to exec)
    #[serde(default)]
    pub print: Option<String>,

    /// Whether to suppress output
    #[serde(default)]
    pub quiet: bool,

    /// Working directory for the command
    #[serde(default)]
    pub dir: Option<String>,
}

/// A conditional expression. Every condition present must pass.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct When {
    /// Check if values are equal
    #[serde(default)]
    pub equal: Option<Comparison>,

    /// Check if values are not equal
    #[serde(rename = "not-equal", default)]
    pub not_equal: Option<Comparison>,

    /// Check if a command succeeds
    #[serde(default)]
    pub command: Option<String>,

    /// Check if a path exists
    #[serde(default)]
    pub exists: Option<String>,

    /// Check if a path does not exist
    #[serde(rename = "not-exists", default)]
    pub not_exists: Option<String>,

    /// Check the current operating system
    #[serde(default)]
    pub os: Option<StringList>,

    /// Check if environment variable is set
    #[serde(rename = "env-set", default)]
    pub env_set: Option<String>,

    /// Check if environment variable is not set
    #[serde(rename = "env-not-set", default)]
    pub env_not_set: Option<String>,

    /// Check if option is set
    #[serde(rename = "option-set", default)]
    pub option_set: Option<String>,

    /// Check if option is not set
    #[serde(rename = "option-not-set", default)]
    pub option_not_set: Option<String>,
}

/// A comparison for `equal` / `not-equal` conditions
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Comparison {
    /// Compare two interpolated strings
    Operands {
        /// Left-hand side of comparison
        left: String,
        /// Right-hand side of comparison
        right: String,
    },

    /// Compare resolved variables against one or more accepted values
    Options(IndexMap<String, StringList>),
}

/// An option (flag) definition
#[derive(Debug, Clone, Deserialize)]
pub struct TaskOption {
    /// Usage description for help text
    #[serde(default)]
    pub usage: Option<String>,

    /// Short flag (single character)
    #[serde(default)]
    pub short: Option<String>,

    /// Option type (string, bool, integer, etc.)
    #[serde(rename = "type", default = "default_value_type")]
    pub option_type: String,

    /// Default candidates, tried in order
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub default: Vec<DefaultCandidate>,

    /// Required option
    #[serde(default)]
    pub required: bool,

    /// Environment variable to read from
    #[serde(default)]
    pub environment: Option<String>,

    /// Private option (only ever takes its default)
    #[serde(default)]
    pub private: bool,
}

impl TaskOption {
    /// Whether this option is a boolean switch on the command line
    pub fn is_bool(&self) -> bool {
        matches!(self.option_type.as_str(), "bool" | "boolean")
    }

    /// Environment variable name, when one is configured
    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref().filter(|env| !env.is_empty())
    }
}

impl Default for TaskOption {
    fn default() -> Self {
        TaskOption {
            usage: None,
            short: None,
            option_type: default_value_type(),
            default: Vec::new(),
            required: false,
            environment: None,
            private: false,
        }
    }
}

fn default_value_type() -> String {
    "string".to_string()
}

/// An argument (positional parameter) definition
#[derive(Debug, Clone, Deserialize)]
pub struct Arg {
    /// Usage description for help text
    #[serde(default)]
    pub usage: Option<String>,

    /// Argument type (informational)
    #[serde(rename = "type", default = "default_value_type")]
    pub arg_type: String,
}

/// One conditionally-applicable default for an option
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawDefault")]
pub struct DefaultCandidate {
    /// Conditions gating this candidate (empty passes)
    pub when: Vec<When>,

    /// Where the value comes from
    pub source: DefaultSource,
}

/// The value of a default candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultSource {
    /// A literal value
    Value(String),

    /// A shell command whose trimmed stdout becomes the value
    Command(String),
}

impl DefaultCandidate {
    /// Unconditional literal candidate
    pub fn value(value: impl Into<String>) -> Self {
        DefaultCandidate {
            when: Vec::new(),
            source: DefaultSource::Value(value.into()),
        }
    }
}

/// A default as written in the file: a bare scalar or a `when`/`value`/`command` mapping
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDefault {
    Structured(DefaultDetail),
    Literal(Value),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DefaultDetail {
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    when: Vec<When>,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    command: Option<String>,
}

impl TryFrom<RawDefault> for DefaultCandidate {
    type Error = String;

    fn try_from(raw: RawDefault) -> Result<Self, Self::Error> {
        match raw {
            RawDefault::Literal(value) => scalar_to_string(value)
                .map(DefaultCandidate::value)
                .ok_or_else(|| {
                    "default must be a value or a mapping of when/value/command".to_string()
                }),
            RawDefault::Structured(detail) => {
                let value = match detail.value {
                    Some(value) => Some(
                        scalar_to_string(value)
                            .ok_or_else(|| "default value must be a scalar".to_string())?,
                    ),
                    None => None,
                };
                let source = match (value, detail.command) {
                    (Some(value), Some(command)) if !value.is_empty() && !command.is_empty() => {
                        return Err(format!(
                            "value ({}) and command ({}) are both defined",
                            value, command
                        ));
                    }
                    (_, Some(command)) if !command.is_empty() => DefaultSource::Command(command),
                    (value, _) => DefaultSource::Value(value.unwrap_or_default()),
                };
                Ok(DefaultCandidate {
                    when: detail.when,
                    source,
                })
            }
        }
    }
}

/// A list of strings that may be written as a single scalar
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringList(pub Vec<String>);

impl<'de> Deserialize<'de> for StringList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let items = match Value::deserialize(deserializer)? {
            Value::Sequence(seq) => seq,
            Value::Null => Vec::new(),
            other => vec![other],
        };

        items
            .into_iter()
            .map(|item| {
                scalar_to_string(item)
                    .ok_or_else(|| D::Error::custom("expected a string or a list of strings"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(StringList)
    }
}

/// Render a YAML scalar the way it was written
fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

/// Custom deserializer for fields that accept either one item or a list of items
fn deserialize_one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Sequence(seq) => seq,
        // Null or not present
        Value::Null => return Ok(Vec::new()),
        other => vec![other],
    };

    items
        .into_iter()
        .map(|item| serde_yaml::from_value(item).map_err(D::Error::custom))
        .collect()
}
