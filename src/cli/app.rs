//! Main CLI application

use crate::cli::completion::{completion_arg, print_completion};
use crate::config::{read_config_auto, read_config_file, validate_config, Config};
use crate::error::{BriskError, ConfigError};
use crate::interp::{
    find_option, interpolate_in, load_interpolated, required_options, Document, Passed,
};
use crate::runner::{task_registry, Context, Verbosity};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;

/// Long flags owned by brisk itself
const RESERVED_LONG: &[&str] = &["file", "quiet", "silent", "verbose", "completion", "help", "version"];

/// Short flags owned by brisk itself
const RESERVED_SHORT: &[char] = &['f', 'q', 's', 'v', 'h', 'V'];

/// A command-line flag generated for an option
#[derive(Debug, Clone)]
struct Flag {
    name: String,
    is_bool: bool,
}

/// CLI application
pub struct App {
    /// The clap command
    command: Command,
    /// Raw, uninterpolated configuration text
    text: String,
    /// Configuration decoded from the raw text
    config: Config,
    /// Config file path
    config_path: PathBuf,
    /// Flags generated for each task
    flags: HashMap<String, Vec<Flag>>,
}

impl App {
    /// Create a new app from the discovered configuration file
    pub fn new() -> Result<Self, BriskError> {
        let (text, config_path) = read_config_auto()?;
        Self::from_text(text, config_path)
    }

    /// Create app with a specific config file
    pub fn with_config_file(path: PathBuf) -> Result<Self, BriskError> {
        let text = read_config_file(&path)?;
        Self::from_text(text, path)
    }

    /// Create app from configuration text read from `config_path`
    pub fn from_text(text: String, config_path: PathBuf) -> Result<Self, BriskError> {
        let doc = Document::parse(&text)?;
        let config = doc.config()?;
        validate_config(&config)?;

        let (command, flags) = build_command(&doc, &config)?;

        Ok(App {
            command,
            text,
            config,
            config_path,
            flags,
        })
    }

    /// Run the application with the process arguments
    pub fn run(self) -> Result<(), BriskError> {
        self.run_from(std::env::args_os())
    }

    /// Run the application with the given arguments
    pub fn run_from<I, T>(mut self, args: I) -> Result<(), BriskError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command.clone().get_matches_from(args);

        let verbosity = get_verbosity(&matches);
        init_logging(verbosity);

        if let Some(shell) = matches.get_one::<Shell>("completion") {
            print_completion(*shell, &mut self.command);
            return Ok(());
        }

        // Check if a task was specified
        let (task_name, task_matches) = match matches.subcommand() {
            Some((name, sub_matches)) => (name.to_string(), sub_matches),
            None => {
                self.command.print_help()?;
                println!();
                return Ok(());
            }
        };

        let passed = self.passed_values(&task_name, task_matches);
        log::debug!("task '{}' invoked with {:?}", task_name, passed);

        let mut ctx = Context::new()
            .with_config_path(self.config_path.clone())
            .with_verbosity(verbosity);

        let interpolated = interpolate_in(&ctx, &self.text, &passed, &task_name)?;
        let config = load_interpolated(&interpolated)?;

        // Set interpreter if specified in config
        if let Some(interpreter) = &config.interpreter {
            ctx = ctx.with_interpreter(interpreter.clone());
        }

        let tasks = task_registry(config)?;
        let task = tasks
            .get(&task_name)
            .cloned()
            .ok_or_else(|| ConfigError::TaskNotFound(task_name.clone()))?
            .with_vars(interpolated.vars);

        let mut ctx = ctx.with_tasks(tasks);
        task.execute(&mut ctx)?;

        Ok(())
    }

    /// Values the command line gave for a task
    ///
    /// Only flags that actually appeared count as passed; clap's own
    /// defaults for switches are left out so the option's precedence applies.
    fn passed_values(&self, task_name: &str, matches: &ArgMatches) -> Passed {
        let args = self
            .config
            .tasks
            .get(task_name)
            .map(|task| {
                task.args
                    .keys()
                    .filter_map(|name| matches.get_one::<String>(&arg_id(name)).cloned())
                    .collect()
            })
            .unwrap_or_default();

        let mut flags = HashMap::new();
        for flag in self.flags.get(task_name).into_iter().flatten() {
            if matches.value_source(&flag.name) != Some(ValueSource::CommandLine) {
                continue;
            }

            let value = if flag.is_bool {
                Some("true".to_string())
            } else {
                matches.get_one::<String>(&flag.name).cloned()
            };

            if let Some(value) = value {
                flags.insert(flag.name.clone(), value);
            }
        }

        Passed { args, flags }
    }
}

/// clap id of a positional argument, kept apart from flag ids
fn arg_id(name: &str) -> String {
    format!("<{}>", name)
}

/// Build the clap command from configuration
fn build_command(
    doc: &Document,
    config: &Config,
) -> Result<(Command, HashMap<String, Vec<Flag>>), BriskError> {
    let mut cmd = Command::new(config.name.clone().unwrap_or_else(|| "brisk".to_string()))
        .version(env!("CARGO_PKG_VERSION"))
        .about(config.usage.clone().unwrap_or_else(|| {
            "A YAML-based task runner".to_string()
        }))
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Path to brisk.yml config file")
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print command output and errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(completion_arg());

    let mut all_flags = HashMap::new();

    // Add subcommands for each task
    for (task_name, task) in &config.tasks {
        // Skip private tasks
        if task.private {
            continue;
        }

        let mut task_cmd = Command::new(task_name.clone())
            .about(task.usage.clone().unwrap_or_default());

        // Add long description if available
        if let Some(desc) = &task.description {
            task_cmd = task_cmd.long_about(desc.clone());
        }

        // Positional arguments, all required
        for (arg_name, arg) in &task.args {
            task_cmd = task_cmd.arg(
                Arg::new(arg_id(arg_name))
                    .value_name(arg_name.to_uppercase())
                    .help(arg.usage.clone().unwrap_or_default())
                    .required(true),
            );
        }

        // A task whose options cannot be collected still gets its subcommand;
        // running it reports the error
        let needed = match required_options(doc, config, task_name) {
            Ok(needed) => needed,
            Err(e) => {
                log::warn!("no flags for task '{}': {}", task_name, e);
                Vec::new()
            }
        };

        // One flag per public option the task needs
        let mut flags = Vec::new();
        for opt_name in needed {
            let Some((_, opt)) = find_option(config, task_name, &opt_name) else {
                continue;
            };
            if opt.private {
                continue;
            }
            if RESERVED_LONG.contains(&opt_name.as_str()) {
                log::warn!(
                    "option '{}' of task '{}' clashes with a built-in flag and cannot be passed",
                    opt_name,
                    task_name
                );
                continue;
            }

            let mut opt_def = Arg::new(opt_name.clone())
                .long(opt_name.clone())
                .help(
                    opt.usage
                        .clone()
                        .unwrap_or_else(|| format!("Option: {}", opt_name)),
                );

            if let Some(c) = opt.short.as_deref().and_then(|short| short.chars().next()) {
                if RESERVED_SHORT.contains(&c) {
                    log::warn!("short flag -{} of option '{}' is reserved", c, opt_name);
                } else {
                    opt_def = opt_def.short(c);
                }
            }

            if opt.is_bool() {
                opt_def = opt_def.action(ArgAction::SetTrue);
            } else {
                opt_def = opt_def.value_name(opt_name.to_uppercase());
            }

            if let Some(env) = opt.environment() {
                opt_def = opt_def.long_help(format!(
                    "{} [env: {}]",
                    opt.usage.clone().unwrap_or_default(),
                    env
                ));
            }

            task_cmd = task_cmd.arg(opt_def);
            flags.push(Flag {
                is_bool: opt.is_bool(),
                name: opt_name,
            });
        }

        all_flags.insert(task_name.clone(), flags);
        cmd = cmd.subcommand(task_cmd);
    }

    Ok((cmd, all_flags))
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Route `log` output to stderr; `RUST_LOG` overrides the verbosity flags
fn init_logging(verbosity: Verbosity) {
    let _ = env_logger::Builder::new()
        .filter_level(verbosity.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
}

/// Run the CLI application with the process arguments
pub fn run() -> Result<(), BriskError> {
    // The config file decides which subcommands exist, so find it before clap parses
    let args: Vec<String> = std::env::args().collect();
    let app = match extract_file_arg(&args) {
        Some(path) => App::with_config_file(path)?,
        None => App::new()?,
    };

    app.run_from(args)
}

/// Extract --file argument before clap parsing
fn extract_file_arg(args: &[String]) -> Option<PathBuf> {
    for (i, arg) in args.iter().enumerate() {
        if (arg == "--file" || arg == "-f") && i + 1 < args.len() {
            return Some(PathBuf::from(&args[i + 1]));
        }
        if let Some(path) = arg.strip_prefix("--file=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
options:
  region:
    short: r
    default: eu
  unused:
    default: x
tasks:
  greet:
    usage: Say hello
    args:
      name:
        usage: Who to greet
    options:
      loud:
        type: bool
      secret:
        private: true
        default: s
    run: echo ${name} ${loud} ${secret} ${region}
  hidden:
    private: true
    run: echo hidden
"#;

    fn app() -> App {
        App::from_text(CONFIG.to_string(), PathBuf::from("brisk.yml")).unwrap()
    }

    #[test]
    fn test_get_verbosity_normal() {
        let cmd = Command::new("test")
            .arg(Arg::new("quiet").long("quiet").action(ArgAction::SetTrue))
            .arg(Arg::new("silent").long("silent").action(ArgAction::SetTrue))
            .arg(Arg::new("verbose").long("verbose").action(ArgAction::SetTrue));
        let matches = cmd.get_matches_from(vec!["test"]);
        assert_eq!(get_verbosity(&matches), Verbosity::Normal);
    }

    #[test]
    fn test_extract_file_arg() {
        let args = vec![
            "brisk".to_string(),
            "--file".to_string(),
            "test.yml".to_string(),
        ];
        assert_eq!(extract_file_arg(&args), Some(PathBuf::from("test.yml")));

        let args = vec!["brisk".to_string(), "-f".to_string(), "test.yml".to_string()];
        assert_eq!(extract_file_arg(&args), Some(PathBuf::from("test.yml")));

        let args = vec!["brisk".to_string(), "--file=other.yml".to_string()];
        assert_eq!(extract_file_arg(&args), Some(PathBuf::from("other.yml")));

        assert_eq!(extract_file_arg(&["brisk".to_string()]), None);
    }

    #[test]
    fn test_subcommands_for_public_tasks() {
        let app = app();
        let names: Vec<_> = app
            .command
            .get_subcommands()
            .map(|sub| sub.get_name().to_string())
            .collect();
        assert_eq!(names, vec!["greet"]);
    }

    #[test]
    fn test_flags_cover_needed_public_options() {
        let app = app();
        let flags: Vec<_> = app.flags["greet"].iter().map(|f| f.name.as_str()).collect();
        assert_eq!(flags, vec!["region", "loud"]);
    }

    #[test]
    fn test_only_command_line_flags_are_passed() {
        let app = app();
        let matches = app
            .command
            .clone()
            .try_get_matches_from(["brisk", "greet", "Ann"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        let passed = app.passed_values("greet", sub);
        assert_eq!(passed.args, vec!["Ann"]);
        assert!(passed.flags.is_empty());

        let matches = app
            .command
            .clone()
            .try_get_matches_from(["brisk", "greet", "--loud", "-r", "us", "Ann"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        let passed = app.passed_values("greet", sub);
        assert_eq!(passed.flags["loud"], "true");
        assert_eq!(passed.flags["region"], "us");
    }

    #[test]
    fn test_broken_task_keeps_other_tasks_usable() {
        let text = r#"
tasks:
  broken:
    run:
      - when:
          option-set: ghost
        command: echo never
  fine:
    options:
      level:
        default: one
    run: echo ${level}
"#;
        let app = App::from_text(text.to_string(), PathBuf::from("brisk.yml")).unwrap();

        let names: Vec<_> = app
            .command
            .get_subcommands()
            .map(|sub| sub.get_name().to_string())
            .collect();
        assert_eq!(names, vec!["broken", "fine"]);
        assert!(app.flags["broken"].is_empty());
        assert_eq!(app.flags["fine"][0].name, "level");
    }

    #[test]
    fn test_missing_positional_is_rejected() {
        let app = app();
        assert!(app
            .command
            .clone()
            .try_get_matches_from(["brisk", "greet"])
            .is_err());
    }
}
