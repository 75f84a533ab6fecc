//! Variable resolution and interpolation
//!
//! Turns raw configuration text plus the values given on the command line into
//! fully interpolated text for one task invocation:
//!
//! 1. positional args are bound in declaration order and substituted;
//! 2. the options the task needs are resolved in declaration order, each one
//!    seeing the variables resolved before it, and substituted. A literal
//!    default keeps its own references live, so an option declared later
//!    still fills them in;
//! 3. every remaining `${...}` is escaped so it survives as literal text.
//!
//! The result decodes into a normal [`Config`](crate::config::Config) and comes
//! with the resolved variables, which become the task's execution variables.

pub mod collect;
pub mod document;
pub mod placeholder;
pub mod resolve;

pub use collect::{declared_args, find_option, required_options};
pub use document::{Document, Scope};
pub use placeholder::unescape;
pub use resolve::{resolve_option, Resolved};

use crate::config::{parse_config, validate_config, Config, TaskOption};
use crate::error::{ConfigError, InterpolationError, InterpolationResult, Result};
use crate::runner::Context;
use std::collections::HashMap;

/// Values given for the selected task on the command line
#[derive(Debug, Clone, Default)]
pub struct Passed {
    /// Positional values, in order
    pub args: Vec<String>,

    /// Option values by name; only flags that were actually given
    pub flags: HashMap<String, String>,
}

/// Result of an interpolation pass
#[derive(Debug, Clone)]
pub struct Interpolated {
    /// Interpolated configuration text
    pub text: String,

    /// Every arg and option resolved during the pass
    pub vars: HashMap<String, String>,
}

/// Interpolate `text` for `task_name` using a default context
pub fn interpolate(text: &str, passed: &Passed, task_name: &str) -> Result<Interpolated> {
    interpolate_in(&Context::new(), text, passed, task_name)
}

/// Interpolate `text` for `task_name`.
///
/// `base` supplies the working directory and output settings for commands run
/// by conditions and command defaults. An empty task name only validates the
/// definitions and escapes the text.
pub fn interpolate_in(
    base: &Context,
    text: &str,
    passed: &Passed,
    task_name: &str,
) -> Result<Interpolated> {
    let mut doc = Document::parse(text)?;
    let config = doc.config()?;
    validate_config(&config)?;

    let mut ctx = base.clone().with_vars(HashMap::new());
    if let Some(interpreter) = &config.interpreter {
        ctx = ctx.with_interpreter(interpreter.clone());
    }

    let arg_names = declared_args(&config, task_name)?;
    if arg_names.len() != passed.args.len() {
        return Err(InterpolationError::ArgumentCount {
            task: task_name.to_string(),
            expected: arg_names.len(),
            passed: passed.args.len(),
        }
        .into());
    }

    for (name, value) in arg_names.iter().zip(&passed.args) {
        bind(&mut ctx.vars, name, value)?;
        let changed = doc.substitute(name, value);
        log::trace!("arg '{}' substituted in {} place(s)", name, changed);
    }

    let required = required_options(&doc, &config, task_name)?;

    for name in &required {
        let config = doc.config()?;
        let (scope, option) = find_option(&config, task_name, name).ok_or_else(|| {
            ConfigError::OptionNotDefined {
                option: name.clone(),
                task: task_name.to_string(),
            }
        })?;

        check_order(name, option, &ctx.vars)?;

        let passed_value = passed.flags.get(name).map(String::as_str);
        let resolved = resolve_option(name, option, &ctx, passed_value)?;
        log::debug!("{} option '{}' = {:?}", scope, name, resolved);

        bind(&mut ctx.vars, name, &resolved.value())?;
        let changed = match &resolved {
            Resolved::Text(text) => doc.substitute(name, text),
            Resolved::Template(template) => doc.substitute_template(name, template),
        };
        log::trace!("option '{}' substituted in {} place(s)", name, changed);
    }

    let escaped = doc.escape_residual();
    log::trace!("escaped {} string(s) with unresolved references", escaped);

    Ok(Interpolated {
        text: doc.to_text()?,
        vars: ctx.vars,
    })
}

/// Parse interpolated text into a validated configuration
pub fn load_interpolated(interpolated: &Interpolated) -> Result<Config> {
    let config = parse_config(&interpolated.text)?;
    validate_config(&config)?;
    Ok(config)
}

/// Record a resolved variable; a name is bound at most once per pass
fn bind(pool: &mut HashMap<String, String>, name: &str, value: &str) -> InterpolationResult<()> {
    if pool.contains_key(name) {
        return Err(InterpolationError::AlreadyBound(name.to_string()));
    }
    pool.insert(name.to_string(), value.to_string());
    Ok(())
}

/// Options named by the `when` clauses of `option`'s defaults must be resolved
/// before it is
fn check_order(
    name: &str,
    option: &TaskOption,
    pool: &HashMap<String, String>,
) -> InterpolationResult<()> {
    let dependencies = option
        .default
        .iter()
        .flat_map(|candidate| collect::when_dependencies(&candidate.when));

    for dependency in dependencies {
        if !pool.contains_key(&dependency) {
            return Err(InterpolationError::OutOfOrder {
                option: name.to_string(),
                dependency,
            });
        }
    }

    Ok(())
}
