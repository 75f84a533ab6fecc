//! When condition evaluation
//!
//! This module handles evaluating conditional expressions for run items and
//! default candidates. A condition either passes, fails as an ordinary
//! outcome ([`ExecutionError::FailedCondition`]), or cannot be evaluated at
//! all (any other error).

use crate::error::{is_failed_condition, ExecutionError, ExecutionResult};
use crate::interp::unescape;
use crate::runner::{check_command, Context, When, WhenCondition};
use std::env;

/// Evaluate a list of when conditions (all must be true - AND logic)
pub fn evaluate_when_list(when_list: &[When], ctx: &Context) -> ExecutionResult<bool> {
    passed(validate_when_list(when_list, ctx))
}

/// Evaluate a single when condition
pub fn evaluate_when(when: &When, ctx: &Context) -> ExecutionResult<bool> {
    passed(validate_when(when, ctx))
}

/// Check a list of when conditions, reporting why the first one failed
pub fn validate_when_list(when_list: &[When], ctx: &Context) -> ExecutionResult<()> {
    for when in when_list {
        validate_when(when, ctx)?;
    }
    Ok(())
}

/// Check every condition of a single when
pub fn validate_when(when: &When, ctx: &Context) -> ExecutionResult<()> {
    for condition in &when.conditions {
        validate_condition(condition, ctx)?;
    }
    Ok(())
}

fn passed(result: ExecutionResult<()>) -> ExecutionResult<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if is_failed_condition(&e) => {
            log::debug!("{}", e);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

fn validate_condition(condition: &WhenCondition, ctx: &Context) -> ExecutionResult<()> {
    match condition {
        WhenCondition::Equal { left, right } => {
            let (left, right) = (unescape(left), unescape(right));
            check(left == right, || format!("\"{}\" is not equal to \"{}\"", left, right))
        }

        WhenCondition::NotEqual { left, right } => {
            let (left, right) = (unescape(left), unescape(right));
            check(left != right, || format!("\"{}\" is equal to \"{}\"", left, right))
        }

        WhenCondition::OptionEqual { name, values } => {
            require_name("equal", name)?;
            let Some(value) = ctx.get_var(name) else {
                return Err(failed_condition_error(&format!("'{}' is not resolved", name)));
            };
            check(values.iter().any(|v| unescape(v) == *value), || {
                format!("'{}' is \"{}\", not one of {:?}", name, value, values)
            })
        }

        WhenCondition::OptionNotEqual { name, values } => {
            require_name("not-equal", name)?;
            let Some(value) = ctx.get_var(name) else {
                return Err(failed_condition_error(&format!("'{}' is not resolved", name)));
            };
            check(values.iter().all(|v| unescape(v) != *value), || {
                format!("'{}' is \"{}\"", name, value)
            })
        }

        WhenCondition::OptionSet(name) => {
            require_name("option-set", name)?;
            let set = ctx.get_var(name).is_some_and(|value| !value.is_empty());
            check(set, || format!("option '{}' is not set", name))
        }

        WhenCondition::OptionNotSet(name) => {
            require_name("option-not-set", name)?;
            let set = ctx.get_var(name).is_some_and(|value| !value.is_empty());
            check(!set, || format!("option '{}' is set", name))
        }

        WhenCondition::Os(names) => {
            if names.is_empty() {
                return Err(ExecutionError::InvalidCondition(
                    "os requires at least one platform".to_string(),
                ));
            }
            let current = env::consts::OS;
            check(names.iter().any(|os| os.eq_ignore_ascii_case(current)), || {
                format!("running on {}, not {}", current, names.join(" or "))
            })
        }

        WhenCondition::EnvSet(var_name) => {
            require_name("env-set", var_name)?;
            check(ctx.env_var(var_name).is_some(), || {
                format!("environment variable {} is not set", var_name)
            })
        }

        WhenCondition::EnvNotSet(var_name) => {
            require_name("env-not-set", var_name)?;
            check(ctx.env_var(var_name).is_none(), || {
                format!("environment variable {} is set", var_name)
            })
        }

        WhenCondition::Exists(path) => {
            let path = unescape(path);
            if path.is_empty() {
                return Err(ExecutionError::InvalidCondition(
                    "exists requires a path".to_string(),
                ));
            }
            check(ctx.working_dir.join(&path).exists(), || {
                format!("{} does not exist", path)
            })
        }

        WhenCondition::NotExists(path) => {
            let path = unescape(path);
            if path.is_empty() {
                return Err(ExecutionError::InvalidCondition(
                    "not-exists requires a path".to_string(),
                ));
            }
            check(!ctx.working_dir.join(&path).exists(), || {
                format!("{} exists", path)
            })
        }

        WhenCondition::Command(cmd) => {
            let cmd = unescape(cmd);
            if cmd.trim().is_empty() {
                return Err(ExecutionError::InvalidCondition(
                    "command must not be empty".to_string(),
                ));
            }
            let succeeded = check_command(&cmd, ctx)?;
            check(succeeded, || format!("command '{}' failed", cmd))
        }
    }
}

fn require_name(key: &str, name: &str) -> ExecutionResult<()> {
    if name.is_empty() {
        return Err(ExecutionError::InvalidCondition(format!(
            "{} requires a name",
            key
        )));
    }
    Ok(())
}

fn check(passed: bool, reason: impl FnOnce() -> String) -> ExecutionResult<()> {
    if passed {
        Ok(())
    } else {
        Err(failed_condition_error(&reason()))
    }
}

/// Helper to create a failed condition error
pub fn failed_condition_error(reason: &str) -> ExecutionError {
    ExecutionError::FailedCondition(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn when(condition: WhenCondition) -> When {
        When {
            conditions: vec![condition],
        }
    }

    fn ctx_with(name: &str, value: &str) -> Context {
        let mut vars = HashMap::new();
        vars.insert(name.to_string(), value.to_string());
        Context::new().with_vars(vars)
    }

    #[test]
    fn test_evaluate_empty_when() {
        let ctx = Context::new();
        assert!(evaluate_when(&When::default(), &ctx).unwrap());
        assert!(evaluate_when_list(&[], &ctx).unwrap());
    }

    #[test]
    fn test_evaluate_equal() {
        let ctx = Context::new();
        let same = when(WhenCondition::Equal {
            left: "production".to_string(),
            right: "production".to_string(),
        });
        let different = when(WhenCondition::Equal {
            left: "development".to_string(),
            right: "production".to_string(),
        });

        assert!(evaluate_when(&same, &ctx).unwrap());
        assert!(!evaluate_when(&different, &ctx).unwrap());
    }

    #[test]
    fn test_equal_compares_unescaped_text() {
        let ctx = Context::new();
        let when = when(WhenCondition::Equal {
            left: "$${HOME}".to_string(),
            right: "${HOME}".to_string(),
        });
        assert!(evaluate_when(&when, &ctx).unwrap());
    }

    #[test]
    fn test_evaluate_not_equal() {
        let ctx = Context::new();
        let when = when(WhenCondition::NotEqual {
            left: "development".to_string(),
            right: "production".to_string(),
        });
        assert!(evaluate_when(&when, &ctx).unwrap());
    }

    #[test]
    fn test_option_equal_against_pool() {
        let ctx = ctx_with("env", "staging");
        let any_of = when(WhenCondition::OptionEqual {
            name: "env".to_string(),
            values: vec!["prod".to_string(), "staging".to_string()],
        });
        let not_any = when(WhenCondition::OptionNotEqual {
            name: "env".to_string(),
            values: vec!["prod".to_string(), "staging".to_string()],
        });

        assert!(evaluate_when(&any_of, &ctx).unwrap());
        assert!(!evaluate_when(&not_any, &ctx).unwrap());
    }

    #[test]
    fn test_unresolved_option_fails_as_condition() {
        let ctx = Context::new();
        let when = when(WhenCondition::OptionEqual {
            name: "env".to_string(),
            values: vec!["prod".to_string()],
        });

        let err = validate_when(&when, &ctx).unwrap_err();
        assert!(is_failed_condition(&err));
    }

    #[test]
    fn test_evaluate_command() {
        let ctx = Context::new();
        assert!(evaluate_when(&when(WhenCondition::Command("true".to_string())), &ctx).unwrap());
        assert!(!evaluate_when(&when(WhenCondition::Command("false".to_string())), &ctx).unwrap());
    }

    #[test]
    fn test_empty_command_is_invalid() {
        let ctx = Context::new();
        let err = evaluate_when(&when(WhenCondition::Command("  ".to_string())), &ctx).unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidCondition(_)));
    }

    #[test]
    fn test_evaluate_exists() {
        use tempfile::TempDir;
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("test.txt"), "test").unwrap();

        let ctx = Context::new().with_working_dir(temp_dir.path().to_path_buf());

        assert!(evaluate_when(&when(WhenCondition::Exists("test.txt".to_string())), &ctx).unwrap());
        assert!(!evaluate_when(&when(WhenCondition::Exists("nonexistent.txt".to_string())), &ctx).unwrap());
        assert!(evaluate_when(&when(WhenCondition::NotExists("nonexistent.txt".to_string())), &ctx).unwrap());
    }

    #[test]
    fn test_evaluate_os() {
        let ctx = Context::new();
        let here = when(WhenCondition::Os(vec![
            "plan9".to_string(),
            env::consts::OS.to_string(),
        ]));
        let elsewhere = when(WhenCondition::Os(vec!["plan9".to_string()]));

        assert!(evaluate_when(&here, &ctx).unwrap());
        assert!(!evaluate_when(&elsewhere, &ctx).unwrap());

        let err = evaluate_when(&when(WhenCondition::Os(Vec::new())), &ctx).unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidCondition(_)));
    }

    #[test]
    fn test_evaluate_env_set() {
        env::set_var("BRISK_WHEN_ENV_SET", "value");
        env::remove_var("BRISK_WHEN_ENV_UNSET");

        let ctx = Context::new();
        assert!(evaluate_when(&when(WhenCondition::EnvSet("BRISK_WHEN_ENV_SET".to_string())), &ctx).unwrap());
        assert!(evaluate_when(&when(WhenCondition::EnvNotSet("BRISK_WHEN_ENV_UNSET".to_string())), &ctx).unwrap());

        env::remove_var("BRISK_WHEN_ENV_SET");
    }

    #[test]
    fn test_empty_names_are_invalid() {
        let ctx = Context::new();
        for condition in [
            WhenCondition::EnvSet(String::new()),
            WhenCondition::EnvNotSet(String::new()),
            WhenCondition::OptionSet(String::new()),
            WhenCondition::OptionNotSet(String::new()),
        ] {
            let err = evaluate_when(&when(condition), &ctx).unwrap_err();
            assert!(matches!(err, ExecutionError::InvalidCondition(_)));
        }
    }

    #[test]
    fn test_option_set_ignores_empty_values() {
        let ctx = ctx_with("myoption", "");
        assert!(!evaluate_when(&when(WhenCondition::OptionSet("myoption".to_string())), &ctx).unwrap());
        assert!(evaluate_when(&when(WhenCondition::OptionNotSet("myoption".to_string())), &ctx).unwrap());

        let ctx = ctx_with("myoption", "value");
        assert!(evaluate_when(&when(WhenCondition::OptionSet("myoption".to_string())), &ctx).unwrap());
    }

    #[test]
    fn test_evaluate_when_list_one_false() {
        let ctx = ctx_with("env", "development");
        let when_list = vec![
            when(WhenCondition::OptionEqual {
                name: "env".to_string(),
                values: vec!["production".to_string()],
            }),
            when(WhenCondition::Command("true".to_string())),
        ];

        assert!(!evaluate_when_list(&when_list, &ctx).unwrap());
    }

    #[test]
    fn test_all_conditions_in_one_when_must_pass() {
        let ctx = ctx_with("env", "production");
        let both = When {
            conditions: vec![
                WhenCondition::OptionSet("env".to_string()),
                WhenCondition::Command("false".to_string()),
            ],
        };

        let err = validate_when(&both, &ctx).unwrap_err();
        assert!(matches!(err, ExecutionError::FailedCondition(ref reason) if reason.contains("false")));
    }
}
