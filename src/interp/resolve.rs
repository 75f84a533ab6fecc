//! Option value resolution
//!
//! An option's value comes from the first applicable source: a value passed on
//! the command line, its environment variable, then the first default
//! candidate whose conditions pass. Private options only ever use defaults.
//!
//! A literal default is text from the configuration file, so references it
//! contains stay live and are filled by later substitutions. Everything else
//! (passed values, environment values, command output) is plain data.

use crate::config::{DefaultSource, TaskOption};
use crate::error::{is_failed_condition, InterpolationError, InterpolationResult};
use crate::interp::placeholder::unescape;
use crate::runner::{capture_command, validate_when_list, Context, When};

/// The resolved value of an option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Plain text, inserted exactly as it is
    Text(String),

    /// A default written in the configuration, still in placeholder encoding
    Template(String),
}

impl Resolved {
    /// The value as commands and conditions see it
    pub fn value(&self) -> String {
        match self {
            Resolved::Text(text) => text.clone(),
            Resolved::Template(template) => unescape(template),
        }
    }
}

/// Resolve the value of one option against the variables resolved so far
///
/// `ctx.vars` is the pool conditions are evaluated against. `passed` is the
/// value given on the command line, if the flag was present at all.
pub fn resolve_option(
    name: &str,
    option: &TaskOption,
    ctx: &Context,
    passed: Option<&str>,
) -> InterpolationResult<Resolved> {
    if !option.private {
        if let Some(value) = passed {
            log::debug!("option '{}' was passed on the command line", name);
            return Ok(Resolved::Text(value.to_string()));
        }

        if let Some(env) = option.environment() {
            if let Some(value) = ctx.env_var(env).filter(|value| !value.is_empty()) {
                log::debug!("option '{}' taken from ${}", name, env);
                return Ok(Resolved::Text(value));
            }
        }
    }

    if option.required {
        return Err(InterpolationError::MissingRequired(name.to_string()));
    }

    for (index, candidate) in option.default.iter().enumerate() {
        let conditions: Vec<When> = candidate
            .when
            .iter()
            .cloned()
            .map(When::from_config)
            .collect();

        match validate_when_list(&conditions, ctx) {
            Ok(()) => {}
            Err(e) if is_failed_condition(&e) => {
                log::debug!("option '{}' skips default #{}: {}", name, index + 1, e);
                continue;
            }
            Err(source) => {
                return Err(InterpolationError::Condition {
                    option: name.to_string(),
                    source,
                })
            }
        }

        log::debug!("option '{}' uses default #{}", name, index + 1);
        return match &candidate.source {
            DefaultSource::Value(value) => Ok(Resolved::Template(value.clone())),
            DefaultSource::Command(command) => capture_command(&unescape(command), ctx)
                .map(Resolved::Text)
                .map_err(|source| InterpolationError::DefaultCommand {
                    option: name.to_string(),
                    source,
                }),
        };
    }

    Ok(Resolved::Text(String::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultCandidate;
    use crate::error::ExecutionError;
    use std::collections::HashMap;

    fn option(yaml: &str) -> TaskOption {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_passed_value_wins() {
        std::env::set_var("BRISK_RESOLVE_PASSED", "from-env");
        let opt = option("{ environment: BRISK_RESOLVE_PASSED, default: from-default }");

        let value = resolve_option("o", &opt, &Context::new(), Some("from-flag")).unwrap().value();
        assert_eq!(value, "from-flag");

        // Presence counts, even when the value is empty
        let value = resolve_option("o", &opt, &Context::new(), Some("")).unwrap().value();
        assert_eq!(value, "");

        std::env::remove_var("BRISK_RESOLVE_PASSED");
    }

    #[test]
    fn test_environment_before_default() {
        std::env::set_var("BRISK_RESOLVE_ENV", "from-env");
        let opt = option("{ environment: BRISK_RESOLVE_ENV, default: from-default }");

        let value = resolve_option("o", &opt, &Context::new(), None).unwrap().value();
        assert_eq!(value, "from-env");

        std::env::set_var("BRISK_RESOLVE_ENV", "");
        let value = resolve_option("o", &opt, &Context::new(), None).unwrap().value();
        assert_eq!(value, "from-default");

        std::env::remove_var("BRISK_RESOLVE_ENV");
    }

    #[test]
    fn test_private_ignores_overrides() {
        let opt = TaskOption {
            private: true,
            default: vec![DefaultCandidate::value("internal")],
            ..TaskOption::default()
        };

        let value = resolve_option("o", &opt, &Context::new(), Some("outside")).unwrap().value();
        assert_eq!(value, "internal");
    }

    #[test]
    fn test_required_without_value() {
        let opt = option("{ required: true }");
        assert!(matches!(
            resolve_option("token", &opt, &Context::new(), None),
            Err(InterpolationError::MissingRequired(name)) if name == "token"
        ));
        assert_eq!(
            resolve_option("token", &opt, &Context::new(), Some("abc")).unwrap().value(),
            "abc"
        );
    }

    #[test]
    fn test_first_matching_candidate_wins() {
        let opt = option(
            r#"
default:
  - when: { option-set: missing }
    value: skipped
  - command: echo first
  - command: exit 9
"#,
        );

        let value = resolve_option("o", &opt, &Context::new(), None).unwrap().value();
        assert_eq!(value, "first");
    }

    #[test]
    fn test_candidates_see_the_pool() {
        let opt = option(
            r#"
default:
  - when: { equal: { env: prod } }
    value: big
  - value: small
"#,
        );

        let mut vars = HashMap::new();
        vars.insert("env".to_string(), "prod".to_string());
        let ctx = Context::new().with_vars(vars);
        assert_eq!(resolve_option("size", &opt, &ctx, None).unwrap().value(), "big");

        assert_eq!(resolve_option("size", &opt, &Context::new(), None).unwrap().value(), "small");
    }

    #[test]
    fn test_no_candidate_is_empty() {
        let opt = option("{ default: { when: { os: plan9 }, value: x } }");
        assert_eq!(resolve_option("o", &opt, &Context::new(), None).unwrap().value(), "");
        assert_eq!(
            resolve_option("o", &TaskOption::default(), &Context::new(), None).unwrap().value(),
            ""
        );
    }

    #[test]
    fn test_failing_default_command() {
        let opt = option("{ default: { command: exit 4 } }");
        match resolve_option("version", &opt, &Context::new(), None) {
            Err(InterpolationError::DefaultCommand { option, source }) => {
                assert_eq!(option, "version");
                assert!(matches!(source, ExecutionError::CommandFailed(Some(4))));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_condition_aborts() {
        let opt = option("{ default: [{ when: { os: [] }, value: a }, { value: b }] }");
        assert!(matches!(
            resolve_option("o", &opt, &Context::new(), None),
            Err(InterpolationError::Condition { .. })
        ));
    }

    #[test]
    fn test_literal_default_is_a_template() {
        let opt = option("{ default: 'https://${host}/api' }");
        let resolved = resolve_option("url", &opt, &Context::new(), None).unwrap();
        assert_eq!(resolved, Resolved::Template("https://${host}/api".to_string()));

        // Data from outside the file is never a template
        let resolved = resolve_option("url", &opt, &Context::new(), Some("${host}")).unwrap();
        assert_eq!(resolved, Resolved::Text("${host}".to_string()));

        let opt = option("{ default: { command: 'echo \\${host}' } }");
        let resolved = resolve_option("url", &opt, &Context::new(), None).unwrap();
        assert_eq!(resolved, Resolved::Text("${host}".to_string()));
    }

    #[test]
    fn test_escaped_literal_is_unescaped() {
        let opt = option("{ default: 'echo $${HOME}' }");
        assert_eq!(
            resolve_option("o", &opt, &Context::new(), None).unwrap().value(),
            "echo ${HOME}"
        );
    }
}
