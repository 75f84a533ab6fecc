//! The configuration document as the engine sees it
//!
//! The raw text is parsed once into an order-preserving YAML tree. Substitution
//! rewrites string scalars in place (mapping keys are never touched), so a
//! substituted value can never change the shape of the document. The typed
//! [`Config`] is re-derived from the tree whenever a step needs it.

use crate::config::{decode_config, parse_tree, Config};
use crate::error::Result;
use crate::interp::placeholder;
use serde_yaml::Value;

/// Where an option definition lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// The top-level `options` mapping
    Global,

    /// The `options` mapping of the named task
    Task(String),
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Global => write!(f, "global options"),
            Scope::Task(name) => write!(f, "task '{}'", name),
        }
    }
}

/// A parsed, not yet interpolated configuration document
#[derive(Debug, Clone)]
pub struct Document {
    root: Value,
}

impl Document {
    /// Parse raw configuration text
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Document {
            root: parse_tree(text)?,
        })
    }

    /// Decode the typed definition model from the current tree
    pub fn config(&self) -> Result<Config> {
        decode_config(&self.root)
    }

    /// Replace every live reference to `name` with `value`.
    ///
    /// Returns the number of strings that changed.
    pub fn substitute(&mut self, name: &str, value: &str) -> usize {
        let mut changed = 0;
        for_each_string_mut(&mut self.root, &mut |s: &mut String| {
            if let Some(updated) = placeholder::substitute(s, name, value) {
                *s = updated;
                changed += 1;
            }
        });
        changed
    }

    /// Replace every live reference to `name` with `template`, keeping the
    /// references inside the template live.
    pub fn substitute_template(&mut self, name: &str, template: &str) -> usize {
        let mut changed = 0;
        for_each_string_mut(&mut self.root, &mut |s: &mut String| {
            if let Some(updated) = placeholder::substitute_template(s, name, template) {
                *s = updated;
                changed += 1;
            }
        });
        changed
    }

    /// Escape every reference that is still live
    pub fn escape_residual(&mut self) -> usize {
        let mut changed = 0;
        for_each_string_mut(&mut self.root, &mut |s: &mut String| {
            if let Some(updated) = placeholder::escape_residual(s) {
                *s = updated;
                changed += 1;
            }
        });
        changed
    }

    /// Live references anywhere in the definition of a task
    pub fn task_references(&self, task: &str) -> Vec<String> {
        self.root
            .get("tasks")
            .and_then(|tasks| tasks.get(task))
            .map(collect_references)
            .unwrap_or_default()
    }

    /// Live references anywhere in the definition of an option
    pub fn option_references(&self, scope: &Scope, option: &str) -> Vec<String> {
        let options = match scope {
            Scope::Global => self.root.get("options"),
            Scope::Task(task) => self
                .root
                .get("tasks")
                .and_then(|tasks| tasks.get(task.as_str()))
                .and_then(|task| task.get("options")),
        };

        options
            .and_then(|options| options.get(option))
            .map(collect_references)
            .unwrap_or_default()
    }

    /// Serialize the current tree back to YAML text
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.root)?)
    }
}

fn collect_references(value: &Value) -> Vec<String> {
    let mut names = Vec::new();
    for_each_string(value, &mut |s: &str| {
        for name in placeholder::references(s) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    });
    names
}

fn for_each_string(value: &Value, f: &mut dyn FnMut(&str)) {
    match value {
        Value::String(s) => f(s),
        Value::Sequence(seq) => {
            for item in seq {
                for_each_string(item, f);
            }
        }
        Value::Mapping(map) => {
            for item in map.values() {
                for_each_string(item, f);
            }
        }
        Value::Tagged(tagged) => for_each_string(&tagged.value, f),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn for_each_string_mut(value: &mut Value, f: &mut dyn FnMut(&mut String)) {
    match value {
        Value::String(s) => f(s),
        Value::Sequence(seq) => {
            for item in seq {
                for_each_string_mut(item, f);
            }
        }
        Value::Mapping(map) => {
            for item in map.values_mut() {
                for_each_string_mut(item, f);
            }
        }
        Value::Tagged(tagged) => for_each_string_mut(&mut tagged.value, f),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
options:
  region:
    default: "${zone}-1"
tasks:
  greet:
    args:
      name:
        usage: Who to greet
    options:
      loud:
        default:
          command: echo ${name}
    run: echo "${name} says ${greeting}"
"#;

    #[test]
    fn test_empty_document_is_empty_config() {
        let doc = Document::parse("# nothing here\n").unwrap();
        let config = doc.config().unwrap();
        assert!(config.tasks.is_empty());
    }

    #[test]
    fn test_substitute_rewrites_values_not_keys() {
        let mut doc = Document::parse("tasks:\n  ${name}:\n    run: echo ${name}\n").unwrap();
        assert_eq!(doc.substitute("name", "Ann"), 1);

        let config = doc.config().unwrap();
        assert!(config.tasks.contains_key("${name}"));
    }

    #[test]
    fn test_value_cannot_change_structure() {
        let mut doc = Document::parse("tasks:\n  t:\n    run: echo ${msg}\n").unwrap();
        doc.substitute("msg", "a\ntasks:\n  evil: {}");

        let config = doc.config().unwrap();
        assert_eq!(config.tasks.len(), 1);
    }

    #[test]
    fn test_task_references() {
        let doc = Document::parse(YAML).unwrap();
        assert_eq!(doc.task_references("greet"), vec!["name", "greeting"]);
        assert!(doc.task_references("missing").is_empty());
    }

    #[test]
    fn test_option_references() {
        let doc = Document::parse(YAML).unwrap();
        assert_eq!(doc.option_references(&Scope::Global, "region"), vec!["zone"]);
        assert_eq!(
            doc.option_references(&Scope::Task("greet".to_string()), "loud"),
            vec!["name"]
        );
    }

    #[test]
    fn test_escape_then_reserialize_is_stable() {
        let mut doc = Document::parse(YAML).unwrap();
        doc.escape_residual();
        let first = doc.to_text().unwrap();

        let mut again = Document::parse(&first).unwrap();
        assert_eq!(again.escape_residual(), 0);
        assert_eq!(again.to_text().unwrap(), first);
    }
}
