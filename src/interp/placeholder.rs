//! Placeholder scanning and substitution for strings
//!
//! A reference is written `${name}`. What a run of `$` in front of a `{`
//! means depends on its length: an odd run ends in a live reference and every
//! pair before it is one literal `$`; an even run is literal text, so
//! `$${name}` spells the literal text `${name}`. A run that is not followed by
//! `{` is always literal, which keeps shell text such as `$$` or `$HOME` as
//! written.
//!
//! Text is split into literal and reference segments before anything is
//! replaced and rendered back afterwards, so a value inserted next to a
//! reference can never change whether that reference is live.

use regex::Regex;
use std::sync::OnceLock;

/// A `$` run in front of `{`, with the reference name when one follows
fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\$+)\{(?:([A-Za-z0-9_-]+)\})?").unwrap())
}

fn dollar_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$+").unwrap())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Ref(String),
}

fn parse(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut last = 0;

    for caps in token_regex().captures_iter(text) {
        let (Some(whole), Some(run)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        literal.push_str(&text[last..whole.start()]);
        last = whole.end();

        let run = run.as_str().len();
        match caps.get(2) {
            Some(name) if run % 2 == 1 => {
                literal.push_str(&"$".repeat(run / 2));
                if !literal.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Ref(name.as_str().to_string()));
            }
            Some(name) => {
                literal.push_str(&"$".repeat(run / 2));
                literal.push('{');
                literal.push_str(name.as_str());
                literal.push('}');
            }
            // `${` that opens no valid reference is literal as written
            None if run % 2 == 1 => {
                literal.push_str(&"$".repeat(run / 2 + 1));
                literal.push('{');
            }
            None => {
                literal.push_str(&"$".repeat(run / 2));
                literal.push('{');
            }
        }
    }

    literal.push_str(&text[last..]);
    if !literal.is_empty() {
        segments.push(Segment::Text(literal));
    }
    segments
}

/// Encode literal text; `before_ref` means a live reference follows it
fn encode(literal: &str, before_ref: bool) -> String {
    dollar_run_regex()
        .replace_all(literal, |caps: &regex::Captures| {
            let run = &caps[0];
            let end = caps.get(0).map_or(literal.len(), |m| m.end());
            let next_is_brace = literal[end..].starts_with('{');
            if next_is_brace || (before_ref && end == literal.len()) {
                run.repeat(2)
            } else {
                run.to_string()
            }
        })
        .into_owned()
}

fn render(segments: &[Segment]) -> String {
    let mut out = String::new();
    let mut literal = String::new();

    for segment in segments {
        match segment {
            Segment::Text(text) => literal.push_str(text),
            Segment::Ref(name) => {
                out.push_str(&encode(&literal, true));
                literal.clear();
                out.push_str("${");
                out.push_str(name);
                out.push('}');
            }
        }
    }

    out.push_str(&encode(&literal, false));
    out
}

/// Replace every live reference for which `replace` returns segments.
///
/// Returns `None` when nothing changed.
fn rewrite<F>(text: &str, mut replace: F) -> Option<String>
where
    F: FnMut(&str) -> Option<Vec<Segment>>,
{
    let mut changed = false;
    let mut result = Vec::new();

    for segment in parse(text) {
        match segment {
            Segment::Ref(name) => match replace(&name) {
                Some(replacement) => {
                    changed = true;
                    result.extend(replacement);
                }
                None => result.push(Segment::Ref(name)),
            },
            text => result.push(text),
        }
    }

    changed.then(|| render(&result))
}

/// Names of the live references in `text`, in order of appearance
pub fn references(text: &str) -> Vec<String> {
    parse(text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Ref(name) => Some(name),
            Segment::Text(_) => None,
        })
        .collect()
}

/// Replace every live `${name}` (exact name) with the plain text `value`.
///
/// Reference-like text inside the value stays literal.
pub fn substitute(text: &str, name: &str, value: &str) -> Option<String> {
    rewrite(text, |found| {
        (found == name).then(|| vec![Segment::Text(value.to_string())])
    })
}

/// Replace every live `${name}` with `template`, itself encoded text whose
/// live references stay live for later substitutions.
pub fn substitute_template(text: &str, name: &str, template: &str) -> Option<String> {
    let replacement = parse(template);
    rewrite(text, |found| (found == name).then(|| replacement.clone()))
}

/// Make every remaining live reference inert
pub fn escape_residual(text: &str) -> Option<String> {
    rewrite(text, |found| {
        Some(vec![Segment::Text(format!("${{{}}}", found))])
    })
}

/// Decode text for the shell or a comparison; live references read as written
pub fn unescape(text: &str) -> String {
    parse(text)
        .into_iter()
        .map(|segment| match segment {
            Segment::Text(text) => text,
            Segment::Ref(name) => format!("${{{}}}", name),
        })
        .collect()
}
