//! Splits handler documentation into summary, description and a hand-authored
//! operation fragment.
//!
//! ```text
//! Indicate that you like an album.
//!
//! Longer description, any number of lines.
//! ---
//! responses:
//!   '204':
//!     description: Recorded.
//! ```
//!
//! The first line is the summary, the lines up to the `---` delimiter are the
//! description, and everything after the delimiter is parsed as YAML.

use crate::merge::yaml_to_json;
use serde_json::{Map, Value};

/// Width used when expanding tabs before measuring indentation
const TAB_WIDTH: usize = 8;

/// The three parts of a handler doc string
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitDocstring {
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Hand-authored operation fields, empty when there is no `---` section
    pub overrides: Map<String, Value>,
}

/// Remove uniform indentation and surrounding blank lines.
///
/// The first line is stripped on its own since it usually starts right after
/// the opening delimiter of the doc string; the indentation removed from the
/// remaining lines is the smallest indentation among them.
pub fn trim_docstring(doc: &str) -> String {
    let expanded = doc.replace('\t', &" ".repeat(TAB_WIDTH));
    let lines: Vec<&str> = expanded.lines().collect();
    let Some((first, rest)) = lines.split_first() else {
        return String::new();
    };

    let indent = rest
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    let mut trimmed = vec![first.trim().to_string()];
    trimmed.extend(rest.iter().map(|line| {
        let mut chars = line.chars();
        let mut skipped = 0;
        while skipped < indent && chars.as_str().starts_with(char::is_whitespace) {
            chars.next();
            skipped += 1;
        }
        chars.as_str().trim_end().to_string()
    }));

    while trimmed.last().is_some_and(|line| line.is_empty()) {
        trimmed.pop();
    }
    let leading = trimmed.iter().take_while(|line| line.is_empty()).count();
    trimmed.drain(..leading);
    trimmed.join("\n")
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Split a doc string. A missing doc string yields an empty result.
///
/// # Errors
///
/// Returns a message when the section after the delimiter is not valid YAML
/// or is not a mapping.
pub fn split_docstring(doc: Option<&str>) -> Result<SplitDocstring, String> {
    let Some(doc) = doc else {
        return Ok(SplitDocstring::default());
    };
    let trimmed = trim_docstring(doc);
    let lines: Vec<&str> = trimmed.split('\n').collect();

    let cut = lines
        .iter()
        .position(|line| line.trim().starts_with("---"))
        .unwrap_or(lines.len());

    let summary = lines[..cut].first().and_then(|line| non_empty(line));
    let description = lines
        .get(1..cut)
        .and_then(|body| non_empty(&body.join("\n")));

    // Text following the dashes on the delimiter line starts the fragment.
    let mut fragment: Vec<&str> = Vec::new();
    if let Some(delimiter) = lines.get(cut) {
        let inline = delimiter.trim_start().trim_start_matches('-').trim();
        if !inline.is_empty() {
            fragment.push(inline);
        }
    }
    fragment.extend(lines.iter().skip(cut + 1).copied());
    let yaml = format!("{}\n", fragment.join("\n"));
    let overrides = parse_fragment(&yaml)?;

    Ok(SplitDocstring {
        summary,
        description,
        overrides,
    })
}

fn parse_fragment(yaml: &str) -> Result<Map<String, Value>, String> {
    if yaml.trim().is_empty() {
        return Ok(Map::new());
    }
    let parsed: serde_yaml::Value = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;
    match yaml_to_json(parsed) {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(format!(
            "expected a mapping after the `---` delimiter, found {}",
            kind_of(&other)
        )),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
