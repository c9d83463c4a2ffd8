//! Script normalization
//!
//! A script may be written as a bare string, or as a mapping with a
//! `script` subkey holding a string or a list of strings. Lists may
//! contain lists one level deep, which is what concatenating two
//! `!from_yaml` script references produces.

use serde_yaml::Value;

use crate::error::{Result, ScubaError};

/// An ordered, non-empty list of shell command lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script(Vec<String>);

impl Script {
    /// A script consisting of exactly one line.
    pub fn single(line: impl Into<String>) -> Self {
        Script(vec![line.into()])
    }

    /// Build a script from lines, failing if there are none.
    pub fn from_lines(lines: Vec<String>) -> Result<Self> {
        if lines.is_empty() {
            return Err(ScubaError::ScriptFormat("script must not be empty".to_string()));
        }
        Ok(Script(lines))
    }

    pub fn lines(&self) -> &[String] {
        &self.0
    }

    /// Append shell words to the last line.
    pub fn append_words(&mut self, words: &str) {
        if words.is_empty() {
            return;
        }
        if let Some(last) = self.0.last_mut() {
            last.push(' ');
            last.push_str(words);
        }
    }

    pub fn into_lines(self) -> Vec<String> {
        self.0
    }
}

/// Normalize a raw script node named `name` into a [`Script`].
pub fn normalize(node: &Value, name: &str) -> Result<Script> {
    match node {
        Value::String(line) => Ok(Script::single(line.clone())),
        Value::Mapping(map) => {
            let script = map
                .get("script")
                .filter(|v| !is_blank(v))
                .ok_or_else(|| {
                    ScubaError::ScriptFormat(format!("{}: must have a 'script' subkey", name))
                })?;

            match script {
                Value::String(line) => Ok(Script::single(line.clone())),
                Value::Sequence(items) => {
                    Script::from_lines(flatten_lines(items, &format!("{}.script", name))?)
                }
                _ => Err(ScubaError::ScriptFormat(format!(
                    "{}.script: must be a string or list",
                    name
                ))),
            }
        }
        _ => Err(ScubaError::ScriptFormat(format!(
            "{}: must be string or dict",
            name
        ))),
    }
}

fn flatten_lines(items: &[Value], name: &str) -> Result<Vec<String>> {
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(line) => lines.push(line.clone()),
            Value::Sequence(inner) => {
                for line in inner {
                    match line {
                        Value::String(line) => lines.push(line.clone()),
                        _ => return Err(element_error(name)),
                    }
                }
            }
            _ => return Err(element_error(name)),
        }
    }
    Ok(lines)
}

fn element_error(name: &str) -> ScubaError {
    ScubaError::ScriptFormat(format!(
        "{}: elements must be strings or lists of strings",
        name
    ))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
