//! Environment variable and path expansion for config values

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::error::{Result, ScubaError};

fn var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$(?:(\$)|\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*)|)")
            .expect("valid variable pattern")
    })
}

/// Expand `$VAR`, `${VAR}` and `$$` using the process environment.
pub fn expand_env_vars(input: &str) -> Result<String> {
    expand_with(input, |name| std::env::var(name).ok())
}

/// Expand variables using `lookup`.
///
/// A referenced variable that is not set, or a `$` that does not start a
/// valid reference, is an error.
pub fn expand_with<F>(input: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut failure = None;
    let expanded = var_pattern().replace_all(input, |caps: &Captures| {
        if caps.get(1).is_some() {
            return "$".to_string();
        }
        let Some(name) = caps.get(2).or_else(|| caps.get(3)) else {
            failure.get_or_insert_with(|| {
                format!("Unable to expand string {:?} due to parsing errors", input)
            });
            return String::new();
        };
        match lookup(name.as_str()) {
            Some(value) => value,
            None => {
                failure.get_or_insert_with(|| {
                    format!(
                        "Unset environment variable {:?} used in {:?}",
                        name.as_str(),
                        input
                    )
                });
                String::new()
            }
        }
    });

    match failure {
        Some(msg) => Err(ScubaError::Schema(msg)),
        None => Ok(expanded.into_owned()),
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_home(input: &str) -> Result<String> {
    if input != "~" && !input.starts_with("~/") {
        return Ok(input.to_string());
    }
    let home = std::env::var("HOME")
        .map_err(|_| ScubaError::Schema(format!("HOME not set; cannot expand {:?}", input)))?;
    Ok(format!("{}{}", home, &input[1..]))
}

/// Make a path string absolute.
///
/// Variables and `~` are expanded first. Absolute paths are returned as-is.
/// Relative paths must start with `./` or `../` and are joined to
/// `base_dir`; without a base they are rejected.
pub fn absolutize_path(input: &str, base_dir: Option<&Path>) -> Result<PathBuf> {
    let expanded = expand_home(&expand_env_vars(input)?)?;
    let path = PathBuf::from(&expanded);
    if path.is_absolute() {
        return Ok(path);
    }

    let Some(base) = base_dir else {
        return Err(ScubaError::Schema(format!(
            "Relative path not allowed: {}",
            expanded
        )));
    };

    if !expanded.starts_with("./") && !expanded.starts_with("../") {
        return Err(ScubaError::Schema(format!(
            "Relative path must start with ./ or ../: {}",
            expanded
        )));
    }

    Ok(base.join(path))
}
