//! Shell quoting helpers

use crate::error::{Result, ScubaError};

/// Join words into a single command line, quoting only where needed.
pub fn quote_cmd<I, S>(words: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    shell_words::join(words)
}

/// Split a string into words using POSIX shell rules.
pub fn split(input: &str) -> Result<Vec<String>> {
    shell_words::split(input)
        .map_err(|e| ScubaError::Schema(format!("Unable to split {:?}: {}", input, e)))
}

/// Format args into a shell-quoted command line.
///
/// Lines are wrapped at `max_width` characters where possible, never
/// breaking a single argument. Continuation lines end in ` \`.
pub fn format_cmdline(args: &[String], max_width: usize) -> String {
    // leave room for " \"
    let max_width = max_width.saturating_sub(2);

    let mut lines = Vec::new();
    let mut line = String::new();
    for arg in args {
        let quoted = shell_words::quote(arg);
        if !line.is_empty() && line.len() + quoted.len() + 1 > max_width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&quoted);
    }
    lines.push(line);

    lines.join(" \\\n")
}
