//! JSON output formatting

use serde_json::json;

use crate::output::formatter::DryRun;

pub fn format_json(dry_run: &DryRun) -> String {
    let data = json!({
        "argv": dry_run.argv(),
        "env": dry_run.invocation.env,
        "command_lines": dry_run.invocation.command_lines,
        "image": dry_run.resolved.image,
        "root": dry_run.resolved.root,
    });

    serde_json::to_string_pretty(&data).unwrap_or_else(|_| "{}".to_string())
}
