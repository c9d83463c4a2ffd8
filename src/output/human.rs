//! Human-readable output formatting

use crate::config::ScubaConfig;
use crate::output::formatter::DryRun;
use crate::shell::format_cmdline;

/// Wrap width for printed command lines
const LINE_WIDTH: usize = 80;

pub fn format_human(dry_run: &DryRun, verbose: bool) -> String {
    let mut output = String::new();

    if verbose {
        let resolved = dry_run.resolved;
        output.push_str(&format!(
            "Image:  {}\n\
             Shell:  {}\n\
             Root:   {}\n",
            resolved.image,
            resolved.shell,
            if resolved.root { "yes" } else { "no" }
        ));
        output.push_str("Script:\n");
        for line in &dry_run.invocation.command_lines {
            output.push_str(&format!("  {}\n", line));
        }
        output.push('\n');
    }

    output.push_str(&format_cmdline(&dry_run.argv(), LINE_WIDTH));
    output
}

/// One `ALIAS<TAB>IMAGE` line per alias, sorted by name.
pub fn format_aliases(config: &ScubaConfig) -> String {
    config
        .aliases
        .values()
        .map(|alias| {
            let image = alias
                .image
                .as_deref()
                .or(config.image.as_deref())
                .unwrap_or("");
            format!("{}\t{}", alias.name, image)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::YamlLoader;
    use crate::invocation::DockerInvocation;
    use crate::output::formatter::{format_output, OutputFormat};
    use crate::resolve::{resolve_with_env, CliOverrides, Selector};
    use std::collections::BTreeMap;
    use std::path::Path;

    fn config(text: &str) -> ScubaConfig {
        let root = Path::new("/proj");
        let doc = YamlLoader::new()
            .load_str(text, root, &root.join(".scuba.yml"))
            .unwrap();
        ScubaConfig::from_value(&doc, Some(root)).unwrap()
    }

    #[test]
    fn test_format_aliases() {
        let cfg = config(
            "image: alpine\naliases:\n  test: make test\n  build:\n    image: gcc\n    script: make\n",
        );
        assert_eq!(format_aliases(&cfg), "build\tgcc\ntest\talpine");
    }

    #[test]
    fn test_dry_run_output() {
        let cfg = config("image: alpine\naliases:\n  hi: echo hello world\n");
        let selector = Selector::from_tokens(&cfg, &["hi".to_string()]);
        let resolved =
            resolve_with_env(&cfg, &selector, &CliOverrides::default(), |_| None).unwrap();
        let invocation = DockerInvocation {
            argv: vec!["run".to_string(), "--rm".to_string(), "alpine".to_string()],
            env: BTreeMap::from([("A".to_string(), "b c".to_string())]),
            command_lines: vec!["echo hello world".to_string()],
        };
        let dry_run = DryRun {
            program: "docker",
            resolved: &resolved,
            invocation: &invocation,
        };

        assert_eq!(
            format_output(&dry_run, &OutputFormat::Human, false),
            "docker run --rm alpine"
        );

        let verbose = format_output(&dry_run, &OutputFormat::Human, true);
        assert!(verbose.starts_with("Image:  alpine\n"));
        assert!(verbose.contains("  echo hello world\n"));

        let json: serde_json::Value =
            serde_json::from_str(&format_output(&dry_run, &OutputFormat::Json, false)).unwrap();
        assert_eq!(json["argv"][0], "docker");
        assert_eq!(json["env"]["A"], "b c");
        assert_eq!(json["command_lines"][0], "echo hello world");
    }
}
