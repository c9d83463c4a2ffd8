//! Layered config resolution
//!
//! Combines three layers into one [`ResolvedInvocation`]: top-level
//! defaults, then the selected alias (if any), then command-line
//! overrides, which always win.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::layer::apply_layer;
use crate::config::{
    parse_env_var, Entrypoint, Environment, Hooks, Layer, Script, ScubaConfig, Volume, Volumes,
};
use crate::error::{Result, ScubaError};
use crate::shell;

/// Settings given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub image: Option<String>,
    pub shell: Option<String>,
    /// An empty string clears the entrypoint
    pub entrypoint: Option<String>,
    /// `KEY=VALUE` or `KEY` (inherit)
    pub environment: Vec<String>,
    pub docker_args: Vec<String>,
    pub root: bool,
}

/// What the user asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// A named alias, with extra words to append to its script
    Alias { name: String, extra: Vec<String> },
    /// A literal command; empty means "the image's default command"
    Command(Vec<String>),
}

impl Selector {
    /// Interpret command-line tokens, checking the alias table first.
    pub fn from_tokens(config: &ScubaConfig, tokens: &[String]) -> Self {
        match tokens.split_first() {
            Some((first, rest)) if config.aliases.contains_key(first) => Selector::Alias {
                name: first.clone(),
                extra: rest.to_vec(),
            },
            _ => Selector::Command(tokens.to_vec()),
        }
    }
}

/// Everything needed to build one `docker run` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInvocation {
    pub image: String,
    pub environment: BTreeMap<String, String>,
    pub docker_args: Vec<String>,
    pub volumes: Vec<Volume>,
    pub shell: String,
    /// `None` means use the image's own entrypoint
    pub entrypoint: Option<Entrypoint>,
    pub root: bool,
    /// `None` means run the image's default command
    pub command_lines: Option<Script>,
    pub hooks: Hooks,
}

/// Resolve against the process environment.
pub fn resolve(
    config: &ScubaConfig,
    selector: &Selector,
    overrides: &CliOverrides,
) -> Result<ResolvedInvocation> {
    resolve_with_env(config, selector, overrides, |k| std::env::var(k).ok())
}

/// Resolve, looking up inherited environment variables with `lookup`.
pub fn resolve_with_env<F>(
    config: &ScubaConfig,
    selector: &Selector,
    overrides: &CliOverrides,
    lookup: F,
) -> Result<ResolvedInvocation>
where
    F: Fn(&str) -> Option<String>,
{
    let mut image = config.image.clone();
    let mut shell = config.shell.clone();
    let mut entrypoint = config.entrypoint.clone();
    let mut environment: Environment = config.environment.clone();
    let mut docker_args = config.docker_args.clone();
    let mut volumes: Volumes = config.volumes.clone();
    let mut root = false;

    let command_lines = match selector {
        Selector::Command(tokens) if tokens.is_empty() => None,
        Selector::Command(tokens) => Some(Script::single(shell::quote_cmd(tokens))),
        Selector::Alias { name, extra } => {
            let alias = config
                .aliases
                .get(name)
                .ok_or_else(|| ScubaError::UnknownAlias(name.clone()))?;
            debug!("Using alias {}", name);

            if alias.image.is_some() {
                image = alias.image.clone();
            }
            if alias.shell.is_some() {
                shell = alias.shell.clone();
            }
            if alias.entrypoint.is_some() {
                entrypoint = alias.entrypoint.clone();
            }
            root |= alias.root;

            apply_layer(&mut environment, alias.environment.as_ref());
            apply_layer(&mut docker_args, alias.docker_args.as_ref());
            apply_layer(&mut volumes, alias.volumes.as_ref());

            let mut script = alias.script.clone();
            script.append_words(&shell::quote_cmd(extra));
            Some(script)
        }
    };

    // Command-line overrides always win
    if let Some(cli_image) = &overrides.image {
        image = Some(cli_image.clone());
    }
    if let Some(cli_shell) = &overrides.shell {
        shell = Some(cli_shell.clone());
    }
    if let Some(cli_entrypoint) = &overrides.entrypoint {
        entrypoint = Some(if cli_entrypoint.is_empty() {
            Entrypoint::Clear
        } else {
            Entrypoint::Set(cli_entrypoint.clone())
        });
    }
    let cli_env: Environment = overrides.environment.iter().map(|s| parse_env_var(s)).collect();
    Layer::Merge(cli_env).apply(&mut environment);
    Layer::Merge(overrides.docker_args.clone()).apply(&mut docker_args);
    root |= overrides.root;

    let image = image.ok_or(ScubaError::MissingImage)?;

    let environment = environment
        .into_iter()
        .map(|(k, v)| {
            let value = v.or_else(|| lookup(&k)).unwrap_or_default();
            (k, value)
        })
        .collect();

    Ok(ResolvedInvocation {
        image,
        environment,
        docker_args,
        volumes: volumes.into_values().collect(),
        shell: shell.unwrap_or_else(|| config.shell().to_string()),
        entrypoint,
        root,
        command_lines,
        hooks: config.hooks.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::YamlLoader;
    use std::path::Path;

    fn config(text: &str) -> ScubaConfig {
        let root = Path::new("/proj");
        let doc = YamlLoader::new()
            .load_str(text, root, &root.join(".scuba.yml"))
            .unwrap();
        ScubaConfig::from_value(&doc, Some(root)).unwrap()
    }

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn run(cfg: &ScubaConfig, words: &[&str], overrides: &CliOverrides) -> Result<ResolvedInvocation> {
        let selector = Selector::from_tokens(cfg, &tokens(words));
        resolve_with_env(cfg, &selector, overrides, no_env)
    }

    fn lines(resolved: &ResolvedInvocation) -> Vec<String> {
        resolved
            .command_lines
            .clone()
            .map(Script::into_lines)
            .unwrap_or_default()
    }

    #[test]
    fn test_alias_with_extra_token() {
        let cfg = config("image: alpine\naliases:\n  build:\n    script: make -j4\n");
        let resolved = run(&cfg, &["build", "foo"], &CliOverrides::default()).unwrap();
        assert_eq!(lines(&resolved), vec!["make -j4 foo"]);
        assert_eq!(resolved.image, "alpine");
        assert_eq!(resolved.shell, "/bin/sh");
        assert!(!resolved.root);
    }

    #[test]
    fn test_alias_without_extra_tokens() {
        let cfg = config("image: alpine\naliases:\n  build: make -j4\n");
        let resolved = run(&cfg, &["build"], &CliOverrides::default()).unwrap();
        assert_eq!(lines(&resolved), vec!["make -j4"]);
    }

    #[test]
    fn test_multiline_alias_extra_tokens_go_on_last_line() {
        let cfg = config("image: alpine\naliases:\n  t:\n    script:\n      - cd src\n      - make\n");
        let resolved = run(&cfg, &["t", "all", "V=1 2"], &CliOverrides::default()).unwrap();
        assert_eq!(lines(&resolved), vec!["cd src", "make all 'V=1 2'"]);
    }

    #[test]
    fn test_raw_command_is_quoted() {
        let cfg = config("image: alpine\naliases:\n  build: make\n");
        let resolved = run(&cfg, &["echo", "hello world"], &CliOverrides::default()).unwrap();
        assert_eq!(lines(&resolved), vec!["echo 'hello world'"]);
    }

    #[test]
    fn test_no_command() {
        let cfg = config("image: alpine\n");
        let resolved = run(&cfg, &[], &CliOverrides::default()).unwrap();
        assert_eq!(resolved.command_lines, None);
    }

    #[test]
    fn test_alias_scalars_replace() {
        let cfg = config(
            "image: alpine\nshell: /bin/bash\nentrypoint: /top.sh\n\
             aliases:\n  a:\n    image: debian\n    shell: /bin/zsh\n    entrypoint:\n    root: true\n    script: ls\n",
        );
        let resolved = run(&cfg, &["a"], &CliOverrides::default()).unwrap();
        assert_eq!(resolved.image, "debian");
        assert_eq!(resolved.shell, "/bin/zsh");
        assert_eq!(resolved.entrypoint, Some(Entrypoint::Clear));
        assert!(resolved.root);

        let resolved = run(&cfg, &["ls"], &CliOverrides::default()).unwrap();
        assert_eq!(resolved.image, "alpine");
        assert_eq!(resolved.shell, "/bin/bash");
        assert_eq!(resolved.entrypoint, Some(Entrypoint::Set("/top.sh".to_string())));
    }

    #[test]
    fn test_docker_args_append() {
        let cfg = config(
            "image: alpine\ndocker_args: --privileged\n\
             aliases:\n  a:\n    docker_args: -v /x:/x\n    script: ls\n",
        );
        let resolved = run(&cfg, &["a"], &CliOverrides::default()).unwrap();
        assert_eq!(resolved.docker_args, tokens(&["--privileged", "-v", "/x:/x"]));
    }

    #[test]
    fn test_docker_args_override() {
        let cfg = config(
            "image: alpine\ndocker_args: --privileged\n\
             aliases:\n  a:\n    docker_args: !override -v /x:/x\n    script: ls\n",
        );
        let resolved = run(&cfg, &["a"], &CliOverrides::default()).unwrap();
        assert_eq!(resolved.docker_args, tokens(&["-v", "/x:/x"]));
    }

    #[test]
    fn test_docker_args_override_null_clears() {
        let cfg = config(
            "image: alpine\ndocker_args: --privileged\n\
             aliases:\n  a:\n    docker_args: !override null\n    script: ls\n",
        );
        let resolved = run(&cfg, &["a"], &CliOverrides::default()).unwrap();
        assert!(resolved.docker_args.is_empty());
    }

    #[test]
    fn test_environment_merge() {
        let cfg = config(
            "image: alpine\nenvironment:\n  A: top\n  B: top\n\
             aliases:\n  a:\n    environment:\n      B: alias\n      C: alias\n    script: ls\n",
        );
        let overrides = CliOverrides {
            environment: vec!["C=cli".to_string(), "D".to_string()],
            ..Default::default()
        };
        let resolved = run(&cfg, &["a"], &overrides).unwrap();
        assert_eq!(resolved.environment["A"], "top");
        assert_eq!(resolved.environment["B"], "alias");
        assert_eq!(resolved.environment["C"], "cli");
        assert_eq!(resolved.environment["D"], "");
    }

    #[test]
    fn test_environment_inherits_unset_values() {
        let cfg = config("image: alpine\nenvironment:\n  FROM_HOST:\n");
        let selector = Selector::Command(Vec::new());
        let resolved = resolve_with_env(&cfg, &selector, &CliOverrides::default(), |k| {
            (k == "FROM_HOST").then(|| "host-value".to_string())
        })
        .unwrap();
        assert_eq!(resolved.environment["FROM_HOST"], "host-value");
    }

    #[test]
    fn test_volumes_merge_by_container_path() {
        let cfg = config(
            "image: alpine\nvolumes:\n  /a: /host/a\n  /b: /host/b\n\
             aliases:\n  x:\n    volumes:\n      /b: /other/b\n      /c: named-c\n    script: ls\n",
        );
        let resolved = run(&cfg, &["x"], &CliOverrides::default()).unwrap();
        let summary: Vec<String> = resolved
            .volumes
            .iter()
            .map(|v| format!("{}={:?}", v.container_path.display(), v.source))
            .collect();
        assert_eq!(summary.len(), 3);
        assert!(summary[1].contains("/other/b"));
        assert!(summary[2].contains("named-c"));
    }

    #[test]
    fn test_volumes_override_replaces() {
        let cfg = config(
            "image: alpine\nvolumes:\n  /a: /srv/a\n\
             aliases:\n  x:\n    volumes: !override\n      /b: /srv/b\n    script: ls\n",
        );
        let resolved = run(&cfg, &["x"], &CliOverrides::default()).unwrap();
        assert_eq!(resolved.volumes.len(), 1);
        assert_eq!(resolved.volumes[0].container_path, Path::new("/b"));
        assert_eq!(resolved.volumes[0].host_path(), Some(Path::new("/srv/b")));
    }

    #[test]
    fn test_volumes_override_null_clears() {
        let cfg = config(
            "image: alpine\nvolumes:\n  /a: /srv/a\n\
             aliases:\n  x:\n    volumes: !override null\n    script: ls\n",
        );
        let resolved = run(&cfg, &["x"], &CliOverrides::default()).unwrap();
        assert!(resolved.volumes.is_empty());
    }

    #[test]
    fn test_environment_override_replaces() {
        let cfg = config(
            "image: alpine\nenvironment:\n  A: top\n\
             aliases:\n  x:\n    environment: !override\n      B: alias\n    script: ls\n",
        );
        let resolved = run(&cfg, &["x"], &CliOverrides::default()).unwrap();
        assert_eq!(resolved.environment.len(), 1);
        assert_eq!(resolved.environment["B"], "alias");
        assert!(!resolved.environment.contains_key("A"));
    }

    #[test]
    fn test_environment_override_null_clears() {
        let cfg = config(
            "image: alpine\nenvironment:\n  A: top\n\
             aliases:\n  x:\n    environment: !override null\n    script: ls\n",
        );
        let resolved = run(&cfg, &["x"], &CliOverrides::default()).unwrap();
        assert!(resolved.environment.is_empty());
    }

    #[test]
    fn test_cli_overrides_win() {
        let cfg = config(
            "image: alpine\ndocker_args: --privileged\n\
             aliases:\n  a:\n    image: debian\n    shell: /bin/zsh\n    script: ls\n",
        );
        let overrides = CliOverrides {
            image: Some("fedora".to_string()),
            shell: Some("/bin/bash".to_string()),
            entrypoint: Some(String::new()),
            docker_args: tokens(&["--net=host"]),
            root: true,
            ..Default::default()
        };
        let resolved = run(&cfg, &["a"], &overrides).unwrap();
        assert_eq!(resolved.image, "fedora");
        assert_eq!(resolved.shell, "/bin/bash");
        assert_eq!(resolved.entrypoint, Some(Entrypoint::Clear));
        assert_eq!(resolved.docker_args, tokens(&["--privileged", "--net=host"]));
        assert!(resolved.root);
    }

    #[test]
    fn test_missing_image() {
        let cfg = config("aliases:\n  a: ls\n");
        let err = run(&cfg, &["a"], &CliOverrides::default()).unwrap_err();
        assert!(matches!(err, ScubaError::MissingImage));

        let cfg = config("aliases:\n  a:\n    image: debian\n    script: ls\n");
        assert_eq!(run(&cfg, &["a"], &CliOverrides::default()).unwrap().image, "debian");
    }

    #[test]
    fn test_unknown_alias() {
        let cfg = config("image: alpine\n");
        let selector = Selector::Alias {
            name: "nope".to_string(),
            extra: Vec::new(),
        };
        let err = resolve_with_env(&cfg, &selector, &CliOverrides::default(), no_env).unwrap_err();
        assert!(matches!(err, ScubaError::UnknownAlias(name) if name == "nope"));
    }

    #[test]
    fn test_selector_prefers_alias() {
        let cfg = config("image: alpine\naliases:\n  ls: ls -la\n");
        assert_eq!(
            Selector::from_tokens(&cfg, &tokens(&["ls", "/"])),
            Selector::Alias {
                name: "ls".to_string(),
                extra: tokens(&["/"])
            }
        );
        assert_eq!(
            Selector::from_tokens(&cfg, &tokens(&["pwd"])),
            Selector::Command(tokens(&["pwd"]))
        );
    }
}
