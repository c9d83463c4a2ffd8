//! Turning a resolved invocation into a `docker run` command line

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::docker::{ImageConfig, ImageInspector};
use super::identity::HostIdentity;
use super::scubadir::ScubaDir;
use crate::config::{Entrypoint, Script, Volume, VolumeSource};
use crate::error::{Result, ScubaError};
use crate::init::env::{
    SCUBAINIT_GID, SCUBAINIT_GROUP, SCUBAINIT_HOOK_ROOT, SCUBAINIT_HOOK_USER, SCUBAINIT_UID,
    SCUBAINIT_UMASK, SCUBAINIT_USER, SCUBAINIT_VERBOSE,
};
use crate::resolve::ResolvedInvocation;
use crate::shell;

/// Name of the init binary, both next to `scuba` and inside the scuba dir
pub const SCUBAINIT_NAME: &str = "scubainit";

/// Exported into the container as the project root
pub const SCUBA_ROOT_VAR: &str = "SCUBA_ROOT";

/// Host-side facts that shape the invocation but are not config.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Project root, mounted at the same path in the container
    pub root_dir: PathBuf,
    /// Working directory inside the container
    pub workdir: PathBuf,
    /// Host path of the `scubainit` binary to copy in
    pub scubainit: PathBuf,
    pub identity: HostIdentity,
    pub umask: u32,
    pub tty: bool,
    pub verbose: bool,
}

/// A ready-to-run docker command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerInvocation {
    /// Arguments to `docker`, starting with `run`
    pub argv: Vec<String>,
    /// Environment passed into the container
    pub env: BTreeMap<String, String>,
    /// Lines of the generated command script
    pub command_lines: Vec<String>,
}

/// Find `scubainit` next to the running executable.
pub fn locate_scubainit() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let path = exe
        .parent()
        .map(|dir| dir.join(SCUBAINIT_NAME))
        .ok_or_else(|| ScubaError::Build("Cannot locate scubainit".to_string()))?;
    if !path.is_file() {
        return Err(ScubaError::Build(format!(
            "scubainit not found at {}",
            path.display()
        )));
    }
    Ok(path)
}

/// Build the docker command, writing generated files into `dir`.
pub fn build(
    resolved: &ResolvedInvocation,
    opts: &BuildOptions,
    dir: &ScubaDir,
    inspector: &dyn ImageInspector,
) -> Result<DockerInvocation> {
    let mut env = resolved.environment.clone();
    let mut add_env = |key: &str, value: String| -> Result<()> {
        if env.contains_key(key) {
            return Err(ScubaError::Build(format!(
                "Environment variable {} is reserved by scuba",
                key
            )));
        }
        env.insert(key.to_string(), value);
        Ok(())
    };

    add_env(SCUBA_ROOT_VAR, opts.root_dir.display().to_string())?;

    let init = dir.copy_file(SCUBAINIT_NAME, &opts.scubainit)?;

    if !resolved.root {
        add_env(SCUBAINIT_UID, opts.identity.uid.to_string())?;
        add_env(SCUBAINIT_GID, opts.identity.gid.to_string())?;
        add_env(SCUBAINIT_USER, opts.identity.user.clone())?;
        add_env(SCUBAINIT_GROUP, opts.identity.group.clone())?;
    }
    add_env(SCUBAINIT_UMASK, format!("{:04o}", opts.umask))?;
    if opts.verbose {
        add_env(SCUBAINIT_VERBOSE, "1".to_string())?;
    }

    for (name, var) in [("root", SCUBAINIT_HOOK_ROOT), ("user", SCUBAINIT_HOOK_USER)] {
        if let Some(script) = resolved.hooks.get(name) {
            let path = dir.write_file(
                &format!("hooks/{}.sh", name),
                &hook_script(&resolved.shell, script),
            )?;
            add_env(var, path.display().to_string())?;
        }
    }

    // Only ask docker about the image when something is left to it
    let image_config = if resolved.command_lines.is_none() || resolved.entrypoint.is_none() {
        inspector.image_config(&resolved.image)?
    } else {
        ImageConfig::default()
    };

    let command_lines = match &resolved.command_lines {
        Some(script) => script.lines().to_vec(),
        None => {
            let cmd = image_config.cmd.as_deref().unwrap_or_default();
            if cmd.is_empty() {
                return Err(ScubaError::Build(format!(
                    "No command given and no image-specified command for {}",
                    resolved.image
                )));
            }
            vec![shell::quote_cmd(cmd)]
        }
    };
    let command_path = dir.write_file("command.sh", &command_script(&command_lines))?;

    let entrypoint: Vec<String> = match &resolved.entrypoint {
        Some(Entrypoint::Set(path)) => vec![path.clone()],
        Some(Entrypoint::Clear) => Vec::new(),
        None => image_config.entrypoint.clone().unwrap_or_default(),
    };

    let mut argv: Vec<String> = vec!["run".into(), "-i".into(), "--rm".into()];
    if opts.tty {
        argv.push("--tty".into());
    }
    argv.extend(env.iter().map(|(k, v)| format!("--env={}={}", k, v)));

    let z = ["z".to_string()];
    argv.push(vol_opt(&opts.root_dir.display().to_string(), &opts.root_dir, &z));
    argv.push(vol_opt(
        &dir.host_path().display().to_string(),
        dir.container_root(),
        &z,
    ));
    argv.extend(resolved.volumes.iter().map(volume_arg));

    argv.push("-w".into());
    argv.push(opts.workdir.display().to_string());
    argv.push(format!("--entrypoint={}", init.display()));
    argv.extend(resolved.docker_args.iter().cloned());
    argv.push(resolved.image.clone());
    argv.extend(entrypoint);
    argv.push(resolved.shell.clone());
    argv.push(command_path.display().to_string());

    debug!("docker argv: {:?}", argv);

    Ok(DockerInvocation {
        argv,
        env,
        command_lines,
    })
}

/// `--volume=SRC:DST[:OPTS]`
pub fn vol_opt(source: &str, container_path: &Path, options: &[String]) -> String {
    let mut opt = format!("--volume={}:{}", source, container_path.display());
    if !options.is_empty() {
        opt.push(':');
        opt.push_str(&options.join(","));
    }
    opt
}

fn volume_arg(volume: &Volume) -> String {
    let source = match &volume.source {
        VolumeSource::HostPath(path) => path.display().to_string(),
        VolumeSource::Named(name) => name.clone(),
    };
    vol_opt(&source, &volume.container_path, &volume.options)
}

fn command_script(lines: &[String]) -> String {
    let mut text = String::from("# Auto-generated from scuba\nset -e\n");
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    text
}

fn hook_script(shell: &str, script: &Script) -> String {
    let mut text = format!("#!{}\n# Auto-generated from .scuba.yml\nset -e\n", shell);
    for line in script.lines() {
        text.push_str(line);
        text.push('\n');
    }
    text
}
