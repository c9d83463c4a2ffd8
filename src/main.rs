//! Scuba CLI - run commands in a Docker container as yourself

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::debug;

use scuba::cli::Args;
use scuba::config::{self, find_config, Discovered, ScubaConfig};
use scuba::invocation::{
    self, build, current_umask, ensure_local_docker, locate_scubainit, BuildOptions, DockerCli,
    HostIdentity, ScubaDir,
};
use scuba::output::{format_aliases, format_output, DryRun};
use scuba::resolve::{resolve, ResolvedInvocation, Selector};
use scuba::{logging, Result, ScubaError};

fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("scuba: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

fn run(args: Args) -> Result<i32> {
    let cwd = std::env::current_dir()?;
    let (config, found) = load(&cwd, args.image.is_some())?;

    if args.list_aliases {
        let listing = format_aliases(&config);
        if !listing.is_empty() {
            println!("{}", listing);
        }
        return Ok(0);
    }

    let overrides = args.overrides()?;
    let selector = Selector::from_tokens(&config, &args.command);
    let resolved = resolve(&config, &selector, &overrides)?;

    ensure_local_docker()?;

    let workdir = if found.rel.as_os_str().is_empty() {
        found.root.clone()
    } else {
        found.root.join(&found.rel)
    };
    let opts = BuildOptions {
        root_dir: found.root.clone(),
        workdir,
        scubainit: locate_scubainit()?,
        identity: HostIdentity::current(),
        umask: current_umask(),
        tty: std::io::stdout().is_terminal(),
        verbose: args.verbose,
    };

    let docker = DockerCli::new();
    let dir = ScubaDir::new()?;
    let result = execute(&args, &resolved, &opts, &dir, &docker);

    if args.keep_tempfiles {
        let path = dir.keep();
        eprintln!("Temp files not cleaned up: {}", path.display());
    }
    result
}

fn execute(
    args: &Args,
    resolved: &ResolvedInvocation,
    opts: &BuildOptions,
    dir: &ScubaDir,
    docker: &DockerCli,
) -> Result<i32> {
    let docker_run = build(resolved, opts, dir, docker)?;

    if args.dry_run {
        let dry_run = DryRun {
            program: docker.program(),
            resolved,
            invocation: &docker_run,
        };
        println!("{}", format_output(&dry_run, &args.output_format(), args.verbose));
        return Ok(0);
    }

    invocation::run(docker, &docker_run)
}

/// Find and load `.scuba.yml`, or fall back to an empty config when the
/// image comes from the command line.
fn load(cwd: &Path, have_image: bool) -> Result<(ScubaConfig, Discovered)> {
    match find_config(cwd) {
        Ok(found) => {
            debug!("Using {}", found.config_path().display());
            let cfg = config::load_config(&found.config_path(), &found.root)?;
            Ok((cfg, found))
        }
        Err(ScubaError::ConfigNotFound(msg)) if have_image => {
            debug!("{}; using --image only", msg);
            let found = Discovered {
                root: cwd.to_path_buf(),
                rel: PathBuf::new(),
            };
            Ok((ScubaConfig::default(), found))
        }
        Err(e) => Err(e),
    }
}
