//! CLI argument parsing

use clap::Parser;

use crate::error::Result;
use crate::output::OutputFormat;
use crate::resolve::CliOverrides;
use crate::shell;

#[derive(Parser, Debug)]
#[command(name = "scuba")]
#[command(author, version, about = "Simple Container-Utilizing Build Apparatus", long_about = None)]
pub struct Args {
    /// Docker arguments, split like a shell would (may be repeated)
    #[arg(short = 'd', long = "docker-arg", value_name = "ARGS", allow_hyphen_values = true)]
    pub docker_args: Vec<String>,

    /// Environment variables to pass to the container (may be repeated)
    #[arg(short = 'e', long = "env", value_name = "KEY[=VALUE]")]
    pub env: Vec<String>,

    /// Override the Docker image
    #[arg(long)]
    pub image: Option<String>,

    /// Override the shell used in the container
    #[arg(long)]
    pub shell: Option<String>,

    /// Override the image entrypoint (empty string clears it)
    #[arg(long, value_name = "PATH")]
    pub entrypoint: Option<String>,

    /// Run the command as root in the container
    #[arg(short, long)]
    pub root: bool,

    /// Print the docker command instead of running it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Keep the temporary scuba dir after running
    #[arg(long)]
    pub keep_tempfiles: bool,

    /// List the aliases defined in .scuba.yml and exit
    #[arg(long)]
    pub list_aliases: bool,

    /// Dry-run output as JSON
    #[arg(long)]
    pub json: bool,

    /// Command or alias to run, with its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Args {
    /// The command-line layer of configuration.
    pub fn overrides(&self) -> Result<CliOverrides> {
        let mut docker_args = Vec::new();
        for arg in &self.docker_args {
            docker_args.extend(shell::split(arg)?);
        }

        Ok(CliOverrides {
            image: self.image.clone(),
            shell: self.shell.clone(),
            entrypoint: self.entrypoint.clone(),
            environment: self.env.clone(),
            docker_args,
            root: self.root,
        })
    }

    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}
