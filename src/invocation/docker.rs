//! Talking to the `docker` executable

use std::io;
use std::process::{Command, ExitStatus, Stdio};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Result, ScubaError};

/// Set when docker runs on another host, which scuba cannot support
pub const DOCKER_HOST_VAR: &str = "DOCKER_HOST";

/// The parts of an image's configuration scuba cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImageConfig {
    #[serde(rename = "Cmd", default)]
    pub cmd: Option<Vec<String>>,
    #[serde(rename = "Entrypoint", default)]
    pub entrypoint: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct InspectEntry {
    #[serde(rename = "Config")]
    config: ImageConfig,
}

/// Source of image metadata.
pub trait ImageInspector {
    fn image_config(&self, image: &str) -> Result<ImageConfig>;
}

/// The `docker` command-line client.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }
}

impl DockerCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self) -> Command {
        Command::new(&self.program)
    }

    /// Inspect an image; `Ok(None)` if it does not exist locally.
    fn inspect(&self, image: &str) -> Result<Option<ImageConfig>> {
        let output = self
            .command()
            .args(["inspect", "--type", "image", image])
            .output()
            .map_err(spawn_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.to_lowercase().contains("no such image") {
                return Ok(None);
            }
            return Err(ScubaError::Docker(format!(
                "Failed to inspect image: {}",
                stderr.trim()
            )));
        }

        let entries: Vec<InspectEntry> = serde_json::from_slice(&output.stdout)
            .map_err(|e| ScubaError::Docker(format!("Failed to parse inspect output: {}", e)))?;
        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| ScubaError::Docker(format!("No inspect result for {}", image)))?;
        Ok(Some(entry.config))
    }

    /// Pull an image, letting docker report progress on our stdout/stderr.
    pub fn pull(&self, image: &str) -> Result<()> {
        info!("Pulling image {}", image);
        let status = self
            .command()
            .args(["pull", image])
            .status()
            .map_err(spawn_error)?;
        if !status.success() {
            return Err(ScubaError::Docker(format!("Failed to pull image: {}", image)));
        }
        Ok(())
    }

    /// Run docker with `args`, inheriting stdio, and wait for it to exit.
    pub fn run(&self, args: &[String]) -> Result<ExitStatus> {
        debug!("Running {} {:?}", self.program, args);
        self.command()
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(spawn_error)
    }
}

impl ImageInspector for DockerCli {
    /// Inspect an image, pulling it first if it is not present.
    fn image_config(&self, image: &str) -> Result<ImageConfig> {
        if let Some(config) = self.inspect(image)? {
            return Ok(config);
        }
        self.pull(image)?;
        self.inspect(image)?
            .ok_or_else(|| ScubaError::Docker(format!("No such image: {}", image)))
    }
}

/// Fail if docker is configured to run on a remote host.
pub fn ensure_local_docker() -> Result<()> {
    if std::env::var_os(DOCKER_HOST_VAR).is_some() {
        return Err(ScubaError::Build(format!(
            "Remote docker not supported ({} is set)",
            DOCKER_HOST_VAR
        )));
    }
    Ok(())
}

fn spawn_error(err: io::Error) -> ScubaError {
    if err.kind() == io::ErrorKind::NotFound {
        ScubaError::DockerExecute(err)
    } else {
        ScubaError::Io(err)
    }
}
