//! Building and running the `docker run` invocation

pub mod builder;
pub mod docker;
pub mod identity;
pub mod scubadir;

use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use tracing::{debug, warn};

pub use builder::{build, locate_scubainit, vol_opt, BuildOptions, DockerInvocation};
pub use docker::{ensure_local_docker, DockerCli, ImageConfig, ImageInspector};
pub use identity::{current_umask, HostIdentity};
pub use scubadir::{ScubaDir, SCUBA_DIR_CONTAINER_PATH};

use crate::error::Result;

/// Run the invocation in the foreground and return docker's exit code.
pub fn run(docker: &DockerCli, invocation: &DockerInvocation) -> Result<i32> {
    // SIGINT goes to the whole foreground process group; let docker handle
    // it and report how the container ended.
    if let Err(e) = ctrlc::set_handler(|| debug!("Ignoring interrupt while docker runs")) {
        warn!("Failed to install interrupt handler: {}", e);
    }

    let status = docker.run(&invocation.argv)?;
    Ok(exit_code(status))
}

/// Exit code for a finished child, `128 + N` if killed by signal N.
pub fn exit_code(status: ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => 128 + status.signal().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code(ExitStatus::from_raw(3 << 8)), 3);
        // killed by SIGKILL
        assert_eq!(exit_code(ExitStatus::from_raw(9)), 137);
    }
}
