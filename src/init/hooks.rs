//! Running hook scripts

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::debug;

/// Copy the read permission bits to the execute bits.
pub fn make_executable(path: &Path) -> std::io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    let mode = perms.mode();
    perms.set_mode(mode | ((mode & 0o444) >> 2));
    fs::set_permissions(path, perms)
}

/// Run a hook to completion; any failure is an error.
pub fn run_hook(path: &Path) -> Result<()> {
    make_executable(path)
        .with_context(|| format!("Failed to make {} executable", path.display()))?;

    debug!("Executing hook {}", path.display());
    let status = Command::new(path)
        .status()
        .with_context(|| format!("Failed to execute hook {}", path.display()))?;

    if !status.success() {
        if let Some(code) = status.code() {
            bail!("{} exited with status {}", path.display(), code);
        }
        if let Some(signal) = status.signal() {
            bail!("{} terminated by signal {}", path.display(), signal);
        }
        bail!("{} exited for an unknown reason ({})", path.display(), status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn script(dir: &TempDir, name: &str, body: &str, mode: u32) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn test_make_executable() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "a.sh", "true", 0o640);
        make_executable(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o750);
    }

    #[test]
    fn test_run_hook_success() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("ran");
        let path = script(&dir, "ok.sh", &format!("touch '{}'", marker.display()), 0o644);
        run_hook(&path).unwrap();
        assert!(marker.exists());
    }

    #[test]
    fn test_run_hook_failure() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "bad.sh", "exit 3", 0o644);
        let err = run_hook(&path).unwrap_err();
        assert!(err.to_string().contains("exited with status 3"));
    }

    #[test]
    fn test_missing_hook() {
        let dir = TempDir::new().unwrap();
        assert!(run_hook(&dir.path().join("nope.sh")).is_err());
    }
}
