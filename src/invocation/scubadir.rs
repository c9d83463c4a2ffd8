//! The per-invocation scratch directory bind-mounted into the container

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::{Result, ScubaError};

/// Where the scuba dir is mounted inside the container
pub const SCUBA_DIR_CONTAINER_PATH: &str = "/.scuba";

/// Temporary host directory holding generated files for one invocation.
///
/// Removed when dropped, on success and error paths alike, unless
/// [`ScubaDir::keep`] is called.
#[derive(Debug)]
pub struct ScubaDir {
    dir: TempDir,
    container_root: PathBuf,
}

impl ScubaDir {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("scubadir").tempdir()?;
        debug!("Created scuba dir {}", dir.path().display());
        Ok(Self {
            dir,
            container_root: PathBuf::from(SCUBA_DIR_CONTAINER_PATH),
        })
    }

    pub fn host_path(&self) -> &Path {
        self.dir.path()
    }

    pub fn container_root(&self) -> &Path {
        &self.container_root
    }

    /// Container path of `name` within the scuba dir.
    pub fn container_path(&self, name: &str) -> PathBuf {
        self.container_root.join(name)
    }

    /// Write a new file, returning its container path.
    pub fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.new_host_path(name)?;
        fs::write(&path, contents)?;
        Ok(self.container_path(name))
    }

    /// Copy `source` into the scuba dir, returning its container path.
    pub fn copy_file(&self, name: &str, source: &Path) -> Result<PathBuf> {
        let path = self.new_host_path(name)?;
        fs::copy(source, &path)?;
        Ok(self.container_path(name))
    }

    /// Leave the directory on disk and return its path.
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }

    fn new_host_path(&self, name: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        if path.exists() {
            return Err(ScubaError::Build(format!(
                "{} already exists in scuba dir",
                name
            )));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_file() {
        let dir = ScubaDir::new().unwrap();
        let cpath = dir.write_file("hooks/root.sh", "echo hi\n").unwrap();
        assert_eq!(cpath, PathBuf::from("/.scuba/hooks/root.sh"));
        let text = fs::read_to_string(dir.host_path().join("hooks/root.sh")).unwrap();
        assert_eq!(text, "echo hi\n");

        // names are never reused
        assert!(dir.write_file("hooks/root.sh", "again").is_err());
    }

    #[test]
    fn test_removed_on_drop() {
        let dir = ScubaDir::new().unwrap();
        let host = dir.host_path().to_path_buf();
        dir.write_file("command.sh", "true\n").unwrap();
        assert!(host.exists());
        drop(dir);
        assert!(!host.exists());
    }

    #[test]
    fn test_keep() {
        let dir = ScubaDir::new().unwrap();
        let host = dir.keep();
        assert!(host.exists());
        fs::remove_dir_all(host).unwrap();
    }
}
