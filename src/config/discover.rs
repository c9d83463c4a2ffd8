//! Locating `.scuba.yml` in the current directory or its ancestors

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, ScubaError};

/// Name of the config file to search for
pub const SCUBA_YML: &str = ".scuba.yml";

/// Set to keep searching past filesystem boundaries
pub const DISCOVERY_ACROSS_FS_VAR: &str = "SCUBA_DISCOVERY_ACROSS_FILESYSTEM";

/// Where a config file was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovered {
    /// Directory containing `.scuba.yml` (the project root)
    pub root: PathBuf,
    /// Path of the start directory relative to `root`
    pub rel: PathBuf,
}

impl Discovered {
    pub fn config_path(&self) -> PathBuf {
        self.root.join(SCUBA_YML)
    }
}

/// Search `start` and its ancestors for `.scuba.yml`.
pub fn find_config(start: &Path) -> Result<Discovered> {
    let cross_fs = std::env::var_os(DISCOVERY_ACROSS_FS_VAR).is_some();
    find_config_with(start, cross_fs)
}

pub fn find_config_with(start: &Path, cross_fs: bool) -> Result<Discovered> {
    let mut path = start.to_path_buf();

    loop {
        let candidate = path.join(SCUBA_YML);
        debug!("Looking for {}", candidate.display());
        if candidate.exists() {
            let rel = start.strip_prefix(&path).unwrap_or(Path::new("")).to_path_buf();
            return Ok(Discovered { root: path, rel });
        }

        let Some(parent) = path.parent().map(Path::to_path_buf) else {
            return Err(ScubaError::ConfigNotFound(format!(
                "{} not found here or any parent directories",
                SCUBA_YML
            )));
        };

        if !cross_fs && is_mount_boundary(&path, &parent) {
            return Err(ScubaError::ConfigNotFound(format!(
                "{} not found here or any parent up to mount point {}\n\
                 Stopping at filesystem boundary ({} not set).",
                SCUBA_YML,
                path.display(),
                DISCOVERY_ACROSS_FS_VAR
            )));
        }

        path = parent;
    }
}

fn is_mount_boundary(path: &Path, parent: &Path) -> bool {
    match (fs::metadata(path), fs::metadata(parent)) {
        (Ok(a), Ok(b)) => a.dev() != b.dev(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_in_start_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SCUBA_YML), "image: alpine\n").unwrap();

        let found = find_config_with(dir.path(), false).unwrap();
        assert_eq!(found.root, dir.path());
        assert_eq!(found.rel, PathBuf::new());
        assert_eq!(found.config_path(), dir.path().join(SCUBA_YML));
    }

    #[test]
    fn test_find_in_ancestor() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SCUBA_YML), "image: alpine\n").unwrap();
        let sub = dir.path().join("a").join("b");
        fs::create_dir_all(&sub).unwrap();

        let found = find_config_with(&sub, false).unwrap();
        assert_eq!(found.root, dir.path());
        assert_eq!(found.rel, PathBuf::from("a/b"));
    }
}
