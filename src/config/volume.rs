//! Volume definitions from `.scuba.yml`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde_yaml::Value;

use super::expand::{absolutize_path, expand_env_vars};
use crate::error::{Result, ScubaError};

/// Volumes keyed by container path.
pub type Volumes = BTreeMap<PathBuf, Volume>;

fn volume_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]+$").expect("valid volume name pattern")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeSource {
    HostPath(PathBuf),
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub container_path: PathBuf,
    pub source: VolumeSource,
    pub options: Vec<String>,
}

impl Volume {
    pub fn host_path(&self) -> Option<&Path> {
        match &self.source {
            VolumeSource::HostPath(p) => Some(p),
            VolumeSource::Named(_) => None,
        }
    }

    /// Parse one `volumes` entry.
    ///
    /// Simple form: a host path (`/`, `./`, `../`, `~` prefixed) or a volume
    /// name. Complex form: a mapping with exactly one of `hostpath` or
    /// `name`, plus optional comma-separated `options`.
    pub fn from_node(container_path: PathBuf, node: &Value, root: Option<&Path>) -> Result<Self> {
        match node {
            Value::String(s) => {
                let spec = expand_env_vars(s)?;
                let source = if is_path_like(&spec) {
                    VolumeSource::HostPath(absolutize_path(&spec, root)?)
                } else if volume_name_pattern().is_match(&spec) {
                    VolumeSource::Named(spec)
                } else {
                    return Err(ScubaError::Schema(format!("Invalid volume name: {:?}", spec)));
                };
                Ok(Volume {
                    container_path,
                    source,
                    options: Vec::new(),
                })
            }
            Value::Mapping(_) | Value::Null => {
                let hostpath = optional_str(node, "hostpath", &container_path)?;
                let name = optional_str(node, "name", &container_path)?;
                let options = match optional_str(node, "options", &container_path)? {
                    Some(opts) => split_options(&opts),
                    None => Vec::new(),
                };

                let source = match (hostpath, name) {
                    (Some(hp), None) => VolumeSource::HostPath(absolutize_path(&hp, root)?),
                    (None, Some(name)) => VolumeSource::Named(expand_env_vars(&name)?),
                    _ => {
                        return Err(ScubaError::Schema(format!(
                            "Volume {} must have exactly one of 'hostpath' or 'name' subkey",
                            container_path.display()
                        )))
                    }
                };
                Ok(Volume {
                    container_path,
                    source,
                    options,
                })
            }
            _ => Err(ScubaError::Schema(format!(
                "{}: must be string or dict",
                container_path.display()
            ))),
        }
    }
}

/// Parse a `volumes` mapping.
pub fn parse_volumes(node: &Value, root: Option<&Path>) -> Result<Volumes> {
    let map = match node {
        Value::Null => return Ok(Volumes::new()),
        Value::Mapping(map) => map,
        _ => return Err(ScubaError::Schema("'volumes' must be a mapping".to_string())),
    };

    let mut volumes = Volumes::new();
    for (key, value) in map {
        let Value::String(cpath) = key else {
            return Err(ScubaError::Schema(format!(
                "Volume container path must be a string, not {:?}",
                key
            )));
        };
        // container paths must be absolute
        let cpath = absolutize_path(cpath, None)?;
        let volume = Volume::from_node(cpath.clone(), value, root)?;
        volumes.insert(cpath, volume);
    }
    Ok(volumes)
}

fn is_path_like(spec: &str) -> bool {
    ["/", "./", "../", "~"].iter().any(|p| spec.starts_with(p))
}

fn split_options(opts: &str) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for opt in opts.split(',').filter(|o| !o.is_empty()) {
        if !result.iter().any(|o| o == opt) {
            result.push(opt.to_string());
        }
    }
    result
}

fn optional_str(node: &Value, key: &str, cpath: &Path) -> Result<Option<String>> {
    match node.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ScubaError::Schema(format!(
            "Volume {}: {:?} must be a string",
            cpath.display(),
            key
        ))),
    }
}
