//! Configuration loading for `.scuba.yml`
//!
//! Loading happens in two steps: [`loader`] turns files into a resolved
//! YAML tree (following `!from_yaml` references), then [`schema`] turns
//! the tree into a typed [`ScubaConfig`].

pub mod discover;
pub mod expand;
pub mod layer;
pub mod loader;
pub mod schema;
pub mod script;
pub mod volume;

use std::path::Path;

pub use discover::{find_config, Discovered, SCUBA_YML};
pub use layer::{Layer, Mergeable};
pub use loader::YamlLoader;
pub use schema::{parse_env_var, Alias, Entrypoint, Environment, Hooks, ScubaConfig, DEFAULT_SHELL};
pub use script::{normalize, Script};
pub use volume::{Volume, VolumeSource, Volumes};

use crate::error::Result;

/// Load the config file at `path` for the project rooted at `root`.
pub fn load_config(path: &Path, root: &Path) -> Result<ScubaConfig> {
    let doc = YamlLoader::new().load(path)?;
    ScubaConfig::from_value(&doc, Some(root))
}
