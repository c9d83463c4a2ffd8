//! Typed `.scuba.yml` schema
//!
//! Converts a resolved YAML tree into [`ScubaConfig`]. Unknown top-level
//! keys are rejected; unknown alias keys are ignored so aliases can embed
//! fragments of foreign CI files.

use std::collections::BTreeMap;
use std::path::Path;

use serde_yaml::Value;

use super::layer::Layer;
use super::loader::TAG_OVERRIDE;
use super::script::{normalize, Script};
use super::volume::{parse_volumes, Volumes};
use crate::error::{Result, ScubaError};
use crate::shell;

pub const DEFAULT_SHELL: &str = "/bin/sh";

const TOP_LEVEL_KEYS: &[&str] = &[
    "image",
    "aliases",
    "hooks",
    "entrypoint",
    "environment",
    "shell",
    "docker_args",
    "volumes",
];

/// Environment variables; `None` inherits the value from the outer environment.
pub type Environment = BTreeMap<String, Option<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entrypoint {
    /// Run without any entrypoint
    Clear,
    Set(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hooks {
    pub root: Option<Script>,
    pub user: Option<Script>,
}

impl Hooks {
    pub fn get(&self, name: &str) -> Option<&Script> {
        match name {
            "root" => self.root.as_ref(),
            "user" => self.user.as_ref(),
            _ => None,
        }
    }
}

/// A named command, optionally overriding top-level settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: String,
    pub script: Script,
    pub image: Option<String>,
    pub entrypoint: Option<Entrypoint>,
    pub environment: Option<Layer<Environment>>,
    pub shell: Option<String>,
    pub root: bool,
    pub docker_args: Option<Layer<Vec<String>>>,
    pub volumes: Option<Layer<Volumes>>,
}

impl Alias {
    pub fn from_node(name: &str, node: &Value, root: Option<&Path>) -> Result<Self> {
        let script = normalize(node, name)?;
        let mut alias = Alias {
            name: name.to_string(),
            script,
            image: None,
            entrypoint: None,
            environment: None,
            shell: None,
            root: false,
            docker_args: None,
            volumes: None,
        };

        if let Value::Mapping(_) = node {
            alias.image = get_str(node, "image")?;
            alias.entrypoint = get_entrypoint(node)?;
            alias.environment = get_layer(node, "environment", parse_environment)?;
            alias.shell = get_str(node, "shell")?;
            alias.root = get_bool(node, "root")?;
            alias.docker_args = get_layer(node, "docker_args", parse_docker_args)?;
            alias.volumes = get_layer(node, "volumes", |v| parse_volumes(v, root))?;
        }

        Ok(alias)
    }
}

/// A fully parsed `.scuba.yml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScubaConfig {
    pub image: Option<String>,
    pub shell: Option<String>,
    pub entrypoint: Option<Entrypoint>,
    pub environment: Environment,
    pub docker_args: Vec<String>,
    pub volumes: Volumes,
    pub aliases: BTreeMap<String, Alias>,
    pub hooks: Hooks,
}

impl ScubaConfig {
    /// Build a config from a resolved document.
    ///
    /// `root` is the project root that relative volume paths are joined to.
    pub fn from_value(doc: &Value, root: Option<&Path>) -> Result<Self> {
        let map = match doc {
            Value::Null => return Ok(ScubaConfig::default()),
            Value::Mapping(map) => map,
            _ => {
                return Err(ScubaError::Schema(
                    "top level must be a mapping".to_string(),
                ))
            }
        };

        let extra: Vec<String> = map
            .keys()
            .map(key_name)
            .filter(|k| !TOP_LEVEL_KEYS.contains(&k.as_str()))
            .collect();
        if !extra.is_empty() {
            return Err(ScubaError::Schema(format!(
                "Unrecognized node{}: {}",
                if extra.len() > 1 { "s" } else { "" },
                extra.join(", ")
            )));
        }

        Ok(ScubaConfig {
            image: get_str(doc, "image")?,
            shell: get_str(doc, "shell")?,
            entrypoint: get_entrypoint(doc)?,
            environment: get_layer(doc, "environment", parse_environment)?
                .map(Layer::into_value)
                .unwrap_or_default(),
            docker_args: get_layer(doc, "docker_args", parse_docker_args)?
                .map(Layer::into_value)
                .unwrap_or_default(),
            volumes: get_layer(doc, "volumes", |v| parse_volumes(v, root))?
                .map(Layer::into_value)
                .unwrap_or_default(),
            aliases: parse_aliases(doc.get("aliases"), root)?,
            hooks: parse_hooks(doc.get("hooks"))?,
        })
    }

    /// The top-level image.
    pub fn image(&self) -> Result<&str> {
        self.image.as_deref().ok_or(ScubaError::MissingImage)
    }

    /// The top-level shell, or the default.
    pub fn shell(&self) -> &str {
        self.shell.as_deref().unwrap_or(DEFAULT_SHELL)
    }
}

fn parse_aliases(node: Option<&Value>, root: Option<&Path>) -> Result<BTreeMap<String, Alias>> {
    let map = match node {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::Mapping(map)) => map,
        Some(_) => return Err(ScubaError::Schema("'aliases' must be a mapping".to_string())),
    };

    let mut aliases = BTreeMap::new();
    for (key, value) in map {
        let name = key_name(key);
        if name.contains(' ') {
            return Err(ScubaError::Schema(
                "Alias names cannot contain spaces".to_string(),
            ));
        }
        let alias = Alias::from_node(&name, value, root)?;
        aliases.insert(name, alias);
    }
    Ok(aliases)
}

fn parse_hooks(node: Option<&Value>) -> Result<Hooks> {
    let node = match node {
        None | Some(Value::Null) => return Ok(Hooks::default()),
        Some(node @ Value::Mapping(_)) => node,
        Some(_) => return Err(ScubaError::Schema("'hooks' must be a mapping".to_string())),
    };

    let hook = |name: &str| -> Result<Option<Script>> {
        match node.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(v) => normalize(v, name).map(Some),
        }
    };

    Ok(Hooks {
        root: hook("root")?,
        user: hook("user")?,
    })
}

/// Split an `!override` tag off a node.
fn untag(node: &Value) -> (bool, &Value) {
    match node {
        Value::Tagged(tagged) if tagged.tag == TAG_OVERRIDE => (true, &tagged.value),
        other => (false, other),
    }
}

/// Parse a collection-valued key into a layer.
///
/// A null value merges nothing, unless tagged `!override`, which clears.
fn get_layer<T, F>(node: &Value, key: &str, parse: F) -> Result<Option<Layer<T>>>
where
    T: Default,
    F: FnOnce(&Value) -> Result<T>,
{
    let Some(raw) = node.get(key) else {
        return Ok(None);
    };

    let (is_override, value) = untag(raw);
    let layer = match (is_override, value) {
        (true, Value::Null) => Layer::Clear,
        (true, v) => Layer::Replace(parse(v)?),
        (false, Value::Null) => Layer::Merge(T::default()),
        (false, v) => Layer::Merge(parse(v)?),
    };
    Ok(Some(layer))
}

fn get_str(node: &Value, key: &str) -> Result<Option<String>> {
    match node.get(key).map(|v| untag(v).1) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(v) => Err(ScubaError::Schema(format!(
            "{:?} must be a string, not {}",
            key,
            type_name(v)
        ))),
    }
}

fn get_bool(node: &Value, key: &str) -> Result<bool> {
    match node.get(key).map(|v| untag(v).1) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(v) => Err(ScubaError::Schema(format!(
            "{:?} must be a boolean, not {}",
            key,
            type_name(v)
        ))),
    }
}

/// `entrypoint` distinguishes "absent" from an explicit null, which clears it.
fn get_entrypoint(node: &Value) -> Result<Option<Entrypoint>> {
    match node.get("entrypoint").map(|v| untag(v).1) {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(Entrypoint::Clear)),
        Some(Value::String(s)) if s.is_empty() => Ok(Some(Entrypoint::Clear)),
        Some(Value::String(s)) => Ok(Some(Entrypoint::Set(s.clone()))),
        Some(v) => Err(ScubaError::Schema(format!(
            "'entrypoint' must be a string, not {}",
            type_name(v)
        ))),
    }
}

/// `docker_args` is a shell-style string, or a list of strings.
fn parse_docker_args(node: &Value) -> Result<Vec<String>> {
    match node {
        Value::String(s) => shell::split(s),
        Value::Sequence(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(ScubaError::Schema(format!(
                    "'docker_args' list items must be strings, not {}",
                    type_name(other)
                ))),
            })
            .collect(),
        other => Err(ScubaError::Schema(format!(
            "'docker_args' must be a string or list, not {}",
            type_name(other)
        ))),
    }
}

/// `environment` is a mapping, or a list of `KEY=VALUE` / `KEY` strings.
fn parse_environment(node: &Value) -> Result<Environment> {
    let mut env = Environment::new();
    match node {
        Value::Mapping(map) => {
            for (k, v) in map {
                let value = match v {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    Value::Bool(b) => Some(b.to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    other => {
                        return Err(ScubaError::Schema(format!(
                            "environment variable {:?} must be a scalar, not {}",
                            key_name(k),
                            type_name(other)
                        )))
                    }
                };
                env.insert(key_name(k), value);
            }
        }
        Value::Sequence(items) => {
            for item in items {
                let Value::String(s) = item else {
                    return Err(ScubaError::Schema(format!(
                        "environment list items must be strings, not {}",
                        type_name(item)
                    )));
                };
                let (k, v) = parse_env_var(s);
                env.insert(k, v);
            }
        }
        other => {
            return Err(ScubaError::Schema(format!(
                "'environment' must be list or mapping, not {}",
                type_name(other)
            )))
        }
    }
    Ok(env)
}

/// Parse `KEY=VALUE` or `KEY`, the same way `docker run -e` does.
pub fn parse_env_var(s: &str) -> (String, Option<String>) {
    match s.split_once('=') {
        Some((k, v)) => (k.to_string(), Some(v.to_string())),
        None => (s.to_string(), None),
    }
}

fn key_name(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => format!("{:?}", other),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "dict",
        Value::Tagged(_) => "tagged value",
    }
}
