//! The `SCUBAINIT_*` environment contract between `scuba` and `scubainit`

use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

use super::identity::UserIdentity;

pub const SCUBAINIT_PREFIX: &str = "SCUBAINIT_";
pub const SCUBAINIT_UID: &str = "SCUBAINIT_UID";
pub const SCUBAINIT_GID: &str = "SCUBAINIT_GID";
pub const SCUBAINIT_USER: &str = "SCUBAINIT_USER";
pub const SCUBAINIT_GROUP: &str = "SCUBAINIT_GROUP";
pub const SCUBAINIT_UMASK: &str = "SCUBAINIT_UMASK";
pub const SCUBAINIT_HOOK_ROOT: &str = "SCUBAINIT_HOOK_ROOT";
pub const SCUBAINIT_HOOK_USER: &str = "SCUBAINIT_HOOK_USER";
pub const SCUBAINIT_VERBOSE: &str = "SCUBAINIT_VERBOSE";

/// Host variables that make no sense inside the container
pub const SCRUBBED_VARS: [&str; 3] = ["PWD", "OLDPWD", "XAUTHORITY"];

/// What the host asked the init sequence to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitContract {
    pub identity: Option<UserIdentity>,
    pub umask: Option<u32>,
    pub root_hook: Option<PathBuf>,
    pub user_hook: Option<PathBuf>,
    pub verbose: bool,
}

impl InitContract {
    /// Build the contract from variables looked up with `get`.
    pub fn from_vars<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let uid = get(SCUBAINIT_UID)
            .map(|v| parse_uint(SCUBAINIT_UID, &v))
            .transpose()?;
        let gid = get(SCUBAINIT_GID)
            .map(|v| parse_uint(SCUBAINIT_GID, &v))
            .transpose()?;
        let user = get(SCUBAINIT_USER);
        let group = get(SCUBAINIT_GROUP);

        let identity = match (uid, gid, user, group) {
            (None, None, None, None) => None,
            (Some(uid), Some(gid), Some(user), Some(group)) => Some(UserIdentity {
                uid,
                gid,
                user,
                group,
            }),
            _ => bail!("If any of SCUBAINIT_{{UID,GID,USER,GROUP}} are set, all must be set."),
        };

        Ok(Self {
            identity,
            umask: get(SCUBAINIT_UMASK).map(|v| parse_umask(&v)).transpose()?,
            root_hook: get(SCUBAINIT_HOOK_ROOT).map(PathBuf::from),
            user_hook: get(SCUBAINIT_HOOK_USER).map(PathBuf::from),
            verbose: get(SCUBAINIT_VERBOSE).is_some(),
        })
    }

    /// Read the contract from this process' environment, then unset every
    /// `SCUBAINIT_*` variable along with [`SCRUBBED_VARS`].
    pub fn pop_from_process() -> Result<Self> {
        let popped: Vec<(OsString, OsString)> = env::vars_os()
            .filter(|(k, _)| k.as_bytes().starts_with(SCUBAINIT_PREFIX.as_bytes()))
            .collect();

        for (key, _) in &popped {
            env::remove_var(key);
        }
        for key in SCRUBBED_VARS {
            env::remove_var(key);
        }

        let mut vars = HashMap::new();
        for (key, value) in popped {
            let key = key
                .into_string()
                .map_err(|k| anyhow!("Variable name {:?} is not valid UTF-8", k))?;
            let value = value
                .into_string()
                .map_err(|v| anyhow!("{}={:?} is not valid UTF-8", key, v))?;
            vars.insert(key, value);
        }

        Self::from_vars(|k| vars.get(k).cloned())
    }
}

fn parse_uint(name: &str, value: &str) -> Result<u32> {
    value
        .parse()
        .with_context(|| format!("Parsing integer variable {}=\"{}\"", name, value))
}

/// A leading `0` means octal, as written by `scuba`; otherwise decimal.
pub fn parse_umask(value: &str) -> Result<u32> {
    let parsed = match value.strip_prefix('0') {
        Some(octal) if !octal.is_empty() => u32::from_str_radix(octal, 8),
        _ => value.parse(),
    };
    parsed.with_context(|| format!("Parsing umask {}=\"{}\"", SCUBAINIT_UMASK, value))
}
