//! Creating the invoking user inside the container and becoming them

use std::env;
use std::fs;
use std::io::BufReader;
use std::os::unix::fs::{chown, PermissionsExt};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use nix::unistd::{setgid, setgroups, setuid, Gid, Uid};
use tracing::debug;

use super::entfiles::{append_entry, open_read_append, EntReader, Entry};
use super::group::GroupEntry;
use super::passwd::PasswdEntry;
use super::shadow::ShadowEntry;

/// Password field for new entries (no password login)
pub const INVALID_PASSWORD: &str = "x";

/// Login shell for new users
pub const LOGIN_SHELL: &str = "/bin/sh";

/// Locations of the identity databases and home directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtcPaths {
    pub passwd: PathBuf,
    pub group: PathBuf,
    pub shadow: PathBuf,
    pub home_base: PathBuf,
}

impl Default for EtcPaths {
    fn default() -> Self {
        Self::under(Path::new("/"))
    }
}

impl EtcPaths {
    /// The standard layout below `root`.
    pub fn under(root: &Path) -> Self {
        Self {
            passwd: root.join("etc/passwd"),
            group: root.join("etc/group"),
            shadow: root.join("etc/shadow"),
            home_base: root.join("home"),
        }
    }
}

/// The user to create and switch to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub uid: u32,
    pub gid: u32,
    pub user: String,
    pub group: String,
}

/// How an existing entry relates to the one being added.
enum Existing {
    Unrelated,
    Satisfied,
}

impl UserIdentity {
    pub fn home_dir(&self, paths: &EtcPaths) -> PathBuf {
        paths.home_base.join(&self.user)
    }

    /// Create the home directory and the passwd, group and shadow entries.
    pub fn provision(&self, paths: &EtcPaths) -> Result<()> {
        self.make_homedir(paths)?;
        self.add_group(paths)?;
        self.add_user(paths)?;
        self.add_shadow(paths)?;
        Ok(())
    }

    pub fn make_homedir(&self, paths: &EtcPaths) -> Result<()> {
        let home = self.home_dir(paths);
        debug!("Creating home dir {}", home.display());
        fs::create_dir_all(&home)
            .with_context(|| format!("Failed to create {}", home.display()))?;
        fs::set_permissions(&home, fs::Permissions::from_mode(0o700))?;
        chown(&home, Some(self.uid), Some(self.gid))
            .with_context(|| format!("Failed to chown {}", home.display()))?;
        Ok(())
    }

    pub fn add_group(&self, paths: &EtcPaths) -> Result<()> {
        debug!("Adding group '{}' (gid={})", self.group, self.gid);
        let entry = GroupEntry {
            name: self.group.clone(),
            passwd: INVALID_PASSWORD.to_string(),
            gid: self.gid,
            members: Vec::new(),
        };
        ensure_entry(&paths.group, &entry, |existing: &GroupEntry| {
            match (existing.name == self.group, existing.gid == self.gid) {
                (true, true) => Ok(Existing::Satisfied),
                (true, false) => bail!(
                    "Group {} already exists with different gid in {}",
                    self.group,
                    paths.group.display()
                ),
                (false, true) => bail!(
                    "GID {} already exists with different name in {}",
                    self.gid,
                    paths.group.display()
                ),
                (false, false) => Ok(Existing::Unrelated),
            }
        })
    }

    pub fn add_user(&self, paths: &EtcPaths) -> Result<()> {
        debug!("Adding user '{}' (uid={})", self.user, self.uid);
        let home = self.home_dir(paths);
        let home = home.to_str().context("Invalid home dir")?;
        let entry = PasswdEntry {
            name: self.user.clone(),
            passwd: INVALID_PASSWORD.to_string(),
            uid: self.uid,
            gid: self.gid,
            gecos: self.user.clone(),
            home_dir: home.to_string(),
            shell: LOGIN_SHELL.to_string(),
        };
        ensure_entry(&paths.passwd, &entry, |existing: &PasswdEntry| {
            match (existing.name == self.user, existing.uid == self.uid) {
                (true, true) => Ok(Existing::Satisfied),
                (true, false) => bail!(
                    "User {} already exists with different uid in {}",
                    self.user,
                    paths.passwd.display()
                ),
                (false, true) => bail!(
                    "UID {} already exists with different name in {}",
                    self.uid,
                    paths.passwd.display()
                ),
                (false, false) => Ok(Existing::Unrelated),
            }
        })
    }

    pub fn add_shadow(&self, paths: &EtcPaths) -> Result<()> {
        debug!("Adding shadow entry for '{}'", self.user);
        let entry = ShadowEntry {
            name: self.user.clone(),
            passwd: INVALID_PASSWORD.to_string(),
            ..ShadowEntry::default()
        };
        // Only the name matters here
        ensure_entry(&paths.shadow, &entry, |existing: &ShadowEntry| {
            Ok(if existing.name == self.user {
                Existing::Satisfied
            } else {
                Existing::Unrelated
            })
        })
    }

    /// Become this user. Supplementary groups, then gid, then uid.
    pub fn drop_privileges(&self, paths: &EtcPaths) -> Result<()> {
        debug!(
            "Changing to user={}, uid={}, gid={}",
            self.user, self.uid, self.gid
        );

        setgroups(&[]).context("Failed to clear supplementary groups")?;
        setgid(Gid::from_raw(self.gid)).context("Failed to set gid")?;
        setuid(Uid::from_raw(self.uid)).context("Failed to set uid")?;

        let home = self.home_dir(paths);
        env::set_var("USER", &self.user);
        env::set_var("LOGNAME", &self.user);
        env::set_var("HOME", &home);
        Ok(())
    }
}

/// Append `new` to the file at `path` unless `compare` finds it already
/// satisfied. Every entry is checked, and `compare` fails on a conflict.
fn ensure_entry<T, F>(path: &Path, new: &T, compare: F) -> Result<()>
where
    T: Entry,
    F: Fn(&T) -> Result<Existing>,
{
    let file = open_read_append(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut satisfied = false;
    for existing in EntReader::<_, T>::new(BufReader::new(&file)) {
        let existing = existing.with_context(|| format!("Failed to read {}", path.display()))?;
        if let Existing::Satisfied = compare(&existing)? {
            satisfied = true;
        }
    }

    if satisfied {
        debug!("Entry already present in {}", path.display());
        return Ok(());
    }
    append_entry(&mut &file, new).with_context(|| format!("Failed to write {}", path.display()))
}
