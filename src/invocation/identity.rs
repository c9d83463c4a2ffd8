//! The invoking user's identity, passed to the container init

use nix::sys::stat::{umask, Mode};
use nix::unistd::{getgid, getuid, Group, User};

/// Names used when the host has no passwd/group entry for our ids
pub const FALLBACK_USER: &str = "scubauser";
pub const FALLBACK_GROUP: &str = "scubagroup";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub uid: u32,
    pub gid: u32,
    pub user: String,
    pub group: String,
}

impl HostIdentity {
    pub fn current() -> Self {
        let uid = getuid();
        let gid = getgid();

        let user = User::from_uid(uid)
            .ok()
            .flatten()
            .map(|u| u.name)
            .unwrap_or_else(|| FALLBACK_USER.to_string());
        let group = Group::from_gid(gid)
            .ok()
            .flatten()
            .map(|g| g.name)
            .unwrap_or_else(|| FALLBACK_GROUP.to_string());

        Self {
            uid: uid.as_raw(),
            gid: gid.as_raw(),
            user,
            group,
        }
    }
}

/// Read the process umask without changing it.
pub fn current_umask() -> u32 {
    // There is no way to read the umask without setting it
    let mask = umask(Mode::from_bits_truncate(0o022));
    umask(mask);
    mask.bits()
}
