//! `/etc/passwd` entries

use super::entfiles::{Entry, LineParser};

/// `name:passwd:uid:gid:gecos:home:shell`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswdEntry {
    pub name: String,
    pub passwd: String,
    pub uid: u32,
    pub gid: u32,
    pub gecos: String,
    pub home_dir: String,
    pub shell: String,
}

impl Entry for PasswdEntry {
    fn from_line(line: &str) -> Option<Self> {
        let mut p = LineParser::new(line);
        Some(PasswdEntry {
            name: p.next_string()?,
            passwd: p.next_string()?,
            uid: p.next_u32()?,
            gid: p.next_u32()?,
            gecos: p.next_string()?,
            home_dir: p.next_string()?,
            shell: p.next_string()?,
        })
    }

    fn to_line(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}:{}",
            self.name, self.passwd, self.uid, self.gid, self.gecos, self.home_dir, self.shell
        )
    }
}
