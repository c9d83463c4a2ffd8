//! `/etc/group` entries

use super::entfiles::{split_csv, Entry, LineParser};

/// `name:passwd:gid:member,member`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: String,
    pub passwd: String,
    pub gid: u32,
    pub members: Vec<String>,
}

impl Entry for GroupEntry {
    fn from_line(line: &str) -> Option<Self> {
        let mut p = LineParser::new(line);
        Some(GroupEntry {
            name: p.next_string()?,
            passwd: p.next_string()?,
            gid: p.next_u32()?,
            members: split_csv(p.next_str()?),
        })
    }

    fn to_line(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.name,
            self.passwd,
            self.gid,
            self.members.join(",")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_with_members() {
        let line = "foo:x:1234:moe,larry,shemp";
        let entry = GroupEntry::from_line(line).unwrap();
        assert_eq!(entry.members, vec!["moe", "larry", "shemp"]);
        assert_eq!(entry.to_line(), line);
    }

    #[test]
    fn test_no_members() {
        let entry = GroupEntry::from_line("dev:x:1000:").unwrap();
        assert!(entry.members.is_empty());
        assert_eq!(entry.to_line(), "dev:x:1000:");
    }
}
