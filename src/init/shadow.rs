//! `/etc/shadow` entries

use super::entfiles::{Entry, LineParser};

/// `name:passwd:last:min:max:warn:inact:expire:`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShadowEntry {
    pub name: String,
    pub passwd: String,
    pub last_change_date: Option<u32>,
    pub min_password_age: Option<u32>,
    pub max_password_age: Option<u32>,
    pub warn_period: Option<u32>,
    pub inact_period: Option<u32>,
    pub expire_date: Option<u32>,
}

fn opt(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl Entry for ShadowEntry {
    fn from_line(line: &str) -> Option<Self> {
        let mut p = LineParser::new(line);
        Some(ShadowEntry {
            name: p.next_string()?,
            passwd: p.next_string()?,
            last_change_date: p.next_u32_opt()?,
            min_password_age: p.next_u32_opt()?,
            max_password_age: p.next_u32_opt()?,
            warn_period: p.next_u32_opt()?,
            inact_period: p.next_u32_opt()?,
            expire_date: p.next_u32_opt()?,
        })
    }

    fn to_line(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}:{}:{}:",
            self.name,
            self.passwd,
            opt(self.last_change_date),
            opt(self.min_password_age),
            opt(self.max_password_age),
            opt(self.warn_period),
            opt(self.inact_period),
            opt(self.expire_date),
        )
    }
}
