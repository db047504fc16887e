use std::fmt;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Author or committer signature attached to a commit or tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub email: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Offset from UTC in minutes at the time of signing.
    pub tz_offset: i32,
}

impl Person {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        timestamp: i64,
        tz_offset: i32,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            timestamp,
            tz_offset,
        }
    }

    /// Signature stamped with the current wall-clock time and local offset.
    pub fn now(name: impl Into<String>, email: impl Into<String>) -> Self {
        let local = Local::now();
        Self::new(
            name,
            email,
            local.timestamp_millis(),
            local.offset().local_minus_utc() / 60,
        )
    }

    /// The signing instant in UTC, if the timestamp is representable.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_shows_name_and_email() {
        let p = Person::new("groldan", "groldan@example.com", 0, 0);
        assert_eq!(p.to_string(), "groldan <groldan@example.com>");
    }

    #[test]
    fn datetime_from_millis() {
        let p = Person::new("a", "a@b", 1_500_000_000_000, 120);
        let dt = p.datetime().unwrap();
        assert_eq!(dt.timestamp(), 1_500_000_000);
    }

    #[test]
    fn now_is_recent() {
        let before = Utc::now().timestamp_millis();
        let p = Person::now("a", "a@b");
        assert!(p.timestamp >= before);
    }
}
