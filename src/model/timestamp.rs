use chrono::{DateTime, Utc};
use derive_more::From;
use serde::{Deserialize, Serialize};

pub fn now() -> Timestamp {
    Utc::now().into()
}

/// A UTC instant stored as an RFC 3339 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From)]
pub struct Timestamp(DateTime<Utc>);

impl Default for Timestamp {
    fn default() -> Self {
        now()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.to_rfc3339().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| Self(dt.into()))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survives_a_trip_through_its_string_form() {
        let created = now();
        let json = serde_json::to_string(&created).unwrap();
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, created);
    }

    #[test]
    fn displays_as_a_calendar_date() {
        let instant = DateTime::parse_from_rfc3339("2024-03-09T10:11:12Z").unwrap();
        assert_eq!(Timestamp::from(instant.with_timezone(&Utc)).to_string(), "2024-03-09");
    }
}
