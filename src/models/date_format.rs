//! Serde helpers for stay dates.
//!
//! Clients send either full RFC 3339 timestamps or bare `YYYY-MM-DD` dates
//! from a date picker. Bare dates are read as midnight UTC. Output is always
//! RFC 3339.

use serde::{Deserialize, Deserializer, Serializer};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, Time};

pub fn parse(value: &str) -> Result<OffsetDateTime, time::error::Parse> {
    let value = value.trim();
    match OffsetDateTime::parse(value, &Rfc3339) {
        Ok(timestamp) => Ok(timestamp),
        Err(_) => {
            let format = format_description!("[year]-[month]-[day]");
            let date = Date::parse(value, format)?;
            Ok(date.with_time(Time::MIDNIGHT).assume_utc())
        }
    }
}

pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let formatted = value
        .format(&Rfc3339)
        .map_err(<S::Error as serde::ser::Error>::custom)?;
    serializer.serialize_str(&formatted)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}
