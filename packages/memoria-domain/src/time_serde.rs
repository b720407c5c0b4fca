//! Timestamps on the wire: RFC 3339 out, RFC 3339 or a bare `YYYY-MM-DD` (midnight UTC) in.

pub mod option;

use serde::{Deserialize, Deserializer, Serializer};
use time::{
	Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description,
};

pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	serializer.serialize_str(&value.format(&Rfc3339).map_err(serde::ser::Error::custom)?)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;

	parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, String> {
	let trimmed = raw.trim();

	if let Ok(instant) = OffsetDateTime::parse(trimmed, &Rfc3339) {
		return Ok(instant);
	}

	Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
		.map(|date| date.midnight().assume_utc())
		.map_err(|_| format!("Expected an RFC 3339 timestamp or YYYY-MM-DD date, got {raw:?}."))
}
