use serde::{Deserialize as _, Deserializer, Serializer};
use time::OffsetDateTime;

pub fn serialize<S>(value: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	match value {
		Some(value) => super::serialize(value, serializer),
		None => serializer.serialize_none(),
	}
}

/// Missing, `null`, and blank strings all mean "no timestamp".
pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
	D: Deserializer<'de>,
{
	Option::<String>::deserialize(deserializer)?
		.filter(|raw| !raw.trim().is_empty())
		.map(|raw| super::parse_timestamp(&raw))
		.transpose()
		.map_err(serde::de::Error::custom)
}
