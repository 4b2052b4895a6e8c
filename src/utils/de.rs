//! Lenient serde helpers for node responses.
//!
//! The REST node is inconsistent about numeric encoding (heights and decimals come back
//! either as JSON numbers or as strings) and about empty timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString<T> {
	Number(T),
	String(String),
}

/// Deserialize a number that may be encoded as a JSON number or a string.
pub fn number_from_any<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: FromStr + Deserialize<'de>,
	<T as FromStr>::Err: Display,
{
	match NumberOrString::<T>::deserialize(deserializer)? {
		NumberOrString::Number(value) => Ok(value),
		NumberOrString::String(raw) => raw.trim().parse().map_err(serde::de::Error::custom),
	}
}

/// Deserialize an RFC3339 timestamp, mapping null, empty or malformed values to `None`.
pub fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
	D: Deserializer<'de>,
{
	let raw: Option<String> = Option::deserialize(deserializer)?;
	Ok(raw
		.filter(|value| !value.is_empty())
		.and_then(|value| DateTime::parse_from_rfc3339(&value).ok())
		.map(|time| time.with_timezone(&Utc)))
}

/// Deserialize `null` as the type's default value.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
