//! `serde` (de)serialization for `std::time::Duration` using human-readable
//! strings ("30s", "500ms", "2m", "1h") instead of the default `{secs, nanos}`
//! object, so config files and wire events stay readable.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let secs = duration.as_secs_f64();
    let text = if secs >= 1.0 && secs.fract() == 0.0 && secs as u64 % 60 == 0 && secs as u64 > 0 {
        format!("{}m", secs as u64 / 60)
    } else if secs >= 3600.0 && secs.fract() == 0.0 {
        format!("{}h", secs as u64 / 3600)
    } else if secs.fract() == 0.0 {
        format!("{}s", secs as u64)
    } else {
        format!("{}ms", duration.as_millis())
    };
    text.serialize(serializer)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DurationForm {
        Text(String),
        Object { secs: u64, #[serde(default)] nanos: u32 },
    }

    match DurationForm::deserialize(deserializer)? {
        DurationForm::Text(text) => {
            parse_duration_string(&text).map_err(serde::de::Error::custom)
        }
        DurationForm::Object { secs, nanos } => Ok(Duration::new(secs, nanos)),
    }
}

/// Parses strings like "30s", "500ms", "2m", "1h" into a `Duration`.
///
/// Bare integers (no suffix) are treated as whole seconds.
pub fn parse_duration_string(text: &str) -> Result<Duration, String> {
    let text = text.trim();
    if let Some(value) = text.strip_suffix("ms") {
        let millis: u64 = value
            .trim()
            .parse()
            .map_err(|_| format!("invalid millisecond duration: {text}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = text.strip_suffix('s') {
        let secs: f64 = value
            .trim()
            .parse()
            .map_err(|_| format!("invalid second duration: {text}"))?;
        return Ok(Duration::from_secs_f64(secs));
    }
    if let Some(value) = text.strip_suffix('m') {
        let mins: f64 = value
            .trim()
            .parse()
            .map_err(|_| format!("invalid minute duration: {text}"))?;
        return Ok(Duration::from_secs_f64(mins * 60.0));
    }
    if let Some(value) = text.strip_suffix('h') {
        let hours: f64 = value
            .trim()
            .parse()
            .map_err(|_| format!("invalid hour duration: {text}"))?;
        return Ok(Duration::from_secs_f64(hours * 3600.0));
    }
    text.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| format!("unrecognized duration format: {text}"))
}
