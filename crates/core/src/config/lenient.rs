//! Per-key lenient deserializers
//!
//! Each accepts any TOML value and yields None when the value has the
//! wrong shape, so one bad key never discards the rest of the document.

use serde::{Deserialize, Deserializer};
use toml::Value;

/// Boolean accepting `true`/`false`, integers (non-zero is true) and numeric strings
pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Boolean(b) => Some(*b),
        Value::Integer(i) => Some(*i != 0),
        Value::String(s) => s.trim().parse::<i64>().ok().map(|i| i != 0),
        _ => None,
    };
    if parsed.is_none() {
        tracing::warn!("Ignoring malformed boolean value: {}", value);
    }
    Ok(parsed)
}

/// Signed integer accepting integers, whole floats and numeric strings
pub fn integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Integer(i) => Some(*i),
        Value::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        Value::Boolean(b) => Some(*b as i64),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    if parsed.is_none() {
        tracing::warn!("Ignoring malformed integer value: {}", value);
    }
    Ok(parsed)
}

/// String accepting only strings
pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(Some(s)),
        other => {
            tracing::warn!("Ignoring malformed string value: {}", other);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "super::flag")]
        flag: Option<bool>,
        #[serde(default, deserialize_with = "super::integer")]
        number: Option<i64>,
    }

    fn sample(doc: &str) -> Sample {
        toml::from_str(doc).unwrap()
    }

    #[test]
    fn test_flag_shapes() {
        assert_eq!(sample("flag = 0").flag, Some(false));
        assert_eq!(sample("flag = 1").flag, Some(true));
        assert_eq!(sample("flag = 2").flag, Some(true));
        assert_eq!(sample("flag = \"1\"").flag, Some(true));
        assert_eq!(sample("flag = 1.5").flag, None);
        assert_eq!(sample("").flag, None);
    }

    #[test]
    fn test_integer_shapes() {
        assert_eq!(sample("number = -3").number, Some(-3));
        assert_eq!(sample("number = 59.9").number, Some(59));
        assert_eq!(sample("number = \" 144 \"").number, Some(144));
        assert_eq!(sample("number = { a = 1 }").number, None);
    }
}
