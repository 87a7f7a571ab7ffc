//! Common types and utilities shared across models.
//!
//! List and object columns are stored as JSON text. Rows keep the raw text;
//! everything above the row structs sees the decoded values produced here.

use chrono::{SecondsFormat, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Current instant as a fixed-width RFC 3339 string.
///
/// Microsecond precision keeps lexical order equal to chronological order,
/// which the `ORDER BY created_at DESC` listings rely on.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Today's date in `YYYY-MM-DD` form
pub fn today() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Facilities offered in and around a property
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facilities {
    #[serde(default)]
    pub home_facilities: Vec<String>,
    #[serde(default)]
    pub surrounding_facilities: Vec<String>,
}

/// Canonical JSON text for a loosely-typed list/object field.
///
/// Missing or empty input becomes `[]`. A string that already parses as JSON is
/// passed through byte-for-byte, any other string is encoded as a JSON string,
/// and structured values are serialized. Applying this to its own output is a
/// no-op.
pub fn normalize_json_field(raw: Option<&Value>) -> String {
    match raw {
        None | Some(Value::Null) => "[]".to_string(),
        Some(Value::String(s)) if s.is_empty() => "[]".to_string(),
        Some(Value::String(s)) => {
            if serde_json::from_str::<Value>(s).is_ok() {
                s.clone()
            } else {
                Value::String(s.clone()).to_string()
            }
        }
        Some(other) => other.to_string(),
    }
}

/// Decode a stored list of strings.
///
/// Accepts a JSON array (non-string items are stringified) or a JSON string
/// holding a comma-separated list, which is what plain-text input normalizes to.
pub fn decode_string_list(json: &str) -> Vec<String> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Ok(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Decode stored facilities, tolerating legacy `[]` and malformed values
pub fn decode_facilities(json: &str) -> Facilities {
    serde_json::from_str::<Facilities>(json).unwrap_or_default()
}

/// Encode a list of blob references for storage
pub fn encode_string_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Read an optional amount sent either as a JSON number or as text.
///
/// Form-driven clients send numbers as strings and blank inputs as `""`;
/// both `null` and blank text count as absent.
pub fn deserialize_optional_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| de::Error::custom("number out of range")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected a number, got {:?}", s))),
        Some(other) => Err(de::Error::custom(format!("expected a number, got {}", other))),
    }
}

/// Integer counterpart of [`deserialize_optional_f64`]
pub fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| de::Error::custom("expected a whole number")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected a whole number, got {:?}", s))),
        Some(other) => Err(de::Error::custom(format!(
            "expected a whole number, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_passes_valid_json_through_unchanged() {
        let raw = json!("[\"wifi\",  \"parking\"]");
        let once = normalize_json_field(Some(&raw));
        assert_eq!(once, "[\"wifi\",  \"parking\"]");

        let twice = normalize_json_field(Some(&Value::String(once.clone())));
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_is_idempotent_for_every_input_shape() {
        let inputs = [
            json!(null),
            json!(""),
            json!("wifi, parking"),
            json!(["wifi", "parking"]),
            json!({"homeFacilities": ["kitchen"], "surroundingFacilities": []}),
            json!("{\"homeFacilities\":[\"kitchen\"]}"),
        ];

        for input in inputs {
            let once = normalize_json_field(Some(&input));
            let twice = normalize_json_field(Some(&Value::String(once.clone())));
            assert_eq!(once, twice, "not idempotent for {}", input);
        }
    }

    #[test]
    fn normalize_wraps_plain_strings_and_serializes_structures() {
        assert_eq!(normalize_json_field(None), "[]");
        assert_eq!(
            normalize_json_field(Some(&json!("wifi, parking"))),
            "\"wifi, parking\""
        );
        assert_eq!(
            normalize_json_field(Some(&json!(["wifi", "parking"]))),
            "[\"wifi\",\"parking\"]"
        );
    }

    #[test]
    fn decode_string_list_handles_arrays_and_plain_text() {
        assert_eq!(decode_string_list("[\"a\",\"b\"]"), vec!["a", "b"]);
        assert_eq!(decode_string_list("\"wifi, parking ,\""), vec!["wifi", "parking"]);
        assert!(decode_string_list("not json").is_empty());
        assert!(decode_string_list("{}").is_empty());
    }

    #[test]
    fn decode_facilities_defaults_on_legacy_values() {
        let facilities = decode_facilities(
            "{\"homeFacilities\":[\"kitchen\"],\"surroundingFacilities\":[\"school\"]}",
        );
        assert_eq!(facilities.home_facilities, vec!["kitchen"]);
        assert_eq!(facilities.surrounding_facilities, vec!["school"]);

        assert_eq!(decode_facilities("[]"), Facilities::default());
    }

    #[derive(Deserialize)]
    struct Amounts {
        #[serde(default, deserialize_with = "deserialize_optional_f64")]
        rent: Option<f64>,
        #[serde(default, deserialize_with = "deserialize_optional_i64")]
        years: Option<i64>,
    }

    #[test]
    fn flexible_numbers_accept_text_and_blank_values() {
        let parsed: Amounts = serde_json::from_str(r#"{"rent": "30000", "years": 2}"#).unwrap();
        assert_eq!(parsed.rent, Some(30000.0));
        assert_eq!(parsed.years, Some(2));

        let blank: Amounts = serde_json::from_str(r#"{"rent": "", "years": null}"#).unwrap();
        assert_eq!(blank.rent, None);
        assert_eq!(blank.years, None);

        let missing: Amounts = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.rent, None);

        assert!(serde_json::from_str::<Amounts>(r#"{"years": "1.5"}"#).is_err());
    }

    #[test]
    fn timestamps_have_fixed_width() {
        let ts = now_timestamp();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2024-01-01T00:00:00.000000Z".len());
    }
}
