use serde_json::{json, Map as JsonMap, Number, Value as JsonValue};

use crate::value::{Value, ValueKind};

/// Encodes a store value as plain JSON: numbers stay numbers, timestamps
/// become RFC 3339 strings, bytes become base64 strings and references become
/// path strings. This is the shape handed to `serde` when materializing user
/// record types.
pub fn to_plain_json(value: &Value) -> JsonValue {
    match value.kind() {
        ValueKind::Null => JsonValue::Null,
        ValueKind::Boolean(b) => JsonValue::Bool(*b),
        ValueKind::Integer(i) => json!(i),
        ValueKind::Double(d) => Number::from_f64(*d)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueKind::Timestamp(ts) => JsonValue::String(ts.to_rfc3339()),
        ValueKind::String(s) => JsonValue::String(s.clone()),
        ValueKind::Bytes(b) => JsonValue::String(b.to_base64()),
        ValueKind::Reference(path) => JsonValue::String(path.clone()),
        ValueKind::Array(values) => {
            JsonValue::Array(values.values().iter().map(to_plain_json).collect())
        }
        ValueKind::Map(map) => {
            let entries: JsonMap<String, JsonValue> = map
                .fields()
                .iter()
                .map(|(name, value)| (name.clone(), to_plain_json(value)))
                .collect();
            JsonValue::Object(entries)
        }
    }
}

/// Decodes plain JSON into a store value. Strings stay strings; callers that
/// need timestamp or reference kinds construct them directly.
pub fn from_plain_json(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::null(),
        JsonValue::Bool(b) => Value::from_bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from_integer(i)
            } else {
                Value::from_double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(s) => Value::from_string(s.clone()),
        JsonValue::Array(values) => {
            Value::from_array(values.iter().map(from_plain_json).collect())
        }
        JsonValue::Object(entries) => Value::from_map(
            entries
                .iter()
                .map(|(name, value)| (name.clone(), from_plain_json(value)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_round_trip() {
        let original = json!({"status": "paid", "total": 12, "discount": 0.5, "open": false});
        let value = from_plain_json(&original);
        assert_eq!(to_plain_json(&value), original);
    }

    #[test]
    fn timestamps_encode_as_rfc3339() {
        let ts = chrono::DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let encoded = to_plain_json(&Value::from_timestamp(ts));
        assert_eq!(encoded, json!("2024-05-01T12:00:00+00:00"));
    }

    #[test]
    fn references_encode_as_paths() {
        let encoded = to_plain_json(&Value::from_reference("customers/c1"));
        assert_eq!(encoded, json!("customers/c1"));
    }
}
