//! JSON document helpers
//!
//! Key ordering for serialized models and a canonical rendering used for
//! fingerprints. Objects keep insertion order (`serde_json` is built with
//! `preserve_order`).

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

/// Key carrying a model's concrete type name
pub const TYPE_KEY: &str = "type";

/// Move `front` keys, when present, to the start of an object
///
/// The listed keys appear in the given order; all other keys keep their
/// relative order. Non-object values are returned unchanged.
#[must_use]
pub fn ordered_object(value: JsonValue, front: &[&str]) -> JsonValue {
    let JsonValue::Object(mut map) = value else {
        return value;
    };

    let mut ordered = Map::with_capacity(map.len());
    for key in front {
        if let Some(v) = map.shift_remove(*key) {
            ordered.insert((*key).to_string(), v);
        }
    }
    ordered.extend(map);
    JsonValue::Object(ordered)
}

/// Read the type tag of a serialized model
#[inline]
#[must_use]
pub fn type_tag(value: &JsonValue) -> Option<&str> {
    value.get(TYPE_KEY).and_then(JsonValue::as_str)
}

/// Serialize a model and make sure its type tag is the first key
///
/// # Errors
/// Returns error if the model does not serialize to a JSON object
pub fn to_tagged_value<T: Serialize>(type_name: &str, model: &T) -> Result<JsonValue, serde_json::Error> {
    let mut value = serde_json::to_value(model)?;
    match value.as_object_mut() {
        Some(map) => {
            map.insert(TYPE_KEY.to_string(), JsonValue::String(type_name.to_string()));
        }
        None => {
            return Err(serde::ser::Error::custom(format!(
                "{type_name} must serialize to a JSON object"
            )))
        }
    }
    Ok(ordered_object(value, &[TYPE_KEY]))
}

/// Generate canonical JSON (sorted keys, compact)
#[must_use]
pub fn canonical_json(value: &JsonValue) -> String {
    match value {
        JsonValue::Object(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort();

            let parts: Vec<String> = keys
                .into_iter()
                .filter_map(|key| {
                    map.get(key)
                        .map(|val| format!("{}:{}", quote(key), canonical_json(val)))
                })
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        JsonValue::Array(arr) => {
            let parts: Vec<_> = arr.iter().map(canonical_json).collect();
            format!("[{}]", parts.join(","))
        }
        JsonValue::String(s) => quote(s),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Null => "null".to_string(),
    }
}

fn quote(s: &str) -> String {
    JsonValue::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn ordered_object_moves_front_keys() {
        let value = json!({"a": 1, "idx": 0, "b": 2, "obi_version": "0.1.0"});
        let ordered = ordered_object(value, &["obi_version", "idx", "missing"]);
        let keys: Vec<_> = ordered.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["obi_version", "idx", "a", "b"]);
    }

    #[test]
    fn ordered_object_leaves_scalars() {
        assert_eq!(ordered_object(json!(3), &["a"]), json!(3));
    }

    #[test]
    fn tagged_value_puts_type_first() {
        #[derive(Serialize)]
        struct Info {
            campaign_name: String,
        }

        let value = to_tagged_value("Info", &Info { campaign_name: "c".into() }).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["type", "campaign_name"]);
        assert_eq!(type_tag(&value), Some("Info"));
    }

    #[test]
    fn tagged_value_rejects_scalars() {
        assert!(to_tagged_value("Number", &3).is_err());
    }

    #[test]
    fn canonical_json_sorts_keys() {
        let a = json!({"b": 1, "a": {"y": [1, 2], "x": "q\"uote"}});
        assert_eq!(canonical_json(&a), r#"{"a":{"x":"q\"uote","y":[1,2]},"b":1}"#);
    }
}
