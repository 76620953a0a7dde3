//! Conversion between JSON values and script values

use rhai::{Array, Dynamic, Map as ScriptMap};
use serde_json::{Map, Number, Value};

/// Convert a script value to JSON
pub fn dynamic_to_json(value: Dynamic) -> Value {
    if value.is_unit() {
        Value::Null
    } else if value.is_bool() {
        Value::Bool(value.as_bool().unwrap_or(false))
    } else if value.is_int() {
        Value::from(value.as_int().unwrap_or(0))
    } else if value.is_float() {
        value
            .as_float()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    } else if value.is_string() || value.is_char() {
        Value::String(value.to_string())
    } else if value.is_array() {
        match value.into_array() {
            Ok(items) => Value::Array(items.into_iter().map(dynamic_to_json).collect()),
            Err(_) => Value::Null,
        }
    } else if value.is_map() {
        match value.try_cast::<ScriptMap>() {
            Some(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k.to_string(), dynamic_to_json(v)))
                    .collect(),
            ),
            None => Value::Null,
        }
    } else {
        // Timestamps, function pointers and the like
        Value::String(value.to_string())
    }
}

/// Convert JSON to a script value
pub fn json_to_dynamic(value: Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Dynamic::from(i)
            } else if let Some(f) = n.as_f64() {
                Dynamic::from(f)
            } else {
                Dynamic::UNIT
            }
        }
        Value::String(s) => Dynamic::from(s),
        Value::Array(items) => {
            let array: Array = items.into_iter().map(json_to_dynamic).collect();
            Dynamic::from_array(array)
        }
        Value::Object(obj) => Dynamic::from_map(object_to_script_map(obj)),
    }
}

/// Convert a JSON object to a script map
pub fn object_to_script_map(obj: Map<String, Value>) -> ScriptMap {
    obj.into_iter()
        .map(|(k, v)| (k.into(), json_to_dynamic(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_roundtrip() {
        let value = json!({
            "name": "widget",
            "price": 9.5,
            "qty": 3,
            "tags": ["a", "b"],
            "meta": {"active": true, "note": null}
        });

        let back = dynamic_to_json(json_to_dynamic(value.clone()));
        assert_eq!(back, value);
    }

    #[test]
    fn test_scalars() {
        assert_eq!(dynamic_to_json(Dynamic::from(42_i64)), json!(42));
        assert_eq!(dynamic_to_json(Dynamic::from("hi".to_string())), json!("hi"));
        assert_eq!(dynamic_to_json(Dynamic::UNIT), Value::Null);
        assert_eq!(dynamic_to_json(Dynamic::from(f64::NAN)), Value::Null);
    }
}
