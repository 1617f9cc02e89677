//! Marshalling between native JSON values and runtime values.
//!
//! Wrapping is lazy: arrays and objects are kept as JSON and their
//! elements are wrapped on access. Unwrapping is deep and eager.

use std::sync::Arc;

use quill_core::format_number;
use serde_json::{Map, Number, Value as Json};

use crate::protocol;
use crate::types::{EvalError, Value};

/// Largest magnitude at which every integer is exactly representable.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Wrap a native value. Containers are not converted until accessed.
pub fn wrap(native: Json) -> Value {
    match native {
        Json::Null => Value::None,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        Json::String(s) => Value::from(s),
        Json::Array(items) => Value::WrappedList(Arc::new(items)),
        Json::Object(map) => Value::WrappedDict(Arc::new(map)),
    }
}

/// Convert a runtime value back to its native form.
pub fn to_native(value: &Value) -> Result<Json, EvalError> {
    match value {
        Value::None => Ok(Json::Null),
        Value::Bool(b) => Ok(Json::Bool(*b)),
        Value::Float(n) => number(*n),
        Value::Str(s) => Ok(Json::String(s.to_string())),
        Value::Tuple(items) | Value::List(items) => items
            .iter()
            .map(to_native)
            .collect::<Result<Vec<_>, _>>()
            .map(Json::Array),
        Value::WrappedList(items) => Ok(Json::Array(items.as_ref().clone())),
        Value::WrappedDict(map) => Ok(Json::Object(map.as_ref().clone())),
        Value::Dict(dict) => {
            let mut map = Map::with_capacity(dict.len());
            for (key, item) in dict.iter() {
                map.insert(native_key(key)?, to_native(item)?);
            }
            Ok(Json::Object(map))
        }
        Value::Instance(inst) => match inst.class.to_native_fn() {
            Some(convert) => convert(inst),
            None => Err(not_serializable(value)),
        },
        Value::NotImplemented | Value::Function(_) | Value::BoundMethod(_) | Value::Class(_) => {
            Err(not_serializable(value))
        }
    }
}

/// Integral floats become JSON integers so `1` round-trips as `1`.
fn number(n: f64) -> Result<Json, EvalError> {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Ok(Json::Number(Number::from(n as i64)));
    }
    Number::from_f64(n)
        .map(Json::Number)
        .ok_or_else(|| EvalError::value_error(format!("out of range float value: {}", format_number(n))))
}

fn native_key(key: &Value) -> Result<String, EvalError> {
    match key {
        Value::Str(s) => Ok(s.to_string()),
        Value::Float(n) => Ok(format_number(*n)),
        Value::Bool(b) => Ok(b.to_string()),
        Value::None => Ok("null".to_owned()),
        other => Err(EvalError::type_error(format!(
            "keys must be str, float, bool or None, not {}",
            protocol::repr(other).unwrap_or_else(|_| other.type_name().to_owned())
        ))),
    }
}

fn not_serializable(value: &Value) -> EvalError {
    EvalError::type_error(format!(
        "Object of type '{}' has no native form",
        value.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dict;
    use serde_json::json;

    #[test]
    fn round_trips_native_shapes() {
        for native in [
            json!(null),
            json!(true),
            json!(42),
            json!(-1.5),
            json!("text"),
            json!([1, "a", [null, false]]),
            json!({"a": {"b": [1, 2]}, "c": "d"}),
        ] {
            assert_eq!(to_native(&wrap(native.clone())).unwrap(), native);
        }
    }

    #[test]
    fn wrapping_is_lazy() {
        let wrapped = wrap(json!({"nested": {"x": 1}}));
        assert!(matches!(wrapped, Value::WrappedDict(_)));
        let nested = protocol::get_item(&wrapped, &Value::from("nested")).unwrap();
        assert!(matches!(nested, Value::WrappedDict(_)));
    }

    #[test]
    fn dict_keys_are_stringified() {
        let mut dict = Dict::new();
        dict.insert(Value::int(1), Value::from("one")).unwrap();
        dict.insert(Value::Bool(true), Value::None).unwrap();
        dict.insert(Value::Float(2.5), Value::Bool(false)).unwrap();
        assert_eq!(
            to_native(&Value::dict(dict)).unwrap(),
            json!({"1": "one", "true": null, "2.5": false})
        );
    }

    #[test]
    fn functions_have_no_native_form() {
        let err = to_native(&crate::builtins::lookup("len").unwrap()).unwrap_err();
        assert_eq!(err.kind(), "TypeError");
        let err = to_native(&Value::Float(f64::NAN)).unwrap_err();
        assert_eq!(err.kind(), "ValueError");
    }
}
