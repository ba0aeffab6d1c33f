//! Structural equality for JSON values.

use serde_json::Value;

/// Deep equality check between two JSON values.
///
/// Same as `==` on [`Value`] except that numbers compare by numeric value:
/// `1` and `1.0` are equal.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => {
            if a == b {
                return true;
            }
            match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (Value::String(a), Value::String(b)) => a == b,

        (Value::Array(arr_a), Value::Array(arr_b)) => {
            arr_a.len() == arr_b.len() && arr_a.iter().zip(arr_b).all(|(x, y)| deep_equal(x, y))
        }

        (Value::Object(obj_a), Value::Object(obj_b)) => {
            if obj_a.len() != obj_b.len() {
                return false;
            }
            obj_a
                .iter()
                .all(|(key, val_a)| obj_b.get(key).is_some_and(|val_b| deep_equal(val_a, val_b)))
        }

        // Different types are never equal
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primitives() {
        assert!(deep_equal(&json!(null), &json!(null)));
        assert!(deep_equal(&json!("a"), &json!("a")));
        assert!(!deep_equal(&json!("a"), &json!("b")));
        assert!(!deep_equal(&json!(0), &json!(false)));
        assert!(!deep_equal(&json!(null), &json!(0)));
    }

    #[test]
    fn test_numbers_by_value() {
        assert!(deep_equal(&json!(1), &json!(1.0)));
        assert!(deep_equal(&json!(-3), &json!(-3.0)));
        assert!(!deep_equal(&json!(1), &json!(1.5)));
    }

    #[test]
    fn test_nested() {
        let a = json!({"foo": [1, 2, {"x": 3}]});
        let b = json!({"foo": [1, 2, {"x": 3.0}]});
        let c = json!({"foo": [1, 2, {"x": 4}]});
        assert!(deep_equal(&a, &b));
        assert!(!deep_equal(&a, &c));
        assert!(!deep_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!deep_equal(&json!([1]), &json!([1, 1])));
    }
}
