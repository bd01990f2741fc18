use crate::errors::Result;
use serde::Serialize;
use serde_json::Value;

/// Largest integer a JavaScript client can represent exactly (2^53 - 1).
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

/// Replaces every integer outside the safe range with its decimal string.
///
/// Walks arrays and objects recursively; object keys keep their order and
/// every other value is left untouched.
pub fn stringify_big_ints(value: &mut Value) {
    match value {
        Value::Number(n) => {
            if is_unsafe(n) {
                *value = Value::String(n.to_string());
            }
        }
        Value::Array(items) => items.iter_mut().for_each(stringify_big_ints),
        Value::Object(map) => map.values_mut().for_each(stringify_big_ints),
        Value::Null | Value::Bool(_) | Value::String(_) => {}
    }
}

fn is_unsafe(n: &serde_json::Number) -> bool {
    if let Some(u) = n.as_u64() {
        u > MAX_SAFE_INTEGER
    } else if let Some(i) = n.as_i64() {
        i.unsigned_abs() > MAX_SAFE_INTEGER
    } else {
        false
    }
}

/// Converts a row into a JSON value that is safe to hand to a browser.
pub fn to_safe_json<T: Serialize>(row: &T) -> Result<Value> {
    let mut value = serde_json::to_value(row)?;
    stringify_big_ints(&mut value);
    Ok(value)
}

pub fn rows_to_safe_json<T: Serialize>(rows: &[T]) -> Result<Vec<Value>> {
    rows.iter().map(to_safe_json).collect()
}
