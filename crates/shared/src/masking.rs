//! Masking of sensitive request fields before they reach any log sink.

use serde_json::Value;

/// Placeholder written in place of sensitive values.
pub const MASK: &str = "********";

/// Field names whose values are never logged.
pub const SENSITIVE_FIELDS: [&str; 6] = [
    "password",
    "token",
    "resetPasswordToken",
    "activationToken",
    "currentPassword",
    "newPassword",
];

/// Returns true if the given field name must be masked.
pub fn is_sensitive(field: &str) -> bool {
    SENSITIVE_FIELDS.contains(&field)
}

/// Replaces sensitive values in place, descending into nested objects and arrays.
pub fn mask_sensitive(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if is_sensitive(key) {
                    *v = Value::String(MASK.to_string());
                } else {
                    mask_sensitive(v);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask_sensitive),
        _ => {}
    }
}

/// Returns a masked copy of the given value.
pub fn masked(value: &Value) -> Value {
    let mut copy = value.clone();
    mask_sensitive(&mut copy);
    copy
}
