//! Composite correlation ids.
//!
//! Every client-originated request id is rewritten to
//! `<client-id>:<original-id>` before it reaches the shared stdin, so the
//! wrapped server's response can be routed back to its true sender even
//! when two clients picked the same original id. Client ids are UUIDs and
//! can never contain the separator; original ids may, which is why the
//! split is on the FIRST occurrence only.

use serde_json::Value;

use crate::registry::ClientId;

/// Separator between the client id and the original id.
pub const ID_SEPARATOR: char = ':';

/// Rewrite an original id into its composite form.
///
/// Non-string ids are stringified (`1` → `"1"`); [`split`] undoes this by
/// re-coercing integral originals back to numbers.
pub fn compose(client: &ClientId, original: &Value) -> Value {
    let original = match original {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Value::String(format!("{client}{ID_SEPARATOR}{original}"))
}

/// Split a composite id back into `(client-id, original-id)`.
///
/// Returns `None` when the id does not look rewritten: not a string, or a
/// string without the separator. Such ids are the server's own (e.g. a
/// server-initiated request) and fall through to broadcast.
pub fn split(id: &Value) -> Option<(String, Value)> {
    let (client, original) = id.as_str()?.split_once(ID_SEPARATOR)?;
    let restored = match original.parse::<i64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::String(original.to_string()),
    };
    Some((client.to_string(), restored))
}
