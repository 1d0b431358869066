//! Typed helpers over [`ApiClient`](crate::client::ApiClient), one module per
//! backend resource.

pub mod auth;
pub mod devotionals;
pub mod memories;
pub mod notes;
pub mod payment;
pub mod prayers;
pub mod profile;

use crate::client::ApiError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Unwraps a `{ "data": [...] }` list reply. A missing or non-array `data`
/// is an empty list.
pub(crate) fn list_data<T: DeserializeOwned>(reply: Value) -> Result<Vec<T>, ApiError> {
    match reply {
        Value::Object(mut map) => match map.remove("data") {
            Some(items @ Value::Array(_)) => serde_json::from_value(items).map_err(ApiError::Decode),
            _ => Ok(vec![]),
        },
        _ => Ok(vec![]),
    }
}

/// Unwraps a `{ "data": {...} }` reply, accepting a bare object too since
/// some endpoints answer without the envelope.
pub(crate) fn item_data<T: DeserializeOwned>(reply: Value) -> Result<T, ApiError> {
    let inner = match reply {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(inner).map_err(ApiError::Decode)
}
