//! Shared helpers for storing `serde`-tagged unit enums as their wire
//! string in a `TEXT` column, reused by every store in this crate that
//! persists a model enum without a hand-written `as_str`/`parse` pair.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{RuntimeError, RuntimeResult};

/// Render `value`'s `serde` wire representation as the bare string stored
/// in a column, e.g. `RunStatus::PreviewReady` -> `"preview_ready"`.
///
/// # Panics
///
/// Panics if `T`'s `Serialize` impl is fallible or does not produce a JSON
/// string, which is never the case for the unit enums this crate stores.
pub fn to_tag<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value).expect("enum serialization is infallible") {
        serde_json::Value::String(tag) => tag,
        other => panic!("expected a string tag, got {other}"),
    }
}

/// Parse a column value back into `T` via its `serde` wire representation.
///
/// # Errors
///
/// Returns [`RuntimeError::UnknownTag`] if `tag` is not one of `T`'s
/// variants.
pub fn from_tag<T: DeserializeOwned>(entity: &'static str, tag: &str) -> RuntimeResult<T> {
    serde_json::from_value(serde_json::Value::String(tag.to_string()))
        .map_err(|_source| RuntimeError::UnknownTag { entity, tag: tag.to_string() })
}
