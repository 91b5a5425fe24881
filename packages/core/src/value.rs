//! Protocol-level typed values and update items.

use bytes::Bytes;
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::path::Path;

/// A typed value as carried by a protocol update.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// RFC 7951 JSON payload.
    JsonIetf(Bytes),
    Json(Bytes),
    String(String),
    Int(i64),
    Uint(u64),
    Bool(bool),
    Double(f64),
}

impl TypedValue {
    pub fn json_ietf(payload: impl Into<Bytes>) -> Self {
        TypedValue::JsonIetf(payload.into())
    }

    /// Decode this value into a JSON tree.
    pub fn to_json(&self) -> Result<JsonValue, serde_json::Error> {
        Ok(match self {
            TypedValue::JsonIetf(bytes) | TypedValue::Json(bytes) => {
                serde_json::from_slice(bytes)?
            }
            TypedValue::String(s) => JsonValue::String(s.clone()),
            TypedValue::Int(i) => JsonValue::from(*i),
            TypedValue::Uint(u) => JsonValue::from(*u),
            TypedValue::Bool(b) => JsonValue::Bool(*b),
            // Non-finite doubles have no JSON form and become null.
            TypedValue::Double(d) => JsonValue::from(*d),
        })
    }
}

impl From<&str> for TypedValue {
    fn from(s: &str) -> Self {
        TypedValue::String(s.to_string())
    }
}

/// One replace or update item of a write request.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub path: Path,
    pub value: TypedValue,
}

impl Update {
    pub fn new(path: Path, value: TypedValue) -> Self {
        Self { path, value }
    }

    /// An item addressed by a protocol xpath (see [`Path::parse_xpath`]).
    pub fn from_xpath(xpath: &str, value: TypedValue) -> Result<Self> {
        Ok(Self::new(Path::parse_xpath(xpath)?, value))
    }
}
