//! Wire-level request/reply shapes (§6): the `Request`/`Reply` frame
//! structs every message on the wire is one or the other of. The `Set`
//! type (§3's unordered-string-set) has no separate Rust representation
//! here — the validator encodes/decodes it directly against
//! `serde_json::Value`, since nothing in this crate's dynamic, run-time
//! dispatch model ever holds a typed set value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A method call frame, `{"method": ..., "parameters": ..., ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub more: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oneway: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade: Option<bool>,
}

impl Request {
    pub fn new(method: impl Into<String>, parameters: Value) -> Self {
        let parameters = match &parameters {
            Value::Object(map) if map.is_empty() => None,
            other => Some(other.clone()),
        };
        Request {
            method: method.into(),
            parameters,
            more: None,
            oneway: None,
            upgrade: None,
        }
    }

    /// Split `"iface.Name"` into `("iface", "Name")` on the last dot.
    pub fn split_method(&self) -> Option<(&str, &str)> {
        let idx = self.method.rfind('.')?;
        let (iface, rest) = self.method.split_at(idx);
        let name = &rest[1..];
        if iface.is_empty() || name.is_empty() {
            return None;
        }
        Some((iface, name))
    }
}

/// A reply frame: either `{"parameters": ..., "continues": ...}` or
/// `{"error": ..., "parameters": ...}`. Exactly one of `error`/success data
/// is meaningful per §3's "exactly one of reply/error per frame" invariant;
/// this struct represents the union the way it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Reply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continues: Option<bool>,
}

impl Reply {
    pub fn success(parameters: Value, continues: bool) -> Self {
        let parameters = match &parameters {
            Value::Object(map) if map.is_empty() => None,
            other => Some(other.clone()),
        };
        Reply {
            error: None,
            parameters,
            continues: if continues { Some(true) } else { None },
        }
    }

    pub fn error(name: impl Into<String>, parameters: Value) -> Self {
        let parameters = match &parameters {
            Value::Object(map) if map.is_empty() => None,
            other => Some(other.clone()),
        };
        Reply {
            error: Some(name.into()),
            parameters,
            continues: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// §6: "absence of `continues` is equivalent to `continues: false`".
    pub fn continues(&self) -> bool {
        self.continues.unwrap_or(false)
    }
}
