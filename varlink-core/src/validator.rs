//! Recursive value validator/coercer (§4.3): normalizes a decoded JSON
//! value against an IDL type node, used at all four call sites (client
//! outbound params, client inbound reply, server inbound params, server
//! outbound reply).

use std::collections::{BTreeSet, HashSet};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::idl::{Field, Interface, Type};

/// The validator's internal result: a type node either normalizes to a
/// present JSON value, or — only for `Maybe` — to "absent", the sentinel
/// that is distinct from "present but null" (§9).
enum Normalized {
    Absent,
    Present(Value),
}

fn invalid(path: &str) -> Error {
    Error::InvalidParameter(path.to_string())
}

fn join_path(path: &str, next: &str) -> String {
    if path.is_empty() {
        next.to_string()
    } else {
        format!("{path}.{next}")
    }
}

/// Validates/normalizes `value` against a method's input or output struct
/// fields. This is the crate's one public validator entry point; alias
/// and error payload types (top-level, not struct-shaped) are validated
/// the same way by wrapping them in a one-field struct at the call site if
/// needed, but in practice every wire payload in this protocol is a
/// struct (§3's "a method call is `{method, parameters, ...}`").
pub fn validate(interface: Option<&Interface>, fields: &[Field], value: &Value) -> Result<Value> {
    match validate_struct(interface, fields, Some(value), "")? {
        Normalized::Present(v) => Ok(v),
        Normalized::Absent => unreachable!("a struct value is never itself absent"),
    }
}

fn validate_type(
    interface: Option<&Interface>,
    ty: &Type,
    value: Option<&Value>,
    path: &str,
) -> Result<Normalized> {
    match ty {
        Type::Maybe(inner) => match value {
            None | Some(Value::Null) => Ok(Normalized::Absent),
            Some(v) => validate_type(interface, inner, Some(v), path),
        },
        Type::Map(inner) => validate_map(interface, inner, value, path),
        Type::Array(inner) => validate_array(interface, inner, value, path),
        Type::Set => validate_set(value, path),
        Type::Object => Ok(Normalized::Present(value.cloned().unwrap_or(Value::Null))),
        Type::Bool => match value {
            Some(Value::Bool(b)) => Ok(Normalized::Present(Value::Bool(*b))),
            _ => Err(invalid(path)),
        },
        Type::Int => coerce_int(value, path),
        Type::Float => coerce_float(value, path),
        Type::String => match value {
            Some(Value::String(s)) => Ok(Normalized::Present(Value::String(s.clone()))),
            _ => Err(invalid(path)),
        },
        Type::Enum(tags) => match value {
            Some(Value::String(s)) if tags.iter().any(|t| t == s) => {
                Ok(Normalized::Present(Value::String(s.clone())))
            }
            _ => Err(invalid(path)),
        },
        Type::Struct(fields) => validate_struct(interface, fields, value, path),
        Type::CustomRef(name) => {
            let iface = interface.ok_or_else(|| invalid(path))?;
            let resolved = iface.resolve_alias(name).ok_or_else(|| invalid(path))?;
            validate_type(Some(iface), resolved, value, path)
        }
    }
}

fn validate_map(
    interface: Option<&Interface>,
    inner: &Type,
    value: Option<&Value>,
    path: &str,
) -> Result<Normalized> {
    let obj = match value {
        None => return Ok(Normalized::Present(Value::Object(Default::default()))),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(invalid(path)),
    };
    let mut out = serde_json::Map::new();
    for (key, v) in obj {
        let field_path = join_path(path, key);
        match validate_type(interface, inner, Some(v), &field_path)? {
            Normalized::Absent => {}
            Normalized::Present(nv) => {
                out.insert(key.clone(), nv);
            }
        }
    }
    Ok(Normalized::Present(Value::Object(out)))
}

fn validate_array(
    interface: Option<&Interface>,
    inner: &Type,
    value: Option<&Value>,
    path: &str,
) -> Result<Normalized> {
    let arr = match value {
        None => return Ok(Normalized::Present(Value::Array(Vec::new()))),
        Some(Value::Array(a)) => a,
        Some(_) => return Err(invalid(path)),
    };
    let mut out = Vec::with_capacity(arr.len());
    for (i, v) in arr.iter().enumerate() {
        let elem_path = format!("{path}[{i}]");
        match validate_type(interface, inner, Some(v), &elem_path)? {
            Normalized::Absent => {}
            Normalized::Present(nv) => out.push(nv),
        }
    }
    Ok(Normalized::Present(Value::Array(out)))
}

/// `Set`: a sequence of distinct strings. Outbound encoding is a map with
/// empty-object values; inbound, both the map shape and a plain string
/// array are accepted and normalized to a set (§4.3).
fn validate_set(value: Option<&Value>, path: &str) -> Result<Normalized> {
    let tags: BTreeSet<String> = match value {
        None => BTreeSet::new(),
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        Some(Value::Array(arr)) => {
            let mut set = BTreeSet::new();
            for v in arr {
                match v.as_str() {
                    Some(s) => {
                        set.insert(s.to_string());
                    }
                    None => return Err(invalid(path)),
                }
            }
            set
        }
        Some(_) => return Err(invalid(path)),
    };
    let mut out = serde_json::Map::new();
    for tag in tags {
        out.insert(tag, Value::Object(Default::default()));
    }
    Ok(Normalized::Present(Value::Object(out)))
}

fn coerce_int(value: Option<&Value>, path: &str) -> Result<Normalized> {
    match value.and_then(Value::as_number) {
        Some(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Normalized::Present(Value::from(i)))
            } else if let Some(f) = n.as_f64() {
                Ok(Normalized::Present(Value::from(f.round() as i64)))
            } else {
                Err(invalid(path))
            }
        }
        None => Err(invalid(path)),
    }
}

fn coerce_float(value: Option<&Value>, path: &str) -> Result<Normalized> {
    match value.and_then(Value::as_f64) {
        Some(f) => Ok(Normalized::Present(
            serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        )),
        None => Err(invalid(path)),
    }
}

fn validate_struct(
    interface: Option<&Interface>,
    fields: &[Field],
    value: Option<&Value>,
    path: &str,
) -> Result<Normalized> {
    // Struct values may be a mapping or a positional tuple (§4.3).
    let obj: serde_json::Map<String, Value> = match value {
        None => serde_json::Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(Value::Array(arr)) => fields
            .iter()
            .zip(arr.iter())
            .map(|(f, v)| (f.name.clone(), v.clone()))
            .collect(),
        Some(_) => return Err(invalid(path)),
    };

    let known: HashSet<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    for key in obj.keys() {
        if !known.contains(key.as_str()) {
            return Err(Error::InvalidParameter(key.clone()));
        }
    }

    let mut out = serde_json::Map::new();
    for field in fields {
        let field_path = join_path(path, &field.name);
        let fv = obj.get(&field.name);
        match validate_type(interface, &field.ty, fv, &field_path)? {
            Normalized::Absent => {}
            Normalized::Present(v) => {
                out.insert(field.name.clone(), v);
            }
        }
    }
    Ok(Normalized::Present(Value::Object(out)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Type)]) -> Vec<Field> {
        pairs.iter().map(|(n, t)| Field::new(*n, t.clone())).collect()
    }

    #[test]
    fn maybe_absent_is_omitted() {
        let f = fields(&[("name", Type::Maybe(Box::new(Type::String)))]);
        let out = validate(None, &f, &json!({})).unwrap();
        assert_eq!(out, json!({}));
    }

    #[test]
    fn maybe_null_is_also_omitted() {
        let f = fields(&[("name", Type::Maybe(Box::new(Type::String)))]);
        let out = validate(None, &f, &json!({ "name": null })).unwrap();
        assert_eq!(out, json!({}));
    }

    #[test]
    fn int_accepts_float_and_rounds() {
        let f = fields(&[("n", Type::Int)]);
        let out = validate(None, &f, &json!({ "n": 2.6 })).unwrap();
        assert_eq!(out, json!({ "n": 3 }));
    }

    #[test]
    fn int_rejects_string() {
        let f = fields(&[("int", Type::Int)]);
        let err = validate(None, &f, &json!({ "int": "1" })).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(p) if p == "int"));
    }

    #[test]
    fn float_accepts_plain_integer() {
        let f = fields(&[("float", Type::Float)]);
        let out = validate(None, &f, &json!({ "float": 1 })).unwrap();
        assert_eq!(out["float"].as_f64(), Some(1.0));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let f = fields(&[("a", Type::String)]);
        let err = validate(None, &f, &json!({ "a": "x", "b": 1 })).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(p) if p == "b"));
    }

    #[test]
    fn set_round_trips_through_map_shape() {
        let f = fields(&[("tags", Type::Set)]);
        let out = validate(None, &f, &json!({ "tags": ["one", "two", "three"] })).unwrap();
        assert_eq!(
            out["tags"],
            json!({ "one": {}, "two": {}, "three": {} })
        );
    }

    #[test]
    fn set_accepts_map_shape_inbound() {
        let f = fields(&[("tags", Type::Set)]);
        let out = validate(None, &f, &json!({ "tags": { "a": {}, "b": {} } })).unwrap();
        assert_eq!(out["tags"], json!({ "a": {}, "b": {} }));
    }

    #[test]
    fn missing_array_defaults_to_empty() {
        let f = fields(&[("items", Type::Array(Box::new(Type::Int)))]);
        let out = validate(None, &f, &json!({})).unwrap();
        assert_eq!(out, json!({ "items": [] }));
    }
}
