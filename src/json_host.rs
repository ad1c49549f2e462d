//! A reference [`HostRuntime`] implementation over `serde_json::Value`,
//! used by the CLI's JSON interchange format and by the test suite. Not a
//! faithful general-purpose host — plain JSON has no symbol or byte-string
//! type, so this host encodes them with a small set of tagged-object
//! conventions documented on each method.
//!
//! Composite values are wrapped in `Rc<RefCell<_>>` so that an `array_push`
//! or `set_attribute` call mutates the same handle a cycle or earlier
//! reference already holds — `serde_json::Value` itself has no identity,
//! only structural equality, so plain clones would not observe later
//! mutation.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Number, Value as Json};

use crate::errors::{MarshalError, Result};
use crate::host::{HostPayload, HostRuntime, HostShape};

pub type JsonHandle = Rc<RefCell<Json>>;

/// Wraps a plain `serde_json::Value` as a handle, for callers (the CLI's
/// `encode` command) that already have one to feed into [`crate::project::from_host`].
pub fn wrap_json(value: Json) -> JsonHandle {
    Rc::new(RefCell::new(value))
}

#[derive(Default)]
pub struct JsonHost;

impl JsonHost {
    pub fn new() -> Self {
        JsonHost
    }

    fn wrap(value: Json) -> JsonHandle {
        wrap_json(value)
    }
}

impl HostRuntime for JsonHost {
    type Value = JsonHandle;

    fn nil(&mut self) -> Self::Value {
        Self::wrap(Json::Null)
    }

    fn bool(&mut self, value: bool) -> Self::Value {
        Self::wrap(Json::Bool(value))
    }

    fn integer(&mut self, value: i32) -> Self::Value {
        Self::wrap(Json::Number(Number::from(value)))
    }

    /// Symbols are `{"symbol": "<name>"}`, since JSON strings are already
    /// claimed for Marshal strings.
    fn symbol(&mut self, name: &str) -> Self::Value {
        let mut map = Map::new();
        map.insert("symbol".to_string(), Json::String(name.to_string()));
        Self::wrap(Json::Object(map))
    }

    /// Plain JSON string, lossily decoded as UTF-8 when `encoding` carries
    /// no information; `{"string": "...", "encoding": bool}` when it does.
    fn string(&mut self, bytes: &[u8], encoding: Option<bool>) -> Self::Value {
        let text = String::from_utf8_lossy(bytes).into_owned();
        match encoding {
            None => Self::wrap(Json::String(text)),
            Some(flag) => {
                let mut map = Map::new();
                map.insert("string".to_string(), Json::String(text));
                map.insert("encoding".to_string(), Json::Bool(flag));
                Self::wrap(Json::Object(map))
            }
        }
    }

    fn array_new(&mut self) -> Self::Value {
        Self::wrap(Json::Array(Vec::new()))
    }

    fn array_push(&mut self, array: &Self::Value, item: Self::Value) -> Result<()> {
        let mut slot = array.borrow_mut();
        match &mut *slot {
            Json::Array(items) => {
                items.push(item.borrow().clone());
                Ok(())
            }
            other => Err(MarshalError::HostCallFailure {
                method: "array_push",
                reason: format!("handle is not a JSON array: {other:?}"),
            }),
        }
    }

    /// A hash is `{"hash": [[k, v], ...]}` so that non-string keys (ints,
    /// symbols, nested arrays) survive round-tripping through JSON, which
    /// only allows string object keys.
    fn hash_new(&mut self) -> Self::Value {
        let mut map = Map::new();
        map.insert("hash".to_string(), Json::Array(Vec::new()));
        Self::wrap(Json::Object(map))
    }

    fn hash_set(&mut self, hash: &Self::Value, key: Self::Value, value: Self::Value) -> Result<()> {
        let mut slot = hash.borrow_mut();
        match slot.get_mut("hash") {
            Some(Json::Array(entries)) => {
                entries.push(Json::Array(vec![key.borrow().clone(), value.borrow().clone()]));
                Ok(())
            }
            _ => Err(MarshalError::HostCallFailure {
                method: "hash_set",
                reason: "handle is not a JSON hash wrapper".into(),
            }),
        }
    }

    /// A class instance is `{"class": "<name>", "attributes": {}}`.
    fn instantiate(&mut self, class_name: &str) -> Result<Self::Value> {
        let mut map = Map::new();
        map.insert("class".to_string(), Json::String(class_name.to_string()));
        map.insert("attributes".to_string(), Json::Object(Map::new()));
        Ok(Self::wrap(Json::Object(map)))
    }

    fn set_attribute(&mut self, object: &Self::Value, name: &str, value: Self::Value) -> Result<()> {
        let mut slot = object.borrow_mut();
        match slot.get_mut("attributes") {
            Some(Json::Object(attrs)) => {
                attrs.insert(name.to_string(), value.borrow().clone());
                Ok(())
            }
            _ => Err(MarshalError::HostCallFailure {
                method: "set_attribute",
                reason: "handle is not a JSON class-instance wrapper".into(),
            }),
        }
    }

    fn invoke_load(&mut self, object: &Self::Value, payload: HostPayload<Self::Value>) -> Result<()> {
        let mut slot = object.borrow_mut();
        let key = match &payload {
            HostPayload::Bytes(_) => "data",
            HostPayload::Value(_) => "marshal_data",
        };
        let value = match payload {
            HostPayload::Bytes(bytes) => Json::Array(bytes.into_iter().map(|b| Json::Number(Number::from(b))).collect()),
            HostPayload::Value(handle) => handle.borrow().clone(),
        };
        match &mut *slot {
            Json::Object(map) => {
                map.insert(key.to_string(), value);
                Ok(())
            }
            other => Err(MarshalError::HostCallFailure {
                method: "invoke_load",
                reason: format!("handle is not a JSON object: {other:?}"),
            }),
        }
    }

    fn snapshot(&self, value: &Self::Value) -> HostShape<Self::Value> {
        let borrowed = value.borrow();
        match &*borrowed {
            Json::Null => HostShape::Nil,
            Json::Bool(b) => HostShape::Bool(*b),
            Json::Number(n) => HostShape::Int(n.as_i64().unwrap_or_default() as i32),
            Json::String(s) => HostShape::String(s.clone().into_bytes()),
            Json::Array(items) => {
                HostShape::Array(items.iter().cloned().map(Self::wrap).collect())
            }
            Json::Object(map) => {
                if let Some(Json::String(name)) = map.get("symbol") {
                    return HostShape::Symbol(name.clone());
                }
                if let Some(Json::String(text)) = map.get("string") {
                    return HostShape::String(text.clone().into_bytes());
                }
                if let Some(Json::Array(entries)) = map.get("hash") {
                    let pairs = entries
                        .iter()
                        .filter_map(|entry| match entry {
                            Json::Array(kv) if kv.len() == 2 => {
                                Some((Self::wrap(kv[0].clone()), Self::wrap(kv[1].clone())))
                            }
                            _ => None,
                        })
                        .collect();
                    return HostShape::Hash(pairs);
                }
                if let Some(Json::String(class_name)) = map.get("class") {
                    let attributes = match map.get("attributes") {
                        Some(Json::Object(attrs)) => attrs
                            .iter()
                            .map(|(k, v)| (k.clone(), Self::wrap(v.clone())))
                            .collect(),
                        _ => Vec::new(),
                    };
                    // A `"data"`/`"marshal_data"` key is this host's way of
                    // reporting a `dump`/`marshal_dump` hook (the reverse of
                    // `invoke_load`'s key choice on the `to_host` side).
                    if map.contains_key("data") {
                        return HostShape::UserDefined {
                            class_name: class_name.clone(),
                            attributes,
                        };
                    }
                    if map.contains_key("marshal_data") {
                        return HostShape::UserMarshal {
                            class_name: class_name.clone(),
                            attributes,
                        };
                    }
                    return HostShape::Object {
                        class_name: class_name.clone(),
                        attributes,
                    };
                }
                // Fall back to treating an untagged JSON object as a
                // class-less attribute bag.
                HostShape::Object {
                    class_name: "Object".to_string(),
                    attributes: map.iter().map(|(k, v)| (k.clone(), Self::wrap(v.clone()))).collect(),
                }
            }
        }
    }

    fn invoke(&self, value: &Self::Value, method: &'static str) -> Result<HostPayload<Self::Value>> {
        let borrowed = value.borrow();
        let map = match &*borrowed {
            Json::Object(map) => map,
            other => {
                return Err(MarshalError::HostCallFailure {
                    method,
                    reason: format!("handle is not a JSON object: {other:?}"),
                })
            }
        };
        match method {
            "dump" => match map.get("data") {
                Some(Json::Array(items)) => {
                    let bytes = items
                        .iter()
                        .map(|b| b.as_u64().unwrap_or_default() as u8)
                        .collect();
                    Ok(HostPayload::Bytes(bytes))
                }
                _ => Err(MarshalError::HostCallFailure {
                    method,
                    reason: "missing a \"data\" byte array".into(),
                }),
            },
            "marshal_dump" => match map.get("marshal_data") {
                Some(v) => Ok(HostPayload::Value(Self::wrap(v.clone()))),
                None => Err(MarshalError::HostCallFailure {
                    method,
                    reason: "missing a \"marshal_data\" value".into(),
                }),
            },
            _ => Err(MarshalError::HostCallFailure {
                method,
                reason: "unknown hook method".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{from_host, Projector};
    use crate::session::Session;
    use crate::value::{Object, StringObject, Value};

    #[test]
    fn to_host_renders_array_of_ints() {
        let mut session = Session::new();
        let id = session.register_object(Object::Array(vec![Value::Int(1), Value::Int(2)]));
        let mut host = JsonHost::new();
        let mut projector = Projector::new();
        let handle = projector.to_host(Value::Object(id), &session, &mut host).unwrap();
        assert_eq!(*handle.borrow(), serde_json::json!([1, 2]));
    }

    #[test]
    fn to_host_renders_string_with_encoding() {
        let mut session = Session::new();
        let id = session.register_object(Object::String(StringObject {
            bytes: b"hi".to_vec(),
            encoding: Some(true),
        }));
        let mut host = JsonHost::new();
        let mut projector = Projector::new();
        let handle = projector.to_host(Value::Object(id), &session, &mut host).unwrap();
        assert_eq!(*handle.borrow(), serde_json::json!({"string": "hi", "encoding": true}));
    }

    #[test]
    fn from_host_roundtrips_symbol() {
        let host = JsonHost::new();
        let mut session = Session::new();
        let handle = JsonHost::wrap(serde_json::json!({"symbol": "foo"}));
        let value = from_host(&handle, &mut session, &host).unwrap();
        match value {
            Value::Symbol(id) => assert_eq!(session.symbol(id).unwrap().name_lossy(), "foo"),
            _ => panic!("expected symbol"),
        }
    }

    #[test]
    fn from_host_lifts_user_defined_via_dump() {
        let host = JsonHost::new();
        let mut session = Session::new();
        let handle = JsonHost::wrap(serde_json::json!({
            "class": "Thing",
            "attributes": {},
            "data": [97, 98, 99],
        }));
        let value = from_host(&handle, &mut session, &host).unwrap();
        match value {
            Value::Object(id) => match session.object(id).unwrap() {
                Object::UserDefined(u) => {
                    assert_eq!(u.class_name, "Thing");
                    assert_eq!(u.data, b"abc");
                }
                other => panic!("expected user-defined, got {other:?}"),
            },
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn from_host_lifts_user_marshal_via_marshal_dump() {
        let host = JsonHost::new();
        let mut session = Session::new();
        let handle = JsonHost::wrap(serde_json::json!({
            "class": "Thing",
            "attributes": {},
            "marshal_data": 1,
        }));
        let value = from_host(&handle, &mut session, &host).unwrap();
        match value {
            Value::Object(id) => match session.object(id).unwrap() {
                Object::UserMarshal(u) => {
                    assert_eq!(u.class_name, "Thing");
                    assert_eq!(u.data, Value::Int(1));
                }
                other => panic!("expected user-marshal, got {other:?}"),
            },
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn user_marshal_roundtrips_through_encode_and_decode() {
        // Scenario 6: a host value reporting `marshal_dump` encodes to the
        // `U` wire form and decodes back to an equivalent JSON projection,
        // exercising the public `from_host` -> `encode` -> `decode` ->
        // `to_host` surface rather than just the decode direction.
        let host = JsonHost::new();
        let mut session = Session::new();
        let handle = JsonHost::wrap(serde_json::json!({
            "class": "Thing",
            "attributes": {},
            "marshal_data": 1,
        }));
        let value = from_host(&handle, &mut session, &host).unwrap();

        let mut bytes = Vec::new();
        crate::marshal::encode(value, &session, &mut bytes).unwrap();

        let mut out_session = Session::new();
        let decoded = crate::unmarshal::decode(&bytes[..], &mut out_session).unwrap();
        let mut out_host = JsonHost::new();
        let mut projector = Projector::new();
        let projected = projector.to_host(decoded, &out_session, &mut out_host).unwrap();
        assert_eq!(
            *projected.borrow(),
            serde_json::json!({"attributes": {}, "class": "Thing", "marshal_data": 1})
        );
    }
}
