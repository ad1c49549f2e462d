//! Projecting a decoded [`Value`] tree onto a [`HostRuntime`], and lifting a
//! host value back into a `Session`-owned `Value` tree (distilled spec
//! §4.7). Kept as its own cache rather than folded into `Session`, since the
//! cache is a property of one particular host projection, not of the
//! decoded data itself — a single `Session` can be projected onto several
//! different hosts.

use std::collections::HashMap;

use crate::errors::{MarshalError, Result};
use crate::host::{HostPayload, HostRuntime, HostShape};
use crate::session::Session;
use crate::value::{GenericObject, Object, ObjectId, StringObject, UserDefined, UserMarshal, Value};

/// Caches objects already projected to a host, keyed by `ObjectId`. The
/// cache entry is written *before* an object's children are projected, so a
/// self-referential child resolves to the cached handle instead of
/// recursing forever (the same discipline [`crate::unmarshal`] uses on
/// decode).
pub struct Projector<H: HostRuntime> {
    to_host_cache: HashMap<ObjectId, H::Value>,
}

impl<H: HostRuntime> Projector<H> {
    pub fn new() -> Self {
        Projector {
            to_host_cache: HashMap::new(),
        }
    }

    pub fn to_host(&mut self, value: Value, session: &Session, host: &mut H) -> Result<H::Value> {
        match value {
            Value::Nil => Ok(host.nil()),
            Value::True => Ok(host.bool(true)),
            Value::False => Ok(host.bool(false)),
            Value::Int(i) => Ok(host.integer(i)),
            Value::Symbol(id) => {
                let name = session.symbol(id)?.name_lossy();
                Ok(host.symbol(&name))
            }
            Value::Object(id) => self.to_host_object(id, session, host),
        }
    }

    fn to_host_object(&mut self, id: ObjectId, session: &Session, host: &mut H) -> Result<H::Value> {
        if let Some(cached) = self.to_host_cache.get(&id) {
            return Ok(cached.clone());
        }
        let object = session.object(id)?.clone();
        match object {
            Object::Array(items) => {
                let handle = host.array_new();
                self.to_host_cache.insert(id, handle.clone());
                for item in items {
                    let projected = self.to_host(item, session, host)?;
                    host.array_push(&handle, projected)?;
                }
                Ok(handle)
            }
            Object::Hash(pairs) => {
                let handle = host.hash_new();
                self.to_host_cache.insert(id, handle.clone());
                for (key, value) in pairs {
                    let key = self.to_host(key, session, host)?;
                    let value = self.to_host(value, session, host)?;
                    host.hash_set(&handle, key, value)?;
                }
                Ok(handle)
            }
            Object::String(StringObject { bytes, encoding }) => {
                let handle = host.string(&bytes, encoding);
                self.to_host_cache.insert(id, handle.clone());
                Ok(handle)
            }
            Object::GenericObject(GenericObject { class_name, attributes }) => {
                let handle = host.instantiate(&class_name)?;
                self.to_host_cache.insert(id, handle.clone());
                self.apply_attributes(&handle, attributes, session, host)?;
                Ok(handle)
            }
            Object::UserDefined(UserDefined { class_name, data, attributes }) => {
                let handle = host.instantiate(&class_name)?;
                self.to_host_cache.insert(id, handle.clone());
                host.invoke_load(&handle, HostPayload::Bytes(data))?;
                self.apply_attributes(&handle, attributes, session, host)?;
                Ok(handle)
            }
            Object::UserMarshal(UserMarshal { class_name, data, attributes }) => {
                let handle = host.instantiate(&class_name)?;
                self.to_host_cache.insert(id, handle.clone());
                let projected = self.to_host(data, session, host)?;
                host.invoke_load(&handle, HostPayload::Value(projected))?;
                self.apply_attributes(&handle, attributes, session, host)?;
                Ok(handle)
            }
        }
    }

    fn apply_attributes(
        &mut self,
        handle: &H::Value,
        attributes: Vec<(crate::value::SymbolId, Value)>,
        session: &Session,
        host: &mut H,
    ) -> Result<()> {
        for (key, value) in attributes {
            let name = session.symbol(key)?.name_lossy();
            // A leading `@` is the wire's instance-variable sigil, stripped
            // before it reaches the host, per GenericObject_set_instance_var.
            let name = name.strip_prefix('@').unwrap_or(&name);
            let projected = self.to_host(value, session, host)?;
            host.set_attribute(handle, name, projected)?;
        }
        Ok(())
    }
}

impl<H: HostRuntime> Default for Projector<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifts a host value into a fresh `Value` owned by `session`. There is no
/// cycle cache here: most host representations (e.g. `serde_json::Value`)
/// cannot express a cycle in the first place, so none is needed to decode
/// one safely.
pub fn from_host<H: HostRuntime>(handle: &H::Value, session: &mut Session, host: &H) -> Result<Value> {
    match host.snapshot(handle) {
        HostShape::Nil => Ok(Value::Nil),
        HostShape::Bool(true) => Ok(Value::True),
        HostShape::Bool(false) => Ok(Value::False),
        HostShape::Int(i) => Ok(Value::Int(i)),
        HostShape::Symbol(name) => {
            let id = session
                .find_symbol_by_name(name.as_bytes())
                .unwrap_or_else(|| session.register_symbol(name.into_bytes()));
            Ok(Value::Symbol(id))
        }
        HostShape::String(bytes) => {
            Ok(Value::Object(session.register_object(Object::String(StringObject {
                bytes,
                encoding: None,
            }))))
        }
        HostShape::Array(items) => {
            let id = session.reserve_object(Object::Array(Vec::new()));
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(from_host(&item, session, host)?);
            }
            session.fill_object(id, Object::Array(values))?;
            Ok(Value::Object(id))
        }
        HostShape::Hash(pairs) => {
            let id = session.reserve_object(Object::Hash(Vec::new()));
            let mut values = Vec::with_capacity(pairs.len());
            for (key, value) in pairs {
                values.push((from_host(&key, session, host)?, from_host(&value, session, host)?));
            }
            session.fill_object(id, Object::Hash(values))?;
            Ok(Value::Object(id))
        }
        HostShape::Object { class_name, attributes } => {
            let id = session.reserve_object(Object::GenericObject(GenericObject {
                class_name,
                attributes: Vec::new(),
            }));
            let built = from_host_attributes(attributes, session, host)?;
            match session.object_mut(id)? {
                Object::GenericObject(g) => g.attributes = built,
                _ => return Err(MarshalError::TypeMismatch("expected generic object slot".into())),
            }
            Ok(Value::Object(id))
        }
        HostShape::UserDefined { class_name, attributes } => {
            let id = session.reserve_object(Object::UserDefined(UserDefined {
                class_name,
                data: Vec::new(),
                attributes: Vec::new(),
            }));
            let data = match host.invoke(handle, "dump")? {
                HostPayload::Bytes(bytes) => bytes,
                HostPayload::Value(_) => {
                    return Err(MarshalError::HostCallFailure {
                        method: "dump",
                        reason: "expected a byte payload, got a nested value".into(),
                    })
                }
            };
            let built = from_host_attributes(attributes, session, host)?;
            match session.object_mut(id)? {
                Object::UserDefined(u) => {
                    u.data = data;
                    u.attributes = built;
                }
                _ => return Err(MarshalError::TypeMismatch("expected user-defined slot".into())),
            }
            Ok(Value::Object(id))
        }
        HostShape::UserMarshal { class_name, attributes } => {
            let id = session.reserve_object(Object::UserMarshal(UserMarshal {
                class_name,
                data: Value::Nil,
                attributes: Vec::new(),
            }));
            let data = match host.invoke(handle, "marshal_dump")? {
                HostPayload::Value(nested) => from_host(&nested, session, host)?,
                HostPayload::Bytes(_) => {
                    return Err(MarshalError::HostCallFailure {
                        method: "marshal_dump",
                        reason: "expected a nested value payload, got raw bytes".into(),
                    })
                }
            };
            let built = from_host_attributes(attributes, session, host)?;
            match session.object_mut(id)? {
                Object::UserMarshal(u) => {
                    u.data = data;
                    u.attributes = built;
                }
                _ => return Err(MarshalError::TypeMismatch("expected user-marshal slot".into())),
            }
            Ok(Value::Object(id))
        }
    }
}

/// Lifts a host attribute list (name, host value) into a `(SymbolId, Value)`
/// list, interning each name as a symbol (reusing one already registered
/// under that name, per `find_symbol_by_name`).
fn from_host_attributes<H: HostRuntime>(
    attributes: Vec<(String, H::Value)>,
    session: &mut Session,
    host: &H,
) -> Result<Vec<(crate::value::SymbolId, Value)>> {
    let mut built = Vec::with_capacity(attributes.len());
    for (name, value) in attributes {
        let sym = session
            .find_symbol_by_name(name.as_bytes())
            .unwrap_or_else(|| session.register_symbol(name.into_bytes()));
        built.push((sym, from_host(&value, session, host)?));
    }
    Ok(built)
}
