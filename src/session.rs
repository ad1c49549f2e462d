//! The arena that owns every symbol and object produced by a decode, or
//! fed into an encode (distilled spec §3, §4.3).
//!
//! Mirrors the original's `ruby_context_t`: a flat growable table of
//! symbols and a flat growable table of objects, both addressed by a
//! creation-order index (`SymbolId`/`ObjectId`). Symbol lookup by name is a
//! deliberate linear scan, following `ruby_context_find_symbol` in
//! `original_source/marshal48/ruby_base.c` — stream symbol tables are small
//! enough that a hash index would be premature.

use crate::errors::{MarshalError, Result};
use crate::value::{AttrTarget, Object, SymbolEntry, SymbolId, ObjectId, Value};

/// Guards against pathologically deep or cyclic-without-registration input;
/// chosen generously above any realistic object graph (SPEC_FULL.md §4.3).
pub const MAX_DEPTH: u32 = 512;

pub struct Session {
    symbols: Vec<SymbolEntry>,
    objects: Vec<Object>,
    depth: u32,
}

impl Session {
    pub fn new() -> Self {
        Session {
            symbols: Vec::new(),
            objects: Vec::new(),
            depth: 0,
        }
    }

    pub fn register_symbol(&mut self, name: Vec<u8>) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(SymbolEntry { name });
        id
    }

    /// Linear scan for a symbol already carrying this name, per the
    /// original's `ruby_context_find_symbol`.
    pub fn find_symbol_by_name(&self, name: &[u8]) -> Option<SymbolId> {
        self.symbols
            .iter()
            .position(|entry| entry.name == name)
            .map(|idx| SymbolId(idx as u32))
    }

    pub fn symbol(&self, id: SymbolId) -> Result<&SymbolEntry> {
        self.symbols
            .get(id.0 as usize)
            .ok_or(MarshalError::BadReference { kind: "symbol", id: id.0 })
    }

    /// Reserves a new object slot with a placeholder payload and returns its
    /// id immediately, before any of the object's children are decoded —
    /// this is what lets a self-referential back-reference mid-decode
    /// resolve to a handle instead of recursing forever (SPEC_FULL.md §4.3).
    pub fn reserve_object(&mut self, placeholder: Object) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(placeholder);
        id
    }

    pub fn register_object(&mut self, object: Object) -> ObjectId {
        self.reserve_object(object)
    }

    pub fn fill_object(&mut self, id: ObjectId, object: Object) -> Result<()> {
        let slot = self
            .objects
            .get_mut(id.0 as usize)
            .ok_or(MarshalError::BadReference { kind: "object", id: id.0 })?;
        *slot = object;
        Ok(())
    }

    pub fn object(&self, id: ObjectId) -> Result<&Object> {
        self.objects
            .get(id.0 as usize)
            .ok_or(MarshalError::BadReference { kind: "object", id: id.0 })
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        self.objects
            .get_mut(id.0 as usize)
            .ok_or(MarshalError::BadReference { kind: "object", id: id.0 })
    }

    /// Assigns an attribute to an already-registered object, dispatching to
    /// the nearest accepting kind per §4.3 (e.g. a string's leading `@E`
    /// instance variable becomes its encoding flag, not a generic
    /// attribute).
    pub fn set_attribute(&mut self, target: ObjectId, key: Value, value: Value) -> Result<()> {
        let key_name = match key {
            Value::Symbol(sym) => self.symbol(sym).ok().map(|e| e.name_lossy()),
            _ => None,
        };
        let object = self.object_mut(target)?;
        match object.set_attribute(key, value, key_name.as_deref()) {
            AttrTarget::String(encoding_slot, name) => {
                if name.as_deref() == Some("E") {
                    *encoding_slot = match value {
                        Value::True => Some(true),
                        Value::False => Some(false),
                        _ => {
                            return Err(MarshalError::TypeMismatch(
                                "string encoding attribute must be true or false".into(),
                            ))
                        }
                    };
                    Ok(())
                } else {
                    Err(MarshalError::UnsupportedAttribute {
                        kind: "String",
                        name: name.unwrap_or_default(),
                    })
                }
            }
            AttrTarget::Attributes(attrs, key, value) => {
                let sym = match key {
                    Value::Symbol(sym) => sym,
                    _ => {
                        return Err(MarshalError::TypeMismatch(
                            "attribute keys must be symbols".into(),
                        ))
                    }
                };
                attrs.push((sym, value));
                Ok(())
            }
            AttrTarget::Unsupported(kind) => Err(MarshalError::UnsupportedAttribute {
                kind,
                name: key_name.unwrap_or_default(),
            }),
        }
    }

    pub fn enter_nesting(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(MarshalError::DepthExceeded { limit: MAX_DEPTH });
        }
        Ok(())
    }

    pub fn exit_nesting(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
