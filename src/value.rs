//! The decoded value tree (distilled spec §3).
//!
//! `Value` is `Copy` and is either an immediate (`Nil`/`True`/`False`/`Int`)
//! or a handle into a [`crate::session::Session`]'s arena
//! (`Symbol`/`Object`). This is the arena-and-index rendition of the
//! original's pointer-based `ruby_instance_t` graph, chosen so that
//! self-referential and back-referenced structures never require cloning a
//! cyclic tree (see SPEC_FULL.md §3 and §9).

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u32);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Nil,
    True,
    False,
    Int(i32),
    Symbol(SymbolId),
    Object(ObjectId),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::True => "True",
            Value::False => "False",
            Value::Int(_) => "Int",
            Value::Symbol(_) => "Symbol",
            Value::Object(_) => "Object",
        }
    }
}

/// The payload of a registered symbol: its interned name. No declared text
/// encoding — the bytes are carried as-is (distilled spec §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolEntry {
    pub name: Vec<u8>,
}

impl SymbolEntry {
    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

/// The payload of a registered object. Kept separate from `Value` so that
/// `Value` itself stays a small `Copy` handle (§3's arena-and-index choice).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Object {
    String(StringObject),
    Array(Vec<Value>),
    Hash(Vec<(Value, Value)>),
    GenericObject(GenericObject),
    UserDefined(UserDefined),
    UserMarshal(UserMarshal),
}

impl Object {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Object::String(_) => "String",
            Object::Array(_) => "Array",
            Object::Hash(_) => "Hash",
            Object::GenericObject(_) => "GenericObject",
            Object::UserDefined(_) => "UserDefined",
            Object::UserMarshal(_) => "UserMarshal",
        }
    }

    /// Dispatches an attribute assignment to this object, or to the nearest
    /// ancestor kind that accepts attributes, per §4.3.
    pub fn set_attribute(&mut self, key: Value, value: Value, key_name: Option<&str>) -> AttrTarget {
        match self {
            Object::String(s) => AttrTarget::String(&mut s.encoding, key_name.map(str::to_owned)),
            Object::GenericObject(g) => AttrTarget::Attributes(&mut g.attributes, key, value),
            Object::UserDefined(u) => AttrTarget::Attributes(&mut u.attributes, key, value),
            Object::UserMarshal(u) => AttrTarget::Attributes(&mut u.attributes, key, value),
            Object::Array(_) | Object::Hash(_) => AttrTarget::Unsupported(self.kind_name()),
        }
    }
}

/// Disambiguates how an attribute assignment should be applied; returned by
/// [`Object::set_attribute`] instead of erroring inline so the caller (which
/// owns the `Session` and its error formatting) can produce a rich
/// `MarshalError`.
pub enum AttrTarget<'a> {
    String(&'a mut Option<bool>, Option<String>),
    Attributes(&'a mut Vec<(SymbolId, Value)>, Value, Value),
    Unsupported(&'static str),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringObject {
    pub bytes: Vec<u8>,
    /// The `E` instance variable some streams carry alongside a string to
    /// describe its encoding. `None` means the source stream carried no
    /// such attribute at all (see SPEC_FULL.md §4.6 on why that is not the
    /// same as `Some(false)`).
    pub encoding: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericObject {
    pub class_name: String,
    pub attributes: Vec<(SymbolId, Value)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserDefined {
    pub class_name: String,
    pub data: Vec<u8>,
    pub attributes: Vec<(SymbolId, Value)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserMarshal {
    pub class_name: String,
    pub data: Value,
    pub attributes: Vec<(SymbolId, Value)>,
}
