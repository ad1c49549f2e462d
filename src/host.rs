//! The capability boundary between a decoded value tree and whatever
//! runtime is consuming or producing it (distilled spec §4.7). Grounded on
//! the `IlProvider`/`DotscopeProvider` split in
//! `bsharp_il::loader`: a trait describing what the embedding environment
//! can do, with a concrete `serde_json`-backed implementation supplied by
//! [`crate::json_host`].

use crate::errors::Result;

/// What a host value is classified as, crossing the boundary in
/// [`crate::project::from_host`]. Mirrors the original's
/// `PyList_Check`/`PyLong_Check`/.../`PyObject_HasAttrString` cascade in
/// `ruby_instance_from_python`: objects reporting a `dump` hook classify as
/// `UserDefined`, `marshal_dump` as `UserMarshal`, anything else as the
/// plain `Object` attribute bag.
pub enum HostShape<H> {
    Nil,
    Bool(bool),
    Int(i32),
    Symbol(String),
    String(Vec<u8>),
    Array(Vec<H>),
    Hash(Vec<(H, H)>),
    /// A plain class instance: attributes only, no `dump`/`marshal_dump`
    /// hook.
    Object { class_name: String, attributes: Vec<(String, H)> },
    /// A class instance reporting a `dump` hook; its byte payload is
    /// obtained via `HostRuntime::invoke(handle, "dump")`.
    UserDefined { class_name: String, attributes: Vec<(String, H)> },
    /// A class instance reporting a `marshal_dump` hook; its nested value
    /// payload is obtained via `HostRuntime::invoke(handle, "marshal_dump")`.
    UserMarshal { class_name: String, attributes: Vec<(String, H)> },
}

/// Operations an embedding environment must expose to receive or produce
/// Marshal 4.8 values. `Value` is the host's own representation of "an
/// object" (e.g. `serde_json::Value` for [`crate::json_host`]); it is
/// opaque to everything in this crate except the host's own methods.
pub trait HostRuntime {
    type Value: Clone;

    fn nil(&mut self) -> Self::Value;
    fn bool(&mut self, value: bool) -> Self::Value;
    fn integer(&mut self, value: i32) -> Self::Value;
    fn symbol(&mut self, name: &str) -> Self::Value;
    fn string(&mut self, bytes: &[u8], encoding: Option<bool>) -> Self::Value;

    fn array_new(&mut self) -> Self::Value;
    fn array_push(&mut self, array: &Self::Value, item: Self::Value) -> Result<()>;

    fn hash_new(&mut self) -> Self::Value;
    fn hash_set(&mut self, hash: &Self::Value, key: Self::Value, value: Self::Value) -> Result<()>;

    /// Instantiates a bare object of the given class, before any
    /// attributes/data are attached — called first so a self-referential
    /// attribute can resolve against the handle this returns.
    fn instantiate(&mut self, class_name: &str) -> Result<Self::Value>;
    fn set_attribute(&mut self, object: &Self::Value, name: &str, value: Self::Value) -> Result<()>;
    /// Delivers user-defined/user-marshal payload data (raw bytes, or an
    /// already-projected nested value) to a previously instantiated object.
    fn invoke_load(&mut self, object: &Self::Value, payload: HostPayload<Self::Value>) -> Result<()>;

    /// Classifies a host value for the `from_host` direction. Returning
    /// `HostShape::Object` with attributes invites the encoder to emit a
    /// generic object; a host whose value reports a `dump`/`marshal_dump`
    /// hook should return `HostShape::UserDefined`/`HostShape::UserMarshal`
    /// instead, so `from_host` knows to call `invoke` for the payload.
    fn snapshot(&self, value: &Self::Value) -> HostShape<Self::Value>;

    /// Invokes a duck-typed hook method (`"dump"` or `"marshal_dump"`) on a
    /// value `snapshot` classified as `UserDefined`/`UserMarshal`, producing
    /// the payload to carry on the wire as `u`/`U` data.
    fn invoke(&self, value: &Self::Value, method: &'static str) -> Result<HostPayload<Self::Value>>;
}

pub enum HostPayload<V> {
    Bytes(Vec<u8>),
    Value(V),
}
