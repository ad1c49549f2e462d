//! Encoding: the inverse of [`crate::unmarshal`] (distilled spec §4.4). No
//! encoder exists in the original implementation (decode-only); this one is
//! designed fresh, as the exact inverse of the decode tag table, preferring
//! the shortest representable form at every choice point (SPEC_FULL.md §9).

use std::collections::HashMap;
use std::io::Write;

use crate::errors::Result;
use crate::fixnum::{encode_byteseq, encode_fixnum};
use crate::session::Session;
use crate::stream::ByteWriter;
use crate::unmarshal::MAGIC;
use crate::value::{Object, ObjectId, Value};

/// Encodes one value, with the two-byte magic header, into `inner`.
pub fn encode<W: Write>(value: Value, session: &Session, inner: W) -> Result<()> {
    let mut writer = ByteWriter::new(inner);
    writer.put_bytes(&MAGIC)?;
    let mut marshaller = Marshaller::new(session);
    marshaller.encode_value(value, &mut writer)?;
    writer.flush()
}

/// Per-encode wire-id bookkeeping: assigned at first emission during the
/// traversal, independent of the `Session`'s own creation-order ids.
/// Symbols are deduplicated by name content (Ruby symbols are value types —
/// two `SymbolId`s carrying the same name are the same symbol on the wire),
/// objects by `ObjectId` identity (two distinct objects with equal contents
/// are still distinct references).
struct Marshaller<'a> {
    session: &'a Session,
    wire_symbols: HashMap<Vec<u8>, u32>,
    wire_objects: HashMap<ObjectId, u32>,
    /// Content-keyed dedup for strings specifically (§4.4): two distinct
    /// `ObjectId`s carrying equal bytes collapse to one wire reference,
    /// unlike composite objects, which dedup by identity only.
    string_dedup: HashMap<Vec<u8>, u32>,
}

impl<'a> Marshaller<'a> {
    fn new(session: &'a Session) -> Self {
        Marshaller {
            session,
            wire_symbols: HashMap::new(),
            wire_objects: HashMap::new(),
            string_dedup: HashMap::new(),
        }
    }

    fn encode_value<W: Write>(&mut self, value: Value, writer: &mut ByteWriter<W>) -> Result<()> {
        match value {
            Value::Nil => writer.put_byte(b'0'),
            Value::True => writer.put_byte(b'T'),
            Value::False => writer.put_byte(b'F'),
            Value::Int(i) => {
                writer.put_byte(b'i')?;
                encode_fixnum(writer, i)
            }
            Value::Symbol(id) => {
                let name = self.session.symbol(id)?.name.clone();
                self.encode_symbol_name(&name, writer)
            }
            Value::Object(id) => self.encode_object(id, writer),
        }
    }

    fn encode_symbol_name<W: Write>(&mut self, name: &[u8], writer: &mut ByteWriter<W>) -> Result<()> {
        if let Some(&wire_id) = self.wire_symbols.get(name) {
            writer.put_byte(b';')?;
            return encode_fixnum(writer, wire_id as i32);
        }
        let wire_id = self.wire_symbols.len() as u32;
        self.wire_symbols.insert(name.to_vec(), wire_id);
        writer.put_byte(b':')?;
        encode_byteseq(writer, name)
    }

    fn encode_object<W: Write>(&mut self, id: ObjectId, writer: &mut ByteWriter<W>) -> Result<()> {
        if let Some(&wire_id) = self.wire_objects.get(&id) {
            writer.put_byte(b'@')?;
            return encode_fixnum(writer, wire_id as i32);
        }

        let object = self.session.object(id)?.clone();

        // Strings dedup by content even across distinct `ObjectId`s: a
        // second occurrence of equal bytes reuses the first's wire id
        // rather than spending a fresh one.
        if let Object::String(s) = &object {
            if let Some(&wire_id) = self.string_dedup.get(&s.bytes) {
                self.wire_objects.insert(id, wire_id);
                writer.put_byte(b'@')?;
                return encode_fixnum(writer, wire_id as i32);
            }
        }

        // Registered before its children are encoded, mirroring the
        // decoder's registration-before-recursion discipline — a
        // self-referential child then emits a short `@` back-reference
        // instead of recursing forever.
        let wire_id = self.wire_objects.len() as u32;
        self.wire_objects.insert(id, wire_id);
        if let Object::String(s) = &object {
            self.string_dedup.insert(s.bytes.clone(), wire_id);
        }

        match object {
            Object::Array(items) => {
                writer.put_byte(b'[')?;
                encode_fixnum(writer, i32::try_from(items.len()).unwrap_or(i32::MAX))?;
                for item in items {
                    self.encode_value(item, writer)?;
                }
                Ok(())
            }
            Object::Hash(pairs) => {
                writer.put_byte(b'{')?;
                encode_fixnum(writer, i32::try_from(pairs.len()).unwrap_or(i32::MAX))?;
                for (key, value) in pairs {
                    self.encode_value(key, writer)?;
                    self.encode_value(value, writer)?;
                }
                Ok(())
            }
            Object::String(s) => {
                if let Some(encoding) = s.encoding {
                    writer.put_byte(b'I')?;
                    writer.put_byte(b'"')?;
                    encode_byteseq(writer, &s.bytes)?;
                    encode_fixnum(writer, 1)?;
                    self.encode_symbol_name(b"E", writer)?;
                    writer.put_byte(if encoding { b'T' } else { b'F' })
                } else {
                    writer.put_byte(b'"')?;
                    encode_byteseq(writer, &s.bytes)
                }
            }
            Object::GenericObject(g) => {
                writer.put_byte(b'o')?;
                self.encode_symbol_name(g.class_name.as_bytes(), writer)?;
                encode_fixnum(writer, i32::try_from(g.attributes.len()).unwrap_or(i32::MAX))?;
                for (key, value) in g.attributes {
                    self.encode_value(Value::Symbol(key), writer)?;
                    self.encode_value(value, writer)?;
                }
                Ok(())
            }
            Object::UserDefined(u) => {
                let wrap = !u.attributes.is_empty();
                if wrap {
                    writer.put_byte(b'I')?;
                }
                writer.put_byte(b'u')?;
                self.encode_symbol_name(u.class_name.as_bytes(), writer)?;
                encode_byteseq(writer, &u.data)?;
                if wrap {
                    encode_fixnum(writer, i32::try_from(u.attributes.len()).unwrap_or(i32::MAX))?;
                    for (key, value) in u.attributes {
                        self.encode_value(Value::Symbol(key), writer)?;
                        self.encode_value(value, writer)?;
                    }
                }
                Ok(())
            }
            Object::UserMarshal(u) => {
                let wrap = !u.attributes.is_empty();
                if wrap {
                    writer.put_byte(b'I')?;
                }
                writer.put_byte(b'U')?;
                self.encode_symbol_name(u.class_name.as_bytes(), writer)?;
                self.encode_value(u.data, writer)?;
                if wrap {
                    encode_fixnum(writer, i32::try_from(u.attributes.len()).unwrap_or(i32::MAX))?;
                    for (key, value) in u.attributes {
                        self.encode_value(Value::Symbol(key), writer)?;
                        self.encode_value(value, writer)?;
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unmarshal::decode;
    use crate::value::{GenericObject, StringObject};

    fn roundtrip(value: Value, session: &Session) -> (Value, Session) {
        let mut bytes = Vec::new();
        encode(value, session, &mut bytes).unwrap();
        let mut out_session = Session::new();
        let decoded = decode(&bytes[..], &mut out_session).unwrap();
        (decoded, out_session)
    }

    #[test]
    fn encodes_immediates() {
        let session = Session::new();
        let (v, _) = roundtrip(Value::Nil, &session);
        assert_eq!(v, Value::Nil);
        let (v, _) = roundtrip(Value::Int(42), &session);
        assert_eq!(v, Value::Int(42));
    }

    #[test]
    fn encodes_array_roundtrip() {
        let mut session = Session::new();
        let id = session.register_object(Object::Array(vec![Value::Int(1), Value::Int(2)]));
        let (decoded, out_session) = roundtrip(Value::Object(id), &session);
        match decoded {
            Value::Object(out_id) => assert_eq!(
                out_session.object(out_id).unwrap(),
                &Object::Array(vec![Value::Int(1), Value::Int(2)])
            ),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn encodes_self_referential_array() {
        let mut session = Session::new();
        let id = session.reserve_object(Object::Array(Vec::new()));
        session.fill_object(id, Object::Array(vec![Value::Object(id)])).unwrap();
        let (decoded, out_session) = roundtrip(Value::Object(id), &session);
        match decoded {
            Value::Object(out_id) => {
                assert_eq!(out_session.object(out_id).unwrap(), &Object::Array(vec![Value::Object(out_id)]));
            }
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn encodes_string_with_encoding_flag() {
        let mut session = Session::new();
        let id = session.register_object(Object::String(StringObject {
            bytes: b"hi".to_vec(),
            encoding: Some(true),
        }));
        let (decoded, out_session) = roundtrip(Value::Object(id), &session);
        match decoded {
            Value::Object(out_id) => match out_session.object(out_id).unwrap() {
                Object::String(s) => {
                    assert_eq!(s.bytes, b"hi");
                    assert_eq!(s.encoding, Some(true));
                }
                _ => panic!("expected string"),
            },
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn encodes_generic_object_roundtrip() {
        let mut session = Session::new();
        let sym = session.register_symbol(b"x".to_vec());
        let id = session.register_object(Object::GenericObject(GenericObject {
            class_name: "Point".to_string(),
            attributes: vec![(sym, Value::Int(5))],
        }));
        let (decoded, out_session) = roundtrip(Value::Object(id), &session);
        match decoded {
            Value::Object(out_id) => match out_session.object(out_id).unwrap() {
                Object::GenericObject(g) => {
                    assert_eq!(g.class_name, "Point");
                    assert_eq!(g.attributes[0].1, Value::Int(5));
                }
                _ => panic!("expected generic object"),
            },
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn dedups_repeated_string_by_content() {
        let mut session = Session::new();
        let a = session.register_object(Object::String(StringObject {
            bytes: b"dup".to_vec(),
            encoding: None,
        }));
        let b = session.register_object(Object::String(StringObject {
            bytes: b"dup".to_vec(),
            encoding: None,
        }));
        let id = session.register_object(Object::Array(vec![Value::Object(a), Value::Object(b)]));
        let (decoded, out_session) = roundtrip(Value::Object(id), &session);
        match decoded {
            Value::Object(out_id) => match out_session.object(out_id).unwrap() {
                Object::Array(items) => assert_eq!(items[0], items[1], "both occurrences should decode to the same object"),
                _ => panic!("expected array"),
            },
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn dedups_repeated_symbol_by_name() {
        let mut session = Session::new();
        let a = session.register_symbol(b"dup".to_vec());
        let b = session.register_symbol(b"dup".to_vec());
        let id = session.register_object(Object::Array(vec![Value::Symbol(a), Value::Symbol(b)]));
        let mut bytes = Vec::new();
        encode(Value::Object(id), &session, &mut bytes).unwrap();
        // second occurrence should be a short symbol reference, not a
        // re-declared symbol: header + array tag + count + ":"+len+"dup" + ";"+ref
        let expected_len = 2 + 1 + 1 + (1 + 1 + 3) + 2;
        assert_eq!(bytes.len(), expected_len);
    }
}
