//! Decoding: tag-dispatched recursive descent over a byte stream into a
//! [`Value`] tree owned by a [`Session`] (distilled spec §4.3, §4.4),
//! grounded on the `switch`/jump-table dispatch and per-tag handlers in
//! `original_source/marshal48/unmarshal.c`.

use std::io::Read;

use crate::errors::{MarshalError, Result};
use crate::fixnum::{decode_byteseq, decode_fixnum};
use crate::session::Session;
use crate::stream::ByteReader;
use crate::value::{GenericObject, Object, ObjectId, StringObject, SymbolId, UserDefined, UserMarshal, Value};

pub const MAGIC: [u8; 2] = [0x04, 0x08];

/// Decodes a full stream: magic header followed by exactly one value.
pub fn decode<R: Read>(inner: R, session: &mut Session) -> Result<Value> {
    let mut reader = ByteReader::new(inner);
    let magic = reader.next_bytes(2)?;
    if magic != MAGIC {
        return Err(MarshalError::BadMagic { found: magic });
    }
    decode_value(&mut reader, session)
}

fn decode_value<R: Read>(reader: &mut ByteReader<R>, session: &mut Session) -> Result<Value> {
    session.enter_nesting()?;
    let result = decode_tagged(reader, session);
    session.exit_nesting();
    result
}

fn decode_tagged<R: Read>(reader: &mut ByteReader<R>, session: &mut Session) -> Result<Value> {
    let offset = reader.offset();
    let tag = reader.next_byte()?;
    match tag {
        b'T' => Ok(Value::True),
        b'F' => Ok(Value::False),
        b'0' => Ok(Value::Nil),
        b'i' => Ok(Value::Int(decode_fixnum(reader)?)),
        b':' => decode_symbol(reader, session),
        b';' => decode_symbol_reference(reader, session),
        b'@' => decode_object_reference(reader, session),
        b'[' => decode_array(reader, session),
        b'{' => decode_hash(reader, session),
        b'"' => decode_string(reader, session),
        b'I' => decode_object_with_ivars(reader, session),
        b'o' => decode_generic_object(reader, session),
        b'U' => decode_user_marshal(reader, session),
        b'u' => decode_user_defined(reader, session),
        _ => Err(MarshalError::UnknownTag {
            tag,
            tag_char: tag as char,
            offset,
        }),
    }
}

fn decode_symbol<R: Read>(reader: &mut ByteReader<R>, session: &mut Session) -> Result<Value> {
    let name = decode_byteseq(reader)?;
    Ok(Value::Symbol(session.register_symbol(name)))
}

fn decode_symbol_reference<R: Read>(reader: &mut ByteReader<R>, session: &mut Session) -> Result<Value> {
    let idx = decode_fixnum(reader)?;
    let id = non_negative_id(idx, "symbol")?;
    session.symbol(id).map(|_| Value::Symbol(id))
}

fn decode_object_reference<R: Read>(reader: &mut ByteReader<R>, session: &mut Session) -> Result<Value> {
    let idx = decode_fixnum(reader)?;
    let id = non_negative_object_id(idx)?;
    session.object(id).map(|_| Value::Object(id))
}

fn non_negative_id(idx: i32, kind: &'static str) -> Result<SymbolId> {
    if idx < 0 {
        return Err(MarshalError::BadReference { kind, id: idx as u32 });
    }
    Ok(SymbolId(idx as u32))
}

fn non_negative_object_id(idx: i32) -> Result<ObjectId> {
    if idx < 0 {
        return Err(MarshalError::BadReference { kind: "object", id: idx as u32 });
    }
    Ok(ObjectId(idx as u32))
}

fn decode_array<R: Read>(reader: &mut ByteReader<R>, session: &mut Session) -> Result<Value> {
    let count = non_negative_count(decode_fixnum(reader)?)?;
    // Registered before its elements are decoded, per unmarshal_process_array:
    // this lets a self-referential element resolve via object-reference.
    let id = session.reserve_object(Object::Array(Vec::new()));
    let mut items = Vec::with_capacity(count.min(4096));
    for _ in 0..count {
        items.push(decode_value(reader, session)?);
    }
    session.fill_object(id, Object::Array(items))?;
    Ok(Value::Object(id))
}

fn decode_hash<R: Read>(reader: &mut ByteReader<R>, session: &mut Session) -> Result<Value> {
    let count = non_negative_count(decode_fixnum(reader)?)?;
    let id = session.reserve_object(Object::Hash(Vec::new()));
    let mut pairs = Vec::with_capacity(count.min(4096));
    for _ in 0..count {
        let key = decode_value(reader, session)?;
        let value = decode_value(reader, session)?;
        pairs.push((key, value));
    }
    session.fill_object(id, Object::Hash(pairs))?;
    Ok(Value::Object(id))
}

fn decode_string<R: Read>(reader: &mut ByteReader<R>, session: &mut Session) -> Result<Value> {
    let bytes = decode_byteseq(reader)?;
    // Strings have no nested values, so they are registered after their
    // bytes are read rather than before, per unmarshal_process_string.
    let id = session.register_object(Object::String(StringObject { bytes, encoding: None }));
    Ok(Value::Object(id))
}

fn decode_class_name<R: Read>(reader: &mut ByteReader<R>, session: &mut Session) -> Result<String> {
    match decode_value(reader, session)? {
        Value::Symbol(sym) => Ok(session.symbol(sym)?.name_lossy()),
        other => Err(MarshalError::TypeMismatch(format!(
            "expected a symbol class name, got {}",
            other.kind_name()
        ))),
    }
}

fn decode_generic_object<R: Read>(reader: &mut ByteReader<R>, session: &mut Session) -> Result<Value> {
    let class_name = decode_class_name(reader, session)?;
    let id = session.reserve_object(Object::GenericObject(GenericObject {
        class_name,
        attributes: Vec::new(),
    }));
    decode_instance_vars(reader, session, id)?;
    Ok(Value::Object(id))
}

fn decode_user_marshal<R: Read>(reader: &mut ByteReader<R>, session: &mut Session) -> Result<Value> {
    let class_name = decode_class_name(reader, session)?;
    let id = session.reserve_object(Object::UserMarshal(UserMarshal {
        class_name,
        data: Value::Nil,
        attributes: Vec::new(),
    }));
    let data = decode_value(reader, session)?;
    match session.object_mut(id)? {
        Object::UserMarshal(u) => u.data = data,
        _ => unreachable!("slot just reserved as UserMarshal"),
    }
    Ok(Value::Object(id))
}

fn decode_user_defined<R: Read>(reader: &mut ByteReader<R>, session: &mut Session) -> Result<Value> {
    let class_name = decode_class_name(reader, session)?;
    let data = decode_byteseq(reader)?;
    let id = session.register_object(Object::UserDefined(UserDefined {
        class_name,
        data,
        attributes: Vec::new(),
    }));
    Ok(Value::Object(id))
}

/// Handles the `I` tag: an inner value followed by an instance-variable
/// list. The inner value is *not* re-registered here — if it is a
/// composite, `decode_value` already registered it (see
/// `unmarshal_process_object_with_instance_vars`'s comment on this point).
fn decode_object_with_ivars<R: Read>(reader: &mut ByteReader<R>, session: &mut Session) -> Result<Value> {
    let inner = decode_value(reader, session)?;
    let count = non_negative_count(decode_fixnum(reader)?)?;
    match inner {
        Value::Object(id) => decode_instance_vars_into(reader, session, id, count)?,
        _ if count == 0 => {}
        _ => {
            return Err(MarshalError::UnsupportedAttribute {
                kind: inner.kind_name(),
                name: String::new(),
            })
        }
    }
    Ok(inner)
}

fn decode_instance_vars<R: Read>(reader: &mut ByteReader<R>, session: &mut Session, target: ObjectId) -> Result<()> {
    let count = non_negative_count(decode_fixnum(reader)?)?;
    decode_instance_vars_into(reader, session, target, count)
}

fn decode_instance_vars_into<R: Read>(
    reader: &mut ByteReader<R>,
    session: &mut Session,
    target: ObjectId,
    count: usize,
) -> Result<()> {
    for _ in 0..count {
        let key = decode_value(reader, session)?;
        let value = decode_value(reader, session)?;
        session.set_attribute(target, key, value)?;
    }
    Ok(())
}

fn non_negative_count(value: i32) -> Result<usize> {
    usize::try_from(value).map_err(|_| MarshalError::TypeMismatch(format!("negative count {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_bytes(bytes: &[u8]) -> (Value, Session) {
        let mut session = Session::new();
        let value = decode(bytes, &mut session).unwrap();
        (value, session)
    }

    #[test]
    fn decodes_nil_true_false() {
        let (v, _) = decode_bytes(&[0x04, 0x08, b'0']);
        assert_eq!(v, Value::Nil);
        let (v, _) = decode_bytes(&[0x04, 0x08, b'T']);
        assert_eq!(v, Value::True);
        let (v, _) = decode_bytes(&[0x04, 0x08, b'F']);
        assert_eq!(v, Value::False);
    }

    #[test]
    fn decodes_small_int() {
        let (v, _) = decode_bytes(&[0x04, 0x08, b'i', 0x06]);
        assert_eq!(v, Value::Int(1));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut session = Session::new();
        assert!(matches!(
            decode(&[0x01, 0x02][..], &mut session),
            Err(MarshalError::BadMagic { .. })
        ));
    }

    #[test]
    fn decodes_empty_array() {
        let (v, session) = decode_bytes(&[0x04, 0x08, b'[', 0x00]);
        match v {
            Value::Object(id) => assert_eq!(session.object(id).unwrap(), &Object::Array(Vec::new())),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn decodes_array_with_ints() {
        // [1, 2]
        let (v, session) = decode_bytes(&[0x04, 0x08, b'[', 0x07, b'i', 0x06, b'i', 0x07]);
        match v {
            Value::Object(id) => assert_eq!(
                session.object(id).unwrap(),
                &Object::Array(vec![Value::Int(1), Value::Int(2)])
            ),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn decodes_self_referential_array() {
        // a = []; a << a  ==>  [ "[", count=1, "@", 0 ]
        let (v, session) = decode_bytes(&[0x04, 0x08, b'[', 0x06, b'@', 0x00]);
        match v {
            Value::Object(id) => {
                assert_eq!(session.object(id).unwrap(), &Object::Array(vec![Value::Object(id)]));
            }
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn decodes_symbol_and_reference() {
        // [:foo, :foo] -- second entry is a symbol reference
        let bytes = [
            0x04, 0x08, b'[', 0x07, b':', 0x08, b'f', b'o', b'o', b';', 0x00,
        ];
        let (v, session) = decode_bytes(&bytes);
        match v {
            Value::Object(id) => match session.object(id).unwrap() {
                Object::Array(items) => {
                    assert_eq!(items.len(), 2);
                    assert_eq!(items[0], items[1]);
                }
                _ => panic!("expected array"),
            },
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn decodes_string_with_encoding_attribute() {
        // I"hi"; ivars: 1 pair, :E => true
        let bytes = [
            0x04, 0x08, b'I', b'"', 0x07, b'h', b'i', 0x06, b':', 0x06, b'E', b'T',
        ];
        let (v, session) = decode_bytes(&bytes);
        match v {
            Value::Object(id) => match session.object(id).unwrap() {
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
    fn decodes_generic_object_with_ivar() {
        // o:Point 1 attr: :x => 5
        let bytes = [
            0x04, 0x08, b'o', b':', 0x0a, b'P', b'o', b'i', b'n', b't', 0x06, 0x06, b':', 0x06, b'x', b'i',
            0x0a,
        ];
        let (v, session) = decode_bytes(&bytes);
        match v {
            Value::Object(id) => match session.object(id).unwrap() {
                Object::GenericObject(g) => {
                    assert_eq!(g.class_name, "Point");
                    assert_eq!(g.attributes.len(), 1);
                    assert_eq!(g.attributes[0].1, Value::Int(5));
                }
                _ => panic!("expected generic object"),
            },
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn decodes_user_defined_bytes() {
        // u:Thing 3 "abc"
        let bytes = [
            0x04, 0x08, b'u', b':', 0x0a, b'T', b'h', b'i', b'n', b'g', 0x08, b'a', b'b', b'c',
        ];
        let (v, session) = decode_bytes(&bytes);
        match v {
            Value::Object(id) => match session.object(id).unwrap() {
                Object::UserDefined(u) => {
                    assert_eq!(u.class_name, "Thing");
                    assert_eq!(u.data, b"abc");
                }
                _ => panic!("expected user-defined"),
            },
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn decodes_user_marshal_wrapped_value() {
        // U:Thing i 1  (wraps int 1)
        let bytes = [
            0x04, 0x08, b'U', b':', 0x0a, b'T', b'h', b'i', b'n', b'g', b'i', 0x06,
        ];
        let (v, session) = decode_bytes(&bytes);
        match v {
            Value::Object(id) => match session.object(id).unwrap() {
                Object::UserMarshal(u) => {
                    assert_eq!(u.class_name, "Thing");
                    assert_eq!(u.data, Value::Int(1));
                }
                _ => panic!("expected user-marshal"),
            },
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn unknown_tag_is_reported() {
        let mut session = Session::new();
        assert!(matches!(
            decode(&[0x04, 0x08, b'?'][..], &mut session),
            Err(MarshalError::UnknownTag { tag: b'?', .. })
        ));
    }
}
