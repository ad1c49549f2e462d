//! Golden-file coverage for a handful of representative streams, per the
//! distilled spec's testable-properties section: an empty array, a nested
//! hash, a user-marshal round-trip, and a self-referential array.

use marshal48::json_host::JsonHost;
use marshal48::project::Projector;
use marshal48::repr::represent;
use marshal48::session::Session;
use marshal48::unmarshal::decode;

fn decode_to_json(bytes: &[u8]) -> String {
    let mut session = Session::new();
    let value = decode(bytes, &mut session).unwrap();
    let mut host = JsonHost::new();
    let mut projector = Projector::new();
    let handle = projector.to_host(value, &session, &mut host).unwrap();
    serde_json::to_string(&*handle.borrow()).unwrap()
}

#[test]
fn empty_array() {
    let bytes = [0x04, 0x08, b'[', 0x00];
    insta::assert_snapshot!(decode_to_json(&bytes), @"[]");
}

#[test]
fn nested_hash() {
    // { "a" => [1, 2] }
    let bytes = [
        0x04, 0x08, b'{', 0x06, b'"', 0x06, b'a', b'[', 0x07, b'i', 0x06, b'i', 0x07,
    ];
    insta::assert_snapshot!(decode_to_json(&bytes), @r#"{"hash":[["a",[1,2]]]}"#);
}

#[test]
fn user_marshal_roundtrip() {
    // U:Thing wrapping the integer 1
    let bytes = [
        0x04, 0x08, b'U', b':', 0x0a, b'T', b'h', b'i', b'n', b'g', b'i', 0x06,
    ];
    insta::assert_snapshot!(
        decode_to_json(&bytes),
        @r#"{"attributes":{},"class":"Thing","marshal_data":1}"#
    );
}

#[test]
fn self_referential_array() {
    // a = []; a << a
    let bytes = [0x04, 0x08, b'[', 0x06, b'@', 0x00];
    let mut session = Session::new();
    let value = decode(&bytes[..], &mut session).unwrap();
    let rendered = represent(value, &session).unwrap();
    assert!(rendered.saw_cycle);
    insta::assert_snapshot!(rendered.text, @"[@0]");
}
