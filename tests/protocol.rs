// SPDX-License-Identifier: MIT OR Apache-2.0
use compact_codec::{CompactProtocol, CompactProtocolFactory, Error, Limits, MessageType, TType};
use rstest::rstest;
use std::io::Cursor;

fn write_empty_message(seqid: i32) -> Vec<u8> {
    let mut p = CompactProtocol::new(Vec::new());
    p.write_message_begin(b"Ping", MessageType::Call, seqid)
        .unwrap();
    p.write_message_end().unwrap();
    p.into_inner()
}

#[rstest]
#[case(0, vec![0x82, 0x21, 0x00, 0x04, b'P', b'i', b'n', b'g'])]
#[case(42, vec![0x82, 0x21, 0x2A, 0x04, b'P', b'i', b'n', b'g'])]
fn scenario_s1_message_envelope(#[case] seqid: i32, #[case] expected: Vec<u8>) {
    let _ = env_logger::try_init();
    assert_eq!(write_empty_message(seqid), expected);
}

#[test]
fn scenario_s2_negative_i32_zigzag() {
    let _ = env_logger::try_init();
    let mut p = CompactProtocol::new(Vec::new());
    p.write_struct_begin("S").unwrap();
    p.write_field_begin("n", TType::I32, 1).unwrap();
    p.write_i32(-1).unwrap();
    p.write_field_end().unwrap();
    p.write_struct_end().unwrap();
    // field header (short form, delta 1, I32 tag) + zigzag(-1)=0x01 + STOP
    assert_eq!(p.into_inner(), vec![0x15, 0x01, 0x00]);
}

#[test]
fn scenario_s3_large_varint_field_id_jump() {
    let _ = env_logger::try_init();
    let mut p = CompactProtocol::new(Vec::new());
    p.write_struct_begin("S").unwrap();
    p.write_field_begin("n", TType::I32, 150).unwrap();
    p.write_i32(0).unwrap();
    p.write_field_end().unwrap();
    p.write_struct_end().unwrap();
    // delta from 0 to 150 exceeds 15: long-form header (tag byte + zigzag16(150))
    let bytes = p.into_inner();
    assert_eq!(bytes[0], 0x05); // I32 tag, long form
    assert_eq!(&bytes[1..3], &[0xAC, 0x02]); // zigzag varint of 150
    assert_eq!(bytes[3], 0x00); // value 0
    assert_eq!(bytes[4], 0x00); // STOP
}

#[test]
fn message_roundtrips_through_a_shared_transport() {
    let _ = env_logger::try_init();
    let mut buf = Vec::new();
    {
        let mut w = CompactProtocol::new(&mut buf);
        w.write_message_begin(b"getUser", MessageType::Call, 7)
            .unwrap();
        w.write_struct_begin("GetUserArgs").unwrap();
        w.write_field_begin("id", TType::I64, 1).unwrap();
        w.write_i64(123_456_789).unwrap();
        w.write_field_end().unwrap();
        w.write_struct_end().unwrap();
        w.write_message_end().unwrap();
    }

    let mut r = CompactProtocol::new(Cursor::new(buf));
    let (name, message_type, seqid) = r.read_message_begin().unwrap();
    assert_eq!(name, b"getUser");
    assert_eq!(message_type, MessageType::Call);
    assert_eq!(seqid, 7);

    r.read_struct_begin().unwrap();
    let (ty, id) = r.read_field_begin().unwrap();
    assert_eq!((ty, id), (TType::I64, 1));
    assert_eq!(r.read_i64().unwrap(), 123_456_789);
    r.read_field_end().unwrap();
    assert_eq!(r.read_field_begin().unwrap().0, TType::Stop);
    r.read_struct_end().unwrap();
    r.read_message_end().unwrap();
}

#[test]
fn scrambled_field_order_still_roundtrips() {
    let _ = env_logger::try_init();
    // Delta compression only helps when ids are ascending; out-of-order ids
    // still roundtrip correctly, just via the long-form header every time.
    let mut w = CompactProtocol::new(Vec::new());
    w.write_struct_begin("S").unwrap();
    for id in [9i16, 2, 40, 1] {
        w.write_field_begin("x", TType::I16, id).unwrap();
        w.write_i16(id).unwrap();
        w.write_field_end().unwrap();
    }
    w.write_struct_end().unwrap();
    let bytes = w.into_inner();

    let mut r = CompactProtocol::new(Cursor::new(bytes));
    r.read_struct_begin().unwrap();
    for expected_id in [9i16, 2, 40, 1] {
        let (ty, id) = r.read_field_begin().unwrap();
        assert_eq!(ty, TType::I16);
        assert_eq!(id, expected_id);
        assert_eq!(r.read_i16().unwrap(), expected_id);
        r.read_field_end().unwrap();
    }
    assert_eq!(r.read_field_begin().unwrap().0, TType::Stop);
    r.read_struct_end().unwrap();
}

#[test]
fn bool_field_uses_no_dedicated_body_byte() {
    let _ = env_logger::try_init();
    let mut w = CompactProtocol::new(Vec::new());
    w.write_struct_begin("S").unwrap();
    w.write_field_begin("a", TType::Bool, 1).unwrap();
    w.write_bool(true).unwrap();
    w.write_field_end().unwrap();
    w.write_field_begin("b", TType::Bool, 2).unwrap();
    w.write_bool(false).unwrap();
    w.write_field_end().unwrap();
    w.write_struct_end().unwrap();
    // exactly one header byte per bool field, no body bytes, plus STOP.
    assert_eq!(w.into_inner(), vec![0x11, 0x12, 0x00]);
}

#[test]
fn container_of_14_elements_uses_single_size_byte() {
    let _ = env_logger::try_init();
    let mut w = CompactProtocol::new(Vec::new());
    w.write_struct_begin("S").unwrap();
    w.write_field_begin("xs", TType::List, 1).unwrap();
    w.write_list_begin(TType::Byte, 14).unwrap();
    for i in 0..14 {
        w.write_byte(i).unwrap();
    }
    w.write_list_end().unwrap();
    w.write_field_end().unwrap();
    w.write_struct_end().unwrap();
    let bytes = w.into_inner();
    // field header + one list size/type byte + 14 bytes + STOP
    assert_eq!(bytes.len(), 1 + 1 + 14 + 1);
    assert_eq!(bytes[1], (14 << 4) | 0x03);
}

#[test]
fn container_of_15_elements_uses_varint_size() {
    let _ = env_logger::try_init();
    let mut w = CompactProtocol::new(Vec::new());
    w.write_struct_begin("S").unwrap();
    w.write_field_begin("xs", TType::List, 1).unwrap();
    w.write_list_begin(TType::Byte, 15).unwrap();
    for i in 0..15 {
        w.write_byte(i).unwrap();
    }
    w.write_list_end().unwrap();
    w.write_field_end().unwrap();
    w.write_struct_end().unwrap();
    let bytes = w.into_inner();
    assert_eq!(bytes[1], 0xF0 | 0x03);
    assert_eq!(bytes[2], 15);
}

#[test]
fn empty_map_is_exactly_one_byte() {
    let _ = env_logger::try_init();
    let mut w = CompactProtocol::new(Vec::new());
    w.write_struct_begin("S").unwrap();
    w.write_field_begin("m", TType::Map, 1).unwrap();
    w.write_map_begin(TType::String, TType::I32, 0).unwrap();
    w.write_map_end().unwrap();
    w.write_field_end().unwrap();
    w.write_struct_end().unwrap();
    let bytes = w.into_inner();
    // field header + single 0x00 empty-map marker + STOP
    assert_eq!(bytes, vec![0x1B, 0x00, 0x00]);
}

#[test]
fn factory_produces_independently_usable_protocols() {
    let _ = env_logger::try_init();
    let factory = CompactProtocolFactory::new();
    let mut w = factory.get_protocol(Vec::new());
    w.write_message_begin(b"x", MessageType::Oneway, 1).unwrap();
    w.write_struct_begin("X").unwrap();
    w.write_field_stop().unwrap();
    w.write_struct_end().unwrap();
    w.write_message_end().unwrap();
    let bytes = w.into_inner();

    let mut r = factory.get_protocol(Cursor::new(bytes));
    let (_name, message_type, _seqid) = r.read_message_begin().unwrap();
    assert_eq!(message_type, MessageType::Oneway);
}

#[test]
fn legacy_limits_reject_strings_over_0x7fff() {
    let _ = env_logger::try_init();
    let factory = CompactProtocolFactory::with_limits(Limits::LEGACY);
    let mut w = factory.get_protocol(Vec::new());
    w.write_struct_begin("S").unwrap();
    w.write_field_begin("s", TType::String, 1).unwrap();
    let oversized = vec![b'x'; 0x8000];
    let err = w.write_string(&oversized).unwrap_err();
    assert!(matches!(err, Error::SizeLimitExceeded { .. }));
}

#[test]
fn malformed_message_preamble_is_reported_precisely() {
    let _ = env_logger::try_init();
    let mut r = CompactProtocol::new(Cursor::new(vec![0x83, 0x21, 0x00, 0x00]));
    let err = r.read_message_begin().unwrap_err();
    assert!(matches!(err, Error::BadProtocolId(0x83)));
}
