use carbus::someip::{MessagePayload, SomeIpMessage, HEADER_SIZE};
use carbus::SimError;

#[test]
fn test_encode_header_layout() {
    let message = SomeIpMessage::new(
        0x1234,
        0x5678,
        0x4321,
        0x8765,
        1,
        1,
        1,
        0,
        MessagePayload::Text("AB".to_owned()),
    );

    assert_eq!(message.length, 10); // 8 + 2 payload bytes

    let bytes = message.encode();
    let expected: &[u8] = &[
        0x12, 0x34, 0x56, 0x78, // message_id
        0x00, 0x00, 0x00, 0x0A, // length = 10
        0x43, 0x21, 0x87, 0x65, // client_session_id
        0x01, 0x01, 0x01, 0x00, // version_type_code
        b'A', b'B',
    ];
    assert_eq!(bytes, expected);
}

#[test]
fn test_round_trip_text_payload() {
    let message = SomeIpMessage::new(
        0x00FF,
        0xFF00,
        0x0001,
        0x0002,
        1,
        2,
        3,
        4,
        MessagePayload::Text(r#"{"distance": 12.5, "object_type": "car"}"#.to_owned()),
    );

    let decoded = SomeIpMessage::decode(&message.encode()).expect("decode failed");
    assert_eq!(decoded, message);
}

#[test]
fn test_round_trip_empty_payload() {
    let message = SomeIpMessage::new(
        0xABCD,
        0x0001,
        0xDEAD,
        0xBEEF,
        1,
        1,
        2,
        0,
        MessagePayload::Text(String::new()),
    );

    assert_eq!(message.length, 8);
    let bytes = message.encode();
    assert_eq!(bytes.len(), HEADER_SIZE);

    let decoded = SomeIpMessage::decode(&bytes).expect("decode failed");
    assert_eq!(decoded, message);
}

#[test]
fn test_short_frames_are_malformed() {
    // Every length below the header size must fail cleanly, never panic.
    for len in 0..HEADER_SIZE {
        let data = vec![0xFF; len];
        match SomeIpMessage::decode(&data) {
            Err(SimError::MalformedFrame(n)) => assert_eq!(n, len),
            other => panic!("expected MalformedFrame for {len} bytes, got {other:?}"),
        }
    }
}

#[test]
fn test_invalid_utf8_payload_is_retained() {
    let mut bytes = SomeIpMessage::new(
        0x1234,
        0x5678,
        0x0001,
        0x0001,
        1,
        1,
        2,
        0,
        MessagePayload::Text(String::new()),
    )
    .encode();
    bytes.extend_from_slice(&[0xFF, 0xFE, 0x00]);

    // Payload content never fails the decode; the message is kept with the
    // undecodable sentinel.
    let decoded = SomeIpMessage::decode(&bytes).expect("decode failed");
    assert_eq!(
        decoded.payload,
        MessagePayload::Undecodable(vec![0xFF, 0xFE, 0x00])
    );
    assert!(decoded.payload.as_text().is_none());
}

#[test]
fn test_decode_preserves_wire_length_field() {
    // A sender may lie about the length; decode stores what was on the wire.
    let mut bytes = vec![
        0x00, 0x10, 0x00, 0x20, // message_id
        0x00, 0x00, 0x00, 0x63, // length = 99, inconsistent with payload
        0x00, 0x01, 0x00, 0x02, // client_session_id
        0x01, 0x01, 0x02, 0x00, // version_type_code
    ];
    bytes.extend_from_slice(b"xy");

    let decoded = SomeIpMessage::decode(&bytes).expect("decode failed");
    assert_eq!(decoded.service_id, 0x0010);
    assert_eq!(decoded.method_id, 0x0020);
    assert_eq!(decoded.length, 99);
    assert_eq!(decoded.payload, MessagePayload::Text("xy".to_owned()));
}
