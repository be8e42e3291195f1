//! Encode-then-inspect round trips over the public API, the way a client
//! state machine and a broker would exercise the codec from both sides.

use libmqtt::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng};

#[test]
fn publish_round_trip() {
    let mut buf = [0u8; 256];
    let mut conn = Connection::new(&mut buf);
    let message = conn
        .publish("a/b", &[1, 2, 3], QoS::AtLeastOnce, false, false)
        .unwrap();
    let id = message.message_id().unwrap();

    let packet = Packet::new(message.as_bytes()).unwrap();
    assert_eq!(packet.packet_type(), PacketType::Publish);
    assert_eq!(packet.publish_topic().unwrap(), b"a/b");
    assert_eq!(packet.publish_payload().unwrap(), &[1, 2, 3]);
    assert_eq!(packet.qos().unwrap(), QoS::AtLeastOnce);
    assert_eq!(packet.message_id().unwrap(), Some(id));
    assert!(!packet.dup());
    assert!(!packet.retain());
}

#[test]
fn publish_flags_round_trip() {
    let mut buf = [0u8; 64];
    let mut conn = Connection::new(&mut buf);
    let message = conn
        .publish("t", b"", QoS::ExactlyOnce, true, true)
        .unwrap();
    let packet = Packet::new(message.as_bytes()).unwrap();
    assert!(packet.dup());
    assert!(packet.retain());
    assert_eq!(packet.qos().unwrap(), QoS::ExactlyOnce);
    assert_eq!(packet.publish_payload().unwrap(), b"");
}

#[test]
fn connack_round_trip() {
    let mut buf = [0u8; 16];
    let mut conn = Connection::new(&mut buf);
    for code in [
        ReturnCode::Accepted,
        ReturnCode::RefusedProtocolVersion,
        ReturnCode::RefusedIdentifierRejected,
        ReturnCode::RefusedServerUnavailable,
        ReturnCode::RefusedBadCredentials,
        ReturnCode::RefusedNotAuthorized,
    ] {
        let message = conn.connack(code).unwrap();
        let packet = Packet::new(message.as_bytes()).unwrap();
        assert_eq!(packet.packet_type(), PacketType::Connack);
        assert_eq!(packet.connect_return_code().unwrap(), code);
        assert_eq!(packet.message_id().unwrap(), None);
    }
}

#[test]
fn ack_family_round_trip() {
    let mut buf = [0u8; 16];
    let mut conn = Connection::new(&mut buf);

    fn check(bytes: &[u8], packet_type: PacketType) {
        let packet = Packet::new(bytes).unwrap();
        assert_eq!(packet.packet_type(), packet_type);
        assert_eq!(packet.message_id().unwrap(), Some(0xBEEF));
    }
    check(conn.puback(0xBEEF).unwrap().as_bytes(), PacketType::Puback);
    check(conn.pubrec(0xBEEF).unwrap().as_bytes(), PacketType::Pubrec);
    check(conn.pubrel(0xBEEF).unwrap().as_bytes(), PacketType::Pubrel);
    check(conn.pubcomp(0xBEEF).unwrap().as_bytes(), PacketType::Pubcomp);
    check(conn.unsuback(0xBEEF).unwrap().as_bytes(), PacketType::Unsuback);
}

#[test]
fn subscribe_round_trip() {
    let mut buf = [0u8; 64];
    let mut conn = Connection::new(&mut buf);
    let message = conn.subscribe("sensors/#", QoS::ExactlyOnce).unwrap();
    let id = message.message_id().unwrap();

    let bytes = message.as_bytes();
    let packet = Packet::new(bytes).unwrap();
    assert_eq!(packet.packet_type(), PacketType::Subscribe);
    assert_eq!(packet.message_id().unwrap(), Some(id));
    // Filter and requested QoS sit after the identifier.
    let total = total_length(bytes).unwrap().unwrap();
    assert_eq!(total, bytes.len());
    assert_eq!(&bytes[4..6], &[0x00, 0x09]);
    assert_eq!(&bytes[6..15], b"sensors/#");
    assert_eq!(bytes[15], QoS::ExactlyOnce as u8);
}

#[test]
fn suback_round_trip() {
    let mut buf = [0u8; 32];
    let mut conn = Connection::new(&mut buf);
    let message = conn.suback(&[0x01, 0x80], 42).unwrap();
    let packet = Packet::new(message.as_bytes()).unwrap();
    assert_eq!(packet.packet_type(), PacketType::Suback);
    assert_eq!(packet.message_id().unwrap(), Some(42));
    assert_eq!(&message.as_bytes()[4..], &[0x01, 0x80]);
}

#[test]
fn unsubscribe_round_trip() {
    let mut buf = [0u8; 64];
    let mut conn = Connection::new(&mut buf);
    let message = conn.unsubscribe("devices/+/state").unwrap();
    let id = message.message_id().unwrap();
    let packet = Packet::new(message.as_bytes()).unwrap();
    assert_eq!(packet.packet_type(), PacketType::Unsubscribe);
    assert_eq!(packet.message_id().unwrap(), Some(id));
}

#[test]
fn bodyless_round_trip() {
    let mut buf = [0u8; 8];
    let mut conn = Connection::new(&mut buf);
    fn check(bytes: &[u8], packet_type: PacketType) {
        assert_eq!(bytes.len(), 2);
        let packet = Packet::new(bytes).unwrap();
        assert_eq!(packet.packet_type(), packet_type);
        assert_eq!(packet.message_id().unwrap(), None);
        assert_eq!(total_length(bytes), Ok(Some(2)));
    }
    check(conn.pingreq().unwrap().as_bytes(), PacketType::Pingreq);
    check(conn.pingresp().unwrap().as_bytes(), PacketType::Pingresp);
    check(conn.disconnect().unwrap().as_bytes(), PacketType::Disconnect);
}

#[test]
fn connect_round_trip_both_protocols() {
    for protocol in [Protocol::V3_1, Protocol::V3_1_1] {
        let mut buf = [0u8; 256];
        let mut conn = Connection::new(&mut buf);
        let options = Options {
            client_id: "roundtrip",
            username: Some("u"),
            password: Some(b"p"),
            will: Some(Will {
                topic: "dead/roundtrip",
                payload: b"offline",
                qos: QoS::AtLeastOnce,
                retain: false,
            }),
            keep_alive_seconds: 120,
            clean_session: true,
            protocol,
        };
        let message = conn.connect(&options).unwrap();
        let bytes = message.as_bytes();
        let packet = Packet::new(bytes).unwrap();
        assert_eq!(packet.packet_type(), PacketType::Connect);
        assert_eq!(packet.message_id().unwrap(), None);
        assert_eq!(total_length(bytes), Ok(Some(bytes.len())));

        let magic_len = match protocol {
            Protocol::V3_1 => 6,
            Protocol::V3_1_1 => 4,
        };
        assert_eq!(bytes[3] as usize, magic_len);
    }
}

#[test]
fn framing_survives_buffer_reuse() {
    // One context, several packets in sequence: each view must be fully
    // framed at the moment it is returned.
    let mut buf = [0u8; 128];
    let mut conn = Connection::new(&mut buf);

    let len = conn.subscribe("x", QoS::AtMostOnce).unwrap().len();
    assert_eq!(total_length(&conn.pingreq().unwrap().as_bytes()[..2]), Ok(Some(2)));
    let message = conn
        .publish("x", b"payload", QoS::AtMostOnce, false, false)
        .unwrap();
    assert_ne!(message.len(), len);
    let packet = Packet::new(message.as_bytes()).unwrap();
    assert_eq!(packet.publish_payload().unwrap(), b"payload");
}

#[test]
fn randomized_publish_round_trips() {
    let mut rng = StdRng::seed_from_u64(0x6D71_7474);
    let mut buf = [0u8; 4096];
    let mut conn = Connection::new(&mut buf);

    for _ in 0..200 {
        let topic_len = rng.gen_range(1..=32);
        let topic: String = (0..topic_len).map(|_| rng.gen_range('a'..='z')).collect();
        let payload_len = rng.gen_range(0..=2048);
        let payload: Vec<u8> = (0..payload_len).map(|_| rng.r#gen()).collect();
        let qos = match rng.gen_range(0..3) {
            0 => QoS::AtMostOnce,
            1 => QoS::AtLeastOnce,
            _ => QoS::ExactlyOnce,
        };
        let retain = rng.r#gen();
        let dup = rng.r#gen();

        let message = conn.publish(&topic, &payload, qos, dup, retain).unwrap();
        let expected_id = message.message_id();
        let packet = Packet::new(message.as_bytes()).unwrap();
        assert_eq!(packet.publish_topic().unwrap(), topic.as_bytes());
        assert_eq!(packet.publish_payload().unwrap(), payload.as_slice());
        assert_eq!(packet.qos().unwrap(), qos);
        assert_eq!(packet.dup(), dup);
        assert_eq!(packet.retain(), retain);
        assert_eq!(packet.message_id().unwrap(), expected_id);
        assert_eq!(
            total_length(message.as_bytes()),
            Ok(Some(message.as_bytes().len()))
        );
    }
}

#[test]
fn field_over_16_bit_limit_is_malformed_not_too_small() {
    // A topic longer than 65_535 bytes cannot be framed with a 16-bit
    // length prefix no matter how large the buffer is; the error must be
    // MalformedLength, not BufferTooSmall.
    let topic = "t".repeat(70_000);
    let mut buf = vec![0u8; 128 * 1024];
    let mut conn = Connection::new(&mut buf);
    assert_eq!(
        conn.publish(&topic, b"x", QoS::AtMostOnce, false, false)
            .unwrap_err(),
        Error::MalformedLength
    );

    // Same limit on the CONNECT credential fields.
    let password = vec![0u8; 70_000];
    let options = Options {
        client_id: "c",
        password: Some(&password),
        ..Options::default()
    };
    assert_eq!(conn.connect(&options).unwrap_err(), Error::MalformedLength);

    // The buffer really was large enough for an in-range field: a
    // 65_535-byte topic frames fine, with a saturated length prefix after
    // the 1-byte type and 3-byte remaining-length fields.
    let in_range = "t".repeat(65_535);
    let message = conn
        .publish(&in_range, b"x", QoS::AtMostOnce, false, false)
        .unwrap();
    assert_eq!(message.as_bytes()[4..6], [0xFF, 0xFF]);
}

#[test]
fn capacity_is_enforced_per_packet() {
    let mut buf = [0u8; 32];
    let mut conn = Connection::new(&mut buf);
    // Fits exactly or not at all; never truncates.
    assert!(conn.publish("t", &[0u8; 24], QoS::AtMostOnce, false, false).is_ok());
    assert_eq!(
        conn.publish("t", &[0u8; 28], QoS::AtMostOnce, false, false)
            .unwrap_err(),
        Error::BufferTooSmall
    );
}
