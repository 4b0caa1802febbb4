use super::*;

#[test]
fn tag_classification_covers_every_frame_kind() {
    assert!(matches!(decode("o"), Frame::Open));
    assert!(matches!(decode("c[3000,\"Go away!\"]"), Frame::Close));
    assert!(matches!(decode("h"), Frame::Heartbeat));
    assert!(matches!(decode("a[]"), Frame::Data(_)));
    assert!(matches!(decode("m"), Frame::BinaryUnsupported));
}

#[test]
fn unknown_tag_is_invalid_and_keeps_the_byte() {
    assert!(matches!(decode("x"), Frame::Invalid(Some('x'))));
    assert!(matches!(decode("7[]"), Frame::Invalid(Some('7'))));
}

#[test]
fn empty_input_is_invalid_without_a_byte() {
    assert!(matches!(decode(""), Frame::Invalid(None)));
}

#[test]
fn data_frame_splits_reserved_and_extra_keys() {
    let raw = r#"a["{\"ev_name\":\"rmsg\",\"ev_data\":{\"msg\":\"hi\",\"cid\":7},\"post_id\":10}"]"#;
    let Frame::Data(packets) = decode(raw) else {
        panic!("expected data frame");
    };

    let packet = packets[0].as_ref().expect("packet should decode");
    assert_eq!(packet.header, "rmsg");
    assert_eq!(
        packet.payload_field("msg").and_then(Value::as_str),
        Some("hi")
    );
    assert_eq!(
        packet.extra_field("post_id").and_then(Value::as_i64),
        Some(10)
    );
    assert!(packet.payload_field("post_id").is_none());
}

#[test]
fn extra_keys_keep_wire_order() {
    let raw = r#"a["{\"zeta\":1,\"ev_name\":\"x\",\"alpha\":2,\"mid\":3}"]"#;
    let Frame::Data(packets) = decode(raw) else {
        panic!("expected data frame");
    };

    let packet = packets[0].as_ref().expect("packet should decode");
    let keys: Vec<&str> = packet.extra.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn null_payload_counts_as_absent() {
    let raw = r#"a["{\"ev_name\":\"cn_dis\",\"ev_data\":null}"]"#;
    let Frame::Data(packets) = decode(raw) else {
        panic!("expected data frame");
    };

    let packet = packets[0].as_ref().expect("packet should decode");
    assert!(packet.payload.is_none());
}

#[test]
fn non_string_header_is_coerced_to_bare_text() {
    let raw = r#"a["{\"ev_name\":42}"]"#;
    let Frame::Data(packets) = decode(raw) else {
        panic!("expected data frame");
    };

    let packet = packets[0].as_ref().expect("packet should decode");
    assert_eq!(packet.header, "42");
}

#[test]
fn malformed_element_does_not_abort_siblings() {
    let raw = r#"a["{\"ev_name\":\"first\"}","{not json","{\"ev_name\":\"third\"}"]"#;
    let Frame::Data(packets) = decode(raw) else {
        panic!("expected data frame");
    };

    assert_eq!(packets.len(), 3);
    assert_eq!(packets[0].as_ref().expect("first").header, "first");
    assert!(matches!(
        packets[1],
        Err(CodecError::InvalidElement { index: 1, .. })
    ));
    assert_eq!(packets[2].as_ref().expect("third").header, "third");
}

#[test]
fn element_missing_header_is_an_error() {
    let raw = r#"a["{\"ev_data\":{\"msg\":\"hi\"}}"]"#;
    let Frame::Data(packets) = decode(raw) else {
        panic!("expected data frame");
    };

    assert!(matches!(
        packets[0],
        Err(CodecError::MissingHeader { index: 0 })
    ));
}

#[test]
fn non_object_element_is_an_error() {
    let raw = r#"a["[1,2,3]"]"#;
    let Frame::Data(packets) = decode(raw) else {
        panic!("expected data frame");
    };

    assert!(matches!(packets[0], Err(CodecError::NotAnObject { index: 0 })));
}

#[test]
fn unparseable_body_yields_a_single_error_marker() {
    let Frame::Data(packets) = decode("a{oops") else {
        panic!("expected data frame");
    };

    assert_eq!(packets.len(), 1);
    assert!(matches!(packets[0], Err(CodecError::InvalidBody(_))));
}

#[test]
fn encode_produces_single_element_string_array() {
    let packet = Packet::with_payload("_pmsg", serde_json::json!({"ckey": "abc", "msg": "hello"}));
    let wire = encode(&packet);

    let outer: Vec<String> = serde_json::from_str(&wire).expect("outer array");
    assert_eq!(outer.len(), 1);

    let inner: Value = serde_json::from_str(&outer[0]).expect("inner object");
    assert_eq!(inner.get("ev_name").and_then(Value::as_str), Some("_pmsg"));
    assert_eq!(
        inner.pointer("/ev_data/msg").and_then(Value::as_str),
        Some("hello")
    );
}

#[test]
fn encode_omits_absent_payload() {
    let wire = encode(&Packet::new("_owack"));
    let outer: Vec<String> = serde_json::from_str(&wire).expect("outer array");
    let inner: Value = serde_json::from_str(&outer[0]).expect("inner object");

    assert_eq!(inner.get("ev_name").and_then(Value::as_str), Some("_owack"));
    assert!(inner.get("ev_data").is_none());
}

#[test]
fn encoded_packet_round_trips_through_decode() {
    let packet = Packet::with_payload(
        "_sas",
        serde_json::json!({
            "channel": "main",
            "myself": {"sex": 0, "loc": 7},
            "preferences": {"sex": 0, "loc": 0}
        }),
    );

    let tagged = format!("a{}", encode(&packet));
    let Frame::Data(packets) = decode(&tagged) else {
        panic!("expected data frame");
    };

    assert_eq!(packets[0].as_ref().expect("decode"), &packet);
}
