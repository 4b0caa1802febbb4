use super::*;

use serde_json::Value;

use crate::config::Location;
use crate::dispatch::{Dispatcher, OpcodeTable};
use crate::events::Event;

fn all_kinds() -> Vec<Packet> {
    let myself = PersonInfo::new(1, Location::Mazowieckie);
    let preferences = PersonInfo::new(2, Location::WholePoland);
    let context = ReconnectContext {
        is_mobile: true,
        client_state: ClientState::Chatting,
        connection_started: None,
        last_post_id: 44,
        previous_contact: Some("prev".to_owned()),
        current_contact: Some("curr".to_owned()),
        last_connection_id: Some("1:conn".to_owned()),
        user_agent: UserAgent::new("obcy", "0.1.0"),
    };

    vec![
        search(&myself, &preferences, "main", 3),
        message("ckey-1", "hello there", 4),
        disconnect("ckey-1", 5),
        report_stranger("ckey-1", 6),
        random_topic("ckey-1", 7),
        conversation_start_ack("ckey-1", 8),
        chatstate("ckey-1", true),
        client_info(false, &UserAgent::new("obcy", "0.1.0")),
        pong(),
        open_ack(),
        reconnect_request(&context),
    ]
}

#[test]
fn every_kind_survives_an_encode_decode_round_trip() {
    // Outbound headers are not in the inbound opcode table, so the
    // dispatcher hands them back whole as unknown packets.
    let dispatcher = Dispatcher::new(OpcodeTable::default());

    for original in all_kinds() {
        let tagged = format!("a{}", sockjs::encode(&original));
        let sockjs::Frame::Data(mut packets) = sockjs::decode(&tagged) else {
            panic!("expected data frame for {}", original.header);
        };
        assert_eq!(packets.len(), 1);
        let decoded = packets.remove(0).expect("packet should decode");

        let Event::UnknownPacket(returned) = dispatcher.dispatch(decoded) else {
            panic!("expected UnknownPacket for {}", original.header);
        };
        assert_eq!(returned, original);
    }
}

#[test]
fn correlation_field_rides_in_exactly_the_documented_kinds() {
    let with_ceid = [
        HEADER_SEARCH,
        HEADER_MESSAGE,
        HEADER_DISCONNECT,
        HEADER_REPORT_STRANGER,
        HEADER_RANDOM_TOPIC,
        HEADER_CONVERSATION_START_ACK,
    ];

    for packet in all_kinds() {
        let has_ceid = packet.payload_field("ceid").is_some();
        assert_eq!(
            has_ceid,
            with_ceid.contains(&packet.header.as_str()),
            "ceid mismatch for {}",
            packet.header
        );
    }
}

#[test]
fn search_nests_both_person_blocks() {
    let packet = search(
        &PersonInfo::new(1, Location::Slaskie),
        &PersonInfo::new(0, Location::WholePoland),
        "main",
        9,
    );

    assert_eq!(packet.header, HEADER_SEARCH);
    assert_eq!(
        packet.payload_field("channel").and_then(Value::as_str),
        Some("main")
    );
    assert_eq!(
        packet
            .payload
            .as_ref()
            .and_then(|p| p.pointer("/myself/loc"))
            .and_then(Value::as_i64),
        Some(7)
    );
    assert_eq!(
        packet
            .payload
            .as_ref()
            .and_then(|p| p.pointer("/preferences/sex"))
            .and_then(Value::as_i64),
        Some(0)
    );
}

#[test]
fn client_info_reports_identity_in_wire_form() {
    let packet = client_info(true, &UserAgent::new("obcy", "2.4"));

    assert_eq!(
        packet.payload_field("mobile").and_then(Value::as_bool),
        Some(true)
    );
    assert_eq!(
        packet.payload_field("cver").and_then(Value::as_str),
        Some("obcy, version 2.4")
    );
    assert_eq!(
        packet.payload_field("adf").and_then(Value::as_str),
        Some("php")
    );
}

#[test]
fn reconnect_request_carries_the_snapshot() {
    let context = ReconnectContext {
        is_mobile: false,
        client_state: ClientState::Chatting,
        connection_started: None,
        last_post_id: 17,
        previous_contact: Some("old".to_owned()),
        current_contact: Some("now".to_owned()),
        last_connection_id: Some("1:conn".to_owned()),
        user_agent: UserAgent::new("obcy", "0.1.0"),
    };
    let packet = reconnect_request(&context);

    assert_eq!(packet.header, HEADER_RECONNECT_REQUEST);
    assert_eq!(
        packet.payload_field("ckey").and_then(Value::as_str),
        Some("now")
    );
    assert_eq!(
        packet.payload_field("prev_ckey").and_then(Value::as_str),
        Some("old")
    );
    assert_eq!(
        packet.payload_field("last_post_id").and_then(Value::as_i64),
        Some(17)
    );
    assert_eq!(
        packet.payload_field("last_conn_id").and_then(Value::as_str),
        Some("1:conn")
    );
    assert_eq!(
        packet.payload_field("mobile").and_then(Value::as_bool),
        Some(false)
    );

    let log_msg = packet
        .payload_field("log_msg")
        .and_then(Value::as_str)
        .expect("log_msg");
    assert!(log_msg.starts_with("while conv, time:"));
    assert!(log_msg.contains("transports: websocket > websocket"));
    assert!(log_msg.contains("{\"obcy\":true,\"version\":\"0.1.0\"}"));
}

#[test]
fn reconnect_request_outside_a_conversation_says_so() {
    let context = ReconnectContext {
        is_mobile: false,
        client_state: ClientState::Idle,
        connection_started: None,
        last_post_id: -1,
        previous_contact: None,
        current_contact: None,
        last_connection_id: None,
        user_agent: UserAgent::new("obcy", "0.1.0"),
    };
    let packet = reconnect_request(&context);

    let log_msg = packet
        .payload_field("log_msg")
        .and_then(Value::as_str)
        .expect("log_msg");
    assert!(log_msg.starts_with("out of conv, time:0 "));
    assert_eq!(packet.payload_field("ckey"), Some(&Value::Null));
}
