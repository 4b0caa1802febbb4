//! Outbound packet catalogue.
//!
//! Eleven fixed packet kinds cover every client-to-server message. A subset
//! embeds the session's action counter as the `ceid` correlation field; the
//! service echoes it back in acknowledgements. Which kinds carry `ceid` has
//! shifted between protocol revisions — this catalogue follows the most
//! recent captures.

use serde_json::json;
use sockjs::Packet;

use crate::config::{PersonInfo, UserAgent};
use crate::session::{ClientState, ReconnectContext};

/// Header for a stranger search request. Carries `ceid`.
pub const HEADER_SEARCH: &str = "_sas";
/// Header for a chat message. Carries `ceid`.
pub const HEADER_MESSAGE: &str = "_pmsg";
/// Header ending the current conversation. Carries `ceid`.
pub const HEADER_DISCONNECT: &str = "_distalk";
/// Header reporting the stranger as unpleasant. Carries `ceid`.
pub const HEADER_REPORT_STRANGER: &str = "_reptalk";
/// Header requesting a random conversation topic. Carries `ceid`.
pub const HEADER_RANDOM_TOPIC: &str = "_randtopic";
/// Header acknowledging a conversation start. Carries `ceid`.
pub const HEADER_CONVERSATION_START_ACK: &str = "_begacked";
/// Header reporting our own typing state.
pub const HEADER_CHATSTATE: &str = "_mtyp";
/// Header for the fresh-connection handshake.
pub const HEADER_CLIENT_INFO: &str = "_cinfo";
/// Header answering an application-level ping.
pub const HEADER_PONG: &str = "_gdzie";
/// Header acknowledging the transport open frame.
pub const HEADER_OPEN_ACK: &str = "_owack";
/// Header for the session-resume handshake.
pub const HEADER_RECONNECT_REQUEST: &str = "_reconn_me";

/// Search for a stranger matching `preferences`, presenting as `myself`.
#[must_use]
pub fn search(
    myself: &PersonInfo,
    preferences: &PersonInfo,
    channel: &str,
    ceid: u64,
) -> Packet {
    Packet::with_payload(
        HEADER_SEARCH,
        json!({
            "channel": channel,
            "myself": {"sex": myself.sex, "loc": myself.location.code()},
            "preferences": {"sex": preferences.sex, "loc": preferences.location.code()},
            "ceid": ceid,
        }),
    )
}

/// Send a chat message to the paired stranger.
#[must_use]
pub fn message(contact: &str, body: &str, ceid: u64) -> Packet {
    Packet::with_payload(
        HEADER_MESSAGE,
        json!({"ckey": contact, "msg": body, "ceid": ceid}),
    )
}

/// End the current conversation.
#[must_use]
pub fn disconnect(contact: &str, ceid: u64) -> Packet {
    Packet::with_payload(HEADER_DISCONNECT, json!({"ckey": contact, "ceid": ceid}))
}

/// Report the paired stranger as unpleasant.
#[must_use]
pub fn report_stranger(contact: &str, ceid: u64) -> Packet {
    Packet::with_payload(
        HEADER_REPORT_STRANGER,
        json!({"ckey": contact, "ceid": ceid}),
    )
}

/// Ask the service for a random conversation topic.
#[must_use]
pub fn random_topic(contact: &str, ceid: u64) -> Packet {
    Packet::with_payload(HEADER_RANDOM_TOPIC, json!({"ckey": contact, "ceid": ceid}))
}

/// Acknowledge a freshly started conversation.
#[must_use]
pub fn conversation_start_ack(contact: &str, ceid: u64) -> Packet {
    Packet::with_payload(
        HEADER_CONVERSATION_START_ACK,
        json!({"ckey": contact, "ceid": ceid}),
    )
}

/// Report whether we are typing.
#[must_use]
pub fn chatstate(contact: &str, typing: bool) -> Packet {
    Packet::with_payload(HEADER_CHATSTATE, json!({"ckey": contact, "val": typing}))
}

/// Fresh-connection handshake.
#[must_use]
pub fn client_info(is_mobile: bool, user_agent: &UserAgent) -> Packet {
    Packet::with_payload(
        HEADER_CLIENT_INFO,
        json!({
            "mobile": is_mobile,
            "cver": user_agent.to_string(),
            // Hard-coded in every captured handshake; meaning unknown.
            "adf": "php",
        }),
    )
}

/// Answer an application-level ping.
#[must_use]
pub fn pong() -> Packet {
    Packet::new(HEADER_PONG)
}

/// Acknowledge the transport open frame.
#[must_use]
pub fn open_ack() -> Packet {
    Packet::new(HEADER_OPEN_ACK)
}

/// Session-resume handshake, built from the state snapshot taken when
/// connectivity was declared lost.
#[must_use]
pub fn reconnect_request(context: &ReconnectContext) -> Packet {
    let state = if context.client_state == ClientState::Chatting {
        "while conv"
    } else {
        "out of conv"
    };
    let elapsed_ms = context.connection_started.map_or(0, |started| {
        u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
    });
    let browser = format!(
        "{{\"{}\":true,\"version\":\"{}\"}}",
        context.user_agent.name, context.user_agent.version
    );

    Packet::with_payload(
        HEADER_RECONNECT_REQUEST,
        json!({
            "log_msg": format!(
                "{state}, time:{elapsed_ms} transports: websocket > websocket, browser: {browser}"
            ),
            "ckey": context.current_contact,
            "last_conn_id": context.last_connection_id,
            "last_post_id": context.last_post_id,
            "prev_ckey": context.previous_contact,
            "mobile": context.is_mobile,
        }),
    )
}

#[cfg(test)]
#[path = "outgoing_test.rs"]
mod tests;
