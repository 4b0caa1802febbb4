//! Packet dispatch: opcode lookup and event payload derivation.
//!
//! DESIGN
//! ======
//! The dispatcher is a pure lookup plus field extraction — it never touches
//! session state and never fails loudly. Unknown headers become
//! [`Event::UnknownPacket`]; a recognized header with a missing or unusable
//! required payload becomes [`Event::MalformedPacket`]. Either way the rest
//! of the batch is still processed.
//!
//! The service encodes numbers and booleans inconsistently across packet
//! kinds (`"cid": 7` vs `"cid": "7"`, `"flaged": "false"`), so extraction is
//! deliberately lenient about string-wrapped scalars.

use std::collections::HashMap;

use serde_json::Value;
use sockjs::Packet;

use crate::events::{
    DISCONNECT_ID_NONE, DisconnectInfo, Event, Message, MessageKind, POST_ID_NONE, StrangerInfo,
};

// =============================================================================
// OPCODE CATALOGUE
// =============================================================================

/// Inbound header announcing an accepted session handshake.
pub const OP_CONNECTION_ACCEPTED: &str = "cn_acc";
/// Inbound header announcing a paired stranger.
pub const OP_STRANGER_FOUND: &str = "talk_s";
/// Inbound header carrying a chat message.
pub const OP_MESSAGE: &str = "rmsg";
/// Inbound header: the stranger disconnected mid-conversation.
pub const OP_STRANGER_DISCONNECTED: &str = "sdis";
/// Inbound header: conversation-over reminder, possibly outside any chat.
pub const OP_CONVERSATION_ENDED: &str = "cn_dis";
/// Inbound header carrying the online user count.
pub const OP_ONLINE_COUNT: &str = "count";
/// Inbound header for the application-level ping.
pub const OP_PING: &str = "gdzie";
/// Inbound header carrying a random conversation topic.
pub const OP_RANDOM_TOPIC: &str = "rtopic";
/// Inbound header carrying an operator service message.
pub const OP_SERVICE_MESSAGE: &str = "msgserv";
/// Inbound header for the stranger's typing state.
pub const OP_CHATSTATE: &str = "styp";
/// Inbound header acknowledging a resumed session.
pub const OP_RECONNECTION_SUCCESS: &str = "reconn_ok";

/// The meaning assigned to an inbound header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    ConnectionAccepted,
    StrangerFound,
    MessageReceived,
    StrangerDisconnected,
    ConversationEnded,
    OnlineCountChanged,
    Ping,
    RandomTopicReceived,
    ServiceMessageReceived,
    StrangerChatstateChanged,
    ReconnectionSuccess,
}

/// Injected `header → EventKind` lookup. The defaults are the live service
/// constants; swap entries at configuration time when the service renames
/// opcodes between protocol revisions.
#[derive(Clone, Debug)]
pub struct OpcodeTable {
    entries: HashMap<String, EventKind>,
}

impl OpcodeTable {
    /// A table with no entries; every packet dispatches as unknown.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, header: impl Into<String>, kind: EventKind) {
        self.entries.insert(header.into(), kind);
    }

    #[must_use]
    pub fn lookup(&self, header: &str) -> Option<EventKind> {
        self.entries.get(header).copied()
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.insert(OP_CONNECTION_ACCEPTED, EventKind::ConnectionAccepted);
        table.insert(OP_STRANGER_FOUND, EventKind::StrangerFound);
        table.insert(OP_MESSAGE, EventKind::MessageReceived);
        table.insert(OP_STRANGER_DISCONNECTED, EventKind::StrangerDisconnected);
        table.insert(OP_CONVERSATION_ENDED, EventKind::ConversationEnded);
        table.insert(OP_ONLINE_COUNT, EventKind::OnlineCountChanged);
        table.insert(OP_PING, EventKind::Ping);
        table.insert(OP_RANDOM_TOPIC, EventKind::RandomTopicReceived);
        table.insert(OP_SERVICE_MESSAGE, EventKind::ServiceMessageReceived);
        table.insert(OP_CHATSTATE, EventKind::StrangerChatstateChanged);
        table.insert(OP_RECONNECTION_SUCCESS, EventKind::ReconnectionSuccess);
        table
    }
}

// =============================================================================
// DISPATCHER
// =============================================================================

/// Classifies decoded packets into domain events.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    table: OpcodeTable,
}

impl Dispatcher {
    #[must_use]
    pub fn new(table: OpcodeTable) -> Self {
        Self { table }
    }

    /// Derive the domain event for one packet. Never fails: contract
    /// violations come back as [`Event::MalformedPacket`].
    #[must_use]
    pub fn dispatch(&self, packet: Packet) -> Event {
        let Some(kind) = self.table.lookup(&packet.header) else {
            return Event::UnknownPacket(packet);
        };

        match derive_event(kind, &packet) {
            Ok(event) => event,
            Err(reason) => Event::MalformedPacket {
                header: packet.header,
                reason,
            },
        }
    }
}

fn derive_event(kind: EventKind, packet: &Packet) -> Result<Event, String> {
    match kind {
        EventKind::ConnectionAccepted => {
            let payload = required_payload(packet)?;
            let connection_id = field_string(payload, "conn_id")?;
            let hash = field_string(payload, "hash")?;
            Ok(Event::ConnectionAccepted {
                connection_id,
                hash,
            })
        }
        EventKind::StrangerFound => {
            let payload = required_payload(packet)?;
            let uid = field_string(payload, "ckey")?;
            let client_id = field_i64(payload, "cid")?;
            let flagged_unpleasant = field_bool(payload, "flaged")?;
            let preferences = payload
                .get("info")
                .cloned()
                .ok_or_else(|| missing("info"))?;
            Ok(Event::StrangerFound(StrangerInfo {
                client_id,
                uid,
                flagged_unpleasant,
                preferences,
            }))
        }
        EventKind::MessageReceived => {
            let payload = required_payload(packet)?;
            Ok(Event::MessageReceived(Message {
                kind: MessageKind::Chat,
                body: field_string(payload, "msg")?,
                sender_id: Some(field_i64(payload, "cid")?),
                post_id: extra_post_id(packet),
            }))
        }
        EventKind::RandomTopicReceived => {
            let payload = required_payload(packet)?;
            Ok(Event::MessageReceived(Message {
                kind: MessageKind::Topic,
                body: field_string(payload, "topic")?,
                sender_id: Some(field_i64(payload, "cid")?),
                post_id: extra_post_id(packet),
            }))
        }
        EventKind::ServiceMessageReceived => {
            let payload = required_payload(packet)?;
            let body = payload
                .as_str()
                .ok_or_else(|| "payload is not a string".to_owned())?;
            Ok(Event::MessageReceived(Message {
                kind: MessageKind::Service,
                body: body.to_owned(),
                sender_id: None,
                post_id: POST_ID_NONE,
            }))
        }
        EventKind::StrangerDisconnected => {
            let payload = required_payload(packet)?;
            let client_id =
                lenient_i64(payload).ok_or_else(|| "payload is not a client id".to_owned())?;
            Ok(Event::ConversationEnded(DisconnectInfo {
                is_reminder: false,
                client_id,
            }))
        }
        EventKind::ConversationEnded => {
            // The reminder variant may name nobody at all.
            let client_id = packet
                .payload
                .as_ref()
                .and_then(lenient_i64)
                .unwrap_or(DISCONNECT_ID_NONE);
            Ok(Event::ConversationEnded(DisconnectInfo {
                is_reminder: true,
                client_id,
            }))
        }
        EventKind::OnlineCountChanged => {
            let payload = required_payload(packet)?;
            let count =
                lenient_i64(payload).ok_or_else(|| "payload is not a count".to_owned())?;
            Ok(Event::OnlineCountChanged(count))
        }
        EventKind::StrangerChatstateChanged => {
            let payload = required_payload(packet)?;
            let typing =
                lenient_bool(payload).ok_or_else(|| "payload is not a boolean".to_owned())?;
            Ok(Event::StrangerChatstateChanged(typing))
        }
        EventKind::Ping => Ok(Event::Ping),
        EventKind::ReconnectionSuccess => Ok(Event::ReconnectionSuccess),
    }
}

// =============================================================================
// FIELD EXTRACTION
// =============================================================================

fn required_payload(packet: &Packet) -> Result<&Value, String> {
    packet
        .payload
        .as_ref()
        .ok_or_else(|| "required payload is missing".to_owned())
}

fn missing(key: &str) -> String {
    format!("payload is missing `{key}`")
}

fn field_string(payload: &Value, key: &str) -> Result<String, String> {
    payload
        .get(key)
        .and_then(lenient_string)
        .ok_or_else(|| missing(key))
}

fn field_i64(payload: &Value, key: &str) -> Result<i64, String> {
    payload
        .get(key)
        .and_then(lenient_i64)
        .ok_or_else(|| missing(key))
}

fn field_bool(payload: &Value, key: &str) -> Result<bool, String> {
    payload
        .get(key)
        .and_then(lenient_bool)
        .ok_or_else(|| missing(key))
}

fn extra_post_id(packet: &Packet) -> i64 {
    packet
        .extra_field("post_id")
        .and_then(lenient_i64)
        .unwrap_or(POST_ID_NONE)
}

fn lenient_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => text.trim().parse().ok(),
        Value::Number(number) => number.as_i64().map(|n| n != 0),
        _ => None,
    }
}

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod tests;
