//! Domain events delivered to the consumer.
//!
//! DESIGN
//! ======
//! Every observable outcome — protocol events, socket lifecycle, raw JSON
//! taps, and contained decode failures — flows through the single [`Event`]
//! enum on one ordered stream. Failures are events here, never panics or
//! returned errors: a malformed packet is reported and skipped while the
//! session keeps running.

use serde::Serialize;
use serde_json::Value;
use sockjs::Packet;

/// Sentinel for a message with no `post_id` on the wire.
pub const POST_ID_NONE: i64 = -1;

/// Sentinel for a conversation-ended reminder that names no stranger.
pub const DISCONNECT_ID_NONE: i64 = 0;

/// What kind of conversation message arrived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MessageKind {
    /// A regular chat message from the stranger.
    Chat,
    /// A service notice injected by the operator.
    Service,
    /// A random conversation topic requested by either side.
    Topic,
}

/// A message received while paired with a stranger.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Message {
    pub kind: MessageKind,
    /// Message content.
    pub body: String,
    /// Client id of the sender; absent for service messages.
    pub sender_id: Option<i64>,
    /// Wire post id, or [`POST_ID_NONE`] when the service sent none.
    pub post_id: i64,
}

/// The stranger the service paired us with.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StrangerInfo {
    /// Numeric client id assigned by the service.
    pub client_id: i64,
    /// Conversation key; every conversation packet names it.
    pub uid: String,
    /// Whether the service already flagged this stranger as unpleasant.
    pub flagged_unpleasant: bool,
    /// The stranger's search preferences, passed through opaquely.
    pub preferences: Value,
}

/// Why a conversation ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DisconnectInfo {
    /// True when this is a reminder fired outside a live conversation.
    pub is_reminder: bool,
    /// Client id of the disconnecting stranger, or [`DISCONNECT_ID_NONE`].
    pub client_id: i64,
}

/// Everything the engine reports to its consumer, in arrival order.
#[derive(Clone, Debug)]
pub enum Event {
    /// The service accepted the session handshake.
    ConnectionAccepted { connection_id: String, hash: String },
    /// A stranger was paired with this client.
    StrangerFound(StrangerInfo),
    /// The current conversation ended, or a reminder that none is active.
    ConversationEnded(DisconnectInfo),
    /// A chat, topic, or service message arrived.
    MessageReceived(Message),
    /// The service reported how many people are online.
    OnlineCountChanged(i64),
    /// The stranger started or stopped typing.
    StrangerChatstateChanged(bool),
    /// Application-level ping; the keepalive timer resets on this.
    Ping,
    /// Transport-level heartbeat frame.
    Heartbeat,
    /// The service resumed the session after a reconnection handshake.
    ReconnectionSuccess,
    /// Two keepalive periods elapsed without a ping; recovery has started.
    ConnectionLost,
    /// The underlying socket opened.
    SocketOpened,
    /// The underlying socket closed.
    SocketClosed {
        code: u16,
        reason: String,
        was_clean: bool,
    },
    /// A socket-level error; not fatal on its own.
    SocketError(String),
    /// Raw inbound frame text, emitted before decoding.
    JsonRead(String),
    /// Raw outbound text, emitted only when a send reached the transport.
    JsonWritten(String),
    /// A packet whose header is not in the opcode table.
    UnknownPacket(Packet),
    /// A recognized header whose required payload is missing or unusable.
    MalformedPacket { header: String, reason: String },
    /// A frame or packet element that could not be decoded at all.
    DecodeError(String),
}
