//! Session state machine: transport connectivity × conversation state.
//!
//! DESIGN
//! ======
//! Two independent enums replace the scattered booleans a naive client
//! accumulates ("is open", "is ready", "has stranger"). Every transition goes
//! through one method with an explicit precondition, so impossible
//! combinations (chatting while offline) cannot be reached. Methods return
//! whether they applied; callers treat `false` as "leave everything alone" —
//! a refused conversation action is deliberately a silent no-op, not an
//! error.

use std::time::Instant;

use tracing::debug;

use crate::config::UserAgent;
use crate::events::POST_ID_NONE;

/// Connectivity of the underlying socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportState {
    /// No socket, nothing pending.
    Offline,
    /// A socket is being dialed.
    Connecting,
    /// The socket is up and handshaken.
    Connected,
    /// Connectivity was declared lost; recovery owns the socket.
    Reconnecting,
}

/// Where this client stands in the pairing flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientState {
    /// Not searching, not paired.
    Idle,
    /// A search request is outstanding.
    SearchingForStranger,
    /// Paired with a stranger.
    Chatting,
}

/// User-initiated actions guarded by the state pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversationAction {
    Search,
    SendMessage,
    Disconnect,
    Flag,
    Chatstate,
    RandomTopic,
}

/// The stateful context of one logical connection to the service.
#[derive(Clone, Debug)]
pub struct Session {
    transport_state: TransportState,
    client_state: ClientState,
    connection_id: Option<String>,
    connection_started: Option<Instant>,
    current_contact: Option<String>,
    previous_contact: Option<String>,
    last_post_id: i64,
    is_mobile: bool,
    user_agent: UserAgent,
    action_counter: u64,
}

impl Session {
    #[must_use]
    pub fn new(is_mobile: bool, user_agent: UserAgent) -> Self {
        Self {
            transport_state: TransportState::Offline,
            client_state: ClientState::Idle,
            connection_id: None,
            connection_started: None,
            current_contact: None,
            previous_contact: None,
            last_post_id: POST_ID_NONE,
            is_mobile,
            user_agent,
            action_counter: 0,
        }
    }

    #[must_use]
    pub fn transport_state(&self) -> TransportState {
        self.transport_state
    }

    #[must_use]
    pub fn client_state(&self) -> ClientState {
        self.client_state
    }

    /// Conversation key of the paired stranger. Set whenever the client
    /// state is `Chatting`.
    #[must_use]
    pub fn current_contact(&self) -> Option<&str> {
        self.current_contact.as_deref()
    }

    #[must_use]
    pub fn action_counter(&self) -> u64 {
        self.action_counter
    }

    /// Record one completed user action. Called only after the packet was
    /// handed to the transport, never before.
    pub fn bump_action_counter(&mut self) {
        self.action_counter += 1;
    }

    // =========================================================================
    // TRANSPORT TRANSITIONS
    // =========================================================================

    /// `Offline → Connecting` on a user open.
    pub fn begin_connecting(&mut self) -> bool {
        self.move_transport(TransportState::Offline, TransportState::Connecting)
    }

    /// `Connecting → Connected` on the transport-open callback. Refused
    /// while reconnecting: recovery completes on the service's resume
    /// acknowledgement, not on the raw socket.
    pub fn socket_opened(&mut self) -> bool {
        self.move_transport(TransportState::Connecting, TransportState::Connected)
    }

    /// `Connected → Reconnecting` after a keepalive double miss.
    pub fn begin_reconnect(&mut self) -> bool {
        self.move_transport(TransportState::Connected, TransportState::Reconnecting)
    }

    /// `Reconnecting → Connected` on the resume acknowledgement.
    pub fn reconnected(&mut self) -> bool {
        self.move_transport(TransportState::Reconnecting, TransportState::Connected)
    }

    /// `{Connecting, Connected} → Offline` on the transport-closed callback.
    /// Ignored while reconnecting: recovery closed that socket on purpose.
    pub fn socket_closed(&mut self) -> bool {
        match self.transport_state {
            TransportState::Connecting | TransportState::Connected => {
                self.set_transport(TransportState::Offline);
                true
            }
            TransportState::Offline | TransportState::Reconnecting => false,
        }
    }

    /// Any state → `Offline` on a user close. The conversation cannot
    /// outlive the session, so the pairing resets too.
    pub fn closed_by_user(&mut self) {
        self.set_transport(TransportState::Offline);
        if self.client_state == ClientState::Chatting {
            self.previous_contact = self.current_contact.take();
        }
        self.set_client(ClientState::Idle);
    }

    // =========================================================================
    // CONVERSATION TRANSITIONS
    // =========================================================================

    /// `Idle → SearchingForStranger` after a search request went out.
    pub fn begin_search(&mut self) -> bool {
        if self.client_state != ClientState::Idle {
            return false;
        }
        self.set_client(ClientState::SearchingForStranger);
        true
    }

    /// `Idle | SearchingForStranger → Chatting` when the service pairs us.
    /// The contact key is recorded first so the invariant "chatting implies
    /// a contact" holds before any later packet in the batch is handled.
    pub fn stranger_found(&mut self, contact: &str) {
        if let Some(old) = self.current_contact.take() {
            self.previous_contact = Some(old);
        }
        self.current_contact = Some(contact.to_owned());
        self.set_client(ClientState::Chatting);
    }

    /// `Chatting → Idle` on either side ending the conversation.
    pub fn conversation_ended(&mut self) -> bool {
        if self.client_state != ClientState::Chatting {
            return false;
        }
        self.previous_contact = self.current_contact.take();
        self.set_client(ClientState::Idle);
        true
    }

    // =========================================================================
    // BOOKKEEPING
    // =========================================================================

    /// Record the handshake result.
    pub fn connection_accepted(&mut self, connection_id: String) {
        self.connection_id = Some(connection_id);
        self.connection_started = Some(Instant::now());
    }

    /// Track the most recent wire post id for the reconnect handshake.
    pub fn note_post_id(&mut self, post_id: i64) {
        if post_id != POST_ID_NONE {
            self.last_post_id = post_id;
        }
    }

    /// Whether a guarded user action may proceed right now.
    #[must_use]
    pub fn allows(&self, action: ConversationAction) -> bool {
        if self.transport_state != TransportState::Connected {
            return false;
        }
        match action {
            ConversationAction::Search => self.client_state == ClientState::Idle,
            ConversationAction::SendMessage
            | ConversationAction::Disconnect
            | ConversationAction::Flag
            | ConversationAction::Chatstate
            | ConversationAction::RandomTopic => self.client_state == ClientState::Chatting,
        }
    }

    fn move_transport(&mut self, from: TransportState, to: TransportState) -> bool {
        if self.transport_state != from {
            return false;
        }
        self.set_transport(to);
        true
    }

    fn set_transport(&mut self, state: TransportState) {
        if self.transport_state != state {
            debug!(from = ?self.transport_state, to = ?state, "transport state");
            self.transport_state = state;
        }
    }

    fn set_client(&mut self, state: ClientState) {
        if self.client_state != state {
            debug!(from = ?self.client_state, to = ?state, "client state");
            self.client_state = state;
        }
    }
}

/// Immutable snapshot of the session at the instant connectivity was
/// declared lost; the reconnection request is built from this, not from the
/// live session.
#[derive(Clone, Debug)]
pub struct ReconnectContext {
    pub is_mobile: bool,
    pub client_state: ClientState,
    pub connection_started: Option<Instant>,
    pub last_post_id: i64,
    pub previous_contact: Option<String>,
    pub current_contact: Option<String>,
    pub last_connection_id: Option<String>,
    pub user_agent: UserAgent,
}

impl ReconnectContext {
    #[must_use]
    pub fn snapshot(session: &Session) -> Self {
        Self {
            is_mobile: session.is_mobile,
            client_state: session.client_state,
            connection_started: session.connection_started,
            last_post_id: session.last_post_id,
            previous_contact: session.previous_contact.clone(),
            current_contact: session.current_contact.clone(),
            last_connection_id: session.connection_id.clone(),
            user_agent: session.user_agent.clone(),
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
