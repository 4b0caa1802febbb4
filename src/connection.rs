//! Public connection facade.
//!
//! DESIGN
//! ======
//! `Connection` is a cheap cloneable handle: every operation is a
//! fire-and-forget command into the supervisor actor, and every observable
//! outcome comes back on the [`EventStream`]. Operations whose state guard
//! is not met are silent no-ops by design — no error, no packet, no state
//! change — so callers never need to pre-check session state.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::{ConnectionConfig, PersonInfo};
use crate::events::Event;
use crate::probe::{Reachability, TcpProbe};
use crate::supervisor::{Command, Supervisor};
use crate::transport::{Connector, WsConnector};

/// Handle to one logical session with the service.
#[derive(Clone)]
pub struct Connection {
    commands: mpsc::UnboundedSender<Command>,
}

/// Ordered stream of everything the engine observes.
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<Event>,
}

impl EventStream {
    /// Next event, or `None` once the session actor has shut down.
    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }
}

impl Connection {
    /// Create a connection using the production websocket transport and
    /// reachability probe. Must be called inside a tokio runtime; the
    /// session actor is spawned immediately, idle until [`open`](Self::open).
    #[must_use]
    pub fn new(config: ConnectionConfig) -> (Self, EventStream) {
        Self::with_collaborators(config, Arc::new(WsConnector), Arc::new(TcpProbe::default()))
    }

    /// Create a connection with injected transport and reachability
    /// collaborators. This is the seam tests and alternative transports use.
    #[must_use]
    pub fn with_collaborators(
        config: ConnectionConfig,
        connector: Arc<dyn Connector>,
        reachability: Arc<dyn Reachability>,
    ) -> (Self, EventStream) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let supervisor = Supervisor::new(config, connector, reachability, event_tx);
        tokio::spawn(supervisor.run(command_rx));

        (
            Self {
                commands: command_tx,
            },
            EventStream { receiver: event_rx },
        )
    }

    /// Dial the service. No-op unless the transport is offline.
    pub fn open(&self) {
        self.send(Command::Open);
    }

    /// Tear the session down, aborting any in-flight recovery.
    pub fn close(&self) {
        self.send(Command::Close);
    }

    /// Ask to be paired with a stranger. Requires a connected transport and
    /// an idle conversation state.
    pub fn search_for_stranger(
        &self,
        myself: PersonInfo,
        preferences: PersonInfo,
        channel: impl Into<String>,
    ) {
        self.send(Command::Search {
            myself,
            preferences,
            channel: channel.into(),
        });
    }

    /// Send a chat message to the paired stranger.
    pub fn send_message(&self, body: impl Into<String>) {
        self.send(Command::SendMessage { body: body.into() });
    }

    /// End the current conversation.
    pub fn disconnect_stranger(&self) {
        self.send(Command::DisconnectStranger);
    }

    /// Report the paired stranger as unpleasant.
    pub fn flag_stranger(&self) {
        self.send(Command::FlagStranger);
    }

    /// Tell the stranger whether we are typing.
    pub fn report_chatstate(&self, typing: bool) {
        self.send(Command::ReportChatstate { typing });
    }

    /// Ask the service for a random conversation topic.
    pub fn request_random_topic(&self) {
        self.send(Command::RequestRandomTopic);
    }

    /// Send a pre-built packet as normal traffic. Not counted as a user
    /// action; dropped silently unless connected.
    pub fn send_packet(&self, packet: sockjs::Packet) {
        self.send(Command::SendPacket { packet });
    }

    /// Send raw text on the socket, bypassing the packet encoder. Dropped
    /// silently unless connected.
    pub fn send_raw_json(&self, text: impl Into<String>) {
        self.send(Command::SendRawJson { text: text.into() });
    }

    fn send(&self, command: Command) {
        // A send can only fail once the actor is gone; there is nobody left
        // to care about the command either.
        let _ = self.commands.send(command);
    }
}
