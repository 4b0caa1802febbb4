//! The session supervisor: one actor task owning all mutable state.
//!
//! DESIGN
//! ======
//! Transport notices, public commands, keepalive expiry, and recovery-probe
//! results all mutate the session, so every one of them funnels through this
//! actor's single `select!` loop. Nothing touches `Session` from outside it.
//!
//! Slow work never runs inside the loop: socket dialing and reachability
//! probing happen in spawned tasks that report back over the internal
//! channel. Notices carry the transport generation they came from, so a
//! detached socket's dying gasps are ignored instead of corrupting state.
//!
//! LIFECYCLE
//! =========
//! 1. `Open` → generate endpoint, dial; `Opened` → handshake (`_cinfo`)
//! 2. `cn_acc` → arm the keepalive timer; every `gdzie` ping resets it
//! 3. Two silent periods → `Reconnecting`: probe, redial, `_reconn_me`
//! 4. `reconn_ok` → `Connected` again; `Close` → cancel everything

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Duration, Instant};
use tracing::{debug, info, warn};

use crate::address::Endpoint;
use crate::config::{ConnectionConfig, PersonInfo};
use crate::dispatch::Dispatcher;
use crate::events::Event;
use crate::outgoing;
use crate::probe::Reachability;
use crate::session::{ConversationAction, ReconnectContext, Session, TransportState};
use crate::transport::{Connector, TransportCommand, TransportError, TransportLink, TransportNotice};

/// Close code used for the synthetic close event on a user `close()`.
const USER_CLOSE: u16 = 1000;

/// Public operations, delivered over the command channel.
#[derive(Debug)]
pub(crate) enum Command {
    Open,
    Close,
    Search {
        myself: PersonInfo,
        preferences: PersonInfo,
        channel: String,
    },
    SendMessage {
        body: String,
    },
    DisconnectStranger,
    FlagStranger,
    ReportChatstate {
        typing: bool,
    },
    RequestRandomTopic,
    SendPacket {
        packet: sockjs::Packet,
    },
    SendRawJson {
        text: String,
    },
}

/// Results reported back into the actor by its spawned tasks.
enum Internal {
    Connected(TransportLink),
    ConnectFailed(TransportError),
    Notice {
        generation: u64,
        notice: TransportNotice,
    },
    ProbeFinished {
        reachable: bool,
    },
}

pub(crate) struct Supervisor {
    config: ConnectionConfig,
    connector: Arc<dyn Connector>,
    reachability: Arc<dyn Reachability>,
    session: Session,
    dispatcher: Dispatcher,
    events: mpsc::UnboundedSender<Event>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: Option<mpsc::UnboundedReceiver<Internal>>,
    /// Command half of the attached transport, if any.
    transport: Option<mpsc::UnboundedSender<TransportCommand>>,
    /// Bumped on every attach/detach; stale notices are dropped by it.
    generation: u64,
    keepalive_armed: bool,
    keepalive_deadline: Instant,
    /// Consecutive keepalive periods without a ping.
    misses: u8,
    /// Snapshot backing the resume handshake; cleared on success or close.
    reconnect: Option<ReconnectContext>,
    recovery_cancel: Option<watch::Sender<bool>>,
}

impl Supervisor {
    pub(crate) fn new(
        config: ConnectionConfig,
        connector: Arc<dyn Connector>,
        reachability: Arc<dyn Reachability>,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let session = Session::new(config.is_mobile, config.user_agent.clone());
        let dispatcher = Dispatcher::new(config.opcodes.clone());

        Self {
            config,
            connector,
            reachability,
            session,
            dispatcher,
            events,
            internal_tx,
            internal_rx: Some(internal_rx),
            transport: None,
            generation: 0,
            keepalive_armed: false,
            keepalive_deadline: Instant::now(),
            misses: 0,
            reconnect: None,
            recovery_cancel: None,
        }
    }

    /// Actor loop. Exits when the last `Connection` handle is dropped.
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut internal_rx = self
            .internal_rx
            .take()
            .unwrap_or_else(|| mpsc::unbounded_channel().1);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                internal = internal_rx.recv() => {
                    if let Some(internal) = internal {
                        self.handle_internal(internal);
                    }
                },
                () = time::sleep_until(self.keepalive_deadline), if self.keepalive_armed => {
                    self.handle_keepalive_expiry();
                },
            }
        }

        self.cancel_recovery();
        self.detach_transport(true);
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Open => self.handle_open(),
            Command::Close => self.handle_close(),
            Command::Search {
                myself,
                preferences,
                channel,
            } => self.handle_search(&myself, &preferences, &channel),
            Command::SendMessage { body } => self.handle_send_message(&body),
            Command::DisconnectStranger => self.handle_disconnect_stranger(),
            Command::FlagStranger => self.handle_flag_stranger(),
            Command::ReportChatstate { typing } => self.handle_report_chatstate(typing),
            Command::RequestRandomTopic => self.handle_request_random_topic(),
            Command::SendPacket { packet } => {
                let _ = self.transmit(&packet);
            }
            Command::SendRawJson { text } => {
                if self.session.transport_state() == TransportState::Connected {
                    self.write_text(text);
                }
            }
        }
    }

    fn handle_open(&mut self) {
        if !self.session.begin_connecting() {
            debug!("open ignored: transport is not offline");
            return;
        }
        self.start_connect();
    }

    fn handle_close(&mut self) {
        self.cancel_recovery();
        self.reconnect = None;
        self.keepalive_armed = false;
        self.misses = 0;

        let had_transport = self.transport.is_some();
        self.detach_transport(true);
        self.session.closed_by_user();

        if had_transport {
            self.emit(Event::SocketClosed {
                code: USER_CLOSE,
                reason: "closed by client".to_owned(),
                was_clean: true,
            });
        }
    }

    fn handle_search(&mut self, myself: &PersonInfo, preferences: &PersonInfo, channel: &str) {
        if !self.session.allows(ConversationAction::Search) {
            debug!("search ignored by state guard");
            return;
        }
        let packet = outgoing::search(myself, preferences, channel, self.session.action_counter());
        if self.transmit(&packet) {
            self.session.begin_search();
            self.session.bump_action_counter();
        }
    }

    fn handle_send_message(&mut self, body: &str) {
        if !self.session.allows(ConversationAction::SendMessage) {
            debug!("message ignored by state guard");
            return;
        }
        let Some(contact) = self.session.current_contact().map(ToOwned::to_owned) else {
            return;
        };
        let packet = outgoing::message(&contact, body, self.session.action_counter());
        if self.transmit(&packet) {
            self.session.bump_action_counter();
        }
    }

    fn handle_disconnect_stranger(&mut self) {
        if !self.session.allows(ConversationAction::Disconnect) {
            debug!("disconnect ignored by state guard");
            return;
        }
        let Some(contact) = self.session.current_contact().map(ToOwned::to_owned) else {
            return;
        };
        let packet = outgoing::disconnect(&contact, self.session.action_counter());
        if self.transmit(&packet) {
            self.session.conversation_ended();
            self.session.bump_action_counter();
        }
    }

    fn handle_flag_stranger(&mut self) {
        if !self.session.allows(ConversationAction::Flag) {
            debug!("flag ignored by state guard");
            return;
        }
        let Some(contact) = self.session.current_contact().map(ToOwned::to_owned) else {
            return;
        };
        let packet = outgoing::report_stranger(&contact, self.session.action_counter());
        if self.transmit(&packet) {
            self.session.bump_action_counter();
        }
    }

    fn handle_report_chatstate(&mut self, typing: bool) {
        if !self.session.allows(ConversationAction::Chatstate) {
            debug!("chatstate ignored by state guard");
            return;
        }
        let Some(contact) = self.session.current_contact().map(ToOwned::to_owned) else {
            return;
        };
        let packet = outgoing::chatstate(&contact, typing);
        if self.transmit(&packet) {
            self.session.bump_action_counter();
        }
    }

    fn handle_request_random_topic(&mut self) {
        if !self.session.allows(ConversationAction::RandomTopic) {
            debug!("random topic ignored by state guard");
            return;
        }
        let Some(contact) = self.session.current_contact().map(ToOwned::to_owned) else {
            return;
        };
        let packet = outgoing::random_topic(&contact, self.session.action_counter());
        if self.transmit(&packet) {
            self.session.bump_action_counter();
        }
    }

    // =========================================================================
    // INTERNAL RESULTS
    // =========================================================================

    fn handle_internal(&mut self, internal: Internal) {
        match internal {
            Internal::Connected(link) => self.handle_connected(link),
            Internal::ConnectFailed(error) => self.handle_connect_failed(&error),
            Internal::Notice { generation, notice } => {
                if generation == self.generation {
                    self.handle_notice(notice);
                } else {
                    debug!(generation, "dropping notice from a detached transport");
                }
            }
            Internal::ProbeFinished { reachable } => self.handle_probe_finished(reachable),
        }
    }

    fn handle_connected(&mut self, link: TransportLink) {
        match self.session.transport_state() {
            TransportState::Connecting | TransportState::Reconnecting => {
                self.attach_transport(link);
            }
            _ => {
                // The user closed while the dial was in flight.
                let _ = link.commands.send(TransportCommand::Close);
            }
        }
    }

    fn handle_connect_failed(&mut self, error: &TransportError) {
        warn!(error = %error, "socket dial failed");
        self.emit(Event::SocketError(error.to_string()));

        match self.session.transport_state() {
            TransportState::Connecting => {
                self.session.socket_closed();
            }
            TransportState::Reconnecting => self.start_recovery(),
            _ => {}
        }
    }

    fn handle_probe_finished(&mut self, reachable: bool) {
        if self.session.transport_state() != TransportState::Reconnecting {
            return;
        }
        if reachable {
            info!("host reachable, redialing");
            self.start_connect();
        } else {
            // Still cut off; the recovery task retries after its delay and
            // the loss stays unresolved for the consumer.
            warn!("reachability probe exhausted its attempts");
            self.emit(Event::ConnectionLost);
        }
    }

    // =========================================================================
    // TRANSPORT NOTICES
    // =========================================================================

    fn handle_notice(&mut self, notice: TransportNotice) {
        match notice {
            TransportNotice::Opened => self.handle_opened(),
            TransportNotice::Message(text) => self.handle_inbound(&text),
            TransportNotice::Error(reason) => {
                self.emit(Event::SocketError(reason));
            }
            TransportNotice::Closed {
                code,
                reason,
                was_clean,
            } => self.handle_closed(code, reason, was_clean),
        }
    }

    fn handle_opened(&mut self) {
        match self.session.transport_state() {
            TransportState::Connecting => {
                self.session.socket_opened();
                self.emit(Event::SocketOpened);
                let handshake =
                    outgoing::client_info(self.config.is_mobile, &self.config.user_agent);
                let _ = self.transmit(&handshake);
            }
            TransportState::Reconnecting => {
                self.emit(Event::SocketOpened);
                // Resume handshake instead of the fresh one. The snapshot
                // stays around until the service acknowledges, in case this
                // socket dies and recovery has to run again.
                let packet = self.reconnect.as_ref().map(outgoing::reconnect_request);
                if let Some(packet) = packet {
                    self.write_packet(&packet);
                }
            }
            _ => {}
        }
    }

    fn handle_closed(&mut self, code: u16, reason: String, was_clean: bool) {
        self.detach_transport(false);
        self.emit(Event::SocketClosed {
            code,
            reason,
            was_clean,
        });

        if self.session.socket_closed() {
            self.keepalive_armed = false;
        } else if self.session.transport_state() == TransportState::Reconnecting {
            // The replacement socket died before the service acknowledged
            // the resume; go back to probing.
            self.start_recovery();
        }
    }

    fn handle_inbound(&mut self, text: &str) {
        self.emit(Event::JsonRead(text.to_owned()));

        match sockjs::decode(text) {
            sockjs::Frame::Open => {
                let _ = self.transmit(&outgoing::open_ack());
            }
            sockjs::Frame::Close => debug!("server sent a close frame"),
            sockjs::Frame::Heartbeat => self.emit(Event::Heartbeat),
            sockjs::Frame::BinaryUnsupported => debug!("binary frames are not supported"),
            sockjs::Frame::Invalid(tag) => {
                warn!(?tag, "unrecognized frame tag");
                self.emit(Event::DecodeError(format!(
                    "unrecognized frame tag: {tag:?}"
                )));
            }
            sockjs::Frame::Data(elements) => {
                for element in elements {
                    match element {
                        Ok(packet) => self.apply_packet(packet),
                        Err(error) => {
                            warn!(error = %error, "dropping undecodable packet");
                            self.emit(Event::DecodeError(error.to_string()));
                        }
                    }
                }
            }
        }
    }

    /// Dispatch one packet and apply its state effects before emitting, so a
    /// pairing earlier in a batch is visible to every later packet.
    fn apply_packet(&mut self, packet: sockjs::Packet) {
        let event = self.dispatcher.dispatch(packet);
        match &event {
            Event::ConnectionAccepted { connection_id, .. } => {
                info!(%connection_id, "session accepted");
                self.session.connection_accepted(connection_id.clone());
                self.arm_keepalive();
            }
            Event::Ping => {
                self.arm_keepalive();
                if self.config.keepalive {
                    let _ = self.transmit(&outgoing::pong());
                }
            }
            Event::StrangerFound(info) => {
                self.session.stranger_found(&info.uid);
                let ack =
                    outgoing::conversation_start_ack(&info.uid, self.session.action_counter());
                let _ = self.transmit(&ack);
            }
            Event::ConversationEnded(_) => {
                self.session.conversation_ended();
            }
            Event::MessageReceived(message) => {
                self.session.note_post_id(message.post_id);
            }
            Event::ReconnectionSuccess => {
                if self.session.reconnected() {
                    info!("session resumed");
                    self.reconnect = None;
                    self.cancel_recovery();
                    self.arm_keepalive();
                }
            }
            _ => {}
        }
        self.emit(event);
    }

    // =========================================================================
    // KEEPALIVE
    // =========================================================================

    fn arm_keepalive(&mut self) {
        self.keepalive_armed = true;
        self.misses = 0;
        self.keepalive_deadline = Instant::now() + self.config.keepalive_period;
    }

    fn handle_keepalive_expiry(&mut self) {
        self.misses += 1;
        if self.misses >= 2 {
            warn!("two keepalive periods without a ping; starting recovery");
            self.keepalive_armed = false;
            self.enter_reconnecting();
        } else {
            debug!(misses = self.misses, "keepalive period passed without a ping");
            self.keepalive_deadline = Instant::now() + self.config.keepalive_period;
        }
    }

    fn enter_reconnecting(&mut self) {
        if !self.session.begin_reconnect() {
            return;
        }
        self.reconnect = Some(ReconnectContext::snapshot(&self.session));
        self.emit(Event::ConnectionLost);
        self.detach_transport(true);
        self.start_recovery();
    }

    // =========================================================================
    // RECOVERY
    // =========================================================================

    fn start_recovery(&mut self) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        // Replacing the sender cancels any previous recovery task.
        self.recovery_cancel = Some(cancel_tx);

        let reachability = Arc::clone(&self.reachability);
        let attempts = self.config.probe_attempts;
        let timeout = self.config.probe_timeout;
        let retry_delay = self.config.probe_retry_delay;
        let internal = self.internal_tx.clone();

        tokio::spawn(recovery(
            reachability,
            attempts,
            timeout,
            retry_delay,
            cancel_rx,
            internal,
        ));
    }

    fn cancel_recovery(&mut self) {
        if let Some(cancel) = self.recovery_cancel.take() {
            let _ = cancel.send(true);
        }
    }

    // =========================================================================
    // SOCKET PLUMBING
    // =========================================================================

    fn start_connect(&mut self) {
        let endpoint = Endpoint::generate(&self.config.host);
        let url = endpoint.url();
        let origin = self.config.origin.clone();
        let connector = Arc::clone(&self.connector);
        let internal = self.internal_tx.clone();

        info!(%url, "dialing");
        tokio::spawn(async move {
            match connector.connect(&url, &origin).await {
                Ok(link) => {
                    let _ = internal.send(Internal::Connected(link));
                }
                Err(error) => {
                    let _ = internal.send(Internal::ConnectFailed(error));
                }
            }
        });
    }

    fn attach_transport(&mut self, link: TransportLink) {
        self.generation += 1;
        let generation = self.generation;
        let mut notices = link.notices;
        let internal = self.internal_tx.clone();
        tokio::spawn(async move {
            while let Some(notice) = notices.recv().await {
                if internal.send(Internal::Notice { generation, notice }).is_err() {
                    break;
                }
            }
        });
        self.transport = Some(link.commands);
    }

    fn detach_transport(&mut self, send_close: bool) {
        if let Some(commands) = self.transport.take() {
            if send_close {
                let _ = commands.send(TransportCommand::Close);
            }
        }
        self.generation += 1;
    }

    /// Send one packet as normal traffic. Dropped silently unless the
    /// transport is `Connected`.
    fn transmit(&mut self, packet: &sockjs::Packet) -> bool {
        if self.session.transport_state() != TransportState::Connected {
            debug!(header = %packet.header, "dropping packet: transport not connected");
            return false;
        }
        self.write_packet(packet)
    }

    /// Send one packet without the `Connected` gate. Only the resume
    /// handshake uses this, while `Reconnecting`.
    fn write_packet(&mut self, packet: &sockjs::Packet) -> bool {
        self.write_text(sockjs::encode(packet))
    }

    fn write_text(&mut self, text: String) -> bool {
        let Some(transport) = &self.transport else {
            return false;
        };
        if transport
            .send(TransportCommand::Send(text.clone()))
            .is_err()
        {
            return false;
        }
        self.emit(Event::JsonWritten(text));
        true
    }

    fn emit(&self, event: Event) {
        let _ = self.events.send(event);
    }
}

/// Recovery task: probe until the host answers, pausing between exhausted
/// rounds, honoring cancellation at every boundary. Runs outside the actor
/// so inbound traffic is never stalled behind a probe.
async fn recovery(
    reachability: Arc<dyn Reachability>,
    attempts: u32,
    timeout: Duration,
    retry_delay: Duration,
    mut cancel: watch::Receiver<bool>,
    internal: mpsc::UnboundedSender<Internal>,
) {
    loop {
        for _ in 0..attempts {
            if *cancel.borrow() {
                return;
            }
            tokio::select! {
                reachable = reachability.is_reachable(timeout) => {
                    if reachable {
                        let _ = internal.send(Internal::ProbeFinished { reachable: true });
                        return;
                    }
                }
                _ = cancel.changed() => return,
            }
        }

        if internal
            .send(Internal::ProbeFinished { reachable: false })
            .is_err()
        {
            return;
        }
        tokio::select! {
            () = time::sleep(retry_delay) => {}
            _ = cancel.changed() => return,
        }
    }
}

#[cfg(test)]
#[path = "supervisor_test.rs"]
mod tests;
