//! Client protocol engine for a SockJS-framed stranger-pairing chat service.
//!
//! ARCHITECTURE
//! ============
//! Inbound frames flow `transport → sockjs::decode → Dispatcher → events`,
//! with a single supervisor actor owning the [`session::Session`] state pair
//! (transport connectivity × conversation state) and the keepalive timer.
//! When two keepalive periods pass without a ping, the supervisor probes
//! connectivity, redials a freshly generated endpoint, and resumes the
//! session with a reconnection handshake instead of the fresh one.
//!
//! The consumer-facing surface is [`Connection`] (fire-and-forget
//! operations) plus [`EventStream`] (one ordered stream of every observable
//! outcome). See the `cli` crate for an end-to-end consumer.

pub mod address;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod events;
pub mod outgoing;
pub mod probe;
pub mod session;
mod supervisor;
pub mod transport;

pub use config::{ConnectionConfig, Location, PersonInfo, UserAgent};
pub use connection::{Connection, EventStream};
pub use events::{DisconnectInfo, Event, Message, MessageKind, StrangerInfo};
pub use sockjs::{Frame, Packet};
