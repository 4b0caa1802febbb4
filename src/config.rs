//! Connection configuration and client identity types.

use std::time::Duration;

use serde::Serialize;

use crate::dispatch::OpcodeTable;

/// Default service host. The service publishes no DNS name; clients dial the
/// address embedded in its web client.
pub const DEFAULT_HOST: &str = "91.185.186.211";

/// Default `Origin` header; the service rejects sockets without it.
pub const DEFAULT_ORIGIN: &str = "http://6obcy.in";

/// Expected ping cadence (30 s) plus grace.
const DEFAULT_KEEPALIVE_SECS: u64 = 35;

const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_PROBE_ATTEMPTS: u32 = 3;
const DEFAULT_PROBE_RETRY_SECS: u64 = 10;

/// Application identity reported in the handshake and reconnect request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserAgent {
    pub name: String,
    pub version: String,
}

impl UserAgent {
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl std::fmt::Display for UserAgent {
    /// Wire form used by the `cver` handshake field.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, version {}", self.name, self.version)
    }
}

/// Region preference for stranger searches. Wire values are the service's
/// region codes: 0 matches anywhere in the country, 17 matches abroad.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Location {
    WholePoland = 0,
    Podlaskie = 1,
    Dolnoslaskie = 2,
    Podkarpackie = 3,
    KujawskoPomorskie = 4,
    Pomorskie = 5,
    Lubelskie = 6,
    Slaskie = 7,
    Lubuskie = 8,
    Swietokrzyskie = 9,
    Lodzkie = 10,
    WarminskoMazurskie = 11,
    Malopolskie = 12,
    Wielkopolskie = 13,
    Mazowieckie = 14,
    Zachodniopomorskie = 15,
    Opolskie = 16,
    OutsidePoland = 17,
}

impl Location {
    /// Wire region code.
    #[must_use]
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Parse a wire region code, e.g. from a command-line flag.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        let location = match code {
            0 => Self::WholePoland,
            1 => Self::Podlaskie,
            2 => Self::Dolnoslaskie,
            3 => Self::Podkarpackie,
            4 => Self::KujawskoPomorskie,
            5 => Self::Pomorskie,
            6 => Self::Lubelskie,
            7 => Self::Slaskie,
            8 => Self::Lubuskie,
            9 => Self::Swietokrzyskie,
            10 => Self::Lodzkie,
            11 => Self::WarminskoMazurskie,
            12 => Self::Malopolskie,
            13 => Self::Wielkopolskie,
            14 => Self::Mazowieckie,
            15 => Self::Zachodniopomorskie,
            16 => Self::Opolskie,
            17 => Self::OutsidePoland,
            _ => return None,
        };
        Some(location)
    }
}

/// One side of a search request: who someone is, or who they want to meet.
/// The `sex` code is passed through opaquely, like every preference value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PersonInfo {
    pub sex: i64,
    pub location: Location,
}

impl PersonInfo {
    #[must_use]
    pub fn new(sex: i64, location: Location) -> Self {
        Self { sex, location }
    }
}

impl Default for PersonInfo {
    fn default() -> Self {
        Self {
            sex: 0,
            location: Location::WholePoland,
        }
    }
}

/// Everything a [`crate::Connection`](crate::connection::Connection) needs to
/// dial and keep a session alive.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Service host; combined with a generated endpoint per attempt.
    pub host: String,
    /// `Origin` header sent on every socket.
    pub origin: String,
    /// Identity reported in the handshake.
    pub user_agent: UserAgent,
    /// Whether to present as a mobile client.
    pub is_mobile: bool,
    /// When enabled, every ping is answered with a pong.
    pub keepalive: bool,
    /// One keepalive period; two silent periods trigger recovery.
    pub keepalive_period: Duration,
    /// Timeout for a single reachability probe.
    pub probe_timeout: Duration,
    /// Probes per recovery round.
    pub probe_attempts: u32,
    /// Pause between failed recovery rounds.
    pub probe_retry_delay: Duration,
    /// Inbound opcode catalogue; replaceable when the service shifts names.
    pub opcodes: OpcodeTable,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            origin: DEFAULT_ORIGIN.to_owned(),
            user_agent: UserAgent::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            is_mobile: false,
            keepalive: true,
            keepalive_period: Duration::from_secs(DEFAULT_KEEPALIVE_SECS),
            probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            probe_attempts: DEFAULT_PROBE_ATTEMPTS,
            probe_retry_delay: Duration::from_secs(DEFAULT_PROBE_RETRY_SECS),
            opcodes: OpcodeTable::default(),
        }
    }
}
