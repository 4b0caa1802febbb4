//! Randomized endpoint generation.
//!
//! The service load-balances by having each client pick its own port and
//! session path segments. A fresh [`Endpoint`] is generated per connection
//! attempt and never mutated afterwards.

use rand::Rng;

/// Ports the service listens on; upper bound exclusive.
const PORT_LOW: u16 = 7001;
const PORT_HIGH: u16 = 7017;

/// Ports inside the range that never accept sockets.
const PORT_BLACKLIST: [u16; 2] = [7007, 7009];

const SEED_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890_";

/// Session seed length the service expects in the socket path.
const SEED_LEN: usize = 8;

/// One transport endpoint: regenerated per attempt, never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// Short numeric id in the socket path.
    pub socket_number: u16,
    /// Random 8-character session seed in the socket path.
    pub socket_seed: String,
}

impl Endpoint {
    /// Draw a fresh endpoint for one connection attempt.
    #[must_use]
    pub fn generate(host: &str) -> Self {
        let mut rng = rand::rng();

        let mut port = rng.random_range(PORT_LOW..PORT_HIGH);
        while PORT_BLACKLIST.contains(&port) {
            port = rng.random_range(PORT_LOW..PORT_HIGH);
        }

        let socket_seed = (0..SEED_LEN)
            .map(|_| {
                let index = rng.random_range(0..SEED_ALPHABET.len());
                char::from(SEED_ALPHABET[index])
            })
            .collect();

        Self {
            host: host.to_owned(),
            port,
            socket_number: rng.random_range(0..1000),
            socket_seed,
        }
    }

    /// Socket URL in the service's fixed template.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "ws://{}:{}/echoup/{}/{}/websocket",
            self.host, self.port, self.socket_number, self.socket_seed
        )
    }
}

#[cfg(test)]
#[path = "address_test.rs"]
mod tests;
