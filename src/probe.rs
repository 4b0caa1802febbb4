//! Reachability collaborator used during connection recovery.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

/// Answers "does this machine currently have a route out?". Injected so
/// recovery tests never wait on the network.
#[async_trait]
pub trait Reachability: Send + Sync {
    async fn is_reachable(&self, timeout: Duration) -> bool;
}

/// Default probe: a TCP dial to a well-known anycast resolver. Unprivileged
/// processes cannot send ICMP, so a connect to `8.8.8.8:53` stands in for a
/// ping.
#[derive(Clone, Debug)]
pub struct TcpProbe {
    target: String,
}

impl TcpProbe {
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new("8.8.8.8:53")
    }
}

#[async_trait]
impl Reachability for TcpProbe {
    async fn is_reachable(&self, timeout: Duration) -> bool {
        matches!(
            tokio::time::timeout(timeout, TcpStream::connect(&self.target)).await,
            Ok(Ok(_))
        )
    }
}
