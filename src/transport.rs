//! Transport collaborator: the trait the engine drives, and the
//! tokio-tungstenite implementation used in production.
//!
//! DESIGN
//! ======
//! A connected transport is a pair of channels. The engine writes
//! [`TransportCommand`]s and reads [`TransportNotice`]s; a pump task owns the
//! actual socket and translates between the two. Tests swap in a scripted
//! connector and never touch the network.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::ORIGIN;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

/// Close code reported when the socket dies without a close frame.
const ABNORMAL_CLOSE: u16 = 1006;

/// Close code reported when no close code was supplied.
const NO_STATUS_CLOSE: u16 = 1005;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid socket url or origin: {0}")]
    InvalidRequest(String),
    #[error("websocket connect failed: {0}")]
    Connect(Box<tokio_tungstenite::tungstenite::Error>),
}

/// What the engine asks of a connected transport.
#[derive(Debug)]
pub enum TransportCommand {
    /// Write one text frame.
    Send(String),
    /// Close the socket.
    Close,
}

/// Asynchronous notifications from a connected transport.
#[derive(Clone, Debug)]
pub enum TransportNotice {
    /// The socket is up; always the first notice.
    Opened,
    /// One inbound text frame.
    Message(String),
    /// A socket-level error; a close usually follows.
    Error(String),
    /// The socket closed; always the last notice.
    Closed {
        code: u16,
        reason: String,
        was_clean: bool,
    },
}

/// The two channel halves of a connected transport.
pub struct TransportLink {
    pub commands: mpsc::UnboundedSender<TransportCommand>,
    pub notices: mpsc::UnboundedReceiver<TransportNotice>,
}

/// Opens transports. Injected so tests can script socket behavior.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Dial `url`, presenting `origin`, and return the connected link.
    async fn connect(&self, url: &str, origin: &str) -> Result<TransportLink, TransportError>;
}

/// Production connector backed by tokio-tungstenite.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str, origin: &str) -> Result<TransportLink, TransportError> {
        let mut request = url
            .into_client_request()
            .map_err(|error| TransportError::InvalidRequest(error.to_string()))?;
        let origin_value = HeaderValue::from_str(origin)
            .map_err(|error| TransportError::InvalidRequest(error.to_string()))?;
        request.headers_mut().insert(ORIGIN, origin_value);

        let (stream, _) = connect_async(request)
            .await
            .map_err(|error| TransportError::Connect(Box::new(error)))?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        tokio::spawn(pump(stream, command_rx, notice_tx));

        Ok(TransportLink {
            commands: command_tx,
            notices: notice_rx,
        })
    }
}

/// Own the socket: forward commands out, translate inbound traffic into
/// notices, and always finish with a `Closed` notice.
async fn pump(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut commands: mpsc::UnboundedReceiver<TransportCommand>,
    notices: mpsc::UnboundedSender<TransportNotice>,
) {
    let _ = notices.send(TransportNotice::Opened);
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(TransportCommand::Send(text)) => {
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        let _ = notices.send(TransportNotice::Closed {
                            code: ABNORMAL_CLOSE,
                            reason: "write failed".to_owned(),
                            was_clean: false,
                        });
                        break;
                    }
                }
                Some(TransportCommand::Close) => {
                    let _ = sink.send(Message::Close(None)).await;
                    let _ = notices.send(TransportNotice::Closed {
                        code: NO_STATUS_CLOSE,
                        reason: "closed by client".to_owned(),
                        was_clean: true,
                    });
                    break;
                }
                None => {
                    // Engine went away; shut the socket down quietly.
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            message = source.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let _ = notices.send(TransportNotice::Message(text.to_string()));
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame.map_or_else(
                        || (NO_STATUS_CLOSE, String::new()),
                        |frame| (u16::from(frame.code), frame.reason.to_string()),
                    );
                    let _ = notices.send(TransportNotice::Closed {
                        code,
                        reason,
                        was_clean: true,
                    });
                    break;
                }
                Some(Ok(other)) => {
                    debug!(kind = ?other, "ignoring non-text websocket message");
                }
                Some(Err(error)) => {
                    let _ = notices.send(TransportNotice::Error(error.to_string()));
                    let _ = notices.send(TransportNotice::Closed {
                        code: ABNORMAL_CLOSE,
                        reason: error.to_string(),
                        was_clean: false,
                    });
                    break;
                }
                None => {
                    let _ = notices.send(TransportNotice::Closed {
                        code: ABNORMAL_CLOSE,
                        reason: "stream ended".to_owned(),
                        was_clean: false,
                    });
                    break;
                }
            },
        }
    }
}
