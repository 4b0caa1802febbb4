//! Interactive terminal client for the stranger-chat protocol engine.
//!
//! Connects, then reads stdin: `/`-prefixed lines drive the session and
//! anything else goes out as a chat message. Protocol events print as they
//! arrive, so this doubles as a live trace of the wire behavior.

use clap::Parser;
use obcy::{Connection, ConnectionConfig, Event, Location, MessageKind, PersonInfo};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid region code {0} (expected 0-17)")]
    InvalidLocation(i64),
    #[error("stdin read failed: {0}")]
    Stdin(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "obcy-cli", about = "Terminal client for the stranger-pairing chat service")]
struct Cli {
    #[arg(long, env = "OBCY_HOST", default_value = obcy::config::DEFAULT_HOST)]
    host: String,

    #[arg(long, env = "OBCY_ORIGIN", default_value = obcy::config::DEFAULT_ORIGIN)]
    origin: String,

    /// Present as a mobile client.
    #[arg(long, default_value_t = false)]
    mobile: bool,

    /// Channel searched by `/search`.
    #[arg(long, default_value = "main")]
    channel: String,

    /// Own sex code, passed through to the service.
    #[arg(long, default_value_t = 0)]
    sex: i64,

    /// Own region code (0 = whole country, 17 = abroad).
    #[arg(long, default_value_t = 0)]
    location: i64,

    /// Preferred stranger sex code.
    #[arg(long, default_value_t = 0)]
    wanted_sex: i64,

    /// Preferred stranger region code.
    #[arg(long, default_value_t = 0)]
    wanted_location: i64,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let myself = PersonInfo::new(cli.sex, parse_location(cli.location)?);
    let preferences = PersonInfo::new(cli.wanted_sex, parse_location(cli.wanted_location)?);

    let config = ConnectionConfig {
        host: cli.host,
        origin: cli.origin,
        is_mobile: cli.mobile,
        ..ConnectionConfig::default()
    };
    let (connection, mut events) = Connection::new(config);
    connection.open();

    println!("commands: /search /disconnect /topic /flag /typing /quit — anything else is sent");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                print_event(&event);
            }
            line = stdin.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line == "/quit" {
                    break;
                }
                handle_line(&connection, &myself, &preferences, &cli.channel, line);
            }
        }
    }

    connection.close();
    Ok(())
}

fn parse_location(code: i64) -> Result<Location, CliError> {
    Location::from_code(code).ok_or(CliError::InvalidLocation(code))
}

fn handle_line(
    connection: &Connection,
    myself: &PersonInfo,
    preferences: &PersonInfo,
    channel: &str,
    line: &str,
) {
    match line {
        "" => {}
        "/search" => {
            println!("* searching...");
            connection.search_for_stranger(*myself, *preferences, channel);
        }
        "/disconnect" => connection.disconnect_stranger(),
        "/topic" => connection.request_random_topic(),
        "/flag" => connection.flag_stranger(),
        "/typing" => connection.report_chatstate(true),
        unknown if unknown.starts_with('/') => {
            println!("* unknown command: {unknown}");
        }
        message => connection.send_message(message),
    }
}

fn print_event(event: &Event) {
    match event {
        Event::ConnectionAccepted { connection_id, .. } => {
            println!("* session accepted ({connection_id})");
        }
        Event::OnlineCountChanged(count) => println!("* {count} people online"),
        Event::StrangerFound(info) => {
            println!("* paired with stranger {} — say hi", info.client_id);
        }
        Event::ConversationEnded(info) if info.is_reminder => {
            println!("* no active conversation");
        }
        Event::ConversationEnded(info) => println!("* stranger {} left", info.client_id),
        Event::MessageReceived(message) => match message.kind {
            MessageKind::Chat => println!("stranger: {}", message.body),
            MessageKind::Topic => println!("* topic: {}", message.body),
            MessageKind::Service => println!("* service: {}", message.body),
        },
        Event::StrangerChatstateChanged(true) => println!("* stranger is typing..."),
        Event::ConnectionLost => println!("* connection lost, recovering..."),
        Event::ReconnectionSuccess => println!("* session resumed"),
        Event::SocketError(reason) => eprintln!("! socket error: {reason}"),
        Event::SocketClosed { code, reason, .. } => {
            eprintln!("! socket closed ({code}): {reason}");
        }
        Event::MalformedPacket { header, reason } => {
            eprintln!("! malformed {header} packet: {reason}");
        }
        Event::DecodeError(reason) => eprintln!("! decode error: {reason}"),
        Event::StrangerChatstateChanged(false)
        | Event::Ping
        | Event::Heartbeat
        | Event::SocketOpened
        | Event::JsonRead(_)
        | Event::JsonWritten(_)
        | Event::UnknownPacket(_) => {}
    }
}
