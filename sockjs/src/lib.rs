//! SockJS-style frame classification and packet codec.
//!
//! DESIGN
//! ======
//! Inbound traffic is a one-character type tag, optionally followed (data
//! frames only) by a JSON array of JSON-encoded strings. Each encoded string
//! is a JSON object carrying the reserved keys `ev_name` (the packet header)
//! and `ev_data` (an opaque payload); every other key rides along in `extra`
//! with insertion order preserved. Outbound traffic is a JSON array holding
//! exactly one stringified packet object — the service never batches sends,
//! and client frames carry no tag character.
//!
//! Decode failures are contained per element: one malformed entry in a data
//! frame yields an error marker in its slot while siblings still decode.

use serde_json::{Map, Value};

/// Error attached to a single undecodable data-frame element.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The frame body after the `a` tag is not a JSON array of strings.
    #[error("data frame body is not a JSON string array: {0}")]
    InvalidBody(serde_json::Error),
    /// An array element is not valid JSON.
    #[error("element {index} is not valid JSON: {source}")]
    InvalidElement {
        index: usize,
        source: serde_json::Error,
    },
    /// An array element decoded to something other than a JSON object.
    #[error("element {index} is not a JSON object")]
    NotAnObject { index: usize },
    /// An array element has no `ev_name` key.
    #[error("element {index} is missing ev_name")]
    MissingHeader { index: usize },
}

/// One raw unit delivered by the transport, classified by its first character.
#[derive(Debug)]
pub enum Frame {
    /// `o` — the server accepted the socket.
    Open,
    /// `c` — the server is closing the socket.
    Close,
    /// `h` — transport-level heartbeat.
    Heartbeat,
    /// `a` — a batch of application packets, decoded independently.
    Data(Vec<Result<Packet, CodecError>>),
    /// `m` — binary payload; the service never sends these to clients.
    BinaryUnsupported,
    /// Any other tag character; `None` means the input was empty.
    Invalid(Option<char>),
}

/// One decoded application-level message carried inside a data frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Packet {
    /// The `ev_name` opcode string identifying this packet's meaning.
    pub header: String,
    /// The `ev_data` value, if present and non-null.
    pub payload: Option<Value>,
    /// Every non-reserved key, in wire order.
    pub extra: Map<String, Value>,
}

impl Packet {
    /// Create a packet with a header and no payload.
    #[must_use]
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            payload: None,
            extra: Map::new(),
        }
    }

    /// Create a packet with a header and payload.
    #[must_use]
    pub fn with_payload(header: impl Into<String>, payload: Value) -> Self {
        Self {
            header: header.into(),
            payload: Some(payload),
            extra: Map::new(),
        }
    }

    /// Look up a key inside the payload object, if the payload is an object.
    #[must_use]
    pub fn payload_field(&self, key: &str) -> Option<&Value> {
        self.payload.as_ref()?.get(key)
    }

    /// Look up a non-reserved wire key.
    #[must_use]
    pub fn extra_field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// Classify one raw inbound frame and decode data-frame packets.
#[must_use]
pub fn decode(raw: &str) -> Frame {
    let mut chars = raw.chars();
    let Some(tag) = chars.next() else {
        return Frame::Invalid(None);
    };

    match tag {
        'o' => Frame::Open,
        'c' => Frame::Close,
        'h' => Frame::Heartbeat,
        'a' => Frame::Data(decode_elements(chars.as_str())),
        'm' => Frame::BinaryUnsupported,
        other => Frame::Invalid(Some(other)),
    }
}

/// Encode one packet in the outbound wire form: a JSON array containing
/// exactly one JSON-encoded string.
#[must_use]
pub fn encode(packet: &Packet) -> String {
    let mut object = Map::new();
    object.insert("ev_name".to_owned(), Value::String(packet.header.clone()));
    if let Some(payload) = &packet.payload {
        object.insert("ev_data".to_owned(), payload.clone());
    }
    for (key, value) in &packet.extra {
        object.insert(key.clone(), value.clone());
    }

    let inner = Value::Object(object).to_string();
    Value::Array(vec![Value::String(inner)]).to_string()
}

fn decode_elements(body: &str) -> Vec<Result<Packet, CodecError>> {
    let elements = match serde_json::from_str::<Vec<String>>(body) {
        Ok(elements) => elements,
        Err(error) => return vec![Err(CodecError::InvalidBody(error))],
    };

    elements
        .iter()
        .enumerate()
        .map(|(index, raw)| decode_element(index, raw))
        .collect()
}

fn decode_element(index: usize, raw: &str) -> Result<Packet, CodecError> {
    let value = serde_json::from_str::<Value>(raw)
        .map_err(|source| CodecError::InvalidElement { index, source })?;
    let Value::Object(fields) = value else {
        return Err(CodecError::NotAnObject { index });
    };

    let mut header = None;
    let mut payload = None;
    let mut extra = Map::new();
    for (key, value) in fields {
        match key.as_str() {
            "ev_name" => header = Some(header_string(&value)),
            "ev_data" => {
                // A null payload counts as absent; the dispatcher treats the
                // two identically.
                if !value.is_null() {
                    payload = Some(value);
                }
            }
            _ => {
                extra.insert(key, value);
            }
        }
    }

    let Some(header) = header else {
        return Err(CodecError::MissingHeader { index });
    };

    Ok(Packet { header, payload, extra })
}

/// Render a header token as a bare string: string values lose their quoting,
/// anything else keeps its compact JSON form.
fn header_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
