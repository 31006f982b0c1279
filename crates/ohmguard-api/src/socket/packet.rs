// Engine.IO v4 / Socket.IO v4 text packet codec.
//
// Only the text framing the alert stream uses is supported: the default
// namespace, JSON event payloads, no binary attachments. A text frame is
// one Engine.IO packet; type `4` carries a Socket.IO packet.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::Error;

pub(crate) const PONG: &str = "3";
pub(crate) const NAMESPACE_DISCONNECT: &str = "41";

const DEFAULT_PING_INTERVAL_MS: u64 = 25_000;
const DEFAULT_PING_TIMEOUT_MS: u64 = 20_000;

/// A decoded inbound packet.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Packet {
    /// `0{...}`: transport handshake.
    Open(OpenInfo),
    /// `1`
    Close,
    /// `2`: server heartbeat; must be answered with [`PONG`].
    Ping,
    /// `3`
    Pong,
    /// `6`
    Noop,
    /// `40{"sid":...}`: namespace connect accepted.
    Connect { sid: Option<String> },
    /// `41`: server dropped us from the namespace.
    Disconnect,
    /// `42[name, payload]`, with any ack id stripped.
    Event { name: String, payload: Value },
    /// `43...`: ack for an emit we sent.
    Ack,
    /// `44{...}`: namespace connect refused.
    ConnectError(String),
}

/// Engine.IO handshake payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OpenInfo {
    #[serde(default)]
    pub sid: String,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

fn default_ping_interval() -> u64 {
    DEFAULT_PING_INTERVAL_MS
}

fn default_ping_timeout() -> u64 {
    DEFAULT_PING_TIMEOUT_MS
}

impl OpenInfo {
    /// How long the server may stay silent before the link counts as dead.
    pub(crate) fn heartbeat_window_ms(&self) -> u64 {
        self.ping_interval.saturating_add(self.ping_timeout)
    }
}

impl Default for OpenInfo {
    fn default() -> Self {
        Self {
            sid: String::new(),
            ping_interval: DEFAULT_PING_INTERVAL_MS,
            ping_timeout: DEFAULT_PING_TIMEOUT_MS,
        }
    }
}

/// Decode one text frame.
pub(crate) fn decode(text: &str) -> Result<Packet, Error> {
    let mut chars = text.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::Protocol("empty Engine.IO packet".into()))?;
    let body = chars.as_str();

    match kind {
        '0' => serde_json::from_str(body)
            .map(Packet::Open)
            .map_err(|e| Error::Protocol(format!("bad open packet: {e}"))),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_socketio(body),
        '6' => Ok(Packet::Noop),
        other => Err(Error::Protocol(format!(
            "unsupported Engine.IO packet type {other:?}"
        ))),
    }
}

fn decode_socketio(text: &str) -> Result<Packet, Error> {
    let mut chars = text.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::Protocol("empty Socket.IO packet".into()))?;
    let body = strip_namespace(chars.as_str());

    match kind {
        '0' => {
            let sid = serde_json::from_str::<Value>(body).ok().and_then(|v| {
                v.get("sid")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            });
            Ok(Packet::Connect { sid })
        }
        '1' => Ok(Packet::Disconnect),
        '2' => decode_event(strip_ack_id(body)),
        '3' => Ok(Packet::Ack),
        '4' => Ok(Packet::ConnectError(connect_error_message(body))),
        other => Err(Error::Protocol(format!(
            "unsupported Socket.IO packet type {other:?}"
        ))),
    }
}

fn decode_event(body: &str) -> Result<Packet, Error> {
    let items: Vec<Value> = serde_json::from_str(body)
        .map_err(|e| Error::Protocol(format!("bad event packet: {e}")))?;
    let mut items = items.into_iter();
    let name = match items.next() {
        Some(Value::String(name)) => name,
        _ => return Err(Error::Protocol("event packet without a name".into())),
    };
    let payload = items.next().unwrap_or(Value::Null);
    Ok(Packet::Event { name, payload })
}

/// `/admin,rest` → `rest`; the default namespace has no prefix.
fn strip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        body.split_once(',').map_or("", |(_, rest)| rest)
    } else {
        body
    }
}

fn strip_ack_id(body: &str) -> &str {
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn connect_error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::String(message)) => message,
        Ok(value) => value
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| value.to_string(), str::to_owned),
        Err(_) if body.is_empty() => "connection refused".into(),
        Err(_) => body.to_owned(),
    }
}

/// `40{auth}`: join the default namespace.
pub(crate) fn encode_connect(token: &str) -> String {
    format!("40{}", json!({ "token": token }))
}

/// `42[name, payload]` without an ack id.
pub(crate) fn encode_event(name: &str, payload: &Value) -> String {
    format!("42{}", json!([name, payload]))
}
