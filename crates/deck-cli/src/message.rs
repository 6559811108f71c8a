//! Channel wire format.
//!
//! Every frame on the deck channel is one JSON `ChannelRequest`, sent as a
//! text frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum inbound frame size (1MB).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Subscribe this client to a channel.
pub const REGISTER_LISTENER: &str = "register_listener";
/// Keepalive sent on an interval.
pub const PING: &str = "ping";
/// Server acknowledgement of a request.
pub const OK: &str = "ok";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRequest {
    /// Sender's per-process id
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub request: String,
    #[serde(default)]
    pub data: Value,
}

impl ChannelRequest {
    pub fn new(client_id: &str, channel: &str, request: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            channel: channel.to_string(),
            request: request.to_string(),
            data: Value::Null,
        }
    }

    pub fn register_listener(client_id: &str, channel: &str) -> Self {
        Self::new(client_id, channel, REGISTER_LISTENER)
    }

    pub fn ping(client_id: &str, channel: &str) -> Self {
        Self::new(client_id, channel, PING)
    }

    pub fn to_text(&self) -> String {
        // Only strings and a JSON value; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse a frame. Returns `None` for anything that is not a request.
    pub fn from_text(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    /// Server bookkeeping (acks) rather than a deck change.
    pub fn is_ack(&self) -> bool {
        self.request == OK || self.request == PING
    }
}
