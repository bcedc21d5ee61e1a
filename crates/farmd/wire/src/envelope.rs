//! The JSON text-frame envelope exchanged with the daemon.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, WireError};
use crate::service::ORIGIN;

const REQUEST_ID_BYTES: usize = 32;

/// Generate a fresh 32-byte random request id, hex encoded.
pub fn new_request_id() -> String {
    let mut bytes = [0u8; REQUEST_ID_BYTES];
    rand::rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}

/// The wire unit exchanged over the control socket.
///
/// Inbound and outbound frames share this shape. Responses conventionally
/// carry `success` and `error` inside `data`; pushes such as `state_changed`
/// arrive with no matching pending request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub command: String,
    pub data: Value,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub ack: bool,
    #[serde(default)]
    pub request_id: String,
}

/// An outgoing command before identity fields are attached.
///
/// Builders in [`crate::commands`] produce these; the connection wraps one
/// into a full [`Envelope`] at send time so every transmission carries a
/// fresh request id.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub command: String,
    pub data: Value,
    pub destination: String,
}

impl Envelope {
    /// Build an outgoing envelope for `request`, stamped with this client's
    /// identity and a fresh request id.
    pub fn request(request: Request) -> Self {
        Self {
            command: request.command,
            data: request.data,
            origin: ORIGIN.to_string(),
            destination: request.destination,
            ack: false,
            request_id: new_request_id(),
        }
    }

    /// Parse a JSON text frame.
    ///
    /// `command` and `data` are required; the remaining fields default when
    /// absent, since daemon pushes omit some of them.
    pub fn decode(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|error| WireError::MalformedFrame(format!("invalid JSON: {error}")))?;
        if value.get("command").and_then(Value::as_str).is_none() {
            return Err(WireError::MalformedFrame(
                "missing command field".to_string(),
            ));
        }
        if value.get("data").is_none() {
            return Err(WireError::MalformedFrame("missing data field".to_string()));
        }
        serde_json::from_value(value).map_err(|error| WireError::MalformedFrame(error.to_string()))
    }

    /// Serialize to a JSON text frame.
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Conventional success indicator on response payloads.
    ///
    /// Frames without one (pushes, pings) are treated as successful.
    pub fn success(&self) -> bool {
        self.data
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// Conventional error message on response payloads.
    pub fn error_text(&self) -> Option<&str> {
        self.data.get("error").and_then(Value::as_str)
    }
}
