//! Protocol-specific payload decoding.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{StreamError, UpstreamError};

/// What the pump should do after decoding an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Deliver the event and keep reading.
    Continue,
    /// Deliver the event, then close the session.
    DeliverThenClose,
    /// Close the session without delivering the event.
    CloseSilently,
}

/// A payload schema sharing the `data:` line framing.
pub trait Protocol: Send + 'static {
    /// Event type produced by this protocol.
    type Event: std::fmt::Debug + Send + 'static;

    /// Short name used in logs.
    const NAME: &'static str;

    /// Decode the payload of one data frame.
    fn decode(payload: &[u8]) -> Result<Self::Event, StreamError>;

    /// Termination policy for a decoded event.
    fn disposition(event: &Self::Event) -> Disposition;
}

/// Discriminator fields shared by every frame of both protocols.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    task_id: Option<String>,
}

/// A data frame whose discriminators have been checked.
#[derive(Debug)]
pub(crate) struct Frame {
    /// Wire event name, never empty.
    pub event: String,
    /// The whole payload object, discriminators included.
    pub value: Value,
}

/// Parse the outer JSON object and check the discriminator fields.
///
/// In-band `error` events become [`StreamError::Upstream`].
pub(crate) fn parse_frame(payload: &[u8]) -> Result<Frame, StreamError> {
    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| StreamError::malformed(format!("invalid JSON: {}", e), payload))?;

    if !value.is_object() {
        return Err(StreamError::malformed("payload is not a JSON object", payload));
    }

    let envelope: Envelope = decode_as(&value, "envelope", payload)?;
    let event = match envelope.event {
        Some(event) if !event.is_empty() => event,
        _ => return Err(StreamError::malformed("missing `event` field", payload)),
    };

    if event == "error" {
        return Err(match UpstreamError::deserialize(&value) {
            Ok(err) => StreamError::Upstream(err),
            Err(e) => StreamError::malformed(format!("invalid error event: {}", e), payload),
        });
    }

    if envelope.task_id.is_none() {
        return Err(StreamError::malformed("missing `task_id` field", payload));
    }

    Ok(Frame { event, value })
}

/// Deserialize a typed view of the payload object.
pub(crate) fn decode_as<T: DeserializeOwned>(
    value: &Value,
    what: &str,
    payload: &[u8],
) -> Result<T, StreamError> {
    T::deserialize(value)
        .map_err(|e| StreamError::malformed(format!("invalid {}: {}", what, e), payload))
}

/// The payload object without the given top-level fields.
pub(crate) fn without(value: Value, consumed: &[&str]) -> Value {
    match value {
        Value::Object(mut fields) => {
            for key in consumed {
                fields.remove(*key);
            }
            Value::Object(fields)
        }
        other => other,
    }
}
