//! Frame types and their JSON codec.
//!
//! Inbound frames are decoded through a strict parse-and-validate step: the
//! text must be a JSON object, the `type` discriminator selects a system
//! frame, and everything else is a user message. Duck-typed field probing
//! stays inside this module; the rest of the stack only ever sees the
//! [`InboundFrame`] union.

use serde::Deserialize;

use crate::error::ProtocolError;

/// Intermediate shape for inbound JSON. Every field is optional; the
/// validate step below decides what the frame actually is.
#[derive(Debug, Deserialize)]
struct WireInbound {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    sender_id: Option<String>,
}

/// A classified inbound frame.
///
/// The three system variants update session state and are never surfaced
/// as message-log entries. Everything else is a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Server-assigned local identity.
    SelfId {
        /// The assigned identity value.
        id: String,
    },

    /// Protocol error acknowledgement. Consumed silently.
    ErrorAck,

    /// Delivery status acknowledgement. Consumed silently.
    DeliveryStatus,

    /// A user message from another participant.
    Message {
        /// Sender's user id. Empty when the server omitted it.
        sender_id: String,
        /// Message content. Falls back to the raw frame text when absent.
        content: String,
    },
}

impl InboundFrame {
    /// Decode one inbound text frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Decode` if the text is not a JSON object. The
    ///   session drops such frames without surfacing anything.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let wire: WireInbound = serde_json::from_str(text)?;

        let frame = match wire.kind.as_deref() {
            Some("self_id") => Self::SelfId { id: wire.content.unwrap_or_default() },
            Some("error") => Self::ErrorAck,
            Some("delivery_status") => Self::DeliveryStatus,
            // No recognized system tag: a user message. Content falls back
            // to the raw text so nothing readable is lost.
            _ => Self::Message {
                sender_id: wire.sender_id.unwrap_or_default(),
                content: wire.content.unwrap_or_else(|| text.to_string()),
            },
        };

        Ok(frame)
    }
}

/// An outbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// A user message addressed to one recipient.
    Message {
        /// Recipient's user id.
        recipient_id: String,
        /// Message content.
        content: String,
    },

    /// Keep-alive ping, sent periodically while the link is open.
    Ping,
}

impl OutboundFrame {
    /// Encode the frame as one JSON text payload.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Message { recipient_id, content } => serde_json::json!({
                "recipient_id": recipient_id,
                "content": content,
            })
            .to_string(),
            Self::Ping => serde_json::json!({ "type": "ping" }).to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn decode_self_id() {
        let frame = InboundFrame::decode(r#"{"type":"self_id","content":"u42"}"#).unwrap();
        assert_eq!(frame, InboundFrame::SelfId { id: "u42".to_string() });
    }

    #[test]
    fn decode_system_acks() {
        assert_eq!(InboundFrame::decode(r#"{"type":"error"}"#).unwrap(), InboundFrame::ErrorAck);
        assert_eq!(
            InboundFrame::decode(r#"{"type":"delivery_status"}"#).unwrap(),
            InboundFrame::DeliveryStatus
        );
    }

    #[test]
    fn decode_user_message() {
        let frame = InboundFrame::decode(r#"{"sender_id":"w2","content":"Hi"}"#).unwrap();
        assert_eq!(
            frame,
            InboundFrame::Message { sender_id: "w2".to_string(), content: "Hi".to_string() }
        );
    }

    #[test]
    fn unknown_type_is_a_user_message() {
        let frame = InboundFrame::decode(r#"{"type":"presence","sender_id":"w9"}"#).unwrap();
        assert!(matches!(frame, InboundFrame::Message { ref sender_id, .. } if sender_id == "w9"));
    }

    #[test]
    fn missing_content_falls_back_to_raw_text() {
        let raw = r#"{"sender_id":"w2"}"#;
        let frame = InboundFrame::decode(raw).unwrap();
        assert_eq!(
            frame,
            InboundFrame::Message { sender_id: "w2".to_string(), content: raw.to_string() }
        );
    }

    #[test]
    fn non_json_is_a_decode_error() {
        assert!(InboundFrame::decode("not json").is_err());
    }

    #[test]
    fn non_object_is_a_decode_error() {
        assert!(InboundFrame::decode("42").is_err());
        assert!(InboundFrame::decode(r#"["a","b"]"#).is_err());
    }

    #[test]
    fn encode_message() {
        let frame = OutboundFrame::Message {
            recipient_id: "w1".to_string(),
            content: "Halo".to_string(),
        };
        let value: serde_json::Value = serde_json::from_str(&frame.encode()).unwrap();
        assert_eq!(value["recipient_id"], "w1");
        assert_eq!(value["content"], "Halo");
    }

    #[test]
    fn encode_ping() {
        let value: serde_json::Value = serde_json::from_str(&OutboundFrame::Ping.encode()).unwrap();
        assert_eq!(value["type"], "ping");
    }
}
