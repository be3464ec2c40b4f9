//! Chat client state machine.
//!
//! `ChatClient` is the top-level state machine for one private-chat
//! session. It composes the connection lifecycle ([`Session`]) with frame
//! classification and the append-only [`MessageLog`].

use obrol_core::{
    env::Environment, MessageLog, Session, SessionAction, SessionConfig, SessionEvent,
    SessionState,
};
use obrol_proto::{InboundFrame, OutboundFrame};

use crate::event::{ClientAction, ClientEvent};

/// Client identity.
///
/// The locally configured user id. The server may additionally assign a
/// session identity via a `self_id` frame; both are kept, and the
/// server-assigned one wins for classification when present.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    /// Stable user id configured by the application.
    pub user_id: String,
}

impl ClientIdentity {
    /// Create a new client identity with the given user id.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into() }
    }
}

/// Chat client for one session against an Obrol server.
pub struct ChatClient<E: Environment> {
    /// Environment for timestamps.
    env: E,

    /// Client identity.
    identity: ClientIdentity,

    /// Connection lifecycle machine.
    session: Session<E::Instant>,

    /// Append-only message record.
    log: MessageLog,

    /// Server-assigned session identity, if one has arrived.
    self_id: Option<String>,
}

impl<E: Environment> ChatClient<E> {
    /// Create a new client with the given identity and session config.
    pub fn new(env: E, identity: ClientIdentity, config: SessionConfig) -> Self {
        Self {
            env,
            identity,
            session: Session::new(config),
            log: MessageLog::new(),
            self_id: None,
        }
    }

    /// Configured user id.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }

    /// Server-assigned session id, if the server has sent one.
    #[must_use]
    pub fn self_id(&self) -> Option<&str> {
        self.self_id.as_deref()
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Borrow the message log.
    #[must_use]
    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// Borrow the underlying session machine.
    #[must_use]
    pub fn session(&self) -> &Session<E::Instant> {
        &self.session
    }

    /// Process an event and return resulting actions.
    pub fn handle(&mut self, event: ClientEvent<E::Instant>) -> Vec<ClientAction> {
        match event {
            ClientEvent::Connect => self.forward(SessionEvent::ConnectRequested),
            ClientEvent::TransportOpened { now } => self.forward(SessionEvent::Opened { now }),
            ClientEvent::TransportClosed { code, now } => {
                self.forward(SessionEvent::Closed { code, now })
            },
            ClientEvent::TransportFailed => self.forward(SessionEvent::TransportError),
            ClientEvent::Tick { now } => self.forward(SessionEvent::Tick { now }),
            ClientEvent::VisibilityChanged { visible } => {
                self.forward(SessionEvent::VisibilityChanged { visible })
            },
            ClientEvent::ReconnectNow => self.forward(SessionEvent::ReconnectNow),
            ClientEvent::Shutdown => self.forward(SessionEvent::Shutdown),
            ClientEvent::SendMessage { recipient_id, content } => {
                self.handle_send(&recipient_id, &content)
            },
            ClientEvent::FrameReceived(text) => self.handle_frame(&text),
        }
    }

    /// Run a session event and lift its actions into client actions.
    fn forward(&mut self, event: SessionEvent<E::Instant>) -> Vec<ClientAction> {
        self.session
            .handle(event)
            .into_iter()
            .map(|action| match action {
                SessionAction::Dial { url } => ClientAction::Dial { url },
                SessionAction::SendFrame(text) => ClientAction::Send(text),
                SessionAction::CloseTransport { code } => ClientAction::Close { code },
            })
            .collect()
    }

    /// Outbound send with the full guard: open state, non-empty recipient,
    /// non-blank content. Rejections are silent no-ops.
    fn handle_send(&mut self, recipient_id: &str, content: &str) -> Vec<ClientAction> {
        let content = content.trim();
        if recipient_id.is_empty() || content.is_empty() || !self.session.is_open() {
            return vec![];
        }

        let frame = OutboundFrame::Message {
            recipient_id: recipient_id.to_string(),
            content: content.to_string(),
        };

        // Optimistic local append: no server ack required to display it.
        self.log.push_sent(content, self.env.unix_millis());

        vec![
            ClientAction::Send(frame.encode()),
            ClientAction::RecordContact {
                owner_id: self.identity.user_id.clone(),
                peer_id: recipient_id.to_string(),
            },
        ]
    }

    /// Classify an inbound frame: protocol frames update internal state
    /// and never reach the log; everything else is a user message.
    /// Undecodable text is dropped.
    fn handle_frame(&mut self, text: &str) -> Vec<ClientAction> {
        let Ok(frame) = InboundFrame::decode(text) else {
            return vec![];
        };

        match frame {
            InboundFrame::SelfId { id } => {
                if !id.is_empty() {
                    self.self_id = Some(id);
                }
                vec![]
            },
            InboundFrame::ErrorAck | InboundFrame::DeliveryStatus => vec![],
            InboundFrame::Message { sender_id, content } => {
                self.log.push_recv(&sender_id, &content, self.env.unix_millis());
                if !sender_id.is_empty() && sender_id != self.local_id() {
                    // Keyed by the configured id even when the server
                    // assigned a session id: the directory reads the
                    // store under the configured one.
                    vec![ClientAction::RecordContact {
                        owner_id: self.identity.user_id.clone(),
                        peer_id: sender_id,
                    }]
                } else {
                    vec![]
                }
            },
        }
    }

    /// Effective local id: the server-assigned one when present, the
    /// configured one otherwise.
    fn local_id(&self) -> &str {
        self.self_id.as_deref().unwrap_or(&self.identity.user_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use obrol_core::env::test_utils::MockEnv;
    use obrol_core::Direction;
    use obrol_proto::CLOSE_NORMAL;

    use super::*;

    fn config() -> SessionConfig {
        SessionConfig {
            url: Some("wss://chat.example.com/ws".to_string()),
            token: Some("tok".to_string()),
            ..SessionConfig::default()
        }
    }

    fn client() -> ChatClient<MockEnv> {
        ChatClient::new(MockEnv::new(), ClientIdentity::new("me-1"), config())
    }

    fn open_client() -> ChatClient<MockEnv> {
        let mut client = client();
        let actions = client.handle(ClientEvent::Connect);
        assert!(matches!(actions.as_slice(), [ClientAction::Dial { .. }]));
        client.handle(ClientEvent::TransportOpened { now: client.env.now() });
        assert_eq!(client.state(), SessionState::Open);
        client
    }

    #[test]
    fn send_while_open_emits_frame_log_entry_and_contact() {
        let mut client = open_client();

        let actions = client.handle(ClientEvent::SendMessage {
            recipient_id: "u7".to_string(),
            content: "hello".to_string(),
        });

        match actions.as_slice() {
            [ClientAction::Send(frame), ClientAction::RecordContact { owner_id, peer_id }] => {
                assert!(frame.contains("\"recipient_id\":\"u7\""));
                assert!(frame.contains("\"content\":\"hello\""));
                assert_eq!(owner_id, "me-1");
                assert_eq!(peer_id, "u7");
            },
            other => panic!("unexpected actions: {other:?}"),
        }

        let entries = client.log().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, Direction::Sent);
        assert_eq!(entries[0].text, "me: hello");
    }

    #[test]
    fn send_trims_surrounding_whitespace() {
        let mut client = open_client();
        let actions = client.handle(ClientEvent::SendMessage {
            recipient_id: "u7".to_string(),
            content: "  hi there  ".to_string(),
        });

        match actions.first() {
            Some(ClientAction::Send(frame)) => assert!(frame.contains("\"content\":\"hi there\"")),
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn send_is_rejected_when_not_open() {
        let mut client = client();
        let actions = client.handle(ClientEvent::SendMessage {
            recipient_id: "u7".to_string(),
            content: "hello".to_string(),
        });
        assert!(actions.is_empty());
        assert!(client.log().is_empty());

        // Also rejected after the link drops.
        let mut client = open_client();
        let now = client.env.now();
        client.handle(ClientEvent::TransportClosed { code: CLOSE_NORMAL, now });
        let actions = client.handle(ClientEvent::SendMessage {
            recipient_id: "u7".to_string(),
            content: "hello".to_string(),
        });
        assert!(actions.is_empty());
        assert!(client.log().is_empty());
    }

    #[test]
    fn send_is_rejected_for_blank_content_or_missing_recipient() {
        let mut client = open_client();

        for (recipient, content) in [("u7", ""), ("u7", "   "), ("", "hello")] {
            let actions = client.handle(ClientEvent::SendMessage {
                recipient_id: recipient.to_string(),
                content: content.to_string(),
            });
            assert!(actions.is_empty(), "({recipient:?}, {content:?}) should be rejected");
        }
        assert!(client.log().is_empty());
    }

    #[test]
    fn self_id_frame_assigns_identity_without_logging() {
        let mut client = open_client();

        let actions = client
            .handle(ClientEvent::FrameReceived(r#"{"type":"self_id","content":"u42"}"#.to_string()));
        assert!(actions.is_empty());
        assert_eq!(client.self_id(), Some("u42"));
        assert!(client.log().is_empty());
    }

    #[test]
    fn ack_frames_are_suppressed() {
        let mut client = open_client();

        for text in [r#"{"type":"error"}"#, r#"{"type":"delivery_status"}"#] {
            let actions = client.handle(ClientEvent::FrameReceived(text.to_string()));
            assert!(actions.is_empty());
        }
        assert!(client.log().is_empty());
    }

    #[test]
    fn user_message_is_logged_and_sender_recorded() {
        let mut client = open_client();

        let actions = client.handle(ClientEvent::FrameReceived(
            r#"{"sender_id":"u7","content":"hey"}"#.to_string(),
        ));
        assert_eq!(
            actions,
            vec![ClientAction::RecordContact {
                owner_id: "me-1".to_string(),
                peer_id: "u7".to_string(),
            }]
        );

        let entries = client.log().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, Direction::Recv);
        assert_eq!(entries[0].text, "u7: hey");
    }

    #[test]
    fn own_echoed_message_is_logged_but_not_recorded_as_contact() {
        let mut client = open_client();
        client.handle(ClientEvent::FrameReceived(r#"{"type":"self_id","content":"u42"}"#.to_string()));

        let actions = client.handle(ClientEvent::FrameReceived(
            r#"{"sender_id":"u42","content":"echo"}"#.to_string(),
        ));
        assert!(actions.is_empty());
        assert_eq!(client.log().len(), 1);
    }

    #[test]
    fn contact_records_stay_keyed_by_configured_id_after_self_id() {
        let mut client = open_client();
        // Server assigns a session id that differs from the configured one.
        client.handle(ClientEvent::FrameReceived(r#"{"type":"self_id","content":"u42"}"#.to_string()));

        let sent = client.handle(ClientEvent::SendMessage {
            recipient_id: "u7".to_string(),
            content: "hello".to_string(),
        });
        match sent.as_slice() {
            [ClientAction::Send(_), ClientAction::RecordContact { owner_id, .. }] => {
                assert_eq!(owner_id, "me-1");
            },
            other => panic!("unexpected actions: {other:?}"),
        }

        let received = client.handle(ClientEvent::FrameReceived(
            r#"{"sender_id":"u9","content":"hey"}"#.to_string(),
        ));
        assert_eq!(
            received,
            vec![ClientAction::RecordContact {
                owner_id: "me-1".to_string(),
                peer_id: "u9".to_string(),
            }]
        );
    }

    #[test]
    fn undecodable_frame_is_dropped() {
        let mut client = open_client();
        let actions = client.handle(ClientEvent::FrameReceived("not json at all".to_string()));
        assert!(actions.is_empty());
        assert!(client.log().is_empty());
    }

    #[test]
    fn log_preserves_interleaved_order() {
        let mut client = open_client();

        client.handle(ClientEvent::SendMessage {
            recipient_id: "u7".to_string(),
            content: "first".to_string(),
        });
        client.handle(ClientEvent::FrameReceived(
            r#"{"sender_id":"u7","content":"second"}"#.to_string(),
        ));
        client.handle(ClientEvent::SendMessage {
            recipient_id: "u7".to_string(),
            content: "third".to_string(),
        });

        let texts: Vec<&str> = client.log().entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["me: first", "u7: second", "me: third"]);
    }
}
