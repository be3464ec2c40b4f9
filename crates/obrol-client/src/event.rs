//! Client events and actions.

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Receiving text frames from the network
/// - Driving time forward via ticks
/// - Forwarding application intents (connect, send message, etc.)
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and simulation environments.
#[derive(Debug, Clone)]
pub enum ClientEvent<I = std::time::Instant> {
    /// Application wants to connect.
    Connect,

    /// Text frame received from the server.
    FrameReceived(String),

    /// The transport finished its handshake.
    TransportOpened {
        /// Current time from the environment.
        now: I,
    },

    /// The transport closed.
    TransportClosed {
        /// WebSocket close code.
        code: u16,
        /// Current time from the environment.
        now: I,
    },

    /// The transport hit a socket-level error.
    TransportFailed,

    /// Application wants to send a message.
    ///
    /// Dropped silently unless the connection is open, the recipient is
    /// set, and the content is non-blank.
    SendMessage {
        /// Target peer.
        recipient_id: String,
        /// Message text.
        content: String,
    },

    /// Time tick for retry and heartbeat processing.
    ///
    /// The caller should send ticks periodically to allow the client to
    /// fire due reconnects and keep-alives.
    Tick {
        /// Current time from the environment.
        now: I,
    },

    /// The hosting view was backgrounded or foregrounded.
    VisibilityChanged {
        /// Whether the view is now visible.
        visible: bool,
    },

    /// Manual reconnect, bypassing backoff and the attempt cap.
    ReconnectNow,

    /// Session teardown. Idempotent.
    Shutdown,
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Open a transport connection to this URL.
    Dial {
        /// Fully resolved endpoint URL (token attached).
        url: String,
    },

    /// Send this text frame over the live transport.
    Send(String),

    /// Close the live transport with this code.
    Close {
        /// WebSocket close code.
        code: u16,
    },

    /// Record a conversation with this peer in the recency store.
    RecordContact {
        /// Store key: the configured user id, the same key the
        /// directory reads the recency list under.
        owner_id: String,
        /// Peer the local user just messaged.
        peer_id: String,
    },
}
