//! Connection lifecycle state machine.
//!
//! Owns the single transport handle for one chat session: dial guard,
//! reconnect policy, heartbeat scheduling, and visibility suspension. Uses
//! the action pattern: methods take time as event input and return actions
//! for the driver to execute, so the machine itself never touches a
//! socket or a timer.
//!
//! # State machine
//!
//! ```text
//!            ConnectRequested          Opened
//! ┌────────┐ ───────────────> ┌────────────┐ ──────> ┌──────┐
//! │ Closed │                  │ Connecting │         │ Open │
//! └────────┘ <─────────────── └────────────┘ <────── └──────┘
//!      ^          Closed                      Closed     │
//!      │                                                 │ TransportError
//!      │                  Closed              ┌───────┐  │
//!      └───────────────────────────────────── │ Error │ <┘
//!                                             └───────┘
//! ```
//!
//! A close schedules a retry deadline (linear backoff, capped attempts)
//! unless the close code is terminal, attempts are exhausted, or the
//! configuration is invalid. While the page is hidden, deadlines are
//! deferred to the visibility-restoration path.

use std::time::Duration;

use obrol_proto::{is_terminal, OutboundFrame, CLOSE_NORMAL};
use url::Url;

use crate::error::ConfigError;

/// Keep-alive interval while the link is open.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Backoff step: the delay before attempt `n` is `n` × this step.
pub const DEFAULT_RETRY_STEP: Duration = Duration::from_secs(1);

/// Automatic reconnect attempts before giving up until a manual reconnect.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Connection state as surfaced to the UI.
///
/// Owned exclusively by the [`Session`]; mutated only through its event
/// handlers. Only `Open` permits sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// A dial is in flight.
    Connecting,
    /// The link is open and sendable.
    Open,
    /// No link (initial state, or the transport closed).
    Closed,
    /// Configuration or transport failure.
    Error,
}

/// Session configuration.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Endpoint URL. Must parse as an absolute `ws(s)://` URL.
    pub url: Option<String>,
    /// Authentication token, attached as a query parameter when dialing.
    pub token: Option<String>,
    /// Keep-alive interval.
    pub heartbeat_interval: Option<Duration>,
    /// Backoff step.
    pub retry_step: Option<Duration>,
    /// Maximum automatic reconnect attempts.
    pub max_retries: Option<u32>,
}

/// Events the driver feeds into the session.
#[derive(Debug, Clone)]
pub enum SessionEvent<I> {
    /// The application asked to connect.
    ConnectRequested,
    /// The transport reported an open link.
    Opened {
        /// Current time (anchors the heartbeat).
        now: I,
    },
    /// The transport closed.
    Closed {
        /// WebSocket close code.
        code: u16,
        /// Current time (anchors the retry deadline).
        now: I,
    },
    /// The transport reported a socket-level error.
    ///
    /// Sets the state only; the subsequent close event drives retry
    /// policy.
    TransportError,
    /// Periodic maintenance tick.
    Tick {
        /// Current time.
        now: I,
    },
    /// The hosting page was backgrounded or foregrounded.
    VisibilityChanged {
        /// Whether the page is now visible.
        visible: bool,
    },
    /// Manual reconnect: bypasses backoff and the attempt cap.
    ReconnectNow,
    /// Session teardown. Idempotent.
    Shutdown,
}

/// Actions the session produces for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Open a transport connection to this URL (token already attached).
    Dial {
        /// Fully resolved endpoint URL.
        url: String,
    },
    /// Send this text frame over the live transport.
    SendFrame(String),
    /// Close the live transport with this code.
    CloseTransport {
        /// WebSocket close code.
        code: u16,
    },
}

/// Connection lifecycle state machine.
///
/// Generic over `I` (instant type) so tests can drive a virtual clock.
#[derive(Debug, Clone)]
pub struct Session<I> {
    config: SessionConfig,
    state: SessionState,
    /// Dial in flight. Guards against duplicate sockets under rapid
    /// connect/reconnect (single-connection invariant).
    dialing: bool,
    /// A live transport handle exists.
    live: bool,
    /// Automatic reconnects are disabled until a manual connect. Starts
    /// true: a fresh session does nothing until asked to connect.
    halted: bool,
    /// Completed-or-scheduled attempt counter. Reset on open.
    attempts: u32,
    /// Pending retry deadline.
    retry_at: Option<I>,
    /// The hosting page is visible.
    visible: bool,
    /// A retry was due while hidden; fires on visibility restoration.
    deferred_retry: bool,
    /// Last heartbeat send (or link open) time.
    last_heartbeat: Option<I>,
    /// Last configuration failure, for the UI banner.
    config_error: Option<ConfigError>,
}

impl<I> Session<I>
where
    I: Copy + Ord + std::ops::Add<Duration, Output = I>,
{
    /// Create a new session in the `Closed` state.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Closed,
            dialing: false,
            live: false,
            halted: true,
            attempts: 0,
            retry_at: None,
            visible: true,
            deferred_retry: false,
            last_heartbeat: None,
            config_error: None,
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether sending is currently permitted.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// Whether a live transport handle exists.
    #[must_use]
    pub fn has_live_handle(&self) -> bool {
        self.live
    }

    /// Whether a dial is currently in flight.
    #[must_use]
    pub fn is_dialing(&self) -> bool {
        self.dialing
    }

    /// Number of automatic reconnect attempts made since the last open.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Pending retry deadline, if one is scheduled.
    #[must_use]
    pub fn retry_deadline(&self) -> Option<I> {
        self.retry_at
    }

    /// Last configuration failure, if the session is in config error.
    #[must_use]
    pub fn config_error(&self) -> Option<&ConfigError> {
        self.config_error.as_ref()
    }

    /// Process an event and return resulting actions.
    pub fn handle(&mut self, event: SessionEvent<I>) -> Vec<SessionAction> {
        match event {
            SessionEvent::ConnectRequested => {
                self.halted = false;
                self.try_dial()
            },
            SessionEvent::Opened { now } => self.handle_opened(now),
            SessionEvent::Closed { code, now } => self.handle_closed(code, now),
            SessionEvent::TransportError => {
                self.set_state(SessionState::Error);
                vec![]
            },
            SessionEvent::Tick { now } => self.handle_tick(now),
            SessionEvent::VisibilityChanged { visible } => self.handle_visibility(visible),
            SessionEvent::ReconnectNow => self.handle_reconnect_now(),
            SessionEvent::Shutdown => self.handle_shutdown(),
        }
    }

    /// Resolve the dial URL: absolute `ws(s)://` endpoint with the token
    /// attached as a query parameter.
    fn endpoint(&self) -> Result<String, ConfigError> {
        let token = match self.config.token.as_deref() {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Err(ConfigError::MissingToken),
        };
        let raw = match self.config.url.as_deref() {
            Some(u) if !u.trim().is_empty() => u,
            _ => return Err(ConfigError::MissingUrl),
        };

        let mut url =
            Url::parse(raw).map_err(|e| ConfigError::InvalidUrl { reason: e.to_string() })?;

        match url.scheme() {
            "ws" | "wss" => {},
            other => {
                return Err(ConfigError::UnsupportedScheme { scheme: other.to_string() });
            },
        }

        url.query_pairs_mut().append_pair("token", token);
        Ok(url.to_string())
    }

    /// Attempt a dial, honoring the in-flight guard.
    fn try_dial(&mut self) -> Vec<SessionAction> {
        if self.dialing || self.live {
            return vec![];
        }

        match self.endpoint() {
            Ok(url) => {
                self.dialing = true;
                self.config_error = None;
                self.set_state(SessionState::Connecting);
                vec![SessionAction::Dial { url }]
            },
            Err(err) => {
                // Fatal for this session: redialing the same broken
                // endpoint cannot succeed.
                self.halted = true;
                self.retry_at = None;
                self.config_error = Some(err);
                self.set_state(SessionState::Error);
                vec![]
            },
        }
    }

    fn handle_opened(&mut self, now: I) -> Vec<SessionAction> {
        self.dialing = false;
        self.live = true;
        self.attempts = 0;
        self.retry_at = None;
        self.deferred_retry = false;
        self.last_heartbeat = Some(now);
        self.set_state(SessionState::Open);
        vec![]
    }

    fn handle_closed(&mut self, code: u16, now: I) -> Vec<SessionAction> {
        self.dialing = false;
        self.live = false;
        self.last_heartbeat = None;
        self.set_state(SessionState::Closed);

        if self.halted || is_terminal(code) || self.endpoint().is_err() {
            // Terminal close codes and broken config short-circuit retry,
            // even on the first attempt. Recovery is manual only.
            self.halted = true;
            self.retry_at = None;
            return vec![];
        }

        let max = self.config.max_retries.unwrap_or(DEFAULT_MAX_RETRIES);
        if self.attempts >= max {
            self.halted = true;
            self.retry_at = None;
            return vec![];
        }

        self.attempts += 1;
        let step = self.config.retry_step.unwrap_or(DEFAULT_RETRY_STEP);
        let delay = step * self.attempts;

        if self.visible {
            self.retry_at = Some(now + delay);
        } else {
            // Backgrounded: defer to the visibility-restoration handler
            // instead of burning attempts on a suspended page.
            self.deferred_retry = true;
        }

        vec![]
    }

    fn handle_tick(&mut self, now: I) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        if let Some(at) = self.retry_at {
            if now >= at && self.visible && !self.dialing && !self.live {
                self.retry_at = None;
                actions.extend(self.try_dial());
            }
        }

        if self.state == SessionState::Open {
            let interval = self.config.heartbeat_interval.unwrap_or(DEFAULT_HEARTBEAT_INTERVAL);
            if let Some(last) = self.last_heartbeat {
                if now >= last + interval {
                    actions.push(SessionAction::SendFrame(OutboundFrame::Ping.encode()));
                    self.last_heartbeat = Some(now);
                }
            }
        }

        actions
    }

    fn handle_visibility(&mut self, visible: bool) -> Vec<SessionAction> {
        self.visible = visible;
        if !visible {
            return vec![];
        }

        // Foregrounded: any deferred or pending retry collapses into an
        // immediate attempt when no live handle exists.
        let resume = self.deferred_retry || self.retry_at.is_some();
        self.deferred_retry = false;
        self.retry_at = None;

        if resume && !self.live && !self.dialing && !self.halted {
            return self.try_dial();
        }
        vec![]
    }

    fn handle_reconnect_now(&mut self) -> Vec<SessionAction> {
        self.retry_at = None;
        self.deferred_retry = false;
        self.halted = false;
        self.attempts = 0;

        let mut actions = Vec::new();
        if self.live || self.dialing {
            actions.push(SessionAction::CloseTransport { code: CLOSE_NORMAL });
            self.live = false;
            self.dialing = false;
        }
        actions.extend(self.try_dial());
        actions
    }

    fn handle_shutdown(&mut self) -> Vec<SessionAction> {
        self.retry_at = None;
        self.deferred_retry = false;
        self.halted = true;
        self.dialing = false;

        let mut actions = Vec::new();
        if self.live {
            actions.push(SessionAction::CloseTransport { code: CLOSE_NORMAL });
            self.live = false;
        }
        self.last_heartbeat = None;
        self.set_state(SessionState::Closed);
        actions
    }

    /// Debounced state setter: a repeat transition to the current state is
    /// a no-op so dependent effects never re-trigger.
    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            self.state = state;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::{Duration, Instant};

    use obrol_proto::{CLOSE_ABNORMAL, CLOSE_INTERNAL_ERROR, CLOSE_NORMAL, CLOSE_POLICY_VIOLATION};

    use super::*;

    fn config() -> SessionConfig {
        SessionConfig {
            url: Some("wss://chat.example.com/ws".to_string()),
            token: Some("tok".to_string()),
            ..SessionConfig::default()
        }
    }

    fn dialed() -> Session<Instant> {
        let mut session = Session::new(config());
        let actions = session.handle(SessionEvent::ConnectRequested);
        assert!(matches!(actions.as_slice(), [SessionAction::Dial { .. }]));
        session
    }

    fn opened(now: Instant) -> Session<Instant> {
        let mut session = dialed();
        let actions = session.handle(SessionEvent::Opened { now });
        assert!(actions.is_empty());
        assert_eq!(session.state(), SessionState::Open);
        session
    }

    #[test]
    fn connect_attaches_token_as_query_parameter() {
        let mut session: Session<Instant> = Session::new(config());
        let actions = session.handle(SessionEvent::ConnectRequested);

        match actions.as_slice() {
            [SessionAction::Dial { url }] => {
                assert!(url.starts_with("wss://chat.example.com/ws"));
                assert!(url.contains("token=tok"));
            },
            other => panic!("expected Dial, got {other:?}"),
        }
        assert_eq!(session.state(), SessionState::Connecting);
    }

    #[test]
    fn connect_is_idempotent_while_dialing() {
        let now = Instant::now();
        let mut session = dialed();

        // Second request while the first dial is in flight: no-op.
        assert!(session.handle(SessionEvent::ConnectRequested).is_empty());
        // And while open.
        session.handle(SessionEvent::Opened { now });
        assert!(session.handle(SessionEvent::ConnectRequested).is_empty());
    }

    #[test]
    fn missing_token_is_fatal() {
        let mut session: Session<Instant> = Session::new(SessionConfig {
            url: Some("wss://chat.example.com/ws".to_string()),
            token: None,
            ..SessionConfig::default()
        });

        let actions = session.handle(SessionEvent::ConnectRequested);
        assert!(actions.is_empty());
        assert_eq!(session.state(), SessionState::Error);
        assert_eq!(session.config_error(), Some(&ConfigError::MissingToken));
    }

    #[test]
    fn relative_url_is_fatal() {
        let mut session: Session<Instant> = Session::new(SessionConfig {
            url: Some("/chat/ws".to_string()),
            token: Some("tok".to_string()),
            ..SessionConfig::default()
        });

        let actions = session.handle(SessionEvent::ConnectRequested);
        assert!(actions.is_empty());
        assert_eq!(session.state(), SessionState::Error);
        assert!(matches!(session.config_error(), Some(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn http_scheme_is_fatal() {
        let mut session: Session<Instant> = Session::new(SessionConfig {
            url: Some("https://chat.example.com/ws".to_string()),
            token: Some("tok".to_string()),
            ..SessionConfig::default()
        });

        session.handle(SessionEvent::ConnectRequested);
        assert!(matches!(session.config_error(), Some(ConfigError::UnsupportedScheme { .. })));
    }

    #[test]
    fn open_resets_the_attempt_counter() {
        let now = Instant::now();
        let mut session = dialed();
        session.handle(SessionEvent::Closed { code: CLOSE_NORMAL, now });
        assert_eq!(session.attempts(), 1);

        session.handle(SessionEvent::Tick { now: now + Duration::from_secs(1) });
        session.handle(SessionEvent::Opened { now: now + Duration::from_secs(1) });
        assert_eq!(session.attempts(), 0);
    }

    #[test]
    fn close_schedules_linear_backoff() {
        let now = Instant::now();
        let mut session = dialed();

        session.handle(SessionEvent::Closed { code: CLOSE_NORMAL, now });
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.retry_deadline(), Some(now + Duration::from_secs(1)));

        // Deadline not due yet: no dial.
        let actions = session.handle(SessionEvent::Tick { now: now + Duration::from_millis(500) });
        assert!(actions.is_empty());

        // Due: dial fires, second close schedules a 2s delay.
        let t1 = now + Duration::from_secs(1);
        let actions = session.handle(SessionEvent::Tick { now: t1 });
        assert!(matches!(actions.as_slice(), [SessionAction::Dial { .. }]));

        session.handle(SessionEvent::Closed { code: CLOSE_NORMAL, now: t1 });
        assert_eq!(session.retry_deadline(), Some(t1 + Duration::from_secs(2)));
    }

    #[test]
    fn retries_cap_at_five() {
        let mut now = Instant::now();
        let mut session = dialed();

        for attempt in 1..=5 {
            session.handle(SessionEvent::Closed { code: CLOSE_NORMAL, now });
            assert_eq!(session.attempts(), attempt);
            now = now + Duration::from_secs(u64::from(attempt));
            let actions = session.handle(SessionEvent::Tick { now });
            assert!(
                matches!(actions.as_slice(), [SessionAction::Dial { .. }]),
                "attempt {attempt} should redial"
            );
        }

        // Sixth close: permanently gives up.
        session.handle(SessionEvent::Closed { code: CLOSE_NORMAL, now });
        assert!(session.retry_deadline().is_none());
        let actions = session.handle(SessionEvent::Tick { now: now + Duration::from_secs(60) });
        assert!(actions.is_empty());
    }

    #[test]
    fn terminal_codes_never_schedule_a_retry() {
        for code in [CLOSE_ABNORMAL, CLOSE_POLICY_VIOLATION, CLOSE_INTERNAL_ERROR] {
            let now = Instant::now();
            let mut session = dialed();
            session.handle(SessionEvent::Closed { code, now });

            assert!(session.retry_deadline().is_none(), "code {code} scheduled a retry");
            let actions =
                session.handle(SessionEvent::Tick { now: now + Duration::from_secs(60) });
            assert!(actions.is_empty());
        }
    }

    #[test]
    fn transport_error_sets_state_without_scheduling() {
        let now = Instant::now();
        let mut session = opened(now);

        let actions = session.handle(SessionEvent::TransportError);
        assert!(actions.is_empty());
        assert_eq!(session.state(), SessionState::Error);
        assert!(session.retry_deadline().is_none());
    }

    #[test]
    fn heartbeat_fires_every_interval_while_open() {
        let now = Instant::now();
        let mut session = opened(now);

        // Not due yet.
        assert!(session.handle(SessionEvent::Tick { now: now + Duration::from_secs(29) }).is_empty());

        // Due at 30s.
        let actions = session.handle(SessionEvent::Tick { now: now + Duration::from_secs(30) });
        match actions.as_slice() {
            [SessionAction::SendFrame(text)] => assert!(text.contains("ping")),
            other => panic!("expected heartbeat, got {other:?}"),
        }

        // Re-anchored: next at 60s, not 31s.
        assert!(session.handle(SessionEvent::Tick { now: now + Duration::from_secs(31) }).is_empty());
        let actions = session.handle(SessionEvent::Tick { now: now + Duration::from_secs(60) });
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn heartbeat_stops_when_the_link_drops() {
        let now = Instant::now();
        let mut session = opened(now);
        session.handle(SessionEvent::Closed { code: CLOSE_NORMAL, now });

        // Only the retry dial may fire, never a ping.
        let actions = session.handle(SessionEvent::Tick { now: now + Duration::from_secs(90) });
        assert!(!actions.iter().any(|a| matches!(a, SessionAction::SendFrame(_))));
    }

    #[test]
    fn hidden_page_defers_the_retry() {
        let now = Instant::now();
        let mut session = opened(now);
        session.handle(SessionEvent::VisibilityChanged { visible: false });
        session.handle(SessionEvent::Closed { code: CLOSE_NORMAL, now });

        // No deadline while hidden; ticks do nothing.
        assert!(session.retry_deadline().is_none());
        assert!(session.handle(SessionEvent::Tick { now: now + Duration::from_secs(60) }).is_empty());

        // Foregrounded: immediate dial.
        let actions = session.handle(SessionEvent::VisibilityChanged { visible: true });
        assert!(matches!(actions.as_slice(), [SessionAction::Dial { .. }]));
    }

    #[test]
    fn foregrounding_with_live_link_does_not_redial() {
        let now = Instant::now();
        let mut session = opened(now);
        session.handle(SessionEvent::VisibilityChanged { visible: false });
        let actions = session.handle(SessionEvent::VisibilityChanged { visible: true });
        assert!(actions.is_empty());
    }

    #[test]
    fn reconnect_now_bypasses_backoff_and_the_cap() {
        let now = Instant::now();
        let mut session = dialed();
        for _ in 0..6 {
            session.handle(SessionEvent::Closed { code: CLOSE_NORMAL, now });
        }
        // Exhausted: automatic recovery is off.
        assert!(session.handle(SessionEvent::Tick { now: now + Duration::from_secs(60) }).is_empty());

        let actions = session.handle(SessionEvent::ReconnectNow);
        assert!(matches!(actions.as_slice(), [SessionAction::Dial { .. }]));
        assert_eq!(session.attempts(), 0);
    }

    #[test]
    fn reconnect_now_force_closes_a_live_handle() {
        let now = Instant::now();
        let mut session = opened(now);

        let actions = session.handle(SessionEvent::ReconnectNow);
        assert!(matches!(
            actions.as_slice(),
            [
                SessionAction::CloseTransport { code: CLOSE_NORMAL },
                SessionAction::Dial { .. }
            ]
        ));
    }

    #[test]
    fn shutdown_is_idempotent() {
        let now = Instant::now();
        let mut session = opened(now);

        let first = session.handle(SessionEvent::Shutdown);
        assert!(matches!(first.as_slice(), [SessionAction::CloseTransport { code: CLOSE_NORMAL }]));
        assert_eq!(session.state(), SessionState::Closed);

        // Repeats emit nothing and leave no pending work.
        for _ in 0..3 {
            assert!(session.handle(SessionEvent::Shutdown).is_empty());
        }
        assert!(session.retry_deadline().is_none());
        assert!(session.handle(SessionEvent::Tick { now: now + Duration::from_secs(60) }).is_empty());
    }

    #[test]
    fn no_reconnect_after_shutdown_close_event() {
        let now = Instant::now();
        let mut session = opened(now);
        session.handle(SessionEvent::Shutdown);

        // The driver echoes the close back; it must not revive the session.
        session.handle(SessionEvent::Closed { code: CLOSE_NORMAL, now });
        assert!(session.retry_deadline().is_none());
        assert!(session.handle(SessionEvent::Tick { now: now + Duration::from_secs(60) }).is_empty());
    }
}
