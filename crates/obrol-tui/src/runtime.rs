//! Async runtime
//!
//! Event loop that drives terminal I/O and coordinates between the App
//! state machine, the Sans-IO chat client, the contact directory, and the
//! WebSocket transport. Uses `tokio::select!` to handle terminal events,
//! transport events, background task completions, and ticks concurrently;
//! dials and directory loads run as detached tasks so slow I/O never
//! stalls the loop.

use std::{
    io::{self, stdout},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use crossterm::{
    event::{DisableFocusChange, EnableFocusChange, Event, EventStream, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use futures::StreamExt;
use obrol_client::{
    transport::{self, ConnectedTransport, TransportCommand, TransportError, TransportEvent},
    ChatClient, ClientAction, ClientEvent, ClientIdentity,
};
use obrol_core::{
    env::{Environment, SystemEnv},
    SessionConfig,
};
use obrol_directory::{
    rest::RestRosterApi, Directory, JsonFileStore, Profile, QueryDebouncer, RecencyStore, Role,
};
use obrol_proto::CLOSE_ABNORMAL;
use ratatui::{backend::CrosstermBackend, Terminal};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{
    app::{App, AppAction, AppEvent},
    ui,
};

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Everything the runtime needs to start a session.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// WebSocket endpoint URL.
    pub url: String,
    /// Authentication token.
    pub token: String,
    /// Local user id.
    pub user_id: String,
    /// Marketplace role, selecting the directory strategy.
    pub role: Role,
    /// REST API base URL for roster lookups.
    pub api_base: String,
    /// Path of the persisted recency list file.
    pub store_path: PathBuf,
}

/// One loop iteration's worth of input, extracted under a short borrow so
/// the handlers below can take `&mut self` freely.
enum LoopEvent {
    Terminal(Event),
    TerminalClosed,
    Transport(TransportEvent),
    Job(JobOutcome),
    Tick,
}

/// Completion of a background task spawned off the select loop. Slow
/// handshakes and roster fetches run detached so they never stall
/// keystrokes, inbound frames, or heartbeat ticks.
enum JobOutcome {
    /// A dial attempt finished. `seq` identifies which dial; outcomes
    /// from superseded dials are discarded.
    DialDone {
        seq: u64,
        result: Result<ConnectedTransport, TransportError>,
    },
    /// A directory load finished (`None` when superseded mid-flight).
    ContactsLoaded(Option<Vec<Profile>>),
}

/// Async runtime for the TUI.
///
/// Manages terminal setup/teardown and the main event loop.
pub struct Runtime {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    env: SystemEnv,
    app: App,
    client: ChatClient<SystemEnv>,
    directory: Arc<Directory>,
    store: Arc<dyn RecencyStore>,
    debouncer: QueryDebouncer<std::time::Instant>,
    connection: Option<ConnectedTransport>,
    jobs_tx: mpsc::UnboundedSender<JobOutcome>,
    jobs_rx: mpsc::UnboundedReceiver<JobOutcome>,
    /// Identifies the most recent dial; completions of older dials are
    /// stale and get dropped.
    dial_seq: u64,
}

impl Runtime {
    /// Create a new runtime and take over the terminal.
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        // Without this, terminals never report focus transitions and the
        // backgrounded-reconnect suspension would be unreachable.
        stdout().execute(EnableFocusChange)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;

        let env = SystemEnv;
        let client = ChatClient::new(
            env,
            ClientIdentity::new(config.user_id.clone()),
            SessionConfig {
                url: Some(config.url),
                token: Some(config.token.clone()),
                ..SessionConfig::default()
            },
        );

        let store: Arc<dyn RecencyStore> = Arc::new(JsonFileStore::new(config.store_path));
        let api = Arc::new(RestRosterApi::new(config.api_base, config.token));
        let directory =
            Arc::new(Directory::new(api, Arc::clone(&store), config.role, config.user_id));

        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();

        Ok(Self {
            terminal,
            env,
            app: App::new(),
            client,
            directory,
            store,
            debouncer: QueryDebouncer::default(),
            connection: None,
            jobs_tx,
            jobs_rx,
            dial_seq: 0,
        })
    }

    /// Run the main event loop until quit or terminal loss.
    pub async fn run(mut self) -> Result<(), RuntimeError> {
        let result = self.event_loop().await;

        // Always hand the terminal back, even on error.
        stdout().execute(DisableFocusChange)?;
        disable_raw_mode()?;
        stdout().execute(LeaveAlternateScreen)?;
        result
    }

    async fn event_loop(&mut self) -> Result<(), RuntimeError> {
        self.render()?;
        self.drive_client(ClientEvent::Connect).await;
        // Seed an initial directory load through the normal debounce path.
        self.debouncer.input("", self.env.now());

        let mut event_stream = EventStream::new();
        let mut tick_interval = tokio::time::interval(Duration::from_millis(100));

        loop {
            let loop_event = {
                let connection = &mut self.connection;
                let jobs_rx = &mut self.jobs_rx;
                let transport_recv = async {
                    match connection.as_mut() {
                        Some(conn) => conn.from_server.recv().await,
                        None => std::future::pending().await,
                    }
                };

                tokio::select! {
                    maybe_event = event_stream.next() => match maybe_event {
                        Some(Ok(event)) => LoopEvent::Terminal(event),
                        Some(Err(e)) => return Err(RuntimeError::Io(e)),
                        None => LoopEvent::TerminalClosed,
                    },
                    maybe_transport = transport_recv => match maybe_transport {
                        Some(event) => LoopEvent::Transport(event),
                        // Socket task ended without a close frame.
                        None => LoopEvent::Transport(TransportEvent::Closed {
                            code: CLOSE_ABNORMAL,
                        }),
                    },
                    maybe_job = jobs_rx.recv() => match maybe_job {
                        Some(job) => LoopEvent::Job(job),
                        // The runtime holds a sender, so this cannot close.
                        None => continue,
                    },
                    _ = tick_interval.tick() => LoopEvent::Tick,
                }
            };

            let should_quit = match loop_event {
                LoopEvent::Terminal(event) => self.handle_terminal_event(event).await?,
                LoopEvent::TerminalClosed => true,
                LoopEvent::Transport(event) => {
                    self.handle_transport_event(event).await;
                    false
                },
                LoopEvent::Job(job) => {
                    self.handle_job(job).await?;
                    false
                },
                LoopEvent::Tick => self.handle_tick().await?,
            };

            if should_quit {
                self.drive_client(ClientEvent::Shutdown).await;
                return Ok(());
            }
        }
    }

    /// Handle a terminal event and return whether to quit.
    async fn handle_terminal_event(&mut self, event: Event) -> Result<bool, RuntimeError> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let actions = self.app.handle(AppEvent::Key(key.code, key.modifiers));
                self.process_app_actions(actions).await
            },
            Event::Resize(cols, rows) => {
                let actions = self.app.handle(AppEvent::Resize(cols, rows));
                self.process_app_actions(actions).await
            },
            // Terminal focus maps onto the client's visibility suspension.
            Event::FocusLost => {
                self.drive_client(ClientEvent::VisibilityChanged { visible: false }).await;
                Ok(false)
            },
            Event::FocusGained => {
                self.drive_client(ClientEvent::VisibilityChanged { visible: true }).await;
                Ok(false)
            },
            _ => Ok(false),
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Text(text) => {
                self.drive_client(ClientEvent::FrameReceived(text)).await;
            },
            TransportEvent::Closed { code } => {
                self.connection = None;
                self.drive_client(ClientEvent::TransportClosed { code, now: self.env.now() })
                    .await;
            },
            TransportEvent::Failed(reason) => {
                tracing::warn!(reason, "transport failure");
                self.drive_client(ClientEvent::TransportFailed).await;
            },
        }
    }

    /// Periodic tick: client housekeeping plus debounced directory loads.
    ///
    /// Loads run detached; completions come back through the jobs
    /// channel, so a slow backend never blocks the loop.
    async fn handle_tick(&mut self) -> Result<bool, RuntimeError> {
        let now = self.env.now();
        self.drive_client(ClientEvent::Tick { now }).await;

        if let Some(query) = self.debouncer.poll(now) {
            self.app.handle(AppEvent::DirectoryLoading(true));
            self.render()?;

            let directory = Arc::clone(&self.directory);
            let jobs_tx = self.jobs_tx.clone();
            tokio::spawn(async move {
                let outcome = directory.load(&query).await;
                let _ = jobs_tx.send(JobOutcome::ContactsLoaded(outcome));
            });
        }

        Ok(false)
    }

    /// Handle a background task completion.
    async fn handle_job(&mut self, job: JobOutcome) -> Result<(), RuntimeError> {
        match job {
            JobOutcome::DialDone { seq, result } => {
                if seq != self.dial_seq {
                    // A newer dial superseded this one. Dropping a stale
                    // successful connection aborts its socket task.
                    return Ok(());
                }
                match result {
                    Ok(conn) => {
                        self.connection = Some(conn);
                        self.drive_client(ClientEvent::TransportOpened { now: self.env.now() })
                            .await;
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "dial failed");
                        self.drive_client(ClientEvent::TransportFailed).await;
                        self.drive_client(ClientEvent::TransportClosed {
                            code: CLOSE_ABNORMAL,
                            now: self.env.now(),
                        })
                        .await;
                    },
                }
            },
            JobOutcome::ContactsLoaded(outcome) => {
                match outcome {
                    Some(contacts) => {
                        self.app.handle(AppEvent::ContactsLoaded(contacts));
                    },
                    // Superseded by a newer load; its result will arrive.
                    None => {
                        self.app.handle(AppEvent::DirectoryLoading(false));
                    },
                }
                self.render()?;
            },
        }
        Ok(())
    }

    /// Process actions returned by the app. Returns true if should quit.
    async fn process_app_actions(
        &mut self,
        actions: Vec<AppAction>,
    ) -> Result<bool, RuntimeError> {
        for action in actions {
            match action {
                AppAction::Render => self.render()?,
                AppAction::Quit => return Ok(true),
                AppAction::Send { recipient_id, content } => {
                    self.drive_client(ClientEvent::SendMessage { recipient_id, content }).await;
                },
                AppAction::Reconnect => {
                    self.connection = None;
                    self.drive_client(ClientEvent::ReconnectNow).await;
                },
                AppAction::QueryInput(query) => {
                    self.debouncer.input(query, self.env.now());
                },
            }
        }
        Ok(false)
    }

    /// Feed one event into the client machine and execute all resulting
    /// actions. Dials run detached; their outcomes come back through the
    /// jobs channel.
    async fn drive_client(&mut self, event: ClientEvent) {
        for action in self.client.handle(event) {
            match action {
                ClientAction::Dial { url } => {
                    self.dial_seq += 1;
                    let seq = self.dial_seq;
                    let jobs_tx = self.jobs_tx.clone();
                    tokio::spawn(async move {
                        let result = transport::connect(&url).await;
                        let _ = jobs_tx.send(JobOutcome::DialDone { seq, result });
                    });
                },
                ClientAction::Send(text) => {
                    if let Some(conn) = &self.connection {
                        let _ = conn.to_server.send(TransportCommand::Text(text)).await;
                    }
                },
                ClientAction::Close { code } => {
                    if let Some(conn) = &self.connection {
                        let _ = conn.to_server.send(TransportCommand::Close(code)).await;
                    }
                },
                ClientAction::RecordContact { owner_id, peer_id } => {
                    self.store.push(&owner_id, &peer_id);
                    // A worker's sidebar is recency-driven, so refresh.
                    self.debouncer.input(self.app.query().to_string(), self.env.now());
                },
            }
        }

        self.sync_client_state();
    }

    /// Mirror client state into the app after any client interaction.
    fn sync_client_state(&mut self) {
        let mut actions = self.app.handle(AppEvent::ConnectionChanged(self.client.state()));
        if self.app.log().len() != self.client.log().len() {
            actions.extend(self.app.handle(AppEvent::LogChanged(self.client.log().entries().to_vec())));
        }
        if !actions.is_empty() {
            if let Err(e) = self.render() {
                tracing::warn!(error = %e, "render failed");
            }
        }
    }

    fn render(&mut self) -> Result<(), RuntimeError> {
        self.terminal.draw(|frame| ui::render(frame, &self.app))?;
        Ok(())
    }
}
