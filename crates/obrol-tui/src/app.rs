//! UI state machine.
//!
//! Pure state machine that processes terminal and client events, producing
//! actions for the runtime to execute. Completely decoupled from I/O, so
//! key handling and selection logic are unit-testable.

use crossterm::event::{KeyCode, KeyModifiers};
use obrol_core::{LogEntry, SessionState};
use obrol_directory::Profile;

/// Which pane owns keystrokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Contact sidebar: navigation and search.
    Contacts,
    /// Message input line.
    Input,
}

/// Events the runtime feeds into the app.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Key press.
    Key(KeyCode, KeyModifiers),
    /// Terminal resize.
    Resize(u16, u16),
    /// Connection state changed.
    ConnectionChanged(SessionState),
    /// A directory load finished.
    ContactsLoaded(Vec<Profile>),
    /// A directory load started or finished.
    DirectoryLoading(bool),
    /// The message log changed.
    LogChanged(Vec<LogEntry>),
}

/// Actions the app produces for the runtime to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Redraw the screen.
    Render,
    /// Exit the application.
    Quit,
    /// Send a chat message.
    Send {
        /// Target peer.
        recipient_id: String,
        /// Message text.
        content: String,
    },
    /// Manual reconnect request.
    Reconnect,
    /// Raw search input changed (to be debounced by the runtime).
    QueryInput(String),
}

/// UI state machine.
#[derive(Debug, Clone)]
pub struct App {
    /// Connection state, for the status banner.
    connection: SessionState,
    /// Contacts currently shown in the sidebar.
    contacts: Vec<Profile>,
    /// Selected sidebar row.
    selected: usize,
    /// Chosen conversation partner.
    recipient: Option<Profile>,
    /// Raw search query typed into the sidebar.
    query: String,
    /// A directory load is in flight.
    loading: bool,
    /// Message log snapshot.
    log: Vec<LogEntry>,
    /// Input line buffer.
    input_buffer: String,
    /// Cursor position in the input buffer.
    input_cursor: usize,
    /// Pane that owns keystrokes.
    focus: Focus,
}

impl App {
    /// Create a new app with nothing loaded yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connection: SessionState::Closed,
            contacts: Vec::new(),
            selected: 0,
            recipient: None,
            query: String::new(),
            loading: false,
            log: Vec::new(),
            input_buffer: String::new(),
            input_cursor: 0,
            focus: Focus::Contacts,
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn connection(&self) -> SessionState {
        self.connection
    }

    /// Sidebar contacts.
    #[must_use]
    pub fn contacts(&self) -> &[Profile] {
        &self.contacts
    }

    /// Selected sidebar row.
    #[must_use]
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Chosen conversation partner.
    #[must_use]
    pub fn recipient(&self) -> Option<&Profile> {
        self.recipient.as_ref()
    }

    /// Raw search query.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Whether a directory load is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message log snapshot.
    #[must_use]
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// Input line buffer.
    #[must_use]
    pub fn input_buffer(&self) -> &str {
        &self.input_buffer
    }

    /// Cursor position in the input buffer.
    #[must_use]
    pub fn input_cursor(&self) -> usize {
        self.input_cursor
    }

    /// Pane that owns keystrokes.
    #[must_use]
    pub fn focus(&self) -> Focus {
        self.focus
    }

    /// Process an event and return actions for the runtime.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Key(code, modifiers) => self.handle_key(code, modifiers),
            AppEvent::Resize(_, _) => vec![AppAction::Render],
            AppEvent::ConnectionChanged(state) => {
                if self.connection == state {
                    return vec![];
                }
                self.connection = state;
                vec![AppAction::Render]
            },
            AppEvent::ContactsLoaded(contacts) => {
                self.contacts = contacts;
                self.loading = false;
                if self.selected >= self.contacts.len() {
                    self.selected = self.contacts.len().saturating_sub(1);
                }
                vec![AppAction::Render]
            },
            AppEvent::DirectoryLoading(loading) => {
                if self.loading == loading {
                    return vec![];
                }
                self.loading = loading;
                vec![AppAction::Render]
            },
            AppEvent::LogChanged(entries) => {
                self.log = entries;
                vec![AppAction::Render]
            },
        }
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Vec<AppAction> {
        if modifiers.contains(KeyModifiers::CONTROL) {
            return match code {
                KeyCode::Char('c' | 'q') => vec![AppAction::Quit],
                KeyCode::Char('r') => vec![AppAction::Reconnect],
                _ => vec![],
            };
        }

        match code {
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Contacts => Focus::Input,
                    Focus::Input => Focus::Contacts,
                };
                vec![AppAction::Render]
            },
            KeyCode::Esc => {
                self.focus = Focus::Contacts;
                vec![AppAction::Render]
            },
            _ => match self.focus {
                Focus::Contacts => self.handle_contacts_key(code),
                Focus::Input => self.handle_input_key(code),
            },
        }
    }

    fn handle_contacts_key(&mut self, code: KeyCode) -> Vec<AppAction> {
        match code {
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                vec![AppAction::Render]
            },
            KeyCode::Down => {
                if self.selected + 1 < self.contacts.len() {
                    self.selected += 1;
                }
                vec![AppAction::Render]
            },
            KeyCode::Enter => {
                if let Some(profile) = self.contacts.get(self.selected) {
                    self.recipient = Some(profile.clone());
                    self.focus = Focus::Input;
                }
                vec![AppAction::Render]
            },
            KeyCode::Char(c) => {
                self.query.push(c);
                vec![AppAction::QueryInput(self.query.clone()), AppAction::Render]
            },
            KeyCode::Backspace => {
                if self.query.pop().is_some() {
                    vec![AppAction::QueryInput(self.query.clone()), AppAction::Render]
                } else {
                    vec![]
                }
            },
            _ => vec![],
        }
    }

    fn handle_input_key(&mut self, code: KeyCode) -> Vec<AppAction> {
        match code {
            KeyCode::Char(c) => {
                self.input_buffer.insert(self.input_cursor, c);
                self.input_cursor += c.len_utf8();
                vec![AppAction::Render]
            },
            KeyCode::Backspace => {
                if self.input_cursor > 0 {
                    let prev = self.input_buffer[..self.input_cursor]
                        .chars()
                        .next_back()
                        .map_or(0, char::len_utf8);
                    self.input_cursor -= prev;
                    self.input_buffer.remove(self.input_cursor);
                }
                vec![AppAction::Render]
            },
            KeyCode::Left => {
                let prev = self.input_buffer[..self.input_cursor]
                    .chars()
                    .next_back()
                    .map_or(0, char::len_utf8);
                self.input_cursor = self.input_cursor.saturating_sub(prev);
                vec![AppAction::Render]
            },
            KeyCode::Right => {
                let next = self.input_buffer[self.input_cursor..]
                    .chars()
                    .next()
                    .map_or(0, char::len_utf8);
                self.input_cursor = (self.input_cursor + next).min(self.input_buffer.len());
                vec![AppAction::Render]
            },
            KeyCode::Enter => self.submit_input(),
            _ => vec![],
        }
    }

    /// Submit the input line. Mirrors the client's send guard so the
    /// buffer is only cleared when the send will be accepted.
    fn submit_input(&mut self) -> Vec<AppAction> {
        let content = self.input_buffer.trim().to_string();
        let Some(recipient) = &self.recipient else {
            return vec![];
        };
        if content.is_empty() || self.connection != SessionState::Open {
            return vec![];
        }

        let recipient_id = recipient.id.clone();
        self.input_buffer.clear();
        self.input_cursor = 0;
        vec![AppAction::Send { recipient_id, content }, AppAction::Render]
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
