//! Status bar
//!
//! Displays the connection banner and key hints.

use obrol_core::SessionState;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::App;

/// Render the status bar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let connection_status = match app.connection() {
        SessionState::Closed => Span::styled("Disconnected", Style::default().fg(Color::Red)),
        SessionState::Connecting => {
            Span::styled("Connecting...", Style::default().fg(Color::Yellow))
        },
        SessionState::Open => Span::styled(
            "Connected",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        SessionState::Error => Span::styled("Error", Style::default().fg(Color::Red)),
    };

    let hints = match app.connection() {
        SessionState::Open | SessionState::Connecting => {
            " | Tab: switch pane | Ctrl+Q: quit".to_string()
        },
        SessionState::Closed | SessionState::Error => {
            " | Ctrl+R: reconnect | Tab: switch pane | Ctrl+Q: quit".to_string()
        },
    };

    let status_line = Line::from(vec![
        Span::raw(" "),
        connection_status,
        Span::styled(hints, Style::default().fg(Color::Gray)),
    ]);

    let paragraph =
        Paragraph::new(status_line).style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(paragraph, area);
}
