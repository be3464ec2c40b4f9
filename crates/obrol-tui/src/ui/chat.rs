//! Chat area
//!
//! Displays the message log for the active conversation.

use obrol_core::Direction;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use crate::App;

const BORDER_SIZE: u16 = 2;

/// Render the chat area.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let title = app
        .recipient()
        .map_or_else(
            || " No conversation ".to_string(),
            |r| format!(" {} ", if r.name.is_empty() { &r.id } else { &r.name }),
        );

    let block = Block::default().borders(Borders::ALL).title(title);

    let items: Vec<ListItem> = if app.log().is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "Select a contact to start chatting",
            Style::default().fg(Color::DarkGray),
        )))]
    } else {
        app.log()
            .iter()
            .map(|entry| {
                let color = match entry.kind {
                    Direction::Sent => Color::Cyan,
                    Direction::Recv => Color::Green,
                };
                let (who, _) = entry.text.split_once(": ").unwrap_or(("?", ""));
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{who}:"),
                        Style::default().fg(color).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(" "),
                    Span::raw(entry.content.clone()),
                ]))
            })
            .collect()
    };

    let visible_height = area.height.saturating_sub(BORDER_SIZE) as usize;
    let skip = items.len().saturating_sub(visible_height);
    let visible_items: Vec<_> = items.into_iter().skip(skip).collect();

    let list = List::new(visible_items).block(block);

    frame.render_widget(list, area);
}
