//! Contact sidebar
//!
//! Displays the directory list with the search query in the title.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use crate::{App, Focus};

/// Render the contact sidebar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let title = if app.query().is_empty() {
        " Contacts ".to_string()
    } else {
        format!(" /{} ", app.query())
    };

    let border_style = if app.focus() == Focus::Contacts {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let block = Block::default().borders(Borders::ALL).title(title).border_style(border_style);

    let items: Vec<ListItem> = if app.is_loading() {
        vec![ListItem::new(Line::from(Span::styled(
            "Loading...",
            Style::default().fg(Color::DarkGray),
        )))]
    } else if app.contacts().is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "No contacts",
            Style::default().fg(Color::DarkGray),
        )))]
    } else {
        app.contacts()
            .iter()
            .enumerate()
            .map(|(i, profile)| {
                let label = if profile.name.is_empty() { &profile.id } else { &profile.name };
                let mut style = Style::default();
                if i == app.selected() {
                    style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
                }
                if app.recipient().is_some_and(|r| r.id == profile.id) {
                    style = style.fg(Color::Green);
                }
                ListItem::new(Line::from(Span::styled(label.clone(), style)))
            })
            .collect()
    };

    let list = List::new(items).block(block);
    frame.render_widget(list, area);
}
