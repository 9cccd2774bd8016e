use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::{App, Focus};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();

    match app.focus {
        _ if app.show_glossary && app.focus != Focus::Settings => {
            spans.push(hint("g/esc", "close glossary"));
            spans.push(hint("q", "quit"));
        }
        Focus::Areas => {
            spans.push(hint("↑↓", "navigate"));
            spans.push(hint("enter", "filter"));
            spans.push(hint("→", "epics"));
            spans.push(hint("r", "refresh"));
            spans.push(hint("e", "settings"));
            spans.push(hint("g", "glossary"));
            spans.push(hint("q", "quit"));
        }
        Focus::Epics => {
            spans.push(hint("↑↓", "navigate"));
            spans.push(hint("enter", "details"));
            spans.push(hint("esc", "close details"));
            spans.push(hint("←", "areas"));
            spans.push(hint("r", "refresh"));
            spans.push(hint("g", "glossary"));
            spans.push(hint("q", "quit"));
        }
        Focus::Settings => {
            spans.push(hint("tab", "next field"));
            spans.push(hint("enter", "connect"));
            spans.push(hint("esc", "cancel"));
        }
    }

    // Sync indicator
    spans.push(Span::raw("  "));
    if app.busy() {
        spans.push(Span::styled(
            " LOADING ",
            Style::default()
                .fg(ratatui::style::Color::Black)
                .bg(ratatui::style::Color::Yellow),
        ));
    } else if let Some(at) = app.last_sync {
        spans.push(Span::styled(
            format!(" synced {} UTC ", at.format("%H:%M:%S")),
            Style::default()
                .fg(ratatui::style::Color::Black)
                .bg(ratatui::style::Color::Green),
        ));
    } else {
        spans.push(Span::styled(
            " OFFLINE ",
            Style::default()
                .fg(ratatui::style::Color::Black)
                .bg(ratatui::style::Color::DarkGray),
        ));
    }

    // Flash message
    if let Some((msg, _)) = &app.flash_message {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            msg,
            Style::default().fg(ratatui::style::Color::Yellow),
        ));
    }

    let line = Line::from(spans);
    let paragraph = Paragraph::new(line);
    f.render_widget(paragraph, area);
}

fn hint(key: &str, desc: &str) -> Span<'static> {
    Span::styled(
        format!(" {key}:{desc} "),
        Style::default().fg(ratatui::style::Color::DarkGray),
    )
}
