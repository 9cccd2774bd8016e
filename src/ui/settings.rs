use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::{App, SettingsField};
use crate::ui::centered;

/// Connection form drawn over the dashboard. The PAT is never shown in clear.
pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let popup = centered(area, 70, 9);
    f.render_widget(Clear, popup);

    let form = &app.settings;
    let mut lines = Vec::new();
    let mut cursor = None;

    for (row, field) in SettingsField::ALL.into_iter().enumerate() {
        let active = form.active == Some(field);
        let value = match field {
            SettingsField::Pat => "*".repeat(form.value(field).chars().count()),
            _ => form.value(field).to_string(),
        };
        let label = format!("{:<22}", field.label());
        let label_style = if active {
            Style::default()
                .fg(ratatui::style::Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(ratatui::style::Color::Gray)
        };
        if active {
            let x = popup.x + 1 + label.chars().count() as u16 + value.chars().count() as u16;
            let y = popup.y + 1 + row as u16 * 2;
            cursor = Some((x.min(popup.x + popup.width.saturating_sub(2)), y));
        }
        lines.push(Line::from(vec![
            Span::styled(label, label_style),
            Span::raw(value),
        ]));
        lines.push(Line::raw(""));
    }
    lines.push(Line::styled(
        "tab: next field  enter: connect  esc: cancel",
        Style::default().fg(ratatui::style::Color::DarkGray),
    ));

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(ratatui::style::Color::Yellow))
            .title(" Azure DevOps Connection "),
    );
    f.render_widget(paragraph, popup);

    if let Some(position) = cursor {
        f.set_cursor_position(position);
    }
}
