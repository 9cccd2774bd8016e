use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::app::{App, Focus};
use crate::kpi::with_commas;
use crate::ui::area_labels;
use crate::ui::theme::ACCENT;

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(3)])
        .split(area);

    render_connection(f, parts[0], app);
    render_areas(f, parts[1], app);
}

fn render_connection(f: &mut Frame, area: Rect, app: &App) {
    let label = Style::default().fg(ratatui::style::Color::Gray);
    let pat = if app.connected() { "********" } else { "(not set)" };
    let lines = vec![
        Line::from(vec![Span::styled("Org: ", label), Span::raw(app.org_url.as_str())]),
        Line::from(vec![Span::styled("Project: ", label), Span::raw(app.project.as_str())]),
        Line::from(vec![Span::styled("PAT: ", label), Span::raw(pat)]),
        Line::from(Span::styled(
            "e: edit",
            Style::default().fg(ratatui::style::Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(ratatui::style::Color::DarkGray))
            .title(" Configuration "),
    );
    f.render_widget(paragraph, area);
}

fn render_areas(f: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::Areas;
    let options = app.area_options();
    let names: Vec<&str> = options.iter().map(|(name, _)| *name).collect();
    let labels = area_labels(&names);

    let items: Vec<ListItem> = options
        .iter()
        .zip(labels)
        .enumerate()
        .map(|(i, (&(name, count), label))| {
            let active = match &app.area_filter {
                None => i == 0,
                Some(filter) => filter == name,
            };
            let marker = if active { "● " } else { "  " };
            let mut style = Style::default();
            if focused && i == app.area_cursor {
                style = style.fg(ACCENT).add_modifier(Modifier::BOLD);
            }
            // Area paths are long; keep the count visible.
            let max = area.width.saturating_sub(12) as usize;
            let label: String = label.chars().take(max).collect();
            ListItem::new(Line::from(vec![
                Span::raw(marker),
                Span::styled(label, style),
                Span::styled(
                    format!(" ({})", with_commas(count)),
                    Style::default().fg(ratatui::style::Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let border = if focused {
        ACCENT
    } else {
        ratatui::style::Color::DarkGray
    };
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(" Area Path "),
    );

    let mut state = ListState::default();
    state.select(Some(app.area_cursor));
    f.render_stateful_widget(list, area, &mut state);
}
