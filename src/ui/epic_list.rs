use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

use crate::app::{App, Focus};
use crate::kpi::UNASSIGNED;
use crate::ui::theme::{state_color, ACCENT};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::Epics;
    let epics = app.visible_epics();

    let items: Vec<ListItem> = epics
        .iter()
        .enumerate()
        .map(|(i, epic)| {
            let selected = focused && i == app.selected_epic;

            let id_span = Span::styled(
                format!("{:>7} ", epic.id.0),
                Style::default().fg(ratatui::style::Color::DarkGray),
            );

            // Truncate title to fit
            let max_title = area.width.saturating_sub(40) as usize;
            let title: String = epic.title().chars().take(max_title).collect();
            let title_style = if selected {
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let state = epic.state();
            let owner = epic.assigned_to().unwrap_or(UNASSIGNED);

            ListItem::new(Line::from(vec![
                id_span,
                Span::styled(title, title_style),
                Span::styled(format!(" [{state}]"), Style::default().fg(state_color(state))),
                Span::styled(
                    format!(" {owner}"),
                    Style::default().fg(ratatui::style::Color::Gray),
                ),
            ]))
        })
        .collect();

    let title = if app.loading {
        " Open Epics (loading...) ".to_string()
    } else {
        let scope = app.area_filter.as_deref().unwrap_or("all areas");
        format!(" Open Epics: {} in {scope} ", epics.len())
    };

    let border = if focused {
        ACCENT
    } else {
        ratatui::style::Color::DarkGray
    };
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title),
    );

    let mut state = ListState::default();
    if !epics.is_empty() {
        state.select(Some(app.selected_epic));
    }
    f.render_stateful_widget(list, area, &mut state);
}
