use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::kpi::{is_final, UNASSIGNED, UNSPECIFIED_AREA};
use crate::model::work_item::WorkItemRecord;
use crate::ui::kpi_banner::kpi_lines;
use crate::ui::theme::{state_color, type_color};

const CHILD_ROWS: usize = 6;

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ratatui::style::Color::Cyan))
        .title(" Details ");

    let Some(epic) = app.selected_epic_record() else {
        f.render_widget(block, area);
        return;
    };

    let mut lines = header_lines(app, epic);

    lines.push(Line::raw(""));
    if app.detail_loading {
        lines.push(Line::styled(
            "Loading hierarchy...",
            Style::default().fg(ratatui::style::Color::Yellow),
        ));
    } else {
        match app.detail.as_ref().filter(|d| d.epic_id == epic.id) {
            Some(detail) => {
                lines.extend(kpi_lines(&detail.kpis));
                lines.push(Line::raw(""));
                lines.extend(child_lines(app, &detail.children));
            }
            None => lines.push(Line::styled(
                "enter: load hierarchy and KPIs",
                Style::default().fg(ratatui::style::Color::DarkGray),
            )),
        }
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn label(text: &str) -> Span<'_> {
    Span::styled(text, Style::default().fg(ratatui::style::Color::Gray))
}

fn header_lines<'a>(app: &App, epic: &'a WorkItemRecord) -> Vec<Line<'a>> {
    vec![
        Line::from(vec![
            Span::styled(
                format!("#{} ", epic.id),
                Style::default().fg(ratatui::style::Color::DarkGray),
            ),
            Span::styled(epic.title(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(vec![
            label("State: "),
            Span::styled(epic.state(), Style::default().fg(state_color(epic.state()))),
            label("  Owner: "),
            Span::raw(epic.assigned_to().unwrap_or(UNASSIGNED)),
        ]),
        Line::from(vec![
            label("Area: "),
            Span::raw(epic.area_path().unwrap_or(UNSPECIFIED_AREA)),
        ]),
        Line::from(vec![
            label("URL: "),
            Span::styled(
                app.edit_url(epic.id),
                Style::default().fg(ratatui::style::Color::Blue),
            ),
        ]),
    ]
}

fn child_lines<'a>(app: &App, children: &'a [WorkItemRecord]) -> Vec<Line<'a>> {
    let (active, inactive): (Vec<&WorkItemRecord>, Vec<&WorkItemRecord>) =
        children.iter().partition(|c| !is_final(c.state()));

    let mut lines = Vec::new();
    for (heading, group) in [("Active", active), ("Inactive", inactive)] {
        lines.push(Line::styled(
            format!("{heading} ({})", group.len()),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        if group.is_empty() {
            lines.push(Line::styled(
                "  None",
                Style::default().fg(ratatui::style::Color::DarkGray),
            ));
        }
        for &child in group.iter().take(CHILD_ROWS) {
            lines.extend(child_row(app, child));
        }
        if group.len() > CHILD_ROWS {
            lines.push(Line::styled(
                format!("  ... {} more", group.len() - CHILD_ROWS),
                Style::default().fg(ratatui::style::Color::DarkGray),
            ));
        }
    }
    lines
}

/// Title line, then type, owner, last update and the edit link.
fn child_row<'a>(app: &App, child: &'a WorkItemRecord) -> [Line<'a>; 2] {
    let kind = child.work_item_type();
    let updated = child
        .changed_date()
        .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d %H:%M").to_string());
    [
        Line::from(vec![
            Span::styled(
                format!("  {:>7} ", child.id.0),
                Style::default().fg(type_color(kind)),
            ),
            Span::raw(child.title()),
            Span::styled(
                format!(" [{}]", child.state()),
                Style::default().fg(state_color(child.state())),
            ),
        ]),
        Line::from(vec![
            Span::styled(format!("          {kind}"), Style::default().fg(type_color(kind))),
            Span::styled(
                format!("  {}  {updated}  ", child.assigned_to().unwrap_or(UNASSIGNED)),
                Style::default().fg(ratatui::style::Color::Gray),
            ),
            Span::styled(
                app.edit_url(child.id),
                Style::default().fg(ratatui::style::Color::Blue),
            ),
        ]),
    ]
}
