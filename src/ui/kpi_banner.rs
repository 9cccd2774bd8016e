use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, ALL_AREAS};
use crate::kpi::{with_commas, Kpis};
use crate::ui::theme::type_color;

/// KPIs over the descendants of every epic in the selected area.
pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let title = match (&app.area_kpis, app.area_loading) {
        (_, true) => " KPIs (loading...) ".to_string(),
        (Some(banner), false) => format!(
            " KPIs: {} ({} epics) ",
            banner.area.as_deref().unwrap_or(ALL_AREAS),
            with_commas(banner.epics)
        ),
        (None, false) => " KPIs ".to_string(),
    };

    let lines = match &app.area_kpis {
        Some(banner) => kpi_lines(&banner.kpis),
        None => vec![Line::styled(
            "No KPIs yet: load epics with r",
            Style::default().fg(ratatui::style::Color::DarkGray),
        )],
    };

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ratatui::style::Color::DarkGray))
                .title(title),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn label(text: &str) -> Span<'_> {
    Span::styled(text, Style::default().fg(ratatui::style::Color::Gray))
}

pub fn kpi_lines(kpis: &Kpis) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(vec![
            label("Items: "),
            Span::raw(format!(
                "{} total, {} open, {} closed ({:.1}% complete)",
                with_commas(kpis.total),
                with_commas(kpis.open),
                with_commas(kpis.closed),
                kpis.pct_complete
            )),
        ]),
        Line::from(vec![
            label("Last 7 days: "),
            Span::raw(format!(
                "{} new, {} closed",
                with_commas(kpis.new_7d),
                with_commas(kpis.closed_7d)
            )),
        ]),
        Line::from(vec![
            label("Cycle time: "),
            Span::raw(format!("{:.1}d avg", kpis.avg_cycle_days)),
            label("  Age: "),
            Span::raw(format!(
                "{:.1}d avg, {}d max",
                kpis.avg_age_days, kpis.max_age_days
            )),
        ]),
    ];

    if !kpis.type_breakdown.is_empty() {
        let mut spans = vec![label("Types: ")];
        for (i, (kind, n)) in kpis.type_breakdown.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(", "));
            }
            spans.push(Span::styled(
                format!("{kind}: {}", with_commas(*n)),
                Style::default().fg(type_color(kind)),
            ));
        }
        lines.push(Line::from(spans));
    }

    if !kpis.top_assignees.is_empty() {
        let owners = kpis
            .top_assignees
            .iter()
            .map(|(name, n)| format!("{name} ({})", with_commas(*n)))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(Line::from(vec![label("Top owners: "), Span::raw(owners)]));
    }

    lines.push(Line::from(vec![
        label("Last sync: "),
        Span::raw(format!("{}", kpis.last_sync.format("%Y-%m-%d %H:%M UTC"))),
    ]));
    lines
}
