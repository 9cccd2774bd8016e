use ratatui::{
    layout::{Direction, Rect},
    style::Style,
    text::Line,
    widgets::{Bar, BarChart, BarGroup, Block, Borders},
    Frame,
};

use crate::app::App;
use crate::ui::area_labels;
use crate::ui::theme::{SILVER, STEELBLUE};

/// Open epics per area, the active filter drawn in steel blue.
pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let label_width = area.width.saturating_sub(14) as usize;
    let names: Vec<&str> = app.area_counts.iter().map(|(name, _)| name.as_str()).collect();
    let labels = area_labels(&names);
    let bars: Vec<Bar> = app
        .area_counts
        .iter()
        .zip(labels)
        .map(|((name, count), label)| {
            let color = if app.area_filter.as_deref() == Some(name.as_str()) {
                STEELBLUE
            } else {
                SILVER
            };
            let label: String = label.chars().take(label_width).collect();
            Bar::default()
                .value(*count as u64)
                .label(Line::from(label))
                .style(Style::default().fg(color))
                .value_style(Style::default().fg(ratatui::style::Color::Black).bg(color))
        })
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ratatui::style::Color::DarkGray))
                .title(" Epics by Area "),
        )
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .data(BarGroup::default().bars(&bars));

    f.render_widget(chart, area);
}
