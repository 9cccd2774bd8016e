pub mod area_chart;
pub mod detail_panel;
pub mod epic_list;
pub mod footer;
pub mod glossary;
pub mod kpi_banner;
pub mod settings;
pub mod sidebar;
pub mod theme;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};

use crate::app::{App, Focus};

pub fn render(f: &mut Frame, app: &App) {
    let size = f.area();

    // Split: main content + footer
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(1)])
        .split(size);

    // Sidebar (30) + dashboard
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(40)])
        .split(vertical[0]);

    sidebar::render(f, horizontal[0], app);

    // KPI banner, epic list, then detail + chart
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9),
            Constraint::Fill(2),
            Constraint::Fill(3),
        ])
        .split(horizontal[1]);

    let lower = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(main[2]);

    kpi_banner::render(f, main[0], app);
    epic_list::render(f, main[1], app);
    detail_panel::render(f, lower[0], app);
    area_chart::render(f, lower[1], app);

    footer::render(f, vertical[1], app);

    if app.focus == Focus::Settings {
        settings::render(f, size, app);
    } else if app.show_glossary {
        glossary::render(f, size);
    }
}

/// A `percent_x` wide, `height` tall box in the middle of `area`.
pub fn centered(area: Rect, percent_x: u16, height: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(height),
            Constraint::Fill(1),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

/// Short labels for area paths: the last segment, lengthened with parent
/// segments until no two labels are the same.
pub fn area_labels<'a>(paths: &[&'a str]) -> Vec<&'a str> {
    let mut depth = vec![1usize; paths.len()];
    loop {
        let labels: Vec<&'a str> = paths
            .iter()
            .copied()
            .zip(&depth)
            .map(|(path, &d)| path_suffix(path, d))
            .collect();

        let mut grew = false;
        for (i, path) in paths.iter().enumerate() {
            let clash = labels
                .iter()
                .enumerate()
                .any(|(j, label)| j != i && *label == labels[i]);
            if clash && labels[i] != *path {
                depth[i] += 1;
                grew = true;
            }
        }
        if !grew {
            return labels;
        }
    }
}

/// The last `segments` parts of a `\`-separated path, or all of it.
fn path_suffix(path: &str, segments: usize) -> &str {
    path.rmatch_indices('\\')
        .nth(segments.saturating_sub(1))
        .map_or(path, |(i, _)| &path[i + 1..])
}
