use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::kpi::GLOSSARY;
use crate::ui::centered;

pub fn render(f: &mut Frame, area: Rect) {
    let popup = centered(area, 80, GLOSSARY.len() as u16 + 4);
    f.render_widget(Clear, popup);

    let mut lines: Vec<Line> = GLOSSARY
        .iter()
        .map(|(term, definition)| {
            Line::from(vec![
                Span::styled(
                    format!("{term}: "),
                    Style::default()
                        .fg(ratatui::style::Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(*definition),
            ])
        })
        .collect();
    lines.push(Line::raw(""));
    lines.push(Line::styled(
        "g/esc: close",
        Style::default().fg(ratatui::style::Color::DarkGray),
    ));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ratatui::style::Color::Yellow))
                .title(" KPI Glossary "),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, popup);
}
