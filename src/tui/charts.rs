use crate::model::DailyCount;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph},
    Frame,
};

/// Bordered card with a title and one large value.
pub fn stat_card(f: &mut Frame, area: Rect, title: &str, value: String, color: Color) {
    let p = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            value,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(p, area);
}

/// Per-day application counts as a bar chart, most recent days that fit.
pub fn daily_chart(f: &mut Frame, area: Rect, daily: &[DailyCount]) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Applications per day");
    if daily.is_empty() {
        let p = Paragraph::new(Line::from(Span::styled(
            "No daily data yet",
            Style::default().fg(Color::DarkGray),
        )))
        .alignment(Alignment::Center)
        .block(block);
        f.render_widget(p, area);
        return;
    }

    // Labels are MM-DD, so bars need at least five columns plus a gap.
    let bar_width: u16 = 5;
    let inner_width = area.width.saturating_sub(2) as usize;
    let fits = (inner_width / (bar_width as usize + 1)).max(1);
    let shown = &daily[daily.len().saturating_sub(fits)..];
    let max = shown.iter().map(|d| d.count).max().unwrap_or(0).max(1);

    let bars: Vec<Bar> = shown
        .iter()
        .map(|d| {
            Bar::default()
                .value(d.count)
                .label(Line::from(short_day(&d.day)))
                .style(Style::default().fg(Color::Cyan))
                .value_style(Style::default().fg(Color::Black).bg(Color::Cyan))
        })
        .collect();

    let chart = BarChart::default()
        .block(block.title(format!("max {max}")))
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(1)
        .max(max);
    f.render_widget(chart, area);
}

/// `2024-05-01` becomes `05-01`; anything else is shown as is.
fn short_day(day: &str) -> String {
    match day.get(5..10) {
        Some(tail) if day.len() >= 10 && day.as_bytes()[4] == b'-' => tail.to_string(),
        _ => day.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_day_trims_the_year() {
        assert_eq!(short_day("2024-05-01"), "05-01");
        assert_eq!(short_day("Mon"), "Mon");
    }
}
