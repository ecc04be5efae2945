use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

fn key(keys: &'static str, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{keys:<12}"), Style::default().fg(Color::Magenta)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame, poll_every: &str) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        key("q / Ctrl-C", "Quit"),
        key("space", "Start or stop the automation"),
        key("r", "Refresh status, stats and history now"),
        key("m", "Ask the service to simulate one application"),
        key("tab", "Switch tabs"),
        key("?", "Show this help"),
        Line::from(""),
        Line::from("Settings tab:"),
        key("up/down j/k", "Select a field"),
        key("enter", "Edit the selected text field (enter again to apply, esc to cancel)"),
        key("alt-enter", "New line while editing"),
        key("space", "Flip the selected on/off field"),
        key("s", "Save all settings"),
        key("u", "Discard unsaved edits"),
        Line::from(""),
        Line::from("Applications tab:"),
        key("up/down j/k", "Navigate"),
        key("e", "Export history as CSV"),
        key("y", "Copy exported path to clipboard"),
        Line::from(""),
        Line::from(vec![
            Span::styled("While the service runs the dashboard refreshes every ", Style::default().fg(Color::Gray)),
            Span::styled(poll_every.to_string(), Style::default().fg(Color::Cyan)),
            Span::styled(".", Style::default().fg(Color::Gray)),
        ]),
    ])
    .wrap(Wrap { trim: false })
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
