mod charts;
mod export;
mod help;
mod state;

use crate::cli::Cli;
use crate::export::FileExporter;
use crate::model::{format_duration, FieldValue, SettingsField, SyncConfig};
use crate::orchestrator::{self, UiCommand, UiUpdate};
use crate::sync::Dashboard;
use crate::transport::HttpTransport;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{status_color, UiState, TAB_APPLICATIONS, TAB_COUNT, TAB_DASHBOARD, TAB_HELP, TAB_SETTINGS};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Rows the applications list scrolls by; the real height is only known while drawing.
const HISTORY_PAGE_ROWS: usize = 20;

pub async fn run(args: Cli, cfg: SyncConfig) -> Result<()> {
    let transport = HttpTransport::new(&cfg).context("failed to build HTTP client")?;
    let exporter = FileExporter::in_dir(args.export_dir());
    let dashboard = Dashboard::new(cfg.clone(), Arc::new(transport), Box::new(exporter));

    let (update_tx, update_rx) = mpsc::unbounded_channel::<UiUpdate>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let base_url = cfg.base_url.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(base_url, update_rx, cmd_tx));

    orchestrator::run_controller(dashboard, update_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }
    Ok(())
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    base_url: String,
    mut update_rx: UnboundedReceiver<UiUpdate>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState::new(base_url);
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let mut dirty = true;

    let res = loop {
        while let Ok(update) = update_rx.try_recv() {
            state.apply_update(update);
            dirty = true;
        }

        if dirty || last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
            dirty = false;
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                dirty = true;
                match handle_key(&mut state, k.modifiers, k.code) {
                    KeyOutcome::Nothing => {}
                    KeyOutcome::Send(cmd) => {
                        if cmd_tx.send(cmd).is_err() {
                            break Ok(());
                        }
                    }
                    KeyOutcome::Quit => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

#[derive(Debug)]
enum KeyOutcome {
    Nothing,
    Send(UiCommand),
    Quit,
}

fn handle_key(state: &mut UiState, modifiers: KeyModifiers, code: KeyCode) -> KeyOutcome {
    if state.editing.is_some() {
        return handle_edit_key(state, modifiers, code);
    }

    match (modifiers, code) {
        (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => KeyOutcome::Quit,
        (_, KeyCode::Tab) => {
            state.tab = (state.tab + 1) % TAB_COUNT;
            KeyOutcome::Nothing
        }
        (_, KeyCode::BackTab) => {
            state.tab = (state.tab + TAB_COUNT - 1) % TAB_COUNT;
            KeyOutcome::Nothing
        }
        (_, KeyCode::Char('?')) => {
            state.tab = TAB_HELP;
            KeyOutcome::Nothing
        }
        (_, KeyCode::Char(' ')) if state.tab == TAB_SETTINGS => {
            let field = state.selected_field();
            match field.get(&state.view.draft) {
                FieldValue::Flag(on) => KeyOutcome::Send(UiCommand::EditDraft(field, FieldValue::Flag(!on))),
                FieldValue::Text(_) => {
                    state.info = "Press enter to edit this field".into();
                    KeyOutcome::Nothing
                }
            }
        }
        (_, KeyCode::Char(' ')) => {
            state.info = if state.view.status.is_running() {
                "Stopping automation...".into()
            } else {
                "Starting automation...".into()
            };
            KeyOutcome::Send(UiCommand::ToggleRun)
        }
        (_, KeyCode::Enter) if state.tab == TAB_SETTINGS => {
            if let FieldValue::Text(current) = state.selected_field().get(&state.view.draft) {
                state.editing = Some(current);
            }
            KeyOutcome::Nothing
        }
        (_, KeyCode::Char('s')) => {
            state.info = "Saving settings...".into();
            KeyOutcome::Send(UiCommand::SaveDraft)
        }
        (_, KeyCode::Char('u')) if state.tab == TAB_SETTINGS => {
            state.info = "Unsaved edits discarded".into();
            KeyOutcome::Send(UiCommand::ResetDraft)
        }
        (_, KeyCode::Char('e')) => {
            state.info = "Exporting...".into();
            KeyOutcome::Send(UiCommand::Export)
        }
        (_, KeyCode::Char('y')) => {
            match state.last_exported_path.clone() {
                Some(path) => match export::copy_to_clipboard(&path) {
                    Ok(()) => {
                        state.info = format!("Copied to clipboard: {}", export::abbreviate(&path, 60));
                    }
                    Err(e) => state.info = format!("Clipboard copy failed: {e:#}"),
                },
                None => state.info = "No exported file path to copy. Export first (e)".into(),
            }
            KeyOutcome::Nothing
        }
        (_, KeyCode::Char('m')) => {
            state.info = "Simulated application requested".into();
            KeyOutcome::Send(UiCommand::Simulate)
        }
        (_, KeyCode::Char('r')) => {
            state.info = "Refreshing...".into();
            KeyOutcome::Send(UiCommand::Refresh)
        }
        (_, KeyCode::Up) | (_, KeyCode::Char('k')) => {
            match state.tab {
                TAB_SETTINGS => state.select_prev_field(),
                TAB_APPLICATIONS => state.select_prev_application(),
                _ => {}
            }
            KeyOutcome::Nothing
        }
        (_, KeyCode::Down) | (_, KeyCode::Char('j')) => {
            match state.tab {
                TAB_SETTINGS => state.select_next_field(),
                TAB_APPLICATIONS => state.select_next_application(HISTORY_PAGE_ROWS),
                _ => {}
            }
            KeyOutcome::Nothing
        }
        _ => KeyOutcome::Nothing,
    }
}

fn handle_edit_key(state: &mut UiState, modifiers: KeyModifiers, code: KeyCode) -> KeyOutcome {
    let field = state.selected_field();
    match (modifiers, code) {
        (_, KeyCode::Esc) => {
            state.editing = None;
            state.info = "Edit cancelled".into();
        }
        (KeyModifiers::ALT, KeyCode::Enter) => {
            if let Some(buffer) = state.editing.as_mut() {
                buffer.push('\n');
            }
        }
        (_, KeyCode::Enter) => {
            if let Some(value) = state.editing.take() {
                state.info = format!("{} updated (s to save)", field.label());
                return KeyOutcome::Send(UiCommand::EditDraft(field, FieldValue::Text(value)));
            }
        }
        (_, KeyCode::Backspace) => {
            if let Some(buffer) = state.editing.as_mut() {
                buffer.pop();
            }
        }
        (m, KeyCode::Char(c)) if !m.contains(KeyModifiers::CONTROL) => {
            if let Some(buffer) = state.editing.as_mut() {
                buffer.push(c);
            }
        }
        _ => {}
    }
    KeyOutcome::Nothing
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Dashboard"),
        Line::from("Settings"),
        Line::from("Applications"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(Line::from(vec![
                Span::raw(format!("autoapply-dashboard | {} ", state.base_url)),
                state.status_badge(),
            ])),
    )
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_DASHBOARD => draw_dashboard(chunks[1], f, state),
        TAB_SETTINGS => draw_settings(chunks[1], f, state),
        TAB_APPLICATIONS => draw_applications(chunks[1], f, state),
        _ => help::draw_help(
            chunks[1],
            f,
            &humantime::format_duration(state.view.poll_interval).to_string(),
        ),
    }

    let status = Paragraph::new(state.status_line())
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, chunks[2]);
}

fn draw_dashboard(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(5),  // stat cards
                Constraint::Min(9),     // control + recent
                Constraint::Length(10), // daily chart
            ]
            .as_ref(),
        )
        .split(area);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4].as_ref())
        .split(main[0]);
    let stats = &state.view.stats;
    charts::stat_card(f, cards[0], "Total Applications", stats.total.to_string(), Color::Cyan);
    charts::stat_card(f, cards[1], "Successful", stats.successful.to_string(), Color::Green);
    charts::stat_card(f, cards[2], "Failed", stats.failed.to_string(), Color::Red);
    charts::stat_card(
        f,
        cards[3],
        "Success Rate",
        format!("{:.1}%", stats.success_rate),
        Color::Magenta,
    );

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(main[1]);
    draw_control(middle[0], f, state);
    draw_recent(middle[1], f, state);

    charts::daily_chart(f, main[2], &stats.daily);
}

fn draw_control(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let view = &state.view;
    let gray = Style::default().fg(Color::Gray);
    let duration = match view.status.duration_seconds {
        Some(secs) if view.status.is_running() => format_duration(secs),
        _ => "Not running".to_string(),
    };
    let polling = if view.polling {
        format!("every {}", humantime::format_duration(view.poll_interval))
    } else {
        "off".to_string()
    };

    let mut lines = vec![
        Line::from(vec![Span::styled("Status:   ", gray), state.status_badge()]),
        Line::from(vec![Span::styled("Duration: ", gray), Span::raw(duration)]),
        Line::from(vec![Span::styled("Polling:  ", gray), Span::raw(polling)]),
    ];
    if let Some(started) = view.status.start_time.as_deref() {
        lines.push(Line::from(vec![
            Span::styled("Started:  ", gray),
            Span::raw(started.to_string()),
        ]));
    }
    if let Some(count) = view.status.applications_count {
        lines.push(Line::from(vec![
            Span::styled("This run: ", gray),
            Span::raw(count.to_string()),
        ]));
    }
    lines.push(Line::from(""));

    let (label, color) = if view.status.is_running() {
        ("Stop Automation", Color::Red)
    } else {
        ("Start Automation", Color::Green)
    };
    let button = if view.in_flight.toggle {
        Span::styled(format!("[space] {label}..."), Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(
            format!("[space] {label}"),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )
    };
    lines.push(Line::from(button));

    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Automation Control"));
    f.render_widget(p, area);
}

fn draw_recent(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let recent = state.view.recent();
    let mut lines: Vec<Line> = Vec::new();
    if recent.is_empty() {
        lines.push(Line::from(Span::styled(
            "No applications yet. Start the automation to begin applying.",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for app in recent {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<8}", app.status.label()),
                Style::default().fg(status_color(&app.status)),
            ),
            Span::styled(app.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("  {}", app.applied_time_of_day()),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        lines.push(Line::from(Span::styled(
            format!("        {} | {}", app.company, app.location),
            Style::default().fg(Color::Gray),
        )));
    }
    let p = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Recent Applications"));
    f.render_widget(p, area);
}

fn draw_settings(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let view = &state.view;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(SettingsField::ALL.len() as u16 + 2), Constraint::Min(0)].as_ref())
        .split(area);

    let lines: Vec<Line> = SettingsField::ALL
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let value = match field.get(&view.draft) {
                FieldValue::Flag(true) => "[x]".to_string(),
                FieldValue::Flag(false) => "[ ]".to_string(),
                FieldValue::Text(text) => first_line(&text),
            };
            let changed = field.get(&view.draft) != field.get(&view.settings);
            let style = if i == state.settings_selected {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(format!("{:<24}", field.label()), style.fg(Color::Gray)),
                Span::styled(value, style),
                Span::styled(if changed { " *" } else { "" }, Style::default().fg(Color::Yellow)),
            ])
        })
        .collect();

    let mut title = "Search Settings".to_string();
    if view.in_flight.save {
        title.push_str(" (saving...)");
    } else if view.draft_dirty {
        title.push_str(" (unsaved changes, s to save, u to discard)");
    }
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title)),
        chunks[0],
    );

    let field = state.selected_field();
    let (detail_title, body) = match &state.editing {
        Some(buffer) => (
            format!("Editing {} (enter apply, alt-enter newline, esc cancel)", field.label()),
            format!("{buffer}_"),
        ),
        None => match field.get(&view.draft) {
            FieldValue::Text(text) => (field.label().to_string(), text),
            FieldValue::Flag(on) => (
                field.label().to_string(),
                format!("{} (space to flip)", if on { "Enabled" } else { "Disabled" }),
            ),
        },
    };
    f.render_widget(
        Paragraph::new(body)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(detail_title)),
        chunks[1],
    );
}

fn first_line(text: &str) -> String {
    let mut lines = text.lines();
    let first = lines.next().unwrap_or("").to_string();
    if lines.next().is_some() {
        format!("{first} ...")
    } else {
        first
    }
}

fn draw_applications(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let apps = &state.view.applications;
    let rows = area.height.saturating_sub(2) as usize;
    let start = state.history_scroll_offset.min(apps.len());
    let end = (start + rows).min(apps.len());

    let mut lines: Vec<Line> = Vec::new();
    if apps.is_empty() {
        lines.push(Line::from(Span::styled(
            "No applications yet",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for (i, app) in apps[start..end].iter().enumerate() {
        let selected = start + i == state.history_selected;
        let base = if selected {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        let mut spans = vec![
            Span::styled(format!("{:<17}", app.applied_date_time()), base.fg(Color::DarkGray)),
            Span::styled(format!("{:<8}", app.status.label()), base.fg(status_color(&app.status))),
            Span::styled(app.title.clone(), base.add_modifier(Modifier::BOLD)),
            Span::styled(format!(" @ {} | {}", app.company, app.location), base),
        ];
        if !app.salary.is_empty() {
            spans.push(Span::styled(format!(" | {}", app.salary), base.fg(Color::Green)));
        }
        lines.push(Line::from(spans));
    }

    let mut title = format!("Applications ({})", apps.len());
    if state.view.in_flight.export {
        title.push_str(" exporting...");
    } else if !apps.is_empty() {
        title.push_str("  e export CSV | y copy path");
    }
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunState;

    fn press(state: &mut UiState, code: KeyCode) -> KeyOutcome {
        handle_key(state, KeyModifiers::NONE, code)
    }

    #[test]
    fn space_toggles_run_outside_settings() {
        let mut state = UiState::new("http://svc");
        assert!(matches!(
            press(&mut state, KeyCode::Char(' ')),
            KeyOutcome::Send(UiCommand::ToggleRun)
        ));
        assert_eq!(state.info, "Starting automation...");

        state.view.status.state = RunState::Running;
        press(&mut state, KeyCode::Char(' '));
        assert_eq!(state.info, "Stopping automation...");
    }

    #[test]
    fn space_flips_selected_flag_in_settings() {
        let mut state = UiState::new("http://svc");
        state.tab = TAB_SETTINGS;
        state.settings_selected = 5; // Remote
        match press(&mut state, KeyCode::Char(' ')) {
            KeyOutcome::Send(UiCommand::EditDraft(SettingsField::Remote, FieldValue::Flag(v))) => {
                assert!(!v)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn editing_a_text_field_sends_the_buffer() {
        let mut state = UiState::new("http://svc");
        state.tab = TAB_SETTINGS;
        press(&mut state, KeyCode::Enter);
        state.editing = Some(String::new());
        for c in "rust".chars() {
            press(&mut state, KeyCode::Char(c));
        }
        // 'q' is text while editing, not quit.
        assert!(matches!(press(&mut state, KeyCode::Char('q')), KeyOutcome::Nothing));
        press(&mut state, KeyCode::Backspace);
        match press(&mut state, KeyCode::Enter) {
            KeyOutcome::Send(UiCommand::EditDraft(SettingsField::Keywords, FieldValue::Text(v))) => {
                assert_eq!(v, "rust")
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(state.editing.is_none());
    }

    #[test]
    fn escape_cancels_edit() {
        let mut state = UiState::new("http://svc");
        state.tab = TAB_SETTINGS;
        press(&mut state, KeyCode::Enter);
        assert!(state.editing.is_some());
        assert!(matches!(press(&mut state, KeyCode::Esc), KeyOutcome::Nothing));
        assert!(state.editing.is_none());
    }

    #[test]
    fn q_quits_and_tab_cycles() {
        let mut state = UiState::new("http://svc");
        for _ in 0..TAB_COUNT {
            press(&mut state, KeyCode::Tab);
        }
        assert_eq!(state.tab, TAB_DASHBOARD);
        assert!(matches!(press(&mut state, KeyCode::Char('q')), KeyOutcome::Quit));
    }

    #[test]
    fn cover_letter_preview_is_first_line() {
        assert_eq!(first_line("Dear team,\n\nHi"), "Dear team, ...");
        assert_eq!(first_line("one"), "one");
    }
}
