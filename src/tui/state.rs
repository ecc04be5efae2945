use crate::model::{ApplicationStatus, SettingsField};
use crate::orchestrator::UiUpdate;
use crate::sync::{DashboardView, NoticeKind};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

pub const TAB_DASHBOARD: usize = 0;
pub const TAB_SETTINGS: usize = 1;
pub const TAB_APPLICATIONS: usize = 2;
pub const TAB_HELP: usize = 3;
pub const TAB_COUNT: usize = 4;

/// UI-thread state. The dashboard view is a snapshot; nothing here writes back to the store.
pub struct UiState {
    pub tab: usize,
    pub view: DashboardView,
    pub base_url: String,
    pub info: String,
    pub settings_selected: usize,
    /// Edit buffer for the selected text field, while editing.
    pub editing: Option<String>,
    pub history_selected: usize,
    pub history_scroll_offset: usize,
    pub last_exported_path: Option<String>,
}

impl UiState {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            tab: TAB_DASHBOARD,
            view: DashboardView::default(),
            base_url: base_url.into(),
            info: String::new(),
            settings_selected: 0,
            editing: None,
            history_selected: 0,
            history_scroll_offset: 0,
            last_exported_path: None,
        }
    }

    pub fn apply_update(&mut self, update: UiUpdate) {
        match update {
            UiUpdate::View(view) => {
                self.view = *view;
                let len = self.view.applications.len();
                if self.history_selected >= len {
                    self.history_selected = len.saturating_sub(1);
                }
                if self.history_scroll_offset > self.history_selected {
                    self.history_scroll_offset = self.history_selected;
                }
            }
            UiUpdate::Rejected(reason) => self.info = reason,
            UiUpdate::Exported(path) => {
                self.info = format!("Exported CSV: {} (press 'y' to copy path)", path.display());
                self.last_exported_path = Some(path.to_string_lossy().to_string());
            }
        }
    }

    pub fn selected_field(&self) -> SettingsField {
        SettingsField::ALL[self.settings_selected.min(SettingsField::ALL.len() - 1)]
    }

    pub fn select_next_field(&mut self) {
        if self.settings_selected + 1 < SettingsField::ALL.len() {
            self.settings_selected += 1;
        }
    }

    pub fn select_prev_field(&mut self) {
        self.settings_selected = self.settings_selected.saturating_sub(1);
    }

    pub fn select_next_application(&mut self, visible_rows: usize) {
        let len = self.view.applications.len();
        if self.history_selected + 1 < len {
            self.history_selected += 1;
            let rows = visible_rows.max(1);
            if self.history_selected >= self.history_scroll_offset + rows {
                self.history_scroll_offset = self.history_selected + 1 - rows;
            }
        }
    }

    pub fn select_prev_application(&mut self) {
        if self.history_selected > 0 {
            self.history_selected -= 1;
            if self.history_selected < self.history_scroll_offset {
                self.history_scroll_offset = self.history_selected;
            }
        }
    }

    /// Active/Inactive badge for the status panel and tab title.
    pub fn status_badge(&self) -> Span<'static> {
        if self.view.status.is_running() {
            Span::styled(
                " Active ",
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(" Inactive ", Style::default().fg(Color::Black).bg(Color::Gray))
        }
    }

    /// Bottom status line: the dashboard notice wins over local info text.
    pub fn status_line(&self) -> Line<'static> {
        if let Some(notice) = &self.view.notice {
            let color = match notice.kind {
                NoticeKind::Error => Color::Red,
                NoticeKind::Success => Color::Green,
            };
            return Line::from(Span::styled(notice.text.clone(), Style::default().fg(color)));
        }
        if !self.info.is_empty() {
            return Line::from(Span::styled(self.info.clone(), Style::default().fg(Color::Gray)));
        }
        Line::from(Span::styled(
            "space start/stop | s save | e export | r refresh | tab switch | ? help | q quit",
            Style::default().fg(Color::DarkGray),
        ))
    }
}

pub fn status_color(status: &ApplicationStatus) -> Color {
    match status {
        ApplicationStatus::Successful => Color::Green,
        ApplicationStatus::Failed => Color::Red,
        ApplicationStatus::Other(_) => Color::Yellow,
    }
}
