//! Client-side mirror of the service state.
//!
//! Each field region has one mutation entry point. Fetch results are tagged with a
//! per-endpoint [`Ticket`]; a result is applied only if it was issued after the last
//! applied one, so a slow response can never overwrite a newer one.

use crate::model::{Application, FieldValue, RunState, RunStatus, Settings, SettingsField, Stats};
use crate::model::RECENT_LIMIT;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Status,
    Stats,
    Applications,
    Settings,
}

impl Endpoint {
    pub const ALL: [Endpoint; 4] = [
        Endpoint::Status,
        Endpoint::Stats,
        Endpoint::Applications,
        Endpoint::Settings,
    ];

    fn index(self) -> usize {
        match self {
            Endpoint::Status => 0,
            Endpoint::Stats => 1,
            Endpoint::Applications => 2,
            Endpoint::Settings => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Endpoint::Status => "automation status",
            Endpoint::Stats => "stats",
            Endpoint::Applications => "applications",
            Endpoint::Settings => "settings",
        }
    }
}

/// Issuance tag of one fetch. Higher `seq` means issued later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub endpoint: Endpoint,
    pub seq: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Clock {
    issued: u64,
    applied: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Error,
    Success,
}

/// The single user-facing message slot, shared by failures and confirmations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    /// Identifies this notice so a delayed clear cannot remove a newer one.
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub struct StateStore {
    status: RunStatus,
    stats: Stats,
    applications: Vec<Application>,
    settings: Settings,
    draft: Settings,
    draft_dirty: bool,
    notice: Option<Notice>,
    notice_generation: u64,
    clocks: [Clock; 4],
    page_size: usize,
}

impl StateStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            status: RunStatus::stopped(),
            stats: Stats::default(),
            applications: Vec::new(),
            settings: Settings::default(),
            draft: Settings::default(),
            draft_dirty: false,
            notice: None,
            notice_generation: 0,
            clocks: [Clock::default(); 4],
            page_size: page_size.max(1),
        }
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// History as received: most recent first, at most one page.
    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    /// Leading slice of the history shown in the dashboard's recent panel.
    pub fn recent(&self) -> &[Application] {
        &self.applications[..self.applications.len().min(RECENT_LIMIT)]
    }

    /// Last settings the service confirmed (fetched or successfully saved).
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn draft(&self) -> &Settings {
        &self.draft
    }

    /// True when the draft holds edits the service has not accepted yet.
    pub fn draft_dirty(&self) -> bool {
        self.draft_dirty
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Tag a new fetch for `endpoint`.
    pub fn issue(&mut self, endpoint: Endpoint) -> Ticket {
        let clock = &mut self.clocks[endpoint.index()];
        clock.issued += 1;
        Ticket {
            endpoint,
            seq: clock.issued,
        }
    }

    /// Whether a result carrying `ticket` would still be applied.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.seq > self.clocks[ticket.endpoint.index()].applied
    }

    fn commit(&mut self, ticket: Ticket, endpoint: Endpoint) -> bool {
        debug_assert_eq!(ticket.endpoint, endpoint);
        if ticket.endpoint != endpoint || !self.is_current(ticket) {
            return false;
        }
        self.clocks[endpoint.index()].applied = ticket.seq;
        true
    }

    pub fn apply_status(&mut self, ticket: Ticket, status: RunStatus) -> bool {
        if !self.commit(ticket, Endpoint::Status) {
            return false;
        }
        self.status = status;
        true
    }

    pub fn apply_stats(&mut self, ticket: Ticket, stats: Stats) -> bool {
        if !self.commit(ticket, Endpoint::Stats) {
            return false;
        }
        self.stats = stats;
        true
    }

    pub fn apply_applications(&mut self, ticket: Ticket, mut applications: Vec<Application>) -> bool {
        if !self.commit(ticket, Endpoint::Applications) {
            return false;
        }
        applications.truncate(self.page_size);
        self.applications = applications;
        true
    }

    /// Replace the confirmed settings. The draft follows unless it carries unsaved edits.
    pub fn apply_settings(&mut self, ticket: Ticket, settings: Settings) -> bool {
        if !self.commit(ticket, Endpoint::Settings) {
            return false;
        }
        if !self.draft_dirty {
            self.draft = settings.clone();
        }
        self.settings = settings;
        true
    }

    /// Optimistic transition after a confirmed start/stop.
    ///
    /// Status reads issued before this point are superseded; only reads issued
    /// afterwards can correct the tentative value.
    pub fn assume_run_state(&mut self, state: RunState) {
        let clock = &mut self.clocks[Endpoint::Status.index()];
        clock.applied = clock.issued;
        self.status = RunStatus::tentative(state);
    }

    /// Record a successful save of `saved`.
    pub fn accept_saved_settings(&mut self, saved: Settings) {
        if self.draft == saved {
            self.draft_dirty = false;
        }
        self.settings = saved;
    }

    pub fn update_draft(&mut self, field: SettingsField, value: FieldValue) -> bool {
        let mut next = self.draft.clone();
        if !field.set(&mut next, value) {
            return false;
        }
        if next != self.draft {
            self.draft = next;
            self.draft_dirty = self.draft != self.settings;
        }
        true
    }

    /// Drop unsaved edits and go back to the confirmed settings.
    pub fn reset_draft(&mut self) {
        self.draft = self.settings.clone();
        self.draft_dirty = false;
    }

    pub fn set_notice(&mut self, kind: NoticeKind, text: impl Into<String>) -> u64 {
        self.notice_generation += 1;
        self.notice = Some(Notice {
            kind,
            text: text.into(),
            generation: self.notice_generation,
        });
        self.notice_generation
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    /// Clear the notice only if it is still the one identified by `generation`.
    pub fn expire_notice(&mut self, generation: u64) -> bool {
        match &self.notice {
            Some(n) if n.generation == generation => {
                self.notice = None;
                true
            }
            _ => false,
        }
    }
}
