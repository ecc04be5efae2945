use super::events::{CommandKind, CommandOutcome, CommandRejected, Fetched, Handled, InFlight, SyncEvent};
use super::poller::Poller;
use super::store::{Endpoint, Notice, NoticeKind, StateStore};
use crate::export::Exporter;
use crate::model::{
    Application, FieldValue, RunState, RunStatus, Settings, SettingsField, Stats, SyncConfig,
    EXPORT_FILENAME,
};
use crate::transport::{Transport, TransportError};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

pub const TOGGLE_FAILED_MESSAGE: &str = "Failed to toggle automation";
pub const SAVE_FAILED_MESSAGE: &str = "Failed to save settings";
pub const SETTINGS_SAVED_MESSAGE: &str = "Settings saved successfully!";
pub const EXPORT_FAILED_MESSAGE: &str = "Failed to export data";

/// Read-only snapshot handed to presentation code.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardView {
    pub status: RunStatus,
    pub stats: Stats,
    pub applications: Vec<Application>,
    pub settings: Settings,
    pub draft: Settings,
    pub draft_dirty: bool,
    pub notice: Option<Notice>,
    pub in_flight: InFlight,
    pub polling: bool,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl DashboardView {
    pub fn recent(&self) -> &[Application] {
        &self.applications[..self.applications.len().min(crate::model::RECENT_LIMIT)]
    }
}

/// One mounted dashboard: owns the store, the poller and every background task it spawns.
///
/// All mutation happens on the owner's task through [`Dashboard::handle`]; spawned
/// requests and timers only ever report back over the event channel.
pub struct Dashboard {
    cfg: SyncConfig,
    transport: Arc<dyn Transport>,
    exporter: Box<dyn Exporter>,
    store: StateStore,
    poller: Poller,
    in_flight: InFlight,
    pending_fetches: usize,
    pending_simulations: usize,
    notice_timer: Option<JoinHandle<()>>,
    events_tx: UnboundedSender<SyncEvent>,
    events_rx: UnboundedReceiver<SyncEvent>,
    torn_down: bool,
}

impl Dashboard {
    pub fn new(cfg: SyncConfig, transport: Arc<dyn Transport>, exporter: Box<dyn Exporter>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            store: StateStore::new(cfg.page_size),
            poller: Poller::new(cfg.poll_interval),
            cfg,
            transport,
            exporter,
            in_flight: InFlight::default(),
            pending_fetches: 0,
            pending_simulations: 0,
            notice_timer: None,
            events_tx,
            events_rx,
            torn_down: false,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.cfg
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn in_flight(&self) -> InFlight {
        self.in_flight
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_active()
    }

    pub fn pending_fetches(&self) -> usize {
        self.pending_fetches
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            status: self.store.status().clone(),
            stats: self.store.stats().clone(),
            applications: self.store.applications().to_vec(),
            settings: self.store.settings().clone(),
            draft: self.store.draft().clone(),
            draft_dirty: self.store.draft_dirty(),
            notice: self.store.notice().cloned(),
            in_flight: self.in_flight,
            polling: self.poller.is_active(),
            poll_interval: self.poller.period(),
        }
    }

    /// Initial load: all four reads, concurrently.
    pub fn mount(&mut self) {
        info!("mounting dashboard against {}", self.cfg.base_url);
        for endpoint in Endpoint::ALL {
            self.fetch(endpoint);
        }
    }

    /// One refresh cycle: status, stats and history. Settings are only read on mount.
    pub fn refresh(&mut self) {
        self.fetch(Endpoint::Status);
        self.fetch(Endpoint::Stats);
        self.fetch(Endpoint::Applications);
    }

    fn fetch(&mut self, endpoint: Endpoint) {
        if self.torn_down {
            return;
        }
        let ticket = self.store.issue(endpoint);
        self.pending_fetches += 1;
        let transport = Arc::clone(&self.transport);
        let tx = self.events_tx.clone();
        let per_page = self.cfg.page_size;
        tokio::spawn(async move {
            let payload = match endpoint {
                Endpoint::Status => Fetched::Status(transport.status().await),
                Endpoint::Stats => Fetched::Stats(transport.stats().await),
                Endpoint::Applications => Fetched::Applications(transport.applications(per_page).await),
                Endpoint::Settings => Fetched::Settings(transport.settings().await),
            };
            let _ = tx.send(SyncEvent::Fetched { ticket, payload });
        });
    }

    fn dispatch<F>(&self, request: F)
    where
        F: std::future::Future<Output = CommandOutcome> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(SyncEvent::Command(request.await));
        });
    }

    /// Start the service if it is stopped, stop it if it is running.
    ///
    /// Returns the state being requested. The store only changes once the service confirms.
    pub fn toggle_run(&mut self) -> Result<RunState, CommandRejected> {
        self.in_flight.begin(CommandKind::Toggle)?;
        self.dismiss_notice();
        let target = self.store.status().state.toggled();
        info!("requesting automation {}", verb(target));
        let transport = Arc::clone(&self.transport);
        self.dispatch(async move {
            let result = transport.set_run_state(target).await;
            CommandOutcome::Toggle { target, result }
        });
        Ok(target)
    }

    /// Send `draft` as the complete new settings.
    pub fn save_settings(&mut self, draft: Settings) -> Result<(), CommandRejected> {
        self.in_flight.begin(CommandKind::SaveSettings)?;
        self.dismiss_notice();
        info!("saving settings");
        let transport = Arc::clone(&self.transport);
        self.dispatch(async move {
            let result = transport.save_settings(&draft).await;
            CommandOutcome::SaveSettings { draft, result }
        });
        Ok(())
    }

    /// Save whatever the draft currently holds.
    pub fn save_draft(&mut self) -> Result<(), CommandRejected> {
        let draft = self.store.draft().clone();
        self.save_settings(draft)
    }

    pub fn update_draft(&mut self, field: SettingsField, value: FieldValue) -> bool {
        self.store.update_draft(field, value)
    }

    pub fn reset_draft(&mut self) {
        self.store.reset_draft();
    }

    /// Fetch the service's CSV export and hand it to the exporter.
    ///
    /// Refused without a request when there is no history to export.
    pub fn export_history(&mut self) -> Result<(), CommandRejected> {
        if self.store.applications().is_empty() {
            return Err(CommandRejected::NothingToExport);
        }
        self.in_flight.begin(CommandKind::Export)?;
        info!("exporting application history");
        let transport = Arc::clone(&self.transport);
        self.dispatch(async move {
            let result = transport.export_csv().await;
            CommandOutcome::Export { result }
        });
        Ok(())
    }

    /// Ask the service for a synthetic application. The result is only logged.
    pub fn simulate(&mut self) {
        self.pending_simulations += 1;
        let transport = Arc::clone(&self.transport);
        self.dispatch(async move {
            let result = transport.simulate_application().await;
            CommandOutcome::Simulate { result }
        });
    }

    /// Wait for the next event. Never resolves after every sender is gone.
    pub async fn next_event(&mut self) -> SyncEvent {
        match self.events_rx.recv().await {
            Some(ev) => ev,
            None => futures::future::pending().await,
        }
    }

    pub async fn step(&mut self) -> Handled {
        let ev = self.next_event().await;
        self.handle(ev)
    }

    /// Process events until no fetch or command is outstanding.
    ///
    /// Returns the fetch failures seen along the way.
    pub async fn settle(&mut self) -> Vec<(Endpoint, TransportError)> {
        let mut failures = Vec::new();
        while self.pending_fetches > 0 || self.pending_simulations > 0 || self.in_flight.any() {
            if let Handled::FetchFailed(endpoint, err) = self.step().await {
                failures.push((endpoint, err));
            }
        }
        failures
    }

    pub fn handle(&mut self, ev: SyncEvent) -> Handled {
        match ev {
            SyncEvent::Fetched { ticket, payload } => {
                self.pending_fetches = self.pending_fetches.saturating_sub(1);
                if self.torn_down {
                    return Handled::Ignored;
                }
                self.apply_fetch(ticket, payload)
            }
            SyncEvent::Command(outcome) => self.finish_command(outcome),
            _ if self.torn_down => Handled::Ignored,
            SyncEvent::PollTick { epoch } => {
                if !self.poller.accepts(epoch) {
                    debug!("dropping tick from poller epoch {epoch}");
                    return Handled::Ignored;
                }
                self.refresh();
                Handled::Updated
            }
            SyncEvent::NoticeExpired { generation } => {
                if self.store.expire_notice(generation) {
                    self.notice_timer = None;
                    Handled::Updated
                } else {
                    Handled::Ignored
                }
            }
        }
    }

    fn apply_fetch(&mut self, ticket: super::store::Ticket, payload: Fetched) -> Handled {
        let endpoint = ticket.endpoint;
        if let Some(err) = payload.error() {
            warn!("failed to fetch {}: {err}", endpoint.label());
            return Handled::FetchFailed(endpoint, err.clone());
        }
        let applied = match payload {
            Fetched::Status(Ok(status)) => {
                let applied = self.store.apply_status(ticket, status);
                if applied {
                    self.sync_poller();
                }
                applied
            }
            Fetched::Stats(Ok(stats)) => self.store.apply_stats(ticket, stats),
            Fetched::Applications(Ok(apps)) => self.store.apply_applications(ticket, apps),
            Fetched::Settings(Ok(settings)) => self.store.apply_settings(ticket, settings),
            _ => false,
        };
        if applied {
            Handled::Applied(endpoint)
        } else {
            debug!("discarding stale {} response #{}", endpoint.label(), ticket.seq);
            Handled::Ignored
        }
    }

    fn finish_command(&mut self, outcome: CommandOutcome) -> Handled {
        match outcome {
            CommandOutcome::Toggle { target, result } => {
                self.in_flight.finish(CommandKind::Toggle);
                if self.torn_down {
                    return Handled::Ignored;
                }
                match result {
                    Ok(()) => {
                        info!("automation {} confirmed", verb(target));
                        self.store.assume_run_state(target);
                        self.sync_poller();
                        self.fetch(Endpoint::Status);
                    }
                    Err(err) => {
                        warn!("start/stop failed: {err}");
                        self.show_error(err.user_message(TOGGLE_FAILED_MESSAGE));
                    }
                }
                Handled::Updated
            }
            CommandOutcome::SaveSettings { draft, result } => {
                self.in_flight.finish(CommandKind::SaveSettings);
                if self.torn_down {
                    return Handled::Ignored;
                }
                match result {
                    Ok(()) => {
                        info!("settings saved");
                        self.store.accept_saved_settings(draft);
                        self.show_success(SETTINGS_SAVED_MESSAGE);
                    }
                    Err(err) => {
                        warn!("saving settings failed: {err}");
                        self.show_error(err.user_message(SAVE_FAILED_MESSAGE));
                    }
                }
                Handled::Updated
            }
            CommandOutcome::Export { result } => {
                self.in_flight.finish(CommandKind::Export);
                if self.torn_down {
                    return Handled::Ignored;
                }
                let csv = match result {
                    Ok(csv) => csv,
                    Err(err) => {
                        warn!("export request failed: {err}");
                        self.show_error(EXPORT_FAILED_MESSAGE);
                        return Handled::Updated;
                    }
                };
                match self.exporter.deliver(&csv, EXPORT_FILENAME) {
                    Ok(path) => {
                        info!("exported history to {}", path.display());
                        Handled::Exported(path)
                    }
                    Err(err) => {
                        error!("{err}");
                        self.show_error(EXPORT_FAILED_MESSAGE);
                        Handled::Updated
                    }
                }
            }
            CommandOutcome::Simulate { result } => {
                self.pending_simulations = self.pending_simulations.saturating_sub(1);
                match result {
                    Ok(()) => info!("simulated application requested"),
                    Err(err) => warn!("simulate application failed: {err}"),
                }
                Handled::Ignored
            }
        }
    }

    /// Keep the poller active exactly while the cached status says running.
    fn sync_poller(&mut self) {
        if self.torn_down {
            return;
        }
        let running = self.store.status().is_running();
        if running && !self.poller.is_active() {
            self.poller.start(self.events_tx.clone());
            info!("polling every {}", humantime::format_duration(self.poller.period()));
        } else if !running && self.poller.stop() {
            info!("polling stopped");
        }
    }

    fn dismiss_notice(&mut self) {
        self.cancel_notice_timer();
        self.store.clear_notice();
    }

    fn show_error(&mut self, text: impl Into<String>) {
        self.cancel_notice_timer();
        self.store.set_notice(NoticeKind::Error, text);
    }

    fn show_success(&mut self, text: impl Into<String>) {
        self.cancel_notice_timer();
        let generation = self.store.set_notice(NoticeKind::Success, text);
        let tx = self.events_tx.clone();
        let ttl = self.cfg.notice_ttl;
        self.notice_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let _ = tx.send(SyncEvent::NoticeExpired { generation });
        }));
    }

    fn cancel_notice_timer(&mut self) {
        if let Some(timer) = self.notice_timer.take() {
            timer.abort();
        }
    }

    /// Stop polling and cancel timers. Results that arrive afterwards are dropped.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.poller.stop();
        self.cancel_notice_timer();
        debug!("dashboard torn down");
    }
}

fn verb(target: RunState) -> &'static str {
    match target {
        RunState::Running => "start",
        RunState::Stopped => "stop",
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.teardown();
    }
}
