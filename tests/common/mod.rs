#![allow(dead_code)]

use async_trait::async_trait;
use autoapply_dashboard::export::{ExportError, Exporter};
use autoapply_dashboard::model::{
    Application, ApplicationId, ApplicationStatus, RunState, RunStatus, Settings, Stats,
    SyncConfig,
};
use autoapply_dashboard::sync::Dashboard;
use autoapply_dashboard::transport::{Transport, TransportError, TransportResult};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::sync::oneshot;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(autoapply_dashboard::logging::initialize_for_tests);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Status,
    Stats,
    Applications,
    Settings,
    SaveSettings,
    Start,
    Stop,
    Simulate,
    Export,
}

#[derive(Debug, Clone)]
pub enum Reply {
    Status(TransportResult<RunStatus>),
    Stats(TransportResult<Stats>),
    Applications(TransportResult<Vec<Application>>),
    Settings(TransportResult<Settings>),
    Done(TransportResult<()>),
    Csv(TransportResult<String>),
}

enum Queued {
    Ready(Reply),
    Gated(oneshot::Receiver<Reply>),
}

/// Scripted in-memory service.
///
/// Each call pops the next queued reply for its endpoint; gated replies block until
/// the test releases them, which lets tests choose completion order. With nothing
/// queued a call gets the endpoint's default reply.
#[derive(Default)]
pub struct FakeTransport {
    calls: Mutex<Vec<Call>>,
    queued: Mutex<HashMap<Call, VecDeque<Queued>>>,
    defaults: Mutex<HashMap<Call, Reply>>,
    saved: Mutex<Vec<Settings>>,
}

/// Releases one gated reply.
pub struct Gate(oneshot::Sender<Reply>);

impl Gate {
    pub fn release(self, reply: Reply) {
        let _ = self.0.send(reply);
    }
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, call: Call, reply: Reply) {
        self.queue(call, Queued::Ready(reply));
    }

    pub fn gate(&self, call: Call) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.queue(call, Queued::Gated(rx));
        Gate(tx)
    }

    pub fn set_default(&self, call: Call, reply: Reply) {
        self.defaults.lock().unwrap().insert(call, reply);
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    pub fn saved_settings(&self) -> Vec<Settings> {
        self.saved.lock().unwrap().clone()
    }

    fn queue(&self, call: Call, q: Queued) {
        self.queued
            .lock()
            .unwrap()
            .entry(call)
            .or_default()
            .push_back(q);
    }

    fn default_reply(&self, call: Call) -> Reply {
        if let Some(reply) = self.defaults.lock().unwrap().get(&call) {
            return reply.clone();
        }
        match call {
            Call::Status => Reply::Status(Ok(RunStatus::stopped())),
            Call::Stats => Reply::Stats(Ok(Stats::default())),
            Call::Applications => Reply::Applications(Ok(Vec::new())),
            Call::Settings => Reply::Settings(Ok(Settings::default())),
            Call::Export => Reply::Csv(Ok(String::new())),
            _ => Reply::Done(Ok(())),
        }
    }

    async fn next(&self, call: Call) -> Reply {
        let queued = {
            self.calls.lock().unwrap().push(call);
            let mut all = self.queued.lock().unwrap();
            all.get_mut(&call).and_then(VecDeque::pop_front)
        };
        match queued {
            Some(Queued::Ready(reply)) => reply,
            Some(Queued::Gated(rx)) => rx.await.expect("gate dropped without a reply"),
            None => self.default_reply(call),
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn status(&self) -> TransportResult<RunStatus> {
        match self.next(Call::Status).await {
            Reply::Status(r) => r,
            other => panic!("status got {other:?}"),
        }
    }

    async fn stats(&self) -> TransportResult<Stats> {
        match self.next(Call::Stats).await {
            Reply::Stats(r) => r,
            other => panic!("stats got {other:?}"),
        }
    }

    async fn applications(&self, _per_page: usize) -> TransportResult<Vec<Application>> {
        match self.next(Call::Applications).await {
            Reply::Applications(r) => r,
            other => panic!("applications got {other:?}"),
        }
    }

    async fn settings(&self) -> TransportResult<Settings> {
        match self.next(Call::Settings).await {
            Reply::Settings(r) => r,
            other => panic!("settings got {other:?}"),
        }
    }

    async fn save_settings(&self, settings: &Settings) -> TransportResult<()> {
        self.saved.lock().unwrap().push(settings.clone());
        match self.next(Call::SaveSettings).await {
            Reply::Done(r) => r,
            other => panic!("save got {other:?}"),
        }
    }

    async fn start(&self) -> TransportResult<()> {
        match self.next(Call::Start).await {
            Reply::Done(r) => r,
            other => panic!("start got {other:?}"),
        }
    }

    async fn stop(&self) -> TransportResult<()> {
        match self.next(Call::Stop).await {
            Reply::Done(r) => r,
            other => panic!("stop got {other:?}"),
        }
    }

    async fn simulate_application(&self) -> TransportResult<()> {
        match self.next(Call::Simulate).await {
            Reply::Done(r) => r,
            other => panic!("simulate got {other:?}"),
        }
    }

    async fn export_csv(&self) -> TransportResult<String> {
        match self.next(Call::Export).await {
            Reply::Csv(r) => r,
            other => panic!("export got {other:?}"),
        }
    }
}

/// Exporter that records deliveries instead of touching the disk.
#[derive(Clone, Default)]
pub struct RecordingExporter {
    pub delivered: Arc<Mutex<Vec<(String, String)>>>,
}

impl Exporter for RecordingExporter {
    fn deliver(&self, payload: &str, filename: &str) -> Result<PathBuf, ExportError> {
        self.delivered
            .lock()
            .unwrap()
            .push((payload.to_string(), filename.to_string()));
        Ok(PathBuf::from("/downloads").join(filename))
    }
}

pub fn config() -> SyncConfig {
    SyncConfig {
        base_url: "http://fake/api/automation".into(),
        poll_interval: Duration::from_secs(3),
        notice_ttl: Duration::from_secs(3),
        ..SyncConfig::default()
    }
}

pub fn dashboard(fake: &Arc<FakeTransport>) -> (Dashboard, RecordingExporter) {
    let exporter = RecordingExporter::default();
    let transport: Arc<dyn Transport> = fake.clone();
    (
        Dashboard::new(config(), transport, Box::new(exporter.clone())),
        exporter,
    )
}

pub fn running(secs: u64) -> RunStatus {
    RunStatus {
        state: RunState::Running,
        duration_seconds: Some(secs),
        start_time: None,
        applications_count: None,
    }
}

pub fn app(id: i64) -> Application {
    Application {
        id: ApplicationId::Number(id),
        title: format!("Engineer {id}"),
        company: format!("Company {id}"),
        location: "Remote".into(),
        salary: "$120K".into(),
        status: ApplicationStatus::Successful,
        applied_at: "2024-05-01 10:00:00".into(),
        url: None,
        keywords: None,
        job_type: None,
    }
}

pub fn rejected(status: u16, message: &str) -> TransportError {
    TransportError::Rejected {
        status,
        message: Some(message.to_string()),
    }
}
