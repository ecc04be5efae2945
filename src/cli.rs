use crate::export::{history_csv, Exporter, FileExporter};
use crate::logging::{default_log_path, LogDestination};
use crate::model::{
    Application, RunStatus, Settings, Stats, SyncConfig, DEFAULT_BASE_URL, EXPORT_FILENAME,
};
use crate::sync::{CommandRejected, Dashboard, Endpoint, Handled, NoticeKind};
use crate::transport::{HttpTransport, TransportError};
use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "autoapply-dashboard",
    version,
    about = "Dashboard for a job-application automation service, with optional TUI"
)]
pub struct Cli {
    /// API root of the automation service
    #[arg(long, env = "AUTOAPPLY_API_BASE", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Print a JSON snapshot and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// With --text: keep printing status lines until the service stops or Ctrl-C
    #[arg(long, requires = "text")]
    pub watch: bool,

    /// Refresh cadence while the service is running
    #[arg(long, default_value = "3s")]
    pub poll_interval: humantime::Duration,

    /// How long confirmation messages stay visible
    #[arg(long, default_value = "3s")]
    pub notice_ttl: humantime::Duration,

    /// Per-request timeout
    #[arg(long, default_value = "10s")]
    pub request_timeout: humantime::Duration,

    /// Number of history entries requested per page
    #[arg(long, default_value_t = 50)]
    pub page_size: usize,

    /// Directory the TUI writes exports into (default: downloads directory)
    #[arg(long, env = "AUTOAPPLY_EXPORT_DIR")]
    pub export_dir: Option<PathBuf>,

    /// Export the application history as CSV to this path
    #[arg(long)]
    pub export_csv: Option<PathBuf>,

    /// With --export-csv: render the CSV from the fetched page instead of the service export
    #[arg(long, requires = "export_csv")]
    pub local_csv: bool,

    /// Log file location
    #[arg(long, env = "AUTOAPPLY_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Debug-level logging (mirrored to stderr in headless modes)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// True when no TUI will be started.
    pub fn is_headless(&self) -> bool {
        self.json || self.text || self.export_csv.is_some() || !cfg!(feature = "tui")
    }

    pub fn log_destination(&self) -> LogDestination {
        let path = self.log_file.clone().unwrap_or_else(default_log_path);
        if self.is_headless() && self.verbose {
            LogDestination::FileAndStderr(path)
        } else {
            LogDestination::File(path)
        }
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(FileExporter::default_dir)
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args)?;

    if !args.is_headless() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args, cfg).await;
        }
    }

    run_headless(args, cfg).await
}

/// Build a validated `SyncConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> Result<SyncConfig> {
    let base_url = args.base_url.trim().trim_end_matches('/').to_string();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        bail!("--base-url must be an http(s) URL, got {:?}", args.base_url);
    }
    let poll_interval = Duration::from(args.poll_interval);
    if poll_interval.is_zero() {
        bail!("--poll-interval must be greater than zero");
    }
    let request_timeout = Duration::from(args.request_timeout);
    if request_timeout.is_zero() {
        bail!("--request-timeout must be greater than zero");
    }
    if args.page_size == 0 {
        bail!("--page-size must be at least 1");
    }
    Ok(SyncConfig {
        base_url,
        poll_interval,
        notice_ttl: Duration::from(args.notice_ttl),
        request_timeout,
        page_size: args.page_size,
        ..SyncConfig::default()
    })
}

#[derive(Serialize)]
struct Snapshot<'a> {
    config: &'a SyncConfig,
    status: &'a RunStatus,
    stats: &'a Stats,
    applications: &'a [Application],
    settings: &'a Settings,
}

async fn run_headless(args: Cli, cfg: SyncConfig) -> Result<()> {
    let transport = HttpTransport::new(&cfg).context("failed to build HTTP client")?;
    let exporter: Box<dyn Exporter> = match args.export_csv.as_deref() {
        Some(path) => Box::new(FileExporter::at_path(path)),
        None => Box::new(FileExporter::in_dir(args.export_dir())),
    };
    let mut dashboard = Dashboard::new(cfg.clone(), Arc::new(transport), exporter);
    let (out_tx, out_handle) = spawn_output_writer();

    dashboard.mount();
    let failures = dashboard.settle().await;
    if failures.len() == Endpoint::ALL.len() {
        let (_, err) = &failures[0];
        bail!("automation service unreachable at {}: {err}", cfg.base_url);
    }
    for (endpoint, err) in &failures {
        let _ = out_tx.send(OutputLine::Stderr(format!(
            "Warning: could not load {}: {err}",
            endpoint.label()
        )));
    }

    if let Some(path) = args.export_csv.as_deref() {
        let written = if args.local_csv {
            write_local_csv(&dashboard, path)?
        } else {
            export_via_service(&mut dashboard).await?
        };
        let _ = out_tx.send(OutputLine::Stderr(format!("Exported: {}", written.display())));
    }

    if args.json {
        let store = dashboard.store();
        let snapshot = Snapshot {
            config: dashboard.config(),
            status: store.status(),
            stats: store.stats(),
            applications: store.applications(),
            settings: store.settings(),
        };
        let out = serde_json::to_string_pretty(&snapshot)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else if args.text {
        let summary = crate::text_summary::build_text_summary(&dashboard.view(), &cfg.base_url);
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
        if args.watch {
            watch(&mut dashboard, &out_tx).await;
        }
    }

    dashboard.teardown();
    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

fn write_local_csv(dashboard: &Dashboard, path: &Path) -> Result<PathBuf> {
    let applications = dashboard.store().applications();
    if applications.is_empty() {
        bail!(CommandRejected::NothingToExport);
    }
    FileExporter::at_path(path)
        .deliver(&history_csv(applications), EXPORT_FILENAME)
        .context("failed to write CSV export")
}

async fn export_via_service(dashboard: &mut Dashboard) -> Result<PathBuf> {
    dashboard.export_history()?;
    while dashboard.in_flight().export {
        if let Handled::Exported(path) = dashboard.step().await {
            return Ok(path);
        }
    }
    match dashboard.store().notice() {
        Some(notice) if notice.kind == NoticeKind::Error => bail!("{}", notice.text),
        _ => bail!("export did not complete"),
    }
}

/// Print a status line after every applied status update until the service stops or Ctrl-C.
async fn watch(dashboard: &mut Dashboard, out_tx: &mpsc::UnboundedSender<OutputLine>) {
    if !dashboard.is_polling() {
        let _ = out_tx.send(OutputLine::Stderr("Automation is not running".into()));
        return;
    }
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            handled = dashboard.step() => match handled {
                Handled::Applied(Endpoint::Status) => {
                    let store = dashboard.store();
                    let line = crate::text_summary::status_line(store.status(), store.stats());
                    let _ = out_tx.send(OutputLine::Stdout(line));
                    if !dashboard.is_polling() {
                        break;
                    }
                }
                Handled::FetchFailed(Endpoint::Status, err) => {
                    let _ = out_tx.send(OutputLine::Stderr(format!("Poll failed: {}", describe(&err))));
                }
                _ => {}
            },
        }
    }
}

fn describe(err: &TransportError) -> String {
    match err.server_message() {
        Some(msg) => format!("{err} ({msg})"),
        None => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_cadence() {
        let args = Cli::parse_from(["autoapply-dashboard"]);
        let cfg = build_config(&args).unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_secs(3));
        assert_eq!(cfg.notice_ttl, Duration::from_secs(3));
        assert_eq!(cfg.page_size, 50);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let args = Cli::parse_from(["autoapply-dashboard", "--base-url", "http://svc/api/automation/"]);
        assert_eq!(build_config(&args).unwrap().base_url, "http://svc/api/automation");
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let args = Cli::parse_from(["autoapply-dashboard", "--poll-interval", "0s"]);
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn watch_requires_text() {
        assert!(Cli::try_parse_from(["autoapply-dashboard", "--watch"]).is_err());
        let args = Cli::try_parse_from(["autoapply-dashboard", "--text", "--watch"]).unwrap();
        assert!(args.is_headless());
    }
}
