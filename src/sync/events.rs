use super::store::{Endpoint, Ticket};
use crate::model::{Application, RunState, RunStatus, Settings, Stats};
use crate::transport::{TransportError, TransportResult};
use serde::Serialize;
use std::fmt;

/// Everything that can wake the dashboard: poll ticks, transport completions and timers.
#[derive(Debug)]
pub enum SyncEvent {
    PollTick { epoch: u64 },
    Fetched { ticket: Ticket, payload: Fetched },
    Command(CommandOutcome),
    NoticeExpired { generation: u64 },
}

#[derive(Debug)]
pub enum Fetched {
    Status(TransportResult<RunStatus>),
    Stats(TransportResult<Stats>),
    Applications(TransportResult<Vec<Application>>),
    Settings(TransportResult<Settings>),
}

impl Fetched {
    pub fn error(&self) -> Option<&TransportError> {
        match self {
            Fetched::Status(r) => r.as_ref().err(),
            Fetched::Stats(r) => r.as_ref().err(),
            Fetched::Applications(r) => r.as_ref().err(),
            Fetched::Settings(r) => r.as_ref().err(),
        }
    }
}

#[derive(Debug)]
pub enum CommandOutcome {
    Toggle {
        target: RunState,
        result: TransportResult<()>,
    },
    /// `draft` is the exact payload that was sent.
    SaveSettings {
        draft: Settings,
        result: TransportResult<()>,
    },
    Export {
        result: TransportResult<String>,
    },
    Simulate {
        result: TransportResult<()>,
    },
}

/// Commands that may have at most one request outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Toggle,
    SaveSettings,
    Export,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommandKind::Toggle => "Start/stop",
            CommandKind::SaveSettings => "Settings save",
            CommandKind::Export => "Export",
        })
    }
}

/// Why a command was refused locally without touching the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandRejected {
    #[error("{0} already in progress")]
    InFlight(CommandKind),
    #[error("no applications to export")]
    NothingToExport,
}

/// Per-command in-flight flags; the UI disables the matching controls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InFlight {
    pub toggle: bool,
    pub save: bool,
    pub export: bool,
}

impl InFlight {
    fn slot(&mut self, kind: CommandKind) -> &mut bool {
        match kind {
            CommandKind::Toggle => &mut self.toggle,
            CommandKind::SaveSettings => &mut self.save,
            CommandKind::Export => &mut self.export,
        }
    }

    pub fn is_busy(&self, kind: CommandKind) -> bool {
        match kind {
            CommandKind::Toggle => self.toggle,
            CommandKind::SaveSettings => self.save,
            CommandKind::Export => self.export,
        }
    }

    pub fn any(&self) -> bool {
        self.toggle || self.save || self.export
    }

    pub(crate) fn begin(&mut self, kind: CommandKind) -> Result<(), CommandRejected> {
        let slot = self.slot(kind);
        if *slot {
            return Err(CommandRejected::InFlight(kind));
        }
        *slot = true;
        Ok(())
    }

    pub(crate) fn finish(&mut self, kind: CommandKind) {
        *self.slot(kind) = false;
    }
}

/// What handling one [`SyncEvent`] did to the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum Handled {
    /// Stale response, cancelled tick, superseded timer, or fire-and-forget completion.
    Ignored,
    /// A fetch result was written to the store.
    Applied(Endpoint),
    /// A fetch failed; the store kept its previous value.
    FetchFailed(Endpoint, TransportError),
    /// Something else visible changed (notice, in-flight flags, new fetches issued).
    Updated,
    /// The export finished and was delivered here.
    Exported(std::path::PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_rejected_until_finish() {
        let mut flags = InFlight::default();
        assert!(flags.begin(CommandKind::Toggle).is_ok());
        assert_eq!(
            flags.begin(CommandKind::Toggle),
            Err(CommandRejected::InFlight(CommandKind::Toggle))
        );
        assert!(flags.begin(CommandKind::Export).is_ok());
        flags.finish(CommandKind::Toggle);
        assert!(!flags.is_busy(CommandKind::Toggle));
        assert!(flags.any());
    }

    #[test]
    fn rejection_reads_as_already_in_progress() {
        let msg = CommandRejected::InFlight(CommandKind::SaveSettings).to_string();
        assert_eq!(msg, "Settings save already in progress");
    }
}
