use super::events::SyncEvent;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Active,
}

/// Periodic refresh timer, active exactly while the service is known to be running.
///
/// Every activation gets a fresh epoch. Ticks carry the epoch they were produced
/// under, so a tick already queued when the poller is stopped is recognizably stale.
#[derive(Debug)]
pub struct Poller {
    period: Duration,
    epoch: u64,
    task: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            epoch: 0,
            task: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn state(&self) -> PollerState {
        if self.task.is_some() {
            PollerState::Active
        } else {
            PollerState::Idle
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// Begin ticking. The first tick fires one period from now. No-op if already active.
    pub fn start(&mut self, tx: UnboundedSender<SyncEvent>) -> bool {
        if self.task.is_some() {
            return false;
        }
        self.epoch += 1;
        let epoch = self.epoch;
        let period = self.period;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(SyncEvent::PollTick { epoch }).is_err() {
                    break;
                }
            }
        }));
        true
    }

    pub fn stop(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Whether a tick produced under `epoch` belongs to the current activation.
    pub fn accepts(&self, epoch: u64) -> bool {
        self.task.is_some() && epoch == self.epoch
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}
