//! Client-side synchronization: cached state, periodic refresh and command dispatch.

mod dashboard;
mod events;
mod poller;
mod store;

pub use dashboard::{
    Dashboard, DashboardView, EXPORT_FAILED_MESSAGE, SAVE_FAILED_MESSAGE, SETTINGS_SAVED_MESSAGE,
    TOGGLE_FAILED_MESSAGE,
};
pub use events::{CommandKind, CommandOutcome, CommandRejected, Fetched, Handled, InFlight, SyncEvent};
pub use poller::{Poller, PollerState};
pub use store::{Endpoint, Notice, NoticeKind, StateStore, Ticket};
