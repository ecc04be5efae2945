//! Application-level orchestration.
//!
//! Owns the mounted dashboard for the lifetime of the TUI and relays commands and
//! snapshots between it and the UI thread.

mod controller;

pub(crate) use controller::{run_controller, UiCommand, UiUpdate};
