//! Client for a remote job-application automation service.
//!
//! The [`sync::Dashboard`] keeps a local mirror of the service's status, stats,
//! history and settings, polls while the service runs, and dispatches the
//! start/stop, save, export and simulate commands. Presentation lives in
//! [`cli`] (headless modes) and the optional TUI.

pub mod cli;
pub mod export;
pub mod logging;
pub mod model;
pub mod sync;
pub mod text_summary;
pub mod transport;

#[cfg(feature = "tui")]
mod orchestrator;
#[cfg(feature = "tui")]
mod tui;
