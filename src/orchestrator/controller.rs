//! Dashboard controller.
//!
//! Serializes UI commands and sync events onto one task, so the store has a single writer.

use crate::model::{FieldValue, SettingsField};
use crate::sync::{CommandRejected, Dashboard, DashboardView, Handled};
use std::path::PathBuf;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by the UI.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    ToggleRun,
    SaveDraft,
    EditDraft(SettingsField, FieldValue),
    ResetDraft,
    Export,
    Simulate,
    Refresh,
    Quit,
}

/// Messages sent back to the UI.
#[derive(Debug, Clone)]
pub(crate) enum UiUpdate {
    View(Box<DashboardView>),
    /// A command was refused locally; nothing was sent.
    Rejected(String),
    Exported(PathBuf),
}

enum Wake {
    Command(Option<UiCommand>),
    Handled(Handled),
}

fn apply(dashboard: &mut Dashboard, cmd: UiCommand) -> Result<(), CommandRejected> {
    match cmd {
        UiCommand::ToggleRun => dashboard.toggle_run().map(|_| ()),
        UiCommand::SaveDraft => dashboard.save_draft(),
        UiCommand::EditDraft(field, value) => {
            dashboard.update_draft(field, value);
            Ok(())
        }
        UiCommand::ResetDraft => {
            dashboard.reset_draft();
            Ok(())
        }
        UiCommand::Export => dashboard.export_history(),
        UiCommand::Simulate => {
            dashboard.simulate();
            Ok(())
        }
        UiCommand::Refresh => {
            dashboard.refresh();
            Ok(())
        }
        UiCommand::Quit => Ok(()),
    }
}

/// Mount the dashboard and drive it until the UI quits or goes away.
pub(crate) async fn run_controller(
    mut dashboard: Dashboard,
    update_tx: UnboundedSender<UiUpdate>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) {
    dashboard.mount();
    let _ = update_tx.send(UiUpdate::View(Box::new(dashboard.view())));

    loop {
        let wake = tokio::select! {
            cmd = cmd_rx.recv() => Wake::Command(cmd),
            handled = dashboard.step() => Wake::Handled(handled),
        };
        match wake {
            Wake::Command(None) | Wake::Command(Some(UiCommand::Quit)) => break,
            Wake::Command(Some(cmd)) => {
                if let Err(rejected) = apply(&mut dashboard, cmd) {
                    let _ = update_tx.send(UiUpdate::Rejected(rejected.to_string()));
                }
            }
            Wake::Handled(Handled::Ignored) => continue,
            Wake::Handled(Handled::Exported(path)) => {
                let _ = update_tx.send(UiUpdate::Exported(path));
            }
            Wake::Handled(_) => {}
        }
        if update_tx
            .send(UiUpdate::View(Box::new(dashboard.view())))
            .is_err()
        {
            break;
        }
    }

    dashboard.teardown();
}
