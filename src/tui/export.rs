//! Clipboard handoff for exported file paths.
//!
//! On Linux the clipboard contents vanish with the `Clipboard` that set them, so a
//! background thread holds each one for a while instead of dropping it immediately.

use anyhow::{anyhow, Result};
use std::sync::mpsc::{self, Sender};
use std::sync::OnceLock;
use std::time::Duration;

const HOLD: Duration = Duration::from_secs(2);

static CLIPBOARD_WORKER: OnceLock<Sender<String>> = OnceLock::new();

fn clipboard_worker() -> &'static Sender<String> {
    CLIPBOARD_WORKER.get_or_init(|| {
        let (tx, rx) = mpsc::channel::<String>();
        std::thread::spawn(move || {
            for text in rx {
                match arboard::Clipboard::new() {
                    Ok(mut clipboard) => match clipboard.set_text(text) {
                        Ok(()) => std::thread::sleep(HOLD),
                        Err(err) => log::warn!("clipboard write failed: {err}"),
                    },
                    Err(err) => log::warn!("clipboard unavailable: {err}"),
                }
            }
        });
        tx
    })
}

/// Queue `text` for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    clipboard_worker()
        .send(text.to_string())
        .map_err(|_| anyhow!("clipboard worker has stopped"))
}

/// Shorten long paths for the status line.
pub fn abbreviate(path: &str, max: usize) -> String {
    let count = path.chars().count();
    if count <= max {
        return path.to_string();
    }
    let keep = max.saturating_sub(3);
    let tail: String = path.chars().skip(count - keep).collect();
    format!("...{tail}")
}
