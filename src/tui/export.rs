use crate::model::SubmissionRecord;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

// Clipboard worker channel, started on first copy
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// File name used when exporting a record from the TUI.
pub fn export_file_name(r: &SubmissionRecord) -> String {
    format!(
        "query-submit-{}-{}.json",
        r.timestamp_utc.replace(':', "-").replace('T', "_"),
        r.short_id()
    )
}

/// Export a record as JSON into `dir`. Returns the written path.
pub fn export_record_json_in(dir: &Path, r: &SubmissionRecord) -> Result<PathBuf> {
    let path = dir.join(export_file_name(r));
    crate::storage::export_json(&path, r)?;
    Ok(path)
}

/// Export a record as JSON into the current directory.
pub fn export_record_json(r: &SubmissionRecord) -> Result<PathBuf> {
    let current_dir = std::env::current_dir().context("get current directory")?;
    export_record_json_in(&current_dir, r)
}

/// One worker thread owns clipboard access. Each instance is held for a
/// couple of seconds so Linux clipboard managers can pick the contents up.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                match Clipboard::new() {
                    Ok(mut clipboard) => match clipboard.set_text(&text) {
                        Ok(()) => std::thread::sleep(Duration::from_secs(2)),
                        Err(e) => tracing::warn!(error = %e, "clipboard write failed"),
                    },
                    Err(e) => tracing::warn!(error = %e, "clipboard unavailable"),
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Queue text for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}
