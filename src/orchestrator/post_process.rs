//! Post-submission processing.
//!
//! Handles auto-save, exports and history refresh after a submission settles.

use crate::cli::Cli;
use crate::model::SubmissionRecord;
use crate::storage;

/// Result of post-submission processing, ready for presentation layers.
pub(crate) struct ProcessedSubmission {
    pub export_messages: Vec<String>,
    pub history: Vec<SubmissionRecord>,
    pub auto_saved_path: Option<std::path::PathBuf>,
}

/// Process a settled submission: auto-save, export, and reload `history_load`
/// recent records (none when zero).
pub(crate) fn process_submission(
    args: &Cli,
    history_load: usize,
    auto_save: bool,
    record: &SubmissionRecord,
) -> ProcessedSubmission {
    let auto_saved_path = if auto_save {
        match storage::save_record(record) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "auto-save failed");
                None
            }
        }
    } else {
        None
    };

    let mut export_messages = Vec::new();
    if let Some(export_path) = args.export_json.as_deref() {
        match storage::export_json(export_path, record) {
            Ok(_) => export_messages.push(format!("Exported JSON: {}", export_path.display())),
            Err(e) => export_messages.push(format!("Export JSON failed: {e:#}")),
        }
    }

    let history = if history_load == 0 {
        Vec::new()
    } else {
        storage::load_recent(history_load).unwrap_or_default()
    };

    ProcessedSubmission {
        export_messages,
        history,
        auto_saved_path,
    }
}
