//! Text summary builder for CLI output.
//!
//! Formats the metadata lines printed (to stderr) after the output in text mode.

use crate::model::{Outcome, SubmissionRecord};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn format_bytes(n: u64) -> String {
    const KIB: f64 = 1024.0;
    let n = n as f64;
    if n >= KIB * KIB {
        format!("{:.2} MiB", n / (KIB * KIB))
    } else if n >= KIB {
        format!("{:.1} KiB", n / KIB)
    } else {
        format!("{} B", n)
    }
}

/// Build a text summary from a settled submission.
pub(crate) fn build_text_summary(record: &SubmissionRecord) -> TextSummary {
    let mut lines = Vec::new();

    lines.push(format!("Endpoint: {}", record.endpoint));
    lines.push(format!(
        "Sent: {} field(s), {} file(s) ({})",
        record.form.fields.len(),
        record.form.files.len(),
        format_bytes(record.form.total_bytes())
    ));
    for f in &record.form.files {
        lines.push(format!(
            "  {} = {} ({}, {})",
            f.field,
            f.filename,
            f.mime,
            format_bytes(f.size_bytes)
        ));
    }

    match &record.outcome {
        Outcome::Success {
            thread_id,
            model_used,
            ..
        } => {
            lines.push("Result: ok".to_string());
            if let Some(id) = thread_id {
                lines.push(format!("Thread: {id}"));
            }
            if let Some(model) = model_used.as_deref() {
                lines.push(format!("Model: {model}"));
            }
        }
        Outcome::Application { status, .. } => {
            lines.push(format!("Result: rejected (HTTP {status})"));
        }
        Outcome::Transport { reason } => {
            lines.push(format!("Result: unreachable ({reason})"));
        }
    }

    // Millisecond precision is enough for a round trip.
    let elapsed = std::time::Duration::from_millis(record.elapsed.as_millis() as u64);
    lines.push(format!("Elapsed: {}", humantime::format_duration(elapsed)));

    TextSummary { lines }
}
