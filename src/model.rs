use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed path of the backend endpoint every submission is posted to.
pub const PROCESS_QUERY_PATH: &str = "/api/process_query";

/// Output text shown while a submission is in flight.
pub const IN_FLIGHT_MESSAGE: &str = "Processing request…";

/// Output text shown when no structured response could be obtained.
pub const CONNECTION_FAILURE_MESSAGE: &str = "Connection error: unable to reach the server.";

/// Used in place of `detail` when an error body does not carry one.
pub const FALLBACK_DETAIL: &str = "Unknown error";

/// Field name used for file parts when none is given.
pub const DEFAULT_FILE_FIELD: &str = "files";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitConfig {
    pub base_url: String,
    pub endpoint: String,
    pub user_agent: String,
    pub certificate_path: Option<std::path::PathBuf>,
}

/// Colour class of the output element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputTone {
    #[default]
    Neutral,
    Error,
}

/// How a settled submission ended. Exactly one of these is shown per submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// 2xx with a parsed body.
    Success {
        text: String,
        #[serde(default)]
        thread_id: Option<i64>,
        #[serde(default)]
        model_used: Option<String>,
    },
    /// The backend answered with a non-2xx status.
    Application { status: u16, detail: Option<String> },
    /// No structured response was obtained.
    Transport { reason: String },
}

impl Outcome {
    /// Text written to the output element.
    pub fn display_text(&self) -> String {
        match self {
            Outcome::Success { text, .. } => text.clone(),
            Outcome::Application { status, detail } => format!(
                "Error {}: {}",
                status,
                detail.as_deref().unwrap_or(FALLBACK_DETAIL)
            ),
            Outcome::Transport { .. } => CONNECTION_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn tone(&self) -> OutputTone {
        match self {
            Outcome::Success { .. } => OutputTone::Neutral,
            Outcome::Application { .. } | Outcome::Transport { .. } => OutputTone::Error,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Application { status, .. } => Some(*status),
            Outcome::Transport { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Backend conversation a successful submission landed in.
    pub fn thread_id(&self) -> Option<i64> {
        match self {
            Outcome::Success { thread_id, .. } => *thread_id,
            _ => None,
        }
    }

    /// Short label for list views.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "ok",
            Outcome::Application { .. } => "rejected",
            Outcome::Transport { .. } => "unreachable",
        }
    }
}

/// Metadata of a file part kept in the submission record (content is not stored).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub field: String,
    pub filename: String,
    pub mime: String,
    pub size_bytes: u64,
}

/// What was sent, without file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSummary {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FileSummary>,
}

impl FormSummary {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }
}

/// Events emitted by the controller loop and consumed by the UI thread.
#[derive(Debug, Clone)]
pub enum SubmitEvent {
    Busy(bool),
    Output { text: String, tone: OutputTone },
    /// A second trigger arrived while a submission was still running.
    Ignored,
    Completed {
        // Boxed to keep the event small.
        record: Box<SubmissionRecord>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: String,
    #[serde(default)]
    pub timestamp_utc: String,
    pub endpoint: String,
    pub form: FormSummary,
    pub outcome: Outcome,
    pub output: String,
    pub tone: OutputTone,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
}

impl SubmissionRecord {
    pub fn new(
        id: String,
        endpoint: String,
        form: FormSummary,
        outcome: Outcome,
        elapsed: Duration,
    ) -> Self {
        Self {
            id,
            timestamp_utc: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "now".into()),
            endpoint,
            form,
            output: outcome.display_text(),
            tone: outcome.tone(),
            outcome,
            elapsed,
        }
    }

    /// Up to eight alphanumeric characters of the id, safe for file names.
    pub fn short_id(&self) -> String {
        self.id
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(8)
            .collect()
    }

    /// First line of the output, trimmed for list rows.
    pub fn headline(&self, max_chars: usize) -> String {
        let first = self.output.lines().next().unwrap_or("").trim();
        if first.chars().count() > max_chars {
            let cut: String = first.chars().take(max_chars.saturating_sub(1)).collect();
            format!("{cut}…")
        } else {
            first.to_string()
        }
    }
}
