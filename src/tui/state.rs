use crate::error::FormError;
use crate::form::{DraftEntry, DraftKind, FormDraft};
use crate::model::{OutputTone, SubmissionRecord, SubmitEvent};

pub const OUTPUT_PLACEHOLDER: &str = "Fill in the form, then press s to submit.";

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Line being typed for a new or existing form row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBuffer {
    pub kind: DraftKind,
    /// Row being replaced; `None` appends a new row.
    pub target: Option<usize>,
    pub text: String,
}

pub struct UiState {
    pub tab: usize,
    pub info: String,
    pub endpoint: String,

    // Form being edited
    pub draft: FormDraft,
    pub selected: usize,
    pub editing: Option<EditBuffer>,

    // Surface driven by the submission controller
    pub submit_enabled: bool,
    pub loading_visible: bool,
    pub output: String,
    pub output_tone: OutputTone,
    pub output_scroll: u16,
    pub spinner_frame: usize,

    pub last_record: Option<SubmissionRecord>,
    pub history: Vec<SubmissionRecord>,
    pub history_selected: usize, // Index of selected history item (0 = most recent)
    pub history_loaded_count: usize,
    pub initial_history_load_size: usize, // Initial load size based on terminal height
    pub auto_save: bool,
    pub last_exported_path: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            info: String::new(),
            endpoint: String::new(),
            draft: FormDraft::default(),
            selected: 0,
            editing: None,
            submit_enabled: true,
            loading_visible: false,
            output: OUTPUT_PLACEHOLDER.to_string(),
            output_tone: OutputTone::Neutral,
            output_scroll: 0,
            spinner_frame: 0,
            last_record: None,
            history: Vec::new(),
            history_selected: 0,
            history_loaded_count: 0,
            initial_history_load_size: 50,
            auto_save: true,
            last_exported_path: None,
        }
    }
}

impl UiState {
    /// Apply a controller event to the visible surface.
    pub fn apply_event(&mut self, ev: SubmitEvent) {
        match ev {
            SubmitEvent::Busy(busy) => {
                self.submit_enabled = !busy;
                self.loading_visible = busy;
                if !busy {
                    self.spinner_frame = 0;
                }
            }
            SubmitEvent::Output { text, tone } => {
                self.output = text;
                self.output_tone = tone;
                self.output_scroll = 0;
            }
            SubmitEvent::Ignored => {
                self.info = "A submission is already in flight.".into();
            }
            SubmitEvent::Completed { record } => {
                if let Some(id) = record.outcome.thread_id() {
                    self.continue_thread(id);
                }
                self.last_record = Some(*record);
            }
        }
    }

    /// Point the draft's `thread_id` field at `id`, adding the field when
    /// missing, so the next submission stays in the same conversation.
    pub fn continue_thread(&mut self, id: i64) {
        let value = id.to_string();
        let existing = self
            .draft
            .entries
            .iter_mut()
            .find(|e| e.kind == DraftKind::Text && e.name == "thread_id");
        match existing {
            Some(entry) => entry.value = value,
            None => self.draft.push(DraftEntry::text("thread_id", value)),
        }
        self.info = format!("Continuing thread {id} (delete the thread_id row to start over)");
    }

    pub fn tick(&mut self) {
        if self.loading_visible {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER.len();
        }
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER[self.spinner_frame % SPINNER.len()]
    }

    /// The submit key is honoured only while the affordance is enabled.
    pub fn can_submit(&self) -> bool {
        self.submit_enabled && self.editing.is_none()
    }

    pub fn begin_add(&mut self, kind: DraftKind) {
        let text = match kind {
            DraftKind::Text => String::new(),
            DraftKind::File => format!("{}=", crate::model::DEFAULT_FILE_FIELD),
        };
        self.editing = Some(EditBuffer {
            kind,
            target: None,
            text,
        });
    }

    pub fn begin_edit(&mut self) {
        if let Some(entry) = self.draft.entries.get(self.selected) {
            self.editing = Some(EditBuffer {
                kind: entry.kind,
                target: Some(self.selected),
                text: entry.spec(),
            });
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Parse the edit buffer into a row. On error the buffer stays open.
    pub fn commit_edit(&mut self) -> Result<(), FormError> {
        let Some(buf) = self.editing.as_ref() else {
            return Ok(());
        };
        let entry = match buf.kind {
            DraftKind::Text => DraftEntry::parse_text(&buf.text)?,
            DraftKind::File => DraftEntry::parse_file(&buf.text)?,
        };
        match buf.target {
            Some(i) if i < self.draft.entries.len() => {
                self.draft.entries[i] = entry;
                self.selected = i;
            }
            _ => {
                self.draft.push(entry);
                self.selected = self.draft.entries.len() - 1;
            }
        }
        self.editing = None;
        Ok(())
    }

    pub fn delete_selected(&mut self) -> Option<DraftEntry> {
        if self.selected >= self.draft.entries.len() {
            return None;
        }
        let removed = self.draft.entries.remove(self.selected);
        if self.selected >= self.draft.entries.len() {
            self.selected = self.draft.entries.len().saturating_sub(1);
        }
        Some(removed)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.draft.entries.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn history_next(&mut self) {
        if self.history_selected + 1 < self.history.len() {
            self.history_selected += 1;
        }
    }

    pub fn history_prev(&mut self) {
        self.history_selected = self.history_selected.saturating_sub(1);
    }

    /// Replace history and keep the selection in range.
    pub fn set_history(&mut self, history: Vec<SubmissionRecord>) {
        self.history = history;
        self.history_loaded_count = self.history.len();
        if self.history_selected >= self.history.len() {
            self.history_selected = self.history.len().saturating_sub(1);
        }
    }

    pub fn selected_history(&self) -> Option<&SubmissionRecord> {
        self.history.get(self.history_selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FormSummary, Outcome, IN_FLIGHT_MESSAGE};
    use std::time::Duration;

    #[test]
    fn default_surface_is_idle() {
        let state = UiState::default();
        assert!(state.submit_enabled);
        assert!(!state.loading_visible);
        assert_eq!(state.output, OUTPUT_PLACEHOLDER);
        assert!(state.can_submit());
    }

    #[test]
    fn busy_events_toggle_affordance_and_indicator() {
        let mut state = UiState::default();

        state.apply_event(SubmitEvent::Busy(true));
        state.apply_event(SubmitEvent::Output {
            text: IN_FLIGHT_MESSAGE.into(),
            tone: OutputTone::Neutral,
        });
        assert!(!state.submit_enabled);
        assert!(state.loading_visible);
        assert!(!state.can_submit());
        state.tick();
        assert_eq!(state.spinner_frame, 1);

        state.apply_event(SubmitEvent::Output {
            text: "Error 422: Invalid file type".into(),
            tone: OutputTone::Error,
        });
        state.apply_event(SubmitEvent::Busy(false));

        assert!(state.submit_enabled);
        assert!(!state.loading_visible);
        assert_eq!(state.output, "Error 422: Invalid file type");
        assert_eq!(state.output_tone, OutputTone::Error);
        assert_eq!(state.spinner_frame, 0);
    }

    #[test]
    fn ignored_trigger_only_updates_info() {
        let mut state = UiState::default();
        state.apply_event(SubmitEvent::Ignored);
        assert_eq!(state.output, OUTPUT_PLACEHOLDER);
        assert!(!state.info.is_empty());
    }

    #[test]
    fn completed_event_keeps_last_record() {
        let mut state = UiState::default();
        let record = SubmissionRecord::new(
            "abcdabcdabcdabcd".into(),
            "http://x/api/process_query".into(),
            FormSummary::default(),
            Outcome::Transport {
                reason: "connection refused".into(),
            },
            Duration::from_millis(3),
        );
        state.apply_event(SubmitEvent::Completed {
            record: Box::new(record),
        });
        assert_eq!(state.last_record.unwrap().outcome.label(), "unreachable");
    }

    fn settled(thread_id: Option<i64>) -> SubmitEvent {
        let record = SubmissionRecord::new(
            "feedfacefeedface".into(),
            "http://x/api/process_query".into(),
            FormSummary::default(),
            Outcome::Success {
                text: "OK-42".into(),
                thread_id,
                model_used: Some("gemini".into()),
            },
            Duration::from_millis(12),
        );
        SubmitEvent::Completed {
            record: Box::new(record),
        }
    }

    #[test]
    fn successful_reply_carries_thread_into_next_draft() {
        let mut state = UiState::default();
        state.draft.push(DraftEntry::text("prompt", "Analyse"));

        state.apply_event(settled(Some(7)));
        assert_eq!(
            state.draft.entries,
            vec![
                DraftEntry::text("prompt", "Analyse"),
                DraftEntry::text("thread_id", "7"),
            ]
        );

        // A later reply moves the existing row instead of adding another.
        state.apply_event(settled(Some(8)));
        assert_eq!(state.draft.entries.len(), 2);
        assert_eq!(state.draft.entries[1], DraftEntry::text("thread_id", "8"));
        assert!(state.info.contains('8'));
    }

    #[test]
    fn reply_without_thread_leaves_draft_alone() {
        let mut state = UiState::default();
        state.draft.push(DraftEntry::text("prompt", "Analyse"));
        state.apply_event(settled(None));
        assert_eq!(state.draft.entries, vec![DraftEntry::text("prompt", "Analyse")]);
        assert!(state.last_record.is_some());
    }

    #[test]
    fn file_row_named_thread_id_is_not_overwritten() {
        let mut state = UiState::default();
        state.draft.push(DraftEntry::file("thread_id", "notes.txt"));
        state.continue_thread(3);
        assert_eq!(
            state.draft.entries,
            vec![
                DraftEntry::file("thread_id", "notes.txt"),
                DraftEntry::text("thread_id", "3"),
            ]
        );
    }

    #[test]
    fn adding_and_editing_rows() {
        let mut state = UiState::default();

        state.begin_add(DraftKind::Text);
        state.editing.as_mut().unwrap().text = "prompt=Analyse".into();
        state.commit_edit().unwrap();

        state.begin_add(DraftKind::File);
        assert_eq!(state.editing.as_ref().unwrap().text, "files=");
        state.editing.as_mut().unwrap().text.push_str("ventes.xlsx");
        state.commit_edit().unwrap();
        assert_eq!(state.selected, 1);

        state.select_prev();
        state.begin_edit();
        assert_eq!(state.editing.as_ref().unwrap().text, "prompt=Analyse");
        state.editing.as_mut().unwrap().text = "prompt=Stock".into();
        state.commit_edit().unwrap();

        assert_eq!(
            state.draft.entries,
            vec![
                DraftEntry::text("prompt", "Stock"),
                DraftEntry::file("files", "ventes.xlsx"),
            ]
        );
        assert!(state.editing.is_none());
    }

    #[test]
    fn invalid_edit_keeps_buffer_open() {
        let mut state = UiState::default();
        state.begin_add(DraftKind::Text);
        state.editing.as_mut().unwrap().text = "no separator".into();

        assert!(state.commit_edit().is_err());
        assert!(state.editing.is_some());
        assert!(state.draft.is_empty());
        assert!(!state.can_submit());

        state.cancel_edit();
        assert!(state.can_submit());
    }

    #[test]
    fn delete_keeps_selection_in_range() {
        let mut state = UiState::default();
        state.draft.push(DraftEntry::text("a", "1"));
        state.draft.push(DraftEntry::text("b", "2"));
        state.selected = 1;

        assert_eq!(state.delete_selected(), Some(DraftEntry::text("b", "2")));
        assert_eq!(state.selected, 0);
        assert_eq!(state.delete_selected(), Some(DraftEntry::text("a", "1")));
        assert_eq!(state.delete_selected(), None);
    }
}
