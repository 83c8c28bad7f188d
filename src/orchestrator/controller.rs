//! Submission lifecycle controller.
//!
//! Owns the Idle → Busy → Idle transition around one request and the loop that
//! turns UI commands into submissions and reports settled ones back.

use super::ui_handle::UiHandle;
use crate::engine::{interpret, Transport};
use crate::error::TransportError;
use crate::form::FormSubmission;
use crate::model::{
    Outcome, OutputTone, SubmissionRecord, SubmitEvent, IN_FLIGHT_MESSAGE,
};
use anyhow::Result;
use rand::RngCore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;

/// Commands emitted by UI layers.
#[derive(Debug)]
pub(crate) enum UiCommand {
    Submit(FormSubmission),
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitStatus {
    Settled(Outcome),
    /// Another submission was still in flight; nothing was sent or shown.
    Ignored,
}

/// Runs one request per trigger and keeps the UI consistent around it.
pub struct SubmissionController<T, U> {
    transport: T,
    ui: U,
    in_flight: AtomicBool,
}

/// Leaves the busy state when dropped, on every exit path of `submit`.
struct BusyGuard<'a, U: UiHandle> {
    ui: &'a U,
    in_flight: &'a AtomicBool,
}

impl<U: UiHandle> Drop for BusyGuard<'_, U> {
    fn drop(&mut self) {
        self.ui.set_busy(false);
        self.in_flight.store(false, Ordering::Release);
    }
}

impl<T: Transport, U: UiHandle> SubmissionController<T, U> {
    pub fn new(transport: T, ui: U) -> Self {
        Self {
            transport,
            ui,
            in_flight: AtomicBool::new(false),
        }
    }

    #[cfg(test)]
    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submit a captured form and settle the UI.
    ///
    /// Exactly one of the success text, the structured error text or the
    /// connection-failure text is written before the busy state is cleared.
    /// A call made while another submission is in flight returns
    /// [`SubmitStatus::Ignored`] without side effects.
    pub async fn submit(&self, form: FormSubmission) -> SubmitStatus {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("submission ignored: another request is in flight");
            return SubmitStatus::Ignored;
        }

        self.ui.set_busy(true);
        let _busy = BusyGuard {
            ui: &self.ui,
            in_flight: &self.in_flight,
        };
        self.ui.set_output(IN_FLIGHT_MESSAGE, OutputTone::Neutral);
        tracing::debug!(endpoint = self.endpoint(), parts = form.len(), "submission started");
        if form.is_empty() {
            tracing::info!("submitting a form with no parts");
        }

        let outcome = match self.exchange(form).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    endpoint = self.endpoint(),
                    error = %e,
                    "submission failed before a structured response"
                );
                Outcome::Transport {
                    reason: e.to_string(),
                }
            }
        };

        self.ui.set_output(&outcome.display_text(), outcome.tone());
        SubmitStatus::Settled(outcome)
    }

    /// Submit and wrap the settled outcome in a [`SubmissionRecord`].
    pub async fn submit_recorded(&self, form: FormSubmission) -> Option<SubmissionRecord> {
        let summary = form.summary();
        let started = Instant::now();
        match self.submit(form).await {
            SubmitStatus::Settled(outcome) => Some(SubmissionRecord::new(
                gen_submission_id(),
                self.endpoint().to_string(),
                summary,
                outcome,
                started.elapsed(),
            )),
            SubmitStatus::Ignored => None,
        }
    }

    async fn exchange(&self, form: FormSubmission) -> Result<Outcome, TransportError> {
        let raw = self.transport.post_form(form).await?;
        tracing::info!(status = raw.status, "backend answered");
        interpret(&raw)
    }
}

/// Random identifier for a submission record.
pub fn gen_submission_id() -> String {
    let mut b = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut b);
    b.iter().map(|x| format!("{x:02x}")).collect()
}

/// Feed UI commands into the controller and report settled submissions.
///
/// Each submission runs as its own task so the loop keeps accepting commands;
/// the controller's in-flight flag turns overlapping triggers into
/// [`SubmitEvent::Ignored`]. Quitting drops whatever is still in flight.
pub(crate) async fn run_controller<T, U>(
    controller: Arc<SubmissionController<T, U>>,
    event_tx: UnboundedSender<SubmitEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()>
where
    T: Transport + 'static,
    U: UiHandle + 'static,
{
    let mut tasks: JoinSet<Option<SubmissionRecord>> = JoinSet::new();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Submit(form)) => {
                        if controller.is_in_flight() {
                            tracing::debug!("submit requested while a submission is in flight");
                        }
                        let controller = controller.clone();
                        tasks.spawn(async move { controller.submit_recorded(form).await });
                    }
                    Some(UiCommand::Quit) | None => break,
                }
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                match joined {
                    Ok(Some(record)) => {
                        let _ = event_tx.send(SubmitEvent::Completed { record: Box::new(record) });
                    }
                    Ok(None) => {
                        let _ = event_tx.send(SubmitEvent::Ignored);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "submission task failed");
                    }
                }
            }
        }
    }

    if !tasks.is_empty() {
        tracing::info!(pending = tasks.len(), "quitting with submissions still in flight");
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
