//! Application-level orchestration.
//!
//! This module owns the submission lifecycle (busy state, the single request,
//! outcome mapping) and post-submission processing such as auto-save, exports
//! and history refresh. UI/CLI layers call into this module and talk to it
//! through the [`UiHandle`] seam.

mod controller;
mod post_process;
mod ui_handle;

pub use controller::{SubmissionController, SubmitStatus};
pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use post_process::process_submission;
pub use ui_handle::{ChannelUi, UiHandle};
