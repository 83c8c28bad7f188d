use crate::model::{OutputTone, SubmitEvent};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// The UI surface a submission drives: submit affordance, loading indicator
/// and output element.
pub trait UiHandle: Send + Sync {
    /// `true` disables the submit affordance and shows the loading indicator;
    /// `false` restores both.
    fn set_busy(&self, busy: bool);

    fn set_output(&self, text: &str, tone: OutputTone);
}

impl<U: UiHandle + ?Sized> UiHandle for Arc<U> {
    fn set_busy(&self, busy: bool) {
        (**self).set_busy(busy)
    }

    fn set_output(&self, text: &str, tone: OutputTone) {
        (**self).set_output(text, tone)
    }
}

/// Forwards UI writes to the presentation thread as [`SubmitEvent`]s.
#[derive(Clone)]
pub struct ChannelUi {
    tx: UnboundedSender<SubmitEvent>,
}

impl ChannelUi {
    pub fn new(tx: UnboundedSender<SubmitEvent>) -> Self {
        Self { tx }
    }
}

impl UiHandle for ChannelUi {
    fn set_busy(&self, busy: bool) {
        // A closed channel means the UI is gone; nothing left to update.
        let _ = self.tx.send(SubmitEvent::Busy(busy));
    }

    fn set_output(&self, text: &str, tone: OutputTone) {
        let _ = self.tx.send(SubmitEvent::Output {
            text: text.to_string(),
            tone,
        });
    }
}
