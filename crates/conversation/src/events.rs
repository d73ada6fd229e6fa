use tokio::sync::mpsc;

/// Lifecycle of the single conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Idle,
    Sending,
}

impl Phase {
    pub fn is_sending(self) -> bool {
        matches!(self, Self::Sending)
    }
}

/// Short-lived visual cue on the send affordance after an exchange settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feedback {
    Success,
    Error,
}

/// Notifications the session emits for whatever surface is drawing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged(Phase),
    StagedFileChanged(Option<String>),
    InputCleared,
    TranscriptChanged,
    Feedback(Feedback),
}

pub trait SessionObserver {
    fn on_event(&self, event: SessionEvent);
}

impl SessionObserver for mpsc::UnboundedSender<SessionEvent> {
    fn on_event(&self, event: SessionEvent) {
        if self.send(event).is_err() {
            tracing::trace!("session event receiver is gone");
        }
    }
}
