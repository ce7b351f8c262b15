//! Display surface contract and UI-thread marshalling.
//!
//! The poll loop runs on its own execution context and must never mutate
//! UI-owned state directly. [`DisplaySink`] is the capability injected into
//! the relay; the provided [`NoticeSender`] implementation posts
//! [`UiNotice`] values over a channel that the UI event loop drains on its
//! own task, so the actual mutation always happens on the UI's thread.

use tokio::sync::mpsc;

/// Display/enable-state update requests the core sends to the UI adapter.
///
/// One-way notifications: no return value is observed by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiNotice {
    /// Append a line to the visible transcript.
    Append(String),
    /// Enable or disable further text entry.
    InputEnabled(bool),
}

/// Contract for delivering text and enable-state updates to a display
/// surface that runs on a separate execution context.
///
/// Both operations must be safe to invoke from a non-UI execution context
/// by internally scheduling the actual mutation onto the UI's own thread.
/// Neither may block the caller waiting for the UI to finish.
pub trait DisplaySink: Send + 'static {
    /// Append a line to the visible transcript.
    fn append_text(&self, text: &str);

    /// Enable or disable further text entry.
    fn set_input_enabled(&self, enabled: bool);
}

/// Channel-backed [`DisplaySink`].
///
/// Sends are non-blocking; if the UI side has already gone away during
/// shutdown the notice is dropped, which is the correct behavior for a
/// one-way notification.
#[derive(Debug, Clone)]
pub struct NoticeSender {
    tx: mpsc::UnboundedSender<UiNotice>,
}

impl NoticeSender {
    /// Create a sink plus the receiver the UI event loop should drain.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DisplaySink for NoticeSender {
    fn append_text(&self, text: &str) {
        let _ = self.tx.send(UiNotice::Append(text.to_string()));
    }

    fn set_input_enabled(&self, enabled: bool) {
        let _ = self.tx.send(UiNotice::InputEnabled(enabled));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn notices_arrive_in_send_order() {
        let (sink, mut rx) = NoticeSender::channel();
        sink.append_text("a");
        sink.set_input_enabled(false);
        sink.append_text("b");

        assert_eq!(rx.try_recv().unwrap(), UiNotice::Append("a".into()));
        assert_eq!(rx.try_recv().unwrap(), UiNotice::InputEnabled(false));
        assert_eq!(rx.try_recv().unwrap(), UiNotice::Append("b".into()));
    }

    #[test]
    fn send_after_receiver_dropped_is_ignored() {
        let (sink, rx) = NoticeSender::channel();
        drop(rx);
        sink.append_text("into the void");
    }
}
