//! Outbound publish path.
//!
//! Turns locally entered text into bus messages. Fire-and-forget: the input
//! surface is cleared by the UI before any broker acknowledgment, and a
//! failed send is reported inline so the user can retry the same text.

use std::sync::Arc;

use crate::{
    bus::BusProducer,
    display::DisplaySink,
    error::RelayError,
    relay::SharedState,
    session::SessionState,
};

/// Prefix applied to the local echo of an outbound line.
const LOCAL_ECHO_PREFIX: &str = "CLIENT - ";

/// Outbound publisher.
///
/// Owns the producer handle exclusively and is invoked from the UI's own
/// execution context; `publish` does not block on network acknowledgment,
/// so this is a plain synchronous call path.
pub struct Publisher<P: BusProducer, S: DisplaySink> {
    producer: P,
    topic: String,
    sink: S,
    shared: Arc<SharedState>,
}

impl<P: BusProducer, S: DisplaySink> Publisher<P, S> {
    pub(crate) fn new(producer: P, topic: String, sink: S, shared: Arc<SharedState>) -> Self {
        Self { producer, topic, sink, shared }
    }

    /// Publish one raw text line, unchanged and keyless, then echo it
    /// locally as `CLIENT - {text}`.
    ///
    /// A broker-side publish failure is reported inline through the display
    /// sink and the call still returns `Ok`; input stays enabled so the
    /// user may retry.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::SessionClosed`] once the session has closed;
    /// this is always reported to the caller, never silently ignored.
    pub fn send(&self, text: &str) -> Result<(), RelayError> {
        if self.shared.session_state() == SessionState::Closed {
            return Err(RelayError::SessionClosed);
        }

        match self.producer.publish(&self.topic, None, text) {
            Ok(()) => {
                self.sink.append_text(&format!("{LOCAL_ECHO_PREFIX}{text}"));
                Ok(())
            },
            Err(error) => {
                tracing::warn!(%error, "publish failed");
                self.sink.append_text(&format!(
                    "Unable to send message ({error}). Please retry."
                ));
                Ok(())
            },
        }
    }

    /// Release the producer handle. Idempotent.
    pub(crate) fn close(&mut self) {
        self.producer.close();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Clone, Default)]
    struct RecordingSink {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl DisplaySink for RecordingSink {
        fn append_text(&self, text: &str) {
            self.lines.lock().unwrap().push(text.to_string());
        }

        fn set_input_enabled(&self, _enabled: bool) {}
    }

    #[derive(Default)]
    struct CapturingProducer {
        sent: Arc<Mutex<Vec<(String, Option<String>, String)>>>,
    }

    impl BusProducer for CapturingProducer {
        fn publish(&self, topic: &str, key: Option<&str>, value: &str) -> Result<(), RelayError> {
            self.sent.lock().unwrap().push((
                topic.to_string(),
                key.map(str::to_string),
                value.to_string(),
            ));
            Ok(())
        }

        fn close(&mut self) {}
    }

    struct FailingProducer;

    impl BusProducer for FailingProducer {
        fn publish(&self, _: &str, _: Option<&str>, _: &str) -> Result<(), RelayError> {
            Err(RelayError::Publish("broker unavailable".to_string()))
        }

        fn close(&mut self) {}
    }

    #[test]
    fn text_is_published_unchanged_and_echoed_with_prefix() {
        let producer = CapturingProducer::default();
        let sent = Arc::clone(&producer.sent);
        let sink = RecordingSink::default();
        let lines = Arc::clone(&sink.lines);
        let shared = Arc::new(SharedState::new(SessionState::Running));

        let publisher = Publisher::new(producer, "demo".to_string(), sink, shared);
        publisher.send("hello").unwrap();

        assert_eq!(
            sent.lock().unwrap().as_slice(),
            &[("demo".to_string(), None, "hello".to_string())]
        );
        assert_eq!(lines.lock().unwrap().as_slice(), &["CLIENT - hello".to_string()]);
    }

    #[test]
    fn publish_failure_is_reported_inline_not_propagated() {
        let sink = RecordingSink::default();
        let lines = Arc::clone(&sink.lines);
        let shared = Arc::new(SharedState::new(SessionState::Running));

        let publisher = Publisher::new(FailingProducer, "demo".to_string(), sink, shared);
        assert!(publisher.send("hello").is_ok());

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("broker unavailable"));
        assert!(lines[0].contains("retry"));
    }

    #[test]
    fn send_after_close_fails_with_session_closed() {
        let shared = Arc::new(SharedState::new(SessionState::Running));
        let publisher = Publisher::new(
            CapturingProducer::default(),
            "demo".to_string(),
            RecordingSink::default(),
            Arc::clone(&shared),
        );

        shared.set_session_state(SessionState::Closed);
        assert_eq!(publisher.send("hello"), Err(RelayError::SessionClosed));
    }
}
