//! Relay driver.
//!
//! Wires the pure [`Session`] machine to real handles: subscribes at
//! startup, runs the bounded poll loop on a dedicated thread, executes the
//! actions the session produces, and exposes the outbound publish path to
//! the UI context.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU8, Ordering},
    },
    thread,
    time::Duration,
};

use crate::{
    bus::{BusConsumer, BusProducer},
    config::RelayConfig,
    display::DisplaySink,
    error::RelayError,
    event::{SessionAction, SessionEvent},
    publisher::Publisher,
    session::{Session, SessionState},
};

/// Session state mirror shared between the poll loop and the UI context.
///
/// The poll loop owns the canonical [`Session`]; this mirror lets the
/// publisher refuse sends after close and lets shutdown requests reach the
/// loop with bounded latency (at most one poll timeout).
#[derive(Debug)]
pub(crate) struct SharedState {
    state: AtomicU8,
    shutdown: AtomicBool,
}

impl SharedState {
    pub(crate) fn new(state: SessionState) -> Self {
        Self { state: AtomicU8::new(state.as_u8()), shutdown: AtomicBool::new(false) }
    }

    pub(crate) fn session_state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_session_state(&self, state: SessionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

/// A running relay instance.
///
/// Construction performs the subscription (`Starting`); a connection
/// failure there aborts construction and is surfaced to the caller. On
/// success the poll loop thread is spawned (`Running`) and inbound text
/// flows to the display sink until the termination token arrives, a fatal
/// poll failure occurs, or [`Relay::close`] is called.
pub struct Relay<P: BusProducer, S: DisplaySink> {
    publisher: Publisher<P, S>,
    shared: Arc<SharedState>,
    poll_thread: Option<thread::JoinHandle<()>>,
}

impl<P: BusProducer, S: DisplaySink + Clone> Relay<P, S> {
    /// Subscribe and start the poll loop.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Connection`] if the subscription fails; the
    /// relay is not constructed and nothing is retried.
    pub fn start<C: BusConsumer>(
        config: RelayConfig,
        producer: P,
        mut consumer: C,
        sink: S,
    ) -> Result<Self, RelayError> {
        let mut session = Session::new(config.termination_token);
        consumer.subscribe(&config.topic)?;
        session.handle(SessionEvent::Subscribed)?;
        tracing::info!(topic = %config.topic, group = %config.group_id, "session running");

        let shared = Arc::new(SharedState::new(session.state()));
        let loop_shared = Arc::clone(&shared);
        let loop_sink = sink.clone();
        let poll_timeout = config.poll_timeout;
        let poll_thread = thread::Builder::new()
            .name("partyline-poll".to_string())
            .spawn(move || run_poll_loop(consumer, session, &loop_shared, &loop_sink, poll_timeout))
            .map_err(|e| RelayError::Connection(format!("failed to spawn poll loop: {e}")))?;

        let publisher = Publisher::new(producer, config.topic, sink, Arc::clone(&shared));
        Ok(Self { publisher, shared, poll_thread: Some(poll_thread) })
    }

    /// Publish one locally entered line. See [`Publisher::send`].
    pub fn send_line(&self, text: &str) -> Result<(), RelayError> {
        self.publisher.send(text)
    }

    /// Current session state as observed by the UI context.
    pub fn state(&self) -> SessionState {
        self.shared.session_state()
    }

    /// Request shutdown and release all handles.
    ///
    /// Idempotent. The poll loop observes the request within one poll
    /// timeout; this call joins the loop thread and then closes the
    /// producer handle, so every broker handle is released exactly once.
    ///
    /// On a token-driven shutdown the consumer handle is released by the
    /// poll loop itself, while the producer handle stays open past
    /// `Closed` until this call (or drop); a `send_line` in that window
    /// fails with [`RelayError::SessionClosed`] before the handle is
    /// touched.
    pub fn close(&mut self) {
        self.shared.request_shutdown();
        if let Some(handle) = self.poll_thread.take() {
            if handle.join().is_err() {
                tracing::error!("poll loop thread panicked during shutdown");
                self.shared.set_session_state(SessionState::Closed);
            }
        }
        self.publisher.close();
    }
}

impl<P: BusProducer, S: DisplaySink> Drop for Relay<P, S> {
    fn drop(&mut self) {
        self.shared.request_shutdown();
        if let Some(handle) = self.poll_thread.take() {
            let _ = handle.join();
        }
        self.publisher.close();
    }
}

/// The bounded poll loop.
///
/// Runs unattended on its own thread, blocking synchronously inside
/// `poll(timeout)` and nowhere else. Every effect goes through the display
/// sink's marshalling path or the consumer handle this loop exclusively
/// owns.
fn run_poll_loop<C: BusConsumer, S: DisplaySink>(
    mut consumer: C,
    mut session: Session,
    shared: &SharedState,
    sink: &S,
    poll_timeout: Duration,
) {
    loop {
        if session.state() == SessionState::Closed {
            break;
        }

        let event = if shared.shutdown_requested() && session.state() == SessionState::Running {
            SessionEvent::CloseRequested
        } else {
            match consumer.poll(poll_timeout) {
                Ok(batch) => {
                    if batch.is_empty() {
                        continue;
                    }
                    SessionEvent::Batch(batch)
                },
                Err(error) => SessionEvent::PollFailed(error),
            }
        };

        match session.handle(event) {
            Ok(actions) => {
                execute_actions(actions, &mut consumer, &mut session, sink);
                shared.set_session_state(session.state());
            },
            Err(error) => {
                // Only possible once the session is already closed.
                tracing::warn!(%error, "session rejected event");
                break;
            },
        }
    }
    shared.set_session_state(session.state());
}

/// Execute one batch of session actions against the real handles.
fn execute_actions<C: BusConsumer, S: DisplaySink>(
    actions: Vec<SessionAction>,
    consumer: &mut C,
    session: &mut Session,
    sink: &S,
) {
    for action in actions {
        match action {
            SessionAction::Forward(message) => {
                tracing::debug!(
                    partition = message.partition,
                    offset = message.offset,
                    "forwarding inbound line"
                );
                sink.append_text(&message.value);
            },
            SessionAction::DisableInput => sink.set_input_enabled(false),
            SessionAction::Report(error) => {
                tracing::warn!(%error, "poll loop failure reported");
            },
            SessionAction::CloseBus => {
                consumer.close();
                session.complete_close();
                tracing::info!("session closed");
            },
        }
    }
}
