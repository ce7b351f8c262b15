//! Session state machine.
//!
//! Pure machine governing the relay lifecycle: subscription at startup, the
//! bounded poll loop, detection of the reserved termination token, and
//! shutdown. No I/O happens here; the driver executes the returned actions.

use crate::{
    error::RelayError,
    event::{SessionAction, SessionEvent},
    message::Message,
};

/// Lifecycle state of a session.
///
/// States only move forward through
/// `Starting -> Running -> Closing -> Closed`; no state is revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    /// Subscription in progress.
    Starting,
    /// Poll loop active, messages flowing.
    Running,
    /// Termination observed; input disabled, handles being released.
    Closing,
    /// Terminal. No further delivery or publish is attempted.
    Closed,
}

impl SessionState {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::Starting => 0,
            Self::Running => 1,
            Self::Closing => 2,
            Self::Closed => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Starting,
            1 => Self::Running,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// The relay's session state machine.
///
/// Exactly one session exists per relay instance. It owns the lifecycle of
/// the bus handles conceptually; the driver holds them and executes the
/// [`SessionAction::CloseBus`] release exactly once.
#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    termination_token: String,
}

impl Session {
    /// Create a session in `Starting` with the given termination token.
    pub fn new(termination_token: impl Into<String>) -> Self {
        Self { state: SessionState::Starting, termination_token: termination_token.into() }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Terminal-detection predicate: does this payload equal the reserved
    /// termination token?
    pub fn is_termination(&self, value: &str) -> bool {
        value == self.termination_token
    }

    /// Process an event and return actions for the driver.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::SessionClosed`] for any event handled after the
    /// session reached `Closed`.
    pub fn handle(&mut self, event: SessionEvent) -> Result<Vec<SessionAction>, RelayError> {
        if self.state == SessionState::Closed {
            return Err(RelayError::SessionClosed);
        }

        match event {
            SessionEvent::Subscribed => {
                if self.state == SessionState::Starting {
                    self.state = SessionState::Running;
                }
                Ok(Vec::new())
            },

            SessionEvent::Batch(messages) => Ok(self.handle_batch(messages)),

            SessionEvent::PollFailed(error) => {
                if self.state == SessionState::Running && error.is_connection_fatal() {
                    let mut actions = vec![SessionAction::Report(error)];
                    actions.extend(self.begin_close());
                    Ok(actions)
                } else {
                    Ok(vec![SessionAction::Report(error)])
                }
            },

            SessionEvent::CloseRequested => {
                if self.state == SessionState::Closing {
                    Ok(Vec::new())
                } else {
                    Ok(self.begin_close())
                }
            },
        }
    }

    /// Acknowledge that the bus handles were released.
    ///
    /// Idempotent; calling it on an already-closed session is a no-op.
    pub fn complete_close(&mut self) {
        self.state = SessionState::Closed;
    }

    /// Drain a batch, forwarding in arrival order until the termination
    /// token.
    ///
    /// Messages preceding the token in the batch are still delivered (they
    /// were sent before termination); the token itself and everything after
    /// it are not.
    fn handle_batch(&mut self, messages: Vec<Message>) -> Vec<SessionAction> {
        if self.state != SessionState::Running {
            return Vec::new();
        }

        let mut actions = Vec::with_capacity(messages.len());
        for message in messages {
            if self.is_termination(&message.value) {
                actions.extend(self.begin_close());
                break;
            }
            actions.push(SessionAction::Forward(message));
        }
        actions
    }

    /// Transition to `Closing` and emit the shutdown sequence.
    fn begin_close(&mut self) -> Vec<SessionAction> {
        self.state = SessionState::Closing;
        vec![SessionAction::DisableInput, SessionAction::CloseBus]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::END_OF_SESSION;

    fn running_session() -> Session {
        let mut session = Session::new(END_OF_SESSION);
        let actions = session.handle(SessionEvent::Subscribed).unwrap();
        assert!(actions.is_empty());
        assert_eq!(session.state(), SessionState::Running);
        session
    }

    fn line(value: &str, offset: i64) -> Message {
        Message::new("demo", value, 0, offset)
    }

    #[test]
    fn batch_is_forwarded_in_arrival_order() {
        let mut session = running_session();
        let actions = session
            .handle(SessionEvent::Batch(vec![line("a", 0), line("b", 1), line("c", 2)]))
            .unwrap();

        let forwarded: Vec<&str> = actions
            .iter()
            .filter_map(|a| match a {
                SessionAction::Forward(m) => Some(m.value.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(forwarded, ["a", "b", "c"]);
        assert_eq!(session.state(), SessionState::Running);
    }

    #[test]
    fn token_stops_the_batch_but_keeps_the_prefix() {
        let mut session = running_session();
        let actions = session
            .handle(SessionEvent::Batch(vec![
                line("a", 0),
                line(END_OF_SESSION, 1),
                line("late", 2),
            ]))
            .unwrap();

        assert_eq!(
            actions,
            vec![
                SessionAction::Forward(line("a", 0)),
                SessionAction::DisableInput,
                SessionAction::CloseBus,
            ]
        );
        assert_eq!(session.state(), SessionState::Closing);
    }

    #[test]
    fn no_delivery_once_closing() {
        let mut session = running_session();
        session.handle(SessionEvent::Batch(vec![line(END_OF_SESSION, 0)])).unwrap();

        let actions = session.handle(SessionEvent::Batch(vec![line("late", 1)])).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn transient_poll_failure_keeps_running() {
        let mut session = running_session();
        let error = RelayError::Poll { message: "bad payload".into(), fatal: false };
        let actions = session.handle(SessionEvent::PollFailed(error.clone())).unwrap();

        assert_eq!(actions, vec![SessionAction::Report(error)]);
        assert_eq!(session.state(), SessionState::Running);
    }

    #[test]
    fn fatal_poll_failure_forces_closing() {
        let mut session = running_session();
        let error = RelayError::Poll { message: "all brokers down".into(), fatal: true };
        let actions = session.handle(SessionEvent::PollFailed(error.clone())).unwrap();

        assert_eq!(
            actions,
            vec![
                SessionAction::Report(error),
                SessionAction::DisableInput,
                SessionAction::CloseBus,
            ]
        );
        assert_eq!(session.state(), SessionState::Closing);
    }

    #[test]
    fn close_request_from_running_emits_shutdown_sequence() {
        let mut session = running_session();
        let actions = session.handle(SessionEvent::CloseRequested).unwrap();
        assert_eq!(actions, vec![SessionAction::DisableInput, SessionAction::CloseBus]);
        assert_eq!(session.state(), SessionState::Closing);

        // A second request while closing is a no-op.
        assert!(session.handle(SessionEvent::CloseRequested).unwrap().is_empty());
    }

    #[test]
    fn handle_after_closed_fails_with_session_closed() {
        let mut session = running_session();
        session.handle(SessionEvent::CloseRequested).unwrap();
        session.complete_close();
        assert_eq!(session.state(), SessionState::Closed);

        let result = session.handle(SessionEvent::Batch(vec![line("a", 0)]));
        assert_eq!(result, Err(RelayError::SessionClosed));
    }

    #[test]
    fn complete_close_is_idempotent() {
        let mut session = running_session();
        session.handle(SessionEvent::CloseRequested).unwrap();
        session.complete_close();
        session.complete_close();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn states_only_move_forward() {
        let mut session = Session::new(END_OF_SESSION);
        assert_eq!(session.state(), SessionState::Starting);
        session.handle(SessionEvent::Subscribed).unwrap();
        // A stray Subscribed never moves the state backwards.
        session.handle(SessionEvent::CloseRequested).unwrap();
        session.handle(SessionEvent::Subscribed).unwrap();
        assert_eq!(session.state(), SessionState::Closing);
    }

    #[test]
    fn state_encoding_round_trips() {
        for state in [
            SessionState::Starting,
            SessionState::Running,
            SessionState::Closing,
            SessionState::Closed,
        ] {
            assert_eq!(SessionState::from_u8(state.as_u8()), state);
        }
    }
}
