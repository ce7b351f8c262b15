//! Error taxonomy for the relay.
//!
//! Every failure category is recovered at the boundary where it occurs and
//! converted into either a continued loop iteration or a user-visible inline
//! notification; none may terminate the hosting process. The only
//! unrecoverable condition is startup connection failure, which aborts
//! construction of the whole relay.

use thiserror::Error;

/// Errors produced by the relay and its bus backends.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelayError {
    /// Cannot establish or subscribe at startup. Fatal to session
    /// construction; never retried automatically.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Failure while draining a batch. Reported and the loop continues,
    /// unless classified connection-fatal.
    #[error("poll failed: {message}")]
    Poll {
        /// Human-readable failure description.
        message: String,
        /// Whether the failure indicates a dead connection.
        fatal: bool,
    },

    /// Broker rejected or could not confirm a send. Reported inline so the
    /// user may retry the same text.
    #[error("publish failed: {0}")]
    Publish(String),

    /// Operation attempted against a session that already reached `Closed`.
    #[error("session is closed")]
    SessionClosed,
}

impl RelayError {
    /// Returns true if this error should force the session to close.
    ///
    /// Transient poll failures (e.g. a malformed payload) are not fatal;
    /// the poll loop keeps running through them.
    pub fn is_connection_fatal(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Poll { fatal, .. } => *fatal,
            Self::Publish(_) | Self::SessionClosed => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_classification() {
        assert!(RelayError::Connection("refused".into()).is_connection_fatal());
        assert!(RelayError::Poll { message: "down".into(), fatal: true }.is_connection_fatal());
        assert!(!RelayError::Poll { message: "bad payload".into(), fatal: false }
            .is_connection_fatal());
        assert!(!RelayError::Publish("queue full".into()).is_connection_fatal());
        assert!(!RelayError::SessionClosed.is_connection_fatal());
    }
}
