//! Session events and actions.

use crate::{error::RelayError, message::Message};

/// Events the driver feeds into the session state machine.
///
/// The driver is responsible for:
/// - Completing the broker subscription at startup
/// - Draining inbound batches from the bus consumer
/// - Forwarding local shutdown requests
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The consumer handle was bound to the topic.
    Subscribed,

    /// A (possibly empty) batch of inbound messages, in arrival order.
    Batch(Vec<Message>),

    /// A poll call failed.
    PollFailed(RelayError),

    /// Local shutdown was requested (user quit, relay dropped).
    CloseRequested,
}

/// Actions the session produces for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Deliver the message's text to the display surface.
    Forward(Message),

    /// Disable further input acceptance on the display surface.
    DisableInput,

    /// Release the consumer handle. The driver acknowledges completion via
    /// [`Session::complete_close`](crate::Session::complete_close).
    CloseBus,

    /// Surface a recoverable failure on the error-reporting path.
    Report(RelayError),
}
