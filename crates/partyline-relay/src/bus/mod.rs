//! Bus client abstraction.
//!
//! Thin operational wrappers exposing publish and bounded-poll primitives
//! over a broker connection. The two handles are split by owner per the
//! relay's shared-resource policy: the consumer handle is used only by the
//! poll loop, the producer handle only by the outbound publisher. Neither
//! trait object is ever shared for concurrent use.
//!
//! # Backends
//!
//! - [`memory`]: in-process broker for loopback mode and deterministic tests
//! - [`kafka`]: rdkafka-backed production transport (`kafka` feature)

pub mod memory;

#[cfg(feature = "kafka")]
pub mod kafka;

use std::time::Duration;

use crate::{error::RelayError, message::Message};

/// Producer half of a broker connection.
pub trait BusProducer: Send + 'static {
    /// Publish one record. Asynchronous: the call may return before the
    /// broker acknowledges; failures surface as [`RelayError::Publish`],
    /// not a blocking result.
    fn publish(&self, topic: &str, key: Option<&str>, value: &str) -> Result<(), RelayError>;

    /// Release the producer handle. Idempotent; safe to call multiple times
    /// or after partial failure.
    fn close(&mut self);
}

/// Consumer half of a broker connection.
pub trait BusConsumer: Send + 'static {
    /// Bind the consumer handle to one topic under one consumer-group
    /// identity. Fails fast with [`RelayError::Connection`]; not retried.
    fn subscribe(&mut self, topic: &str) -> Result<(), RelayError>;

    /// Return a possibly-empty batch of buffered messages. Never blocks
    /// longer than `timeout`; an empty result is `Ok`, never an error.
    fn poll(&mut self, timeout: Duration) -> Result<Vec<Message>, RelayError>;

    /// Release the consumer handle. Idempotent.
    fn close(&mut self);
}
