//! Relay core for Partyline
//!
//! Bridges an interactive text-entry surface to a topic-based
//! publish/subscribe bus so that two or more participants can exchange short
//! text lines through a shared channel. The relay owns the only parts of the
//! system with real ordering, concurrency, and failure-handling concerns:
//!
//! - [`Session`]: pure state machine driving startup, the bounded poll loop,
//!   termination-token detection, and shutdown
//! - [`Relay`]: driver that runs the poll loop on a dedicated thread and
//!   executes the actions the session produces
//! - [`Publisher`]: outbound path turning locally entered text into bus
//!   messages, fire-and-forget
//! - [`DisplaySink`]: contract for delivering received text to a display
//!   surface running on a separate execution context
//! - [`bus`]: producer/consumer handle abstractions with an in-memory broker
//!   and an optional Kafka backend (`kafka` feature)
//!
//! # Architecture
//!
//! The session follows the Sans-IO, action-based pattern: events go in
//! ([`SessionEvent`]), pure state transitions happen, and actions come out
//! ([`SessionAction`]) for the driver to execute. The same machine runs under
//! the production poll loop and under deterministic tests.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod bus;
mod config;
mod display;
mod error;
mod event;
mod message;
mod publisher;
mod relay;
mod session;

pub use bus::{
    BusConsumer, BusProducer,
    memory::{MemoryBus, MemoryConsumer, MemoryProducer},
};
pub use config::{
    DEFAULT_POLL_TIMEOUT, END_OF_SESSION, OffsetReset, ParseOffsetResetError, RelayConfig,
};
pub use display::{DisplaySink, NoticeSender, UiNotice};
pub use error::RelayError;
pub use event::{SessionAction, SessionEvent};
pub use message::Message;
pub use publisher::Publisher;
pub use relay::Relay;
pub use session::{Session, SessionState};
