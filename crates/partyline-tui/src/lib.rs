//! Terminal UI for Partyline
//!
//! A thin shell over [`partyline_relay`] that provides terminal-specific
//! I/O. All ordering, termination, and failure handling lives in the relay
//! crate; this crate only renders the transcript and feeds entered lines
//! back in.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod app;
pub mod runtime;
pub mod ui;

pub use app::{App, AppAction, AppEvent, KeyInput};
pub use runtime::{Runtime, RuntimeError};
