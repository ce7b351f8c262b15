//! Fuzz target for the session state machine
//!
//! Drive the machine with arbitrary event sequences and check the
//! lifecycle invariants hold no matter the order.
//!
//! # Invariants
//!
//! - States only move forward through Starting -> Running -> Closing ->
//!   Closed, never backwards
//! - Forward actions only occur while Running and never carry the token
//! - DisableInput is emitted at most once per session
//! - Every event handled after Closed fails with SessionClosed

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use partyline_relay::{Message, RelayError, Session, SessionAction, SessionEvent, SessionState};

const TOKEN: &str = "SERVER - END";

#[derive(Debug, Arbitrary)]
enum Op {
    Subscribed,
    Batch(Vec<Payload>),
    PollTransient,
    PollFatal,
    CloseRequested,
    CompleteClose,
}

#[derive(Debug, Arbitrary)]
enum Payload {
    Line(String),
    Token,
}

fn batch(payloads: Vec<Payload>) -> Vec<Message> {
    payloads
        .into_iter()
        .enumerate()
        .map(|(offset, payload)| {
            let value = match payload {
                Payload::Line(line) => line,
                Payload::Token => TOKEN.to_string(),
            };
            Message::new("fuzz", value, 0, offset as i64)
        })
        .collect()
}

fuzz_target!(|ops: Vec<Op>| {
    let mut session = Session::new(TOKEN);
    let mut disables = 0usize;

    for op in ops {
        let before = session.state();
        let event = match op {
            Op::Subscribed => SessionEvent::Subscribed,
            Op::Batch(payloads) => SessionEvent::Batch(batch(payloads)),
            Op::PollTransient => SessionEvent::PollFailed(RelayError::Poll {
                message: "transient".to_string(),
                fatal: false,
            }),
            Op::PollFatal => SessionEvent::PollFailed(RelayError::Poll {
                message: "fatal".to_string(),
                fatal: true,
            }),
            Op::CloseRequested => SessionEvent::CloseRequested,
            Op::CompleteClose => {
                session.complete_close();
                assert_eq!(session.state(), SessionState::Closed);
                continue;
            },
        };

        match session.handle(event) {
            Ok(actions) => {
                assert_ne!(before, SessionState::Closed, "closed session accepted an event");

                for action in &actions {
                    match action {
                        SessionAction::Forward(message) => {
                            assert_eq!(before, SessionState::Running);
                            assert_ne!(message.value, TOKEN, "token leaked to the display");
                        },
                        SessionAction::DisableInput => disables += 1,
                        SessionAction::CloseBus | SessionAction::Report(_) => {},
                    }
                }
            },
            Err(error) => {
                assert_eq!(before, SessionState::Closed);
                assert_eq!(error, RelayError::SessionClosed);
            },
        }

        assert!(session.state() >= before, "state moved backwards");
        assert!(disables <= 1, "input disabled more than once");
    }
});
