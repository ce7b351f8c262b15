//! Async runtime
//!
//! Event loop that drives terminal I/O and coordinates between the [`App`]
//! state machine and the relay. Uses tokio::select! to handle terminal
//! events and relay notices concurrently; the relay's poll loop stays on
//! its own thread and only reaches this loop through the notice channel.

use std::io::{self, Stdout, stdout};

use crossterm::{
    ExecutableCommand,
    event::{Event, EventStream, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use partyline_relay::{BusProducer, NoticeSender, Relay, RelayError, UiNotice};
use ratatui::{Terminal, backend::CrosstermBackend};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{
    app::{App, AppAction, AppEvent, KeyInput},
    ui,
};

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Relay error surfaced to the UI loop.
    #[error("relay error: {0}")]
    Relay(#[from] RelayError),
}

/// Async runtime for the terminal client.
///
/// Manages terminal setup/teardown and the main event loop. All relay
/// traffic arrives through the notice channel, so UI state is only ever
/// touched from this task.
pub struct Runtime<P: BusProducer> {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    app: App,
    relay: Relay<P, NoticeSender>,
    notices: mpsc::UnboundedReceiver<UiNotice>,
    notices_open: bool,
}

impl<P: BusProducer> Runtime<P> {
    /// Take over the terminal and wrap a started relay.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Io`] if raw mode or the alternate screen
    /// cannot be entered.
    pub fn new(
        topic: impl Into<String>,
        relay: Relay<P, NoticeSender>,
        notices: mpsc::UnboundedReceiver<UiNotice>,
    ) -> Result<Self, RuntimeError> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;
        let app = App::new(topic);

        Ok(Self { terminal, app, relay, notices, notices_open: true })
    }

    /// Run the main event loop until the user quits.
    pub async fn run(mut self) -> Result<(), RuntimeError> {
        self.render()?;

        let mut event_stream = EventStream::new();
        let mut tick_interval = tokio::time::interval(std::time::Duration::from_millis(100));

        loop {
            let actions = tokio::select! {
                // Terminal events
                maybe_event = event_stream.next() => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            match convert_key(key.code) {
                                Some(key) => self.app.handle(AppEvent::Key(key)),
                                None => vec![],
                            }
                        },
                        Some(Ok(Event::Resize(cols, rows))) => {
                            self.app.handle(AppEvent::Resize(cols, rows))
                        },
                        Some(Ok(_)) => vec![],
                        Some(Err(e)) => return Err(RuntimeError::Io(e)),
                        None => break,
                    }
                }

                // Notices from the relay's poll loop
                maybe_notice = self.notices.recv(), if self.notices_open => {
                    match maybe_notice {
                        Some(notice) => self.app.handle(AppEvent::Notice(notice)),
                        None => {
                            self.notices_open = false;
                            vec![]
                        },
                    }
                }

                // Periodic tick
                _ = tick_interval.tick() => {
                    self.app.handle(AppEvent::Tick)
                }
            };

            if self.process_actions(actions)? {
                break;
            }
        }

        self.relay.close();
        Ok(())
    }

    /// Process actions returned by the app. Returns true if should quit.
    fn process_actions(&mut self, actions: Vec<AppAction>) -> Result<bool, RuntimeError> {
        for action in actions {
            match action {
                AppAction::Render => self.render()?,
                AppAction::Quit => return Ok(true),
                AppAction::Submit(text) => {
                    if let Err(error) = self.relay.send_line(&text) {
                        // Only possible once the session has closed.
                        tracing::warn!(%error, "send after session end");
                        self.app.append_local(format!("Message not sent ({error})."));
                        self.render()?;
                    }
                },
            }
        }
        Ok(false)
    }

    /// Render the UI.
    fn render(&mut self) -> Result<(), RuntimeError> {
        self.terminal.draw(|frame| {
            ui::render(frame, &self.app);
        })?;
        Ok(())
    }
}

impl<P: BusProducer> Drop for Runtime<P> {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

/// Convert crossterm `KeyCode` to `KeyInput`.
fn convert_key(code: KeyCode) -> Option<KeyInput> {
    match code {
        KeyCode::Char(c) => Some(KeyInput::Char(c)),
        KeyCode::Enter => Some(KeyInput::Enter),
        KeyCode::Backspace => Some(KeyInput::Backspace),
        KeyCode::Delete => Some(KeyInput::Delete),
        KeyCode::Esc => Some(KeyInput::Esc),
        KeyCode::Left => Some(KeyInput::Left),
        KeyCode::Right => Some(KeyInput::Right),
        KeyCode::Home => Some(KeyInput::Home),
        KeyCode::End => Some(KeyInput::End),
        _ => None,
    }
}
