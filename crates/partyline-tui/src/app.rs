//! UI state machine.
//!
//! Pure state for the terminal client: the visible transcript, the text
//! entry buffer with its cursor, and whether entry is currently enabled.
//! Events go in, state changes, actions come out for the runtime to
//! execute. No I/O happens here, which keeps every transition testable.

use partyline_relay::UiNotice;

/// Key input events from the terminal, already filtered to presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Character input.
    Char(char),
    /// Enter/Return key.
    Enter,
    /// Backspace key.
    Backspace,
    /// Delete key.
    Delete,
    /// Escape key.
    Esc,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Home key.
    Home,
    /// End key.
    End,
}

/// Events fed into the [`App`] state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// A key press from the terminal.
    Key(KeyInput),
    /// A notification from the relay's poll loop.
    Notice(UiNotice),
    /// Terminal resized to (cols, rows).
    Resize(u16, u16),
    /// Periodic tick.
    Tick,
}

/// Actions the runtime must execute after a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Redraw the UI.
    Render,
    /// Publish the entered line through the relay.
    Submit(String),
    /// Tear everything down and exit.
    Quit,
}

/// UI state for the terminal client.
#[derive(Debug)]
pub struct App {
    topic: String,
    transcript: Vec<String>,
    input: String,
    cursor: usize,
    input_enabled: bool,
    status: Option<String>,
}

impl App {
    /// Create the initial state for a session on `topic`.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            transcript: Vec::new(),
            input: String::new(),
            cursor: 0,
            input_enabled: true,
            status: None,
        }
    }

    /// Topic this session is attached to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Lines received so far, oldest first.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Current text in the entry buffer.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Cursor position within the entry buffer, in bytes.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether text entry is currently accepted.
    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    /// Transient status text, if any.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Append a line to the transcript directly.
    ///
    /// Used by the runtime for locally generated notices that never went
    /// through the relay, like a failed send after session end.
    pub fn append_local(&mut self, text: impl Into<String>) {
        self.transcript.push(text.into());
    }

    /// Process one event and return the actions it produced.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Notice(notice) => self.handle_notice(notice),
            AppEvent::Resize(_, _) | AppEvent::Tick => vec![AppAction::Render],
        }
    }

    fn handle_notice(&mut self, notice: UiNotice) -> Vec<AppAction> {
        match notice {
            UiNotice::Append(text) => self.transcript.push(text),
            UiNotice::InputEnabled(enabled) => {
                self.input_enabled = enabled;
                if !enabled {
                    self.status = Some("Session ended. Press Esc to exit.".to_string());
                }
            },
        }
        vec![AppAction::Render]
    }

    fn handle_key(&mut self, key: KeyInput) -> Vec<AppAction> {
        match key {
            KeyInput::Esc => return vec![AppAction::Quit],
            KeyInput::Char(c) if self.input_enabled => {
                self.input.insert(self.cursor, c);
                self.cursor = self.cursor.saturating_add(c.len_utf8());
            },
            KeyInput::Backspace if self.input_enabled => {
                if let Some((idx, _)) = self.input[..self.cursor].char_indices().next_back() {
                    self.input.remove(idx);
                    self.cursor = idx;
                }
            },
            KeyInput::Delete if self.input_enabled => {
                if self.cursor < self.input.len() {
                    self.input.remove(self.cursor);
                }
            },
            KeyInput::Left => {
                if let Some((idx, _)) = self.input[..self.cursor].char_indices().next_back() {
                    self.cursor = idx;
                }
            },
            KeyInput::Right => {
                if let Some(c) = self.input[self.cursor..].chars().next() {
                    self.cursor = self.cursor.saturating_add(c.len_utf8());
                }
            },
            KeyInput::Home => self.cursor = 0,
            KeyInput::End => self.cursor = self.input.len(),
            KeyInput::Enter => return self.handle_enter(),
            KeyInput::Char(_) | KeyInput::Backspace | KeyInput::Delete => {
                // Entry is disabled; swallow the edit.
                return vec![];
            },
        }
        vec![AppAction::Render]
    }

    fn handle_enter(&mut self) -> Vec<AppAction> {
        if !self.input_enabled {
            return vec![];
        }

        let text = std::mem::take(&mut self.input);
        self.cursor = 0;

        if text.is_empty() {
            return vec![AppAction::Render];
        }
        vec![AppAction::Submit(text), AppAction::Render]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn typed(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle(AppEvent::Key(KeyInput::Char(c)));
        }
    }

    #[test]
    fn char_input_adds_to_buffer() {
        let mut app = App::new("demo");
        typed(&mut app, "hi");

        assert_eq!(app.input(), "hi");
        assert_eq!(app.cursor(), 2);
    }

    #[test]
    fn backspace_removes_char_before_cursor() {
        let mut app = App::new("demo");
        typed(&mut app, "ab");
        app.handle(AppEvent::Key(KeyInput::Backspace));

        assert_eq!(app.input(), "a");
        assert_eq!(app.cursor(), 1);
    }

    #[test]
    fn cursor_movement() {
        let mut app = App::new("demo");
        typed(&mut app, "abc");

        app.handle(AppEvent::Key(KeyInput::Home));
        assert_eq!(app.cursor(), 0);

        app.handle(AppEvent::Key(KeyInput::End));
        assert_eq!(app.cursor(), 3);

        app.handle(AppEvent::Key(KeyInput::Left));
        assert_eq!(app.cursor(), 2);

        app.handle(AppEvent::Key(KeyInput::Right));
        assert_eq!(app.cursor(), 3);
    }

    #[test]
    fn enter_submits_and_clears_buffer() {
        let mut app = App::new("demo");
        typed(&mut app, "hello");

        let actions = app.handle(AppEvent::Key(KeyInput::Enter));
        assert_eq!(actions[0], AppAction::Submit("hello".to_string()));
        assert!(app.input().is_empty());
        assert_eq!(app.cursor(), 0);
    }

    #[test]
    fn empty_enter_submits_nothing() {
        let mut app = App::new("demo");
        let actions = app.handle(AppEvent::Key(KeyInput::Enter));
        assert!(!actions.iter().any(|a| matches!(a, AppAction::Submit(_))));
    }

    #[test]
    fn notices_update_transcript_and_entry_state() {
        let mut app = App::new("demo");
        app.handle(AppEvent::Notice(UiNotice::Append("one".to_string())));
        app.handle(AppEvent::Notice(UiNotice::Append("two".to_string())));
        assert_eq!(app.transcript(), ["one", "two"]);

        app.handle(AppEvent::Notice(UiNotice::InputEnabled(false)));
        assert!(!app.input_enabled());
        assert!(app.status().is_some());
    }

    #[test]
    fn disabled_entry_ignores_typing_but_not_esc() {
        let mut app = App::new("demo");
        app.handle(AppEvent::Notice(UiNotice::InputEnabled(false)));

        typed(&mut app, "ignored");
        assert_eq!(app.input(), "");
        assert!(app.handle(AppEvent::Key(KeyInput::Enter)).is_empty());

        let actions = app.handle(AppEvent::Key(KeyInput::Esc));
        assert_eq!(actions, vec![AppAction::Quit]);
    }

    #[test]
    fn multibyte_input_keeps_cursor_on_char_boundaries() {
        let mut app = App::new("demo");
        typed(&mut app, "aé");
        assert_eq!(app.cursor(), 3);

        app.handle(AppEvent::Key(KeyInput::Left));
        assert_eq!(app.cursor(), 1);

        app.handle(AppEvent::Key(KeyInput::Backspace));
        assert_eq!(app.input(), "é");
        assert_eq!(app.cursor(), 0);
    }
}
