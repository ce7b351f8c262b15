//! UI rendering
//!
//! Rendering functions that convert [`App`] state into terminal output
//! using ratatui widgets. All functions are pure, taking state and
//! emitting widgets into the frame.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use crate::App;

const BORDER_SIZE: u16 = 2;
const PROMPT_WIDTH: u16 = 3; // "> "
const INPUT_LINE_OFFSET_Y: u16 = 1; // inside top border
const RIGHT_PADDING: u16 = 1; // inside right border

/// Render the entire UI.
pub fn render(frame: &mut Frame, app: &App) {
    const TRANSCRIPT_MIN_HEIGHT: u16 = 3;
    const INPUT_HEIGHT: u16 = 3;
    const STATUS_HEIGHT: u16 = 1;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(TRANSCRIPT_MIN_HEIGHT),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(frame.area());

    let [transcript_area, input_area, status_area] = chunks.as_ref() else {
        return;
    };

    render_transcript(frame, app, *transcript_area);
    render_input(frame, app, *input_area);
    render_status(frame, app, *status_area);
}

/// Render the transcript, pinned to the newest lines.
fn render_transcript(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(format!(" #{} ", app.topic()));

    let items: Vec<ListItem> = if app.transcript().is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "Waiting for messages",
            Style::default().fg(Color::DarkGray),
        )))]
    } else {
        app.transcript().iter().map(|line| ListItem::new(Line::from(line.as_str()))).collect()
    };

    let visible_height = area.height.saturating_sub(BORDER_SIZE) as usize;
    let skip = items.len().saturating_sub(visible_height);
    let visible_items: Vec<_> = items.into_iter().skip(skip).collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}

/// Render the entry line with the cursor, dimmed once entry is disabled.
#[allow(clippy::cast_possible_truncation)]
fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let style = if app.input_enabled() {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM)
    };

    let block = Block::default().borders(Borders::ALL);
    let paragraph = Paragraph::new(format!("> {}", app.input())).style(style).block(block);
    frame.render_widget(paragraph, area);

    if !app.input_enabled() {
        return;
    }

    let cursor_cols = app.input()[..app.cursor()].chars().count() as u16;
    let available_width = area.width.saturating_sub(PROMPT_WIDTH + RIGHT_PADDING);
    let cursor_offset = cursor_cols.min(available_width);

    let cursor_x = area.x.saturating_add(PROMPT_WIDTH).saturating_add(cursor_offset);
    let cursor_y = area.y.saturating_add(INPUT_LINE_OFFSET_Y);
    let max_x = area.x.saturating_add(area.width).saturating_sub(RIGHT_PADDING);

    frame.set_cursor_position((cursor_x.min(max_x), cursor_y));
}

/// Render the status bar.
fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let session = if app.input_enabled() {
        Span::styled("Live", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        Span::styled("Ended", Style::default().fg(Color::Red))
    };

    let mut spans = vec![Span::raw(" "), session];
    if let Some(status) = app.status() {
        spans.push(Span::styled(format!(" | {status}"), Style::default().fg(Color::Gray)));
    }
    spans.push(Span::styled(
        format!(" | {} lines", app.transcript().len()),
        Style::default().fg(Color::Gray),
    ));

    let paragraph = Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(paragraph, area);
}
