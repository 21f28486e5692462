//! UI renderer implementation.
//!
//! Contains the top-level `render` entry point used by the terminal loop. The screen is a
//! header line (path and mode stack), the listing, and a footer line (input buffer, bulk job
//! progress, notification). While a mode other than the bottom one is active its bindings
//! are shown in a small popup.
//!
//! This module stays pure rendering: it reads the state and produces widgets.

use crate::app::AppState;
use crate::app::notify::Level;
use crate::ui::panes::{self, PaneStyles};
use crate::utils::shorten_home_path;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use unicode_width::UnicodeWidthStr;

const HELP_MAX_ROWS: usize = 16;

/// Renders the entire terminal UI for keel on each frame.
pub fn render(frame: &mut Frame, app: &AppState) {
    let chunks = layout_chunks(frame.area());

    render_header(frame, app, chunks[0]);
    panes::draw_listing(frame, chunks[1], app, &PaneStyles::default());
    render_footer(frame, app, chunks[2]);

    if app.modes().len() > 1 {
        render_mode_help(frame, app, chunks[1]);
    }
}

/// Splits the screen into header, listing and footer.
pub fn layout_chunks(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area)
        .to_vec()
}

fn render_header(frame: &mut Frame, app: &AppState, area: Rect) {
    let mode = app.modes().names().join(" > ");
    let mut right = format!(" [{mode}]");
    if !app.selection().is_empty() {
        right.push_str(&format!(" {} selected", app.selection().len()));
    }

    let path = shorten_home_path(app.nav().pwd());
    let room = (area.width as usize).saturating_sub(right.width());
    let path = panes::tail_to_width(&path, room).to_string();

    let line = Line::from(vec![
        Span::styled(
            path,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(right, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Text of the footer: input buffer, job progress and the notification, in that order.
pub fn footer_spans(app: &AppState) -> Vec<Span<'static>> {
    let mut spans = Vec::new();

    if app.modes().peek().name() == "input" || !app.input_buffer().is_empty() {
        spans.push(Span::styled(
            format!("> {}", panes::sanitize(app.input_buffer())),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw("  "));
    }

    for job in app.jobs() {
        spans.push(Span::styled(
            format!("{} {}/{}", job.kind(), job.current(), job.total()),
            Style::default().fg(Color::Magenta),
        ));
        spans.push(Span::raw("  "));
    }

    if let Some(n) = app.notification() {
        spans.push(Span::styled(
            panes::sanitize(&n.text),
            level_style(n.level),
        ));
    }
    spans
}

fn render_footer(frame: &mut Frame, app: &AppState, area: Rect) {
    frame.render_widget(Paragraph::new(Line::from(footer_spans(app))), area);
}

fn level_style(level: Level) -> Style {
    match level {
        Level::Info => Style::default(),
        Level::Success => Style::default().fg(Color::Green),
        Level::Warning => Style::default().fg(Color::Yellow),
        Level::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

/// Shows the bindings of the active mode in the bottom right corner.
fn render_mode_help(frame: &mut Frame, app: &AppState, area: Rect) {
    let mode = app.modes().peek();
    let bindings = mode.bindings();
    if bindings.is_empty() || area.height < 3 {
        return;
    }

    let lines: Vec<Line> = bindings
        .iter()
        .take(HELP_MAX_ROWS)
        .map(|(key, action)| {
            Line::from(vec![
                Span::styled(format!("{key:<8}"), Style::default().fg(Color::Yellow)),
                Span::raw(action.help.clone().unwrap_or_default()),
            ])
        })
        .collect();

    let title = mode.help().unwrap_or(mode.name()).to_string();
    let width = lines
        .iter()
        .map(|l| l.width())
        .max()
        .unwrap_or(0)
        .max(title.width())
        .saturating_add(4)
        .min(area.width as usize) as u16;
    let height = (lines.len() as u16 + 2).min(area.height);
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width),
        y: area.y + area.height.saturating_sub(height),
        width,
        height,
    };

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title)),
        popup,
    );
}
