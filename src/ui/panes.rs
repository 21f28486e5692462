//! Pane rendering for keel.
//!
//! The listing pane draws the entries of the working directory with the focus bar and the
//! selection markers. Names are truncated to the pane width by display width, not bytes.

use crate::app::AppState;
use crate::core::fm::Node;

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const SELECTION_MARKER: &str = "* ";
const NO_MARKER: &str = "  ";
const ELLIPSIS: char = '…';
const SCROLL_PADDING: usize = 3;

/// Styles used for listing rows.
#[derive(Debug, Clone, Copy)]
pub struct PaneStyles {
    pub item: Style,
    pub dir: Style,
    pub symlink: Style,
    pub broken: Style,
    pub focus: Style,
    pub marker: Style,
}

impl Default for PaneStyles {
    fn default() -> Self {
        Self {
            item: Style::default(),
            dir: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            symlink: Style::default().fg(Color::Cyan),
            broken: Style::default().fg(Color::Red),
            focus: Style::default().add_modifier(Modifier::REVERSED),
            marker: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        }
    }
}

impl PaneStyles {
    fn entry_style(&self, node: &Node) -> Style {
        if node.is_broken_sym() {
            self.broken
        } else if node.is_dir() {
            self.dir
        } else if node.is_symlink() {
            self.symlink
        } else {
            self.item
        }
    }
}

/// Draws the working directory listing.
pub fn draw_listing(frame: &mut Frame, area: Rect, app: &AppState, styles: &PaneStyles) {
    let block = Block::default().borders(Borders::NONE);
    let nodes = app.nav().nodes();

    if nodes.is_empty() {
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(" [Empty]", styles.item))).block(block),
            area,
        );
        return;
    }

    let name_width = (area.width as usize).saturating_sub(NO_MARKER.width());
    let focus = app.nav().focus_idx();

    let items: Vec<ListItem> = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| {
            let selected = app.selection().contains(node.path());
            make_entry_row(node, selected, idx == focus, name_width, styles)
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(focus));

    frame.render_stateful_widget(
        List::new(items).block(block).scroll_padding(SCROLL_PADDING),
        area,
        &mut state,
    );
}

fn make_entry_row(
    node: &Node,
    selected: bool,
    focused: bool,
    width: usize,
    styles: &PaneStyles,
) -> ListItem<'static> {
    let marker = if selected {
        Span::styled(SELECTION_MARKER, styles.marker)
    } else {
        Span::raw(NO_MARKER)
    };

    let mut name = node.name_str().into_owned();
    if node.is_dir() {
        name.push('/');
    }
    let name = truncate_to_width(&sanitize(&name), width);

    let mut style = styles.entry_style(node);
    if focused {
        style = style.patch(styles.focus);
    }
    ListItem::new(Line::from(vec![marker, Span::styled(name, style)]))
}

/// Replaces control characters so a file name cannot break the row layout.
pub fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_control() { '?' } else { c })
        .collect()
}

/// Cuts `s` to at most `max` display columns, marking the cut with an ellipsis.
pub fn truncate_to_width(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }

    let budget = max - 1;
    let mut used = 0;
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push(ELLIPSIS);
    out
}

/// Keeps the last `max` display columns of `s`; used where the end matters most.
pub fn tail_to_width(s: &str, max: usize) -> &str {
    if s.width() <= max {
        return s;
    }
    let mut used = 0;
    let mut start = s.len();
    for (idx, c) in s.char_indices().rev() {
        let w = c.width().unwrap_or(0);
        if used + w > max {
            break;
        }
        used += w;
        start = idx;
    }
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_display_width() {
        let cases = [
            ("short.txt", 10, "short.txt"),
            ("very_long_filename.txt", 10, "very_long…"),
            ("🦀🦀🦀🦀🦀🦀", 5, "🦀🦀…"),
            ("abc", 0, ""),
        ];
        for (input, width, expected) in cases {
            let out = truncate_to_width(input, width);
            assert_eq!(out, expected, "input {input:?}");
            assert!(out.width() <= width);
        }
    }

    #[test]
    fn tail_keeps_the_end() {
        assert_eq!(tail_to_width("/home/user/projects", 8), "projects");
        assert_eq!(tail_to_width("abc", 8), "abc");
        assert_eq!(tail_to_width("x🦀", 1), "");
    }

    #[test]
    fn control_characters_are_replaced() {
        assert_eq!(sanitize("a\tb\nc"), "a?b?c");
    }
}
